//! Core types shared by the flowdesk crates.
//!
//! This crate provides the identifiers and the error-handling foundation
//! used by the workflow model, the editor controllers, and the designer
//! binary.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ParseIdError, SubmissionId, WorkflowId};
