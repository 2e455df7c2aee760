//! Error types for the editor crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `StoreError` / `ApprovalError`: failures reported by collaborators
//! - `PanelError`: configuration panel commits
//! - `EditorError`: session level saves, loads, and renames
//! - `SubmissionError`: the submit procedure
//!
//! A blocked submission is not an error. It is reported as
//! [`SubmissionOutcome::Blocked`](crate::submission::SubmissionOutcome).

use flowdesk_core::WorkflowId;
use flowdesk_workflow::{NodeId, WorkflowStatus};
use std::fmt;

/// Errors from the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No record exists for the workflow.
    NotFound { workflow_id: WorkflowId },
    /// The backing storage failed.
    Io { details: String },
    /// A stored record could not be decoded.
    Corrupt { workflow_id: WorkflowId, details: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { workflow_id } => write!(f, "workflow not found: {workflow_id}"),
            Self::Io { details } => write!(f, "storage error: {details}"),
            Self::Corrupt {
                workflow_id,
                details,
            } => write!(f, "stored workflow {workflow_id} is unreadable: {details}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors from the approval collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalError {
    /// The reviewer side refused the hand-off.
    Rejected { reason: String },
    /// The approval service could not be reached.
    Unavailable { details: String },
}

impl fmt::Display for ApprovalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { reason } => write!(f, "submission rejected: {reason}"),
            Self::Unavailable { details } => write!(f, "approval service unavailable: {details}"),
        }
    }
}

impl std::error::Error for ApprovalError {}

/// Errors from the configuration panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelError {
    /// The node's type is not in the catalog.
    UnknownNodeType { node_type: String },
    /// The panel's node is no longer on the canvas.
    NodeNotFound { node_id: NodeId },
    /// The field is not declared by the node's definition.
    UnknownField { field: String },
    /// Some fields failed their checks; nothing was committed.
    InvalidFields { fields: Vec<String> },
    /// No single node is selected.
    NothingSelected,
    /// The workflow's status no longer allows edits.
    ReadOnly { status: WorkflowStatus },
}

impl fmt::Display for PanelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNodeType { node_type } => write!(f, "unknown node type: {node_type}"),
            Self::NodeNotFound { node_id } => write!(f, "node not found: {node_id}"),
            Self::UnknownField { field } => write!(f, "unknown field: {field}"),
            Self::InvalidFields { fields } => {
                write!(f, "fields need attention: {}", fields.join(", "))
            }
            Self::NothingSelected => write!(f, "no node is selected"),
            Self::ReadOnly { status } => write!(f, "workflow is {status} and cannot be edited"),
        }
    }
}

impl std::error::Error for PanelError {}

/// Errors from an editing session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    /// The workflow could not be loaded.
    LoadFailed { workflow_id: WorkflowId, details: String },
    /// Saving the canvas failed. The in-memory state is kept.
    SaveFailed { workflow_id: WorkflowId, details: String },
    /// Renaming the workflow failed.
    RenameFailed { workflow_id: WorkflowId, details: String },
    /// The canvas has no auto-saver attached.
    AutoSaveUnavailable,
    /// The auto-save task has stopped.
    AutoSaveStopped,
}

impl fmt::Display for EditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadFailed {
                workflow_id,
                details,
            } => write!(f, "failed to load workflow {workflow_id}: {details}"),
            Self::SaveFailed {
                workflow_id,
                details,
            } => write!(f, "failed to save workflow {workflow_id}: {details}"),
            Self::RenameFailed {
                workflow_id,
                details,
            } => write!(f, "failed to rename workflow {workflow_id}: {details}"),
            Self::AutoSaveUnavailable => write!(f, "canvas has no auto-saver"),
            Self::AutoSaveStopped => write!(f, "auto-save task has stopped"),
        }
    }
}

impl std::error::Error for EditorError {}

/// Errors from the submission procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    /// Only drafts can be submitted.
    NotDraft { status: WorkflowStatus },
    /// Another submission for this session is still running.
    AlreadyInFlight,
    /// The pre-submit save failed; nothing was handed off.
    SaveFailed { details: String },
    /// The approval service refused or failed.
    ApprovalFailed { details: String },
}

impl fmt::Display for SubmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotDraft { status } => {
                write!(f, "only drafts can be submitted (status is {status})")
            }
            Self::AlreadyInFlight => write!(f, "a submission is already in progress"),
            Self::SaveFailed { details } => write!(f, "save before submit failed: {details}"),
            Self::ApprovalFailed { details } => write!(f, "hand-off to approval failed: {details}"),
        }
    }
}

impl std::error::Error for SubmissionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_error_lists_fields() {
        let error = PanelError::InvalidFields {
            fields: vec!["to".to_string(), "subject".to_string()],
        };
        assert_eq!(error.to_string(), "fields need attention: to, subject");
    }

    #[test]
    fn not_draft_names_status() {
        let error = SubmissionError::NotDraft {
            status: WorkflowStatus::PendingReview,
        };
        assert!(error.to_string().contains("pending_review"));
    }
}
