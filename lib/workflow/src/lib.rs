//! Workflow model for the flowdesk designer.
//!
//! This crate holds everything about a workflow that does not depend on an
//! editing session:
//!
//! - **Node Catalog**: registered node types, their config fields and ports
//! - **Graph Model**: nodes and edges in a petgraph stable graph
//! - **Canvas**: the persisted snapshot and its viewport
//! - **Validation**: structural and configuration checks, plus summary stats
//! - **Definition**: stored workflow records and submission requests

mod builtin;
pub mod canvas;
pub mod catalog;
pub mod definition;
pub mod edge;
pub mod error;
pub mod graph;
pub mod id;
pub mod node;
pub mod port;
pub mod validation;

pub use canvas::{CanvasState, MAX_ZOOM, MIN_ZOOM, Viewport};
pub use catalog::{
    ConfigFieldDefinition, FieldKind, NodeCatalog, NodeDefinition, SelectOption, is_blank,
};
pub use definition::{Priority, StoredWorkflow, SubmissionRequest, WorkflowStatus};
pub use edge::WorkflowEdge;
pub use error::{CatalogError, GraphError};
pub use graph::{GraphSnapshot, Neighbors, WorkflowGraph};
pub use id::{EdgeId, NodeId};
pub use node::{ConfigMap, NodeCategory, NodeData, NodeType, Position, WorkflowNode};
pub use port::{PortDefinition, Ports};
pub use validation::{
    IssueCode, Reachability, ValidationIssue, ValidationPolicy, ValidationResult, WorkflowStats,
    get_stats, validate, validate_with,
};
