//! Errors surfaced by the designer commands.

use flowdesk_core::WorkflowId;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesignerError {
    Config { details: String },
    ReadCanvas { path: PathBuf, details: String },
    Store { details: String },
    NotFound { workflow_id: WorkflowId },
    Editor { details: String },
}

impl fmt::Display for DesignerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "invalid configuration: {details}"),
            Self::ReadCanvas { path, details } => {
                write!(f, "cannot read canvas {}: {details}", path.display())
            }
            Self::Store { details } => write!(f, "workflow store failed: {details}"),
            Self::NotFound { workflow_id } => write!(f, "no workflow with id {workflow_id}"),
            Self::Editor { details } => write!(f, "{details}"),
        }
    }
}

impl std::error::Error for DesignerError {}
