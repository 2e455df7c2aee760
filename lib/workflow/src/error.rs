//! Error types for the workflow crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `CatalogError`: Node type parsing and catalog registration
//! - `GraphError`: Structural graph mutations (nodes, edges)
//!
//! Validation findings are not errors. They are reported as data through
//! [`ValidationResult`](crate::validation::ValidationResult).

use crate::id::{EdgeId, NodeId};
use std::fmt;

/// Errors from node type parsing and catalog registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A node type token did not have the `category/kind` shape.
    MalformedNodeType { token: String },
    /// The category half of a node type token is not a known category.
    UnknownCategory { category: String },
    /// A definition for this node type is already registered.
    DuplicateDefinition { node_type: String },
    /// Two fields of one definition share a name.
    DuplicateField { node_type: String, field: String },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedNodeType { token } => {
                write!(f, "malformed node type '{token}', expected 'category/kind'")
            }
            Self::UnknownCategory { category } => {
                write!(f, "unknown node category '{category}'")
            }
            Self::DuplicateDefinition { node_type } => {
                write!(f, "node type '{node_type}' is already registered")
            }
            Self::DuplicateField { node_type, field } => {
                write!(f, "node type '{node_type}' declares field '{field}' twice")
            }
        }
    }
}

impl std::error::Error for CatalogError {}

/// Errors from graph mutations.
///
/// These errors contain only information available at the graph layer.
/// Workflow-level context (like the workflow id) belongs to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The node type is not registered in the catalog.
    UnknownNodeType { node_type: String },
    /// Node with the given ID was not found in the graph.
    NodeNotFound { node_id: NodeId },
    /// Edge with the given ID was not found in the graph.
    EdgeNotFound { edge_id: EdgeId },
    /// A node with this ID already exists.
    DuplicateNode { node_id: NodeId },
    /// An edge with this ID already exists.
    DuplicateEdge { edge_id: EdgeId },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNodeType { node_type } => {
                write!(f, "unknown node type: {node_type}")
            }
            Self::NodeNotFound { node_id } => write!(f, "node not found: {node_id}"),
            Self::EdgeNotFound { edge_id } => write!(f, "edge not found: {edge_id}"),
            Self::DuplicateNode { node_id } => write!(f, "node already exists: {node_id}"),
            Self::DuplicateEdge { edge_id } => write!(f, "edge already exists: {edge_id}"),
        }
    }
}

impl std::error::Error for GraphError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_error_display() {
        let err = CatalogError::MalformedNodeType {
            token: "send_email".to_string(),
        };
        assert!(err.to_string().contains("expected 'category/kind'"));
    }

    #[test]
    fn graph_error_display() {
        let err = GraphError::NodeNotFound {
            node_id: NodeId::new("node_a"),
        };
        assert_eq!(err.to_string(), "node not found: node_a");
    }
}
