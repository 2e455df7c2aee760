//! Edge types for workflow graphs.
//!
//! Edges are directed from a source node to a target node. Each end may
//! name a port handle; an absent handle means the node's default port
//! (`output` on the source, `input` on the target).

use crate::id::{EdgeId, NodeId};
use crate::port::{DEFAULT_INPUT, DEFAULT_OUTPUT};
use serde::{Deserialize, Serialize};

/// An edge connecting two nodes in a workflow graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEdge {
    /// Unique identifier for this edge within the graph.
    pub id: EdgeId,
    /// The node the edge leaves.
    pub source: NodeId,
    /// The node the edge enters.
    pub target: NodeId,
    /// Output handle on the source node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    /// Input handle on the target node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl WorkflowEdge {
    /// Creates an edge between default ports with a freshly generated id.
    #[must_use]
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self {
            id: EdgeId::generate(),
            source,
            target,
            source_handle: None,
            target_handle: None,
        }
    }

    /// Sets the port handles.
    #[must_use]
    pub fn with_handles(mut self, source_handle: Option<String>, target_handle: Option<String>) -> Self {
        self.source_handle = source_handle;
        self.target_handle = target_handle;
        self
    }

    /// Sets a specific id.
    #[must_use]
    pub fn with_id(mut self, id: EdgeId) -> Self {
        self.id = id;
        self
    }

    /// Returns the effective source port name.
    #[must_use]
    pub fn source_port(&self) -> &str {
        self.source_handle.as_deref().unwrap_or(DEFAULT_OUTPUT)
    }

    /// Returns the effective target port name.
    #[must_use]
    pub fn target_port(&self) -> &str {
        self.target_handle.as_deref().unwrap_or(DEFAULT_INPUT)
    }

    /// Whether either endpoint is the given node.
    #[must_use]
    pub fn touches(&self, node_id: &NodeId) -> bool {
        &self.source == node_id || &self.target == node_id
    }

    /// Whether the edge starts and ends on the same node.
    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    /// Whether both edges connect the same ports of the same nodes.
    #[must_use]
    pub fn is_parallel_to(&self, other: &Self) -> bool {
        self.source == other.source
            && self.target == other.target
            && self.source_port() == other.source_port()
            && self.target_port() == other.target_port()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_handles_fall_back_to_default_ports() {
        let edge = WorkflowEdge::new(NodeId::new("a"), NodeId::new("b"));
        assert_eq!(edge.source_port(), "output");
        assert_eq!(edge.target_port(), "input");
    }

    #[test]
    fn explicit_handle_matches_default_for_parallel_check() {
        let implicit = WorkflowEdge::new(NodeId::new("a"), NodeId::new("b"));
        let explicit = WorkflowEdge::new(NodeId::new("a"), NodeId::new("b"))
            .with_handles(Some("output".to_string()), None);
        assert!(implicit.is_parallel_to(&explicit));
        assert_ne!(implicit.id, explicit.id);
    }

    #[test]
    fn branch_handles_are_distinct_routes() {
        let yes = WorkflowEdge::new(NodeId::new("cond"), NodeId::new("b"))
            .with_handles(Some("true".to_string()), None);
        let no = WorkflowEdge::new(NodeId::new("cond"), NodeId::new("b"))
            .with_handles(Some("false".to_string()), None);
        assert!(!yes.is_parallel_to(&no));
    }

    #[test]
    fn handles_are_omitted_from_json_when_absent() {
        let edge = WorkflowEdge::new(NodeId::new("a"), NodeId::new("b")).with_id(EdgeId::new("e1"));
        let json = serde_json::to_value(&edge).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({ "id": "e1", "source": "a", "target": "b" })
        );
    }
}
