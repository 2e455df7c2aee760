//! Workflow graph implementation using petgraph.
//!
//! The graph is the in-memory working copy of a canvas:
//! - Nodes are catalog-typed steps with a position and a config payload
//! - Edges are directed and may name source/target port handles
//!
//! The graph stays permissive while the user edits. Self-loops, parallel
//! edges, and unreachable nodes are allowed here and reported later by the
//! validator. The only structural invariant enforced is that every edge
//! endpoint is a node of this graph.

use crate::canvas::{CanvasState, Viewport};
use crate::catalog::NodeCatalog;
use crate::edge::WorkflowEdge;
use crate::error::GraphError;
use crate::id::{EdgeId, NodeId};
use crate::node::{ConfigMap, NodeData, NodeType, Position, WorkflowNode};
use petgraph::Direction;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use rootcause::Report;
use std::collections::HashMap;

/// An immutable copy of the graph's nodes and edges.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphSnapshot {
    pub nodes: Vec<WorkflowNode>,
    pub edges: Vec<WorkflowEdge>,
}

/// The edges touching one node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Neighbors {
    pub incoming: Vec<WorkflowEdge>,
    pub outgoing: Vec<WorkflowEdge>,
}

/// A workflow graph using petgraph's stable directed graph.
///
/// Stable indices keep the id maps valid across removals.
#[derive(Debug, Clone, Default)]
pub struct WorkflowGraph {
    graph: StableDiGraph<WorkflowNode, WorkflowEdge>,
    node_index_map: HashMap<NodeId, NodeIndex>,
    edge_index_map: HashMap<EdgeId, EdgeIndex>,
}

impl WorkflowGraph {
    /// Creates a new empty workflow graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a graph from a stored canvas.
    ///
    /// Nodes with a repeated id and edges whose endpoints are missing are
    /// dropped.
    #[must_use]
    pub fn from_canvas(canvas: &CanvasState) -> Self {
        let mut graph = Self::new();
        for node in &canvas.nodes {
            if let Err(error) = graph.insert_node(node.clone()) {
                tracing::debug!(%error, "dropping node while loading canvas");
            }
        }
        for edge in &canvas.edges {
            if let Err(error) = graph.insert_edge(edge.clone()) {
                tracing::debug!(%error, edge_id = %edge.id, "dropping edge while loading canvas");
            }
        }
        graph
    }

    /// Serializes the graph into a canvas with the given viewport.
    #[must_use]
    pub fn to_canvas(&self, viewport: Viewport) -> CanvasState {
        let GraphSnapshot { nodes, edges } = self.snapshot();
        CanvasState {
            nodes,
            edges,
            viewport,
        }
    }

    /// Instantiates a catalog entry at `position` with its default payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the node type is not registered in the catalog.
    pub fn add_node(
        &mut self,
        catalog: &NodeCatalog,
        node_type: &NodeType,
        position: Position,
    ) -> Result<WorkflowNode, Report<GraphError>> {
        let data = catalog
            .create_default_payload(node_type)
            .ok_or_else(|| GraphError::UnknownNodeType {
                node_type: node_type.to_string(),
            })?;
        let node = WorkflowNode::new(node_type.clone(), position, data);
        self.insert_node(node.clone())?;
        Ok(node)
    }

    /// Inserts a fully built node, keeping its id.
    ///
    /// # Errors
    ///
    /// Returns an error if a node with the same id exists.
    pub fn insert_node(&mut self, node: WorkflowNode) -> Result<(), Report<GraphError>> {
        if self.node_index_map.contains_key(&node.id) {
            return Err(GraphError::DuplicateNode { node_id: node.id }.into());
        }
        let node_id = node.id.clone();
        let index = self.graph.add_node(node);
        self.node_index_map.insert(node_id, index);
        Ok(())
    }

    /// Moves a node and returns its previous position.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn move_node(
        &mut self,
        node_id: &NodeId,
        position: Position,
    ) -> Result<Position, Report<GraphError>> {
        let node = self.node_mut(node_id)?;
        Ok(std::mem::replace(&mut node.position, position))
    }

    /// Removes a node and every edge that starts or ends at it.
    ///
    /// Returns the node and the removed edges, or `None` if no such node.
    pub fn remove_node(&mut self, node_id: &NodeId) -> Option<(WorkflowNode, Vec<WorkflowEdge>)> {
        let index = self.node_index_map.remove(node_id)?;
        let mut edge_indices: Vec<EdgeIndex> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .chain(self.graph.edges_directed(index, Direction::Incoming))
            .map(|edge| edge.id())
            .collect();
        edge_indices.sort();
        edge_indices.dedup();

        let mut removed = Vec::with_capacity(edge_indices.len());
        for edge_index in edge_indices {
            if let Some(edge) = self.graph.remove_edge(edge_index) {
                self.edge_index_map.remove(&edge.id);
                removed.push(edge);
            }
        }
        let node = self.graph.remove_node(index)?;
        Some((node, removed))
    }

    /// Creates a directed edge between two existing nodes.
    ///
    /// Self-loops and parallel edges are accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if either endpoint does not exist.
    pub fn connect(
        &mut self,
        source: &NodeId,
        target: &NodeId,
        source_handle: Option<String>,
        target_handle: Option<String>,
    ) -> Result<WorkflowEdge, Report<GraphError>> {
        let edge = WorkflowEdge::new(source.clone(), target.clone())
            .with_handles(source_handle, target_handle);
        self.insert_edge(edge.clone())?;
        Ok(edge)
    }

    /// Inserts a fully built edge, keeping its id.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint is missing or the id is taken.
    pub fn insert_edge(&mut self, edge: WorkflowEdge) -> Result<(), Report<GraphError>> {
        let source_index = self.index_of(&edge.source)?;
        let target_index = self.index_of(&edge.target)?;
        if self.edge_index_map.contains_key(&edge.id) {
            return Err(GraphError::DuplicateEdge { edge_id: edge.id }.into());
        }
        let edge_id = edge.id.clone();
        let index = self.graph.add_edge(source_index, target_index, edge);
        self.edge_index_map.insert(edge_id, index);
        Ok(())
    }

    /// Removes a single edge.
    pub fn disconnect(&mut self, edge_id: &EdgeId) -> Option<WorkflowEdge> {
        let index = self.edge_index_map.remove(edge_id)?;
        self.graph.remove_edge(index)
    }

    /// Shallow-merges `patch` into a node's config, leaving the rest of the
    /// payload untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn patch_node_config(
        &mut self,
        node_id: &NodeId,
        patch: ConfigMap,
    ) -> Result<(), Report<GraphError>> {
        self.node_mut(node_id)?.data.merge_config(patch);
        Ok(())
    }

    /// Replaces a node's whole payload and returns the previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn replace_node_data(
        &mut self,
        node_id: &NodeId,
        data: NodeData,
    ) -> Result<NodeData, Report<GraphError>> {
        let node = self.node_mut(node_id)?;
        Ok(std::mem::replace(&mut node.data, data))
    }

    /// Renames a node and returns the previous label.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn set_node_label(
        &mut self,
        node_id: &NodeId,
        label: impl Into<String>,
    ) -> Result<String, Report<GraphError>> {
        let node = self.node_mut(node_id)?;
        Ok(std::mem::replace(&mut node.data.label, label.into()))
    }

    /// Returns a node by id.
    #[must_use]
    pub fn node(&self, node_id: &NodeId) -> Option<&WorkflowNode> {
        let index = self.node_index_map.get(node_id)?;
        self.graph.node_weight(*index)
    }

    /// Returns an edge by id.
    #[must_use]
    pub fn edge(&self, edge_id: &EdgeId) -> Option<&WorkflowEdge> {
        let index = self.edge_index_map.get(edge_id)?;
        self.graph.edge_weight(*index)
    }

    #[must_use]
    pub fn contains_node(&self, node_id: &NodeId) -> bool {
        self.node_index_map.contains_key(node_id)
    }

    /// Iterates over nodes in index order.
    pub fn nodes(&self) -> impl Iterator<Item = &WorkflowNode> {
        self.graph.node_weights()
    }

    /// Iterates over edges in index order.
    pub fn edges(&self) -> impl Iterator<Item = &WorkflowEdge> {
        self.graph.edge_weights()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns an immutable copy for validation or saving.
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes().cloned().collect(),
            edges: self.edges().cloned().collect(),
        }
    }

    /// Returns the incoming and outgoing edges of a node.
    #[must_use]
    pub fn neighbors(&self, node_id: &NodeId) -> Neighbors {
        let Some(&index) = self.node_index_map.get(node_id) else {
            return Neighbors::default();
        };
        let collect = |direction: Direction| -> Vec<WorkflowEdge> {
            let mut edges: Vec<_> = self
                .graph
                .edges_directed(index, direction)
                .map(|edge| (edge.id(), edge.weight().clone()))
                .collect();
            edges.sort_by_key(|(edge_index, _)| *edge_index);
            edges.into_iter().map(|(_, edge)| edge).collect()
        };
        Neighbors {
            incoming: collect(Direction::Incoming),
            outgoing: collect(Direction::Outgoing),
        }
    }

    /// Returns the downstream nodes of a node.
    #[must_use]
    pub fn successors(&self, node_id: &NodeId) -> Vec<&WorkflowNode> {
        self.neighbors(node_id)
            .outgoing
            .iter()
            .filter_map(|edge| self.node(&edge.target))
            .collect()
    }

    /// Returns the upstream nodes of a node.
    #[must_use]
    pub fn predecessors(&self, node_id: &NodeId) -> Vec<&WorkflowNode> {
        self.neighbors(node_id)
            .incoming
            .iter()
            .filter_map(|edge| self.node(&edge.source))
            .collect()
    }

    /// Returns nodes that have no incoming edges.
    pub fn entry_nodes(&self) -> Vec<&WorkflowNode> {
        self.graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .edges_directed(idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .filter_map(|idx| self.graph.node_weight(idx))
            .collect()
    }

    fn index_of(&self, node_id: &NodeId) -> Result<NodeIndex, Report<GraphError>> {
        self.node_index_map.get(node_id).copied().ok_or_else(|| {
            GraphError::NodeNotFound {
                node_id: node_id.clone(),
            }
            .into()
        })
    }

    fn node_mut(&mut self, node_id: &NodeId) -> Result<&mut WorkflowNode, Report<GraphError>> {
        let index = self.index_of(node_id)?;
        self.graph.node_weight_mut(index).ok_or_else(|| {
            GraphError::NodeNotFound {
                node_id: node_id.clone(),
            }
            .into()
        })
    }
}
