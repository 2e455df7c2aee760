//! Undo/redo as a bounded log of reversible graph commands.
//!
//! One entry is recorded per user gesture. A drag is one `MoveNode` from the
//! press position to the release position; a paste or a multi-node delete is
//! one `Batch`.

use flowdesk_workflow::{
    EdgeId, GraphError, NodeData, NodeId, Position, WorkflowEdge, WorkflowGraph, WorkflowNode,
};
use rootcause::Report;
use std::collections::VecDeque;

/// A graph mutation that knows how to undo itself.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphCommand {
    AddNode {
        node: WorkflowNode,
    },
    /// Removal of a node together with the edges that cascaded with it.
    RemoveNode {
        node: WorkflowNode,
        edges: Vec<WorkflowEdge>,
    },
    MoveNode {
        node_id: NodeId,
        from: Position,
        to: Position,
    },
    Connect {
        edge: WorkflowEdge,
    },
    Disconnect {
        edge: WorkflowEdge,
    },
    ReplaceNodeData {
        node_id: NodeId,
        before: NodeData,
        after: NodeData,
    },
    Batch(Vec<GraphCommand>),
}

impl GraphCommand {
    /// Performs the command on `graph`.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph no longer matches the command.
    pub fn apply(&self, graph: &mut WorkflowGraph) -> Result<(), Report<GraphError>> {
        match self {
            Self::AddNode { node } => graph.insert_node(node.clone()),
            Self::RemoveNode { node, .. } => remove_node(graph, &node.id),
            Self::MoveNode { node_id, to, .. } => graph.move_node(node_id, *to).map(|_| ()),
            Self::Connect { edge } => graph.insert_edge(edge.clone()),
            Self::Disconnect { edge } => disconnect(graph, &edge.id),
            Self::ReplaceNodeData { node_id, after, .. } => {
                graph.replace_node_data(node_id, after.clone()).map(|_| ())
            }
            Self::Batch(commands) => commands.iter().try_for_each(|c| c.apply(graph)),
        }
    }

    /// Undoes the command on `graph`.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph no longer matches the command.
    pub fn revert(&self, graph: &mut WorkflowGraph) -> Result<(), Report<GraphError>> {
        match self {
            Self::AddNode { node } => remove_node(graph, &node.id),
            Self::RemoveNode { node, edges } => {
                graph.insert_node(node.clone())?;
                edges
                    .iter()
                    .try_for_each(|edge| graph.insert_edge(edge.clone()))
            }
            Self::MoveNode { node_id, from, .. } => graph.move_node(node_id, *from).map(|_| ()),
            Self::Connect { edge } => disconnect(graph, &edge.id),
            Self::Disconnect { edge } => graph.insert_edge(edge.clone()),
            Self::ReplaceNodeData {
                node_id, before, ..
            } => graph.replace_node_data(node_id, before.clone()).map(|_| ()),
            Self::Batch(commands) => commands.iter().rev().try_for_each(|c| c.revert(graph)),
        }
    }
}

fn remove_node(graph: &mut WorkflowGraph, node_id: &NodeId) -> Result<(), Report<GraphError>> {
    graph
        .remove_node(node_id)
        .map(|_| ())
        .ok_or_else(|| {
            GraphError::NodeNotFound {
                node_id: node_id.clone(),
            }
            .into()
        })
}

fn disconnect(graph: &mut WorkflowGraph, edge_id: &EdgeId) -> Result<(), Report<GraphError>> {
    graph.disconnect(edge_id).map(|_| ()).ok_or_else(|| {
        GraphError::EdgeNotFound {
            edge_id: edge_id.clone(),
        }
        .into()
    })
}

/// Undo and redo stacks.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<GraphCommand>,
    redo: Vec<GraphCommand>,
    depth: usize,
}

impl History {
    /// Creates a history keeping at most `depth` undoable commands.
    #[must_use]
    pub fn new(depth: usize) -> Self {
        Self {
            undo: VecDeque::with_capacity(depth.min(64)),
            redo: Vec::new(),
            depth,
        }
    }

    /// Records an already applied command and clears the redo stack.
    pub fn record(&mut self, command: GraphCommand) {
        self.redo.clear();
        if self.depth == 0 {
            return;
        }
        if self.undo.len() == self.depth {
            self.undo.pop_front();
        }
        self.undo.push_back(command);
    }

    /// Reverts the most recent command. Returns false when there is nothing
    /// to undo.
    ///
    /// # Errors
    ///
    /// Returns an error if the command no longer applies. Both stacks are
    /// cleared in that case.
    pub fn undo(&mut self, graph: &mut WorkflowGraph) -> Result<bool, Report<GraphError>> {
        let Some(command) = self.undo.pop_back() else {
            return Ok(false);
        };
        if let Err(error) = command.revert(graph) {
            self.clear();
            return Err(error);
        }
        self.redo.push(command);
        Ok(true)
    }

    /// Re-applies the most recently undone command. Returns false when there
    /// is nothing to redo.
    ///
    /// # Errors
    ///
    /// Returns an error if the command no longer applies. Both stacks are
    /// cleared in that case.
    pub fn redo(&mut self, graph: &mut WorkflowGraph) -> Result<bool, Report<GraphError>> {
        let Some(command) = self.redo.pop() else {
            return Ok(false);
        };
        if let Err(error) = command.apply(graph) {
            self.clear();
            return Err(error);
        }
        self.undo.push_back(command);
        Ok(true)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdesk_workflow::{NodeCatalog, NodeCategory, NodeType};

    fn email(graph: &mut WorkflowGraph, catalog: &NodeCatalog, x: f64) -> WorkflowNode {
        graph
            .add_node(
                catalog,
                &NodeType::new(NodeCategory::Action, "send_email"),
                Position::new(x, 0.0),
            )
            .expect("add")
    }

    fn sorted(graph: &WorkflowGraph) -> (Vec<WorkflowNode>, Vec<WorkflowEdge>) {
        let mut snapshot = graph.snapshot();
        snapshot.nodes.sort_by(|a, b| a.id.cmp(&b.id));
        snapshot.edges.sort_by(|a, b| a.id.cmp(&b.id));
        (snapshot.nodes, snapshot.edges)
    }

    #[test]
    fn undo_remove_restores_node_and_edges() {
        let catalog = NodeCatalog::builtin();
        let mut graph = WorkflowGraph::new();
        let a = email(&mut graph, &catalog, 0.0);
        let b = email(&mut graph, &catalog, 200.0);
        graph.connect(&a.id, &b.id, None, None).expect("connect");
        let before = sorted(&graph);

        let (node, edges) = graph.remove_node(&a.id).expect("present");
        let mut history = History::new(10);
        history.record(GraphCommand::RemoveNode { node, edges });

        assert!(history.undo(&mut graph).expect("undo"));
        assert_eq!(sorted(&graph), before);

        assert!(history.redo(&mut graph).expect("redo"));
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn batch_reverts_in_reverse_order() {
        let catalog = NodeCatalog::builtin();
        let mut graph = WorkflowGraph::new();
        let a = email(&mut graph, &catalog, 0.0);
        let b = email(&mut graph, &catalog, 200.0);
        graph.connect(&a.id, &b.id, None, None).expect("connect");
        let before = sorted(&graph);

        let mut removals = Vec::new();
        for id in [&a.id, &b.id] {
            let (node, edges) = graph.remove_node(id).expect("present");
            removals.push(GraphCommand::RemoveNode { node, edges });
        }
        let mut history = History::new(10);
        history.record(GraphCommand::Batch(removals));
        assert_eq!(graph.node_count(), 0);

        history.undo(&mut graph).expect("undo");
        assert_eq!(sorted(&graph), before);
    }

    #[test]
    fn new_command_clears_redo_and_depth_is_bounded() {
        let catalog = NodeCatalog::builtin();
        let mut graph = WorkflowGraph::new();
        let mut history = History::new(2);
        let node = email(&mut graph, &catalog, 0.0);

        for x in [1.0, 2.0, 3.0] {
            let from = graph.move_node(&node.id, Position::new(x, 0.0)).expect("move");
            history.record(GraphCommand::MoveNode {
                node_id: node.id.clone(),
                from,
                to: Position::new(x, 0.0),
            });
        }
        assert!(history.undo(&mut graph).expect("undo"));
        assert!(history.undo(&mut graph).expect("undo"));
        assert!(!history.undo(&mut graph).expect("exhausted"));
        assert_eq!(
            graph.node(&node.id).map(|n| n.position),
            Some(Position::new(1.0, 0.0))
        );

        assert!(history.can_redo());
        history.record(GraphCommand::MoveNode {
            node_id: node.id.clone(),
            from: Position::new(1.0, 0.0),
            to: Position::new(1.0, 0.0),
        });
        assert!(!history.can_redo());
    }

    #[test]
    fn failed_undo_clears_history() {
        let catalog = NodeCatalog::builtin();
        let mut graph = WorkflowGraph::new();
        let node = email(&mut graph, &catalog, 0.0);
        let mut history = History::new(10);
        history.record(GraphCommand::AddNode { node: node.clone() });
        history.record(GraphCommand::AddNode { node: node.clone() });

        graph.remove_node(&node.id);
        assert!(history.undo(&mut graph).is_err());
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }
}
