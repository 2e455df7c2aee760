//! Canvas controller.
//!
//! Translates pointer gestures into graph mutations and the graph back into
//! a renderable layout. Interaction is a small state machine:
//!
//! - **Idle**: nothing in progress
//! - **DraggingFromPalette**: a catalog entry is being dragged in; a drop adds
//!   a node at the translated pointer position
//! - **DraggingNode**: an existing node follows the pointer; release records
//!   one undoable move
//! - **Connecting**: a wire is being dragged from an output port; release on
//!   a compatible input connects, release anywhere else cancels
//!
//! Selection is orthogonal to the mode. Every structural mutation bumps the
//! revision and hands the new state to the auto-saver.

use crate::autosave::{AutoSaver, SaveStatus};
use crate::config::EditorConfig;
use crate::error::EditorError;
use crate::history::{GraphCommand, History};
use flowdesk_workflow::{
    CanvasState, EdgeId, GraphError, GraphSnapshot, NodeCatalog, NodeCategory, NodeData, NodeId,
    NodeType, PortDefinition, Ports, Position, ValidationResult, Viewport, WorkflowEdge,
    WorkflowGraph, WorkflowNode,
};
use rootcause::Report;
use std::collections::HashMap;
use std::sync::Arc;

/// Width of a node box in canvas units.
pub const NODE_WIDTH: f64 = 160.0;
/// Height of a node box in canvas units.
pub const NODE_HEIGHT: f64 = 60.0;

/// A pointer position in client (window) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClientPoint {
    pub x: f64,
    pub y: f64,
}

impl ClientPoint {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The gesture currently in progress.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionMode {
    #[default]
    Idle,
    DraggingFromPalette {
        node_type: NodeType,
    },
    DraggingNode {
        node_id: NodeId,
        /// Node position when the drag started.
        origin: Position,
        /// Pointer position, in canvas units, when the drag started.
        grab: Position,
    },
    Connecting {
        source: NodeId,
        source_handle: Option<String>,
        /// Current pointer position in canvas units.
        pointer: Position,
    },
}

/// One palette entry, carrying the drag-and-drop token.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteEntry {
    pub token: String,
    pub label: String,
    pub description: String,
    pub icon: String,
    pub color: String,
}

/// Palette entries of one category.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteSection {
    pub category: NodeCategory,
    pub title: String,
    pub entries: Vec<PaletteEntry>,
}

/// A port handle position in canvas units.
#[derive(Debug, Clone, PartialEq)]
pub struct HandleAnchor {
    pub name: String,
    pub label: String,
    pub x: f64,
    pub y: f64,
}

/// A node as drawn on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeBox {
    pub node_id: NodeId,
    pub node_type: NodeType,
    pub category: NodeCategory,
    pub label: String,
    pub icon: String,
    pub color: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub selected: bool,
    pub is_configured: bool,
    pub has_errors: bool,
    /// False when the node's type is missing from the catalog.
    pub known_type: bool,
    pub inputs: Vec<HandleAnchor>,
    pub outputs: Vec<HandleAnchor>,
}

/// An edge as drawn on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgePath {
    pub edge_id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    /// Branch label for edges leaving a branching node.
    pub label: Option<String>,
    /// SVG path data.
    pub path: String,
}

/// Everything needed to draw the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasLayout {
    pub viewport: Viewport,
    pub nodes: Vec<NodeBox>,
    pub edges: Vec<EdgePath>,
    /// Wire following the pointer while connecting.
    pub connection_preview: Option<String>,
}

/// Cubic Bezier from an output handle to an input handle.
#[must_use]
pub fn bezier_path(x1: f64, y1: f64, x2: f64, y2: f64) -> String {
    let offset = ((x2 - x1).abs() / 2.0).max(50.0);
    format!(
        "M {} {} C {} {} {} {} {} {}",
        x1,
        y1,
        x1 + offset,
        y1,
        x2 - offset,
        y2,
        x2,
        y2
    )
}

fn anchors(ports: &[PortDefinition], x: f64, y: f64) -> Vec<HandleAnchor> {
    let slots = ports.len() as f64 + 1.0;
    ports
        .iter()
        .enumerate()
        .map(|(i, port)| HandleAnchor {
            name: port.name.clone(),
            label: port.label.clone(),
            x,
            y: y + NODE_HEIGHT * (i as f64 + 1.0) / slots,
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
struct Clipboard {
    nodes: Vec<WorkflowNode>,
    edges: Vec<WorkflowEdge>,
    pastes: u32,
}

/// Interactive controller over one workflow graph.
#[derive(Debug)]
pub struct CanvasController {
    catalog: Arc<NodeCatalog>,
    graph: WorkflowGraph,
    viewport: Viewport,
    canvas_origin: ClientPoint,
    mode: InteractionMode,
    selection: Vec<NodeId>,
    history: History,
    clipboard: Option<Clipboard>,
    paste_offset: f64,
    revision: u64,
    saver: Option<AutoSaver>,
}

impl CanvasController {
    /// Creates a controller over an empty canvas.
    #[must_use]
    pub fn new(catalog: Arc<NodeCatalog>, config: &EditorConfig) -> Self {
        Self::load(catalog, &CanvasState::default(), config)
    }

    /// Creates a controller over a stored canvas.
    #[must_use]
    pub fn load(catalog: Arc<NodeCatalog>, canvas: &CanvasState, config: &EditorConfig) -> Self {
        Self {
            catalog,
            graph: WorkflowGraph::from_canvas(canvas),
            viewport: canvas.viewport,
            canvas_origin: ClientPoint::default(),
            mode: InteractionMode::Idle,
            selection: Vec::new(),
            history: History::new(config.history_depth),
            clipboard: None,
            paste_offset: config.paste_offset,
            revision: 0,
            saver: None,
        }
    }

    /// Attaches the auto-saver that receives every mutation.
    #[must_use]
    pub fn with_autosave(mut self, saver: AutoSaver) -> Self {
        self.saver = Some(saver);
        self
    }

    /// Detaches the auto-saver, e.g. to shut it down.
    pub fn take_autosave(&mut self) -> Option<AutoSaver> {
        self.saver.take()
    }

    /// Sets the client position of the canvas element's top-left corner.
    pub fn set_canvas_origin(&mut self, origin: ClientPoint) {
        self.canvas_origin = origin;
    }

    /// Converts a client position into canvas coordinates.
    #[must_use]
    pub fn to_canvas_point(&self, at: ClientPoint) -> Position {
        self.viewport
            .to_canvas(at.x - self.canvas_origin.x, at.y - self.canvas_origin.y)
    }

    #[must_use]
    pub fn catalog(&self) -> &NodeCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[must_use]
    pub fn mode(&self) -> &InteractionMode {
        &self.mode
    }

    #[must_use]
    pub fn selection(&self) -> &[NodeId] {
        &self.selection
    }

    /// Returns the selected node when exactly one is selected.
    #[must_use]
    pub fn selected_node(&self) -> Option<&WorkflowNode> {
        match self.selection.as_slice() {
            [only] => self.graph.node(only),
            _ => None,
        }
    }

    /// Revision of the in-memory state. Bumped by every recorded mutation,
    /// and once per completed drag.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn save_status(&self) -> Option<SaveStatus> {
        self.saver.as_ref().map(AutoSaver::status)
    }

    /// Whether there are changes the store does not have yet.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        match &self.saver {
            Some(saver) => saver.status().is_dirty(self.revision),
            None => self.revision > 0,
        }
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        self.graph.snapshot()
    }

    #[must_use]
    pub fn canvas_state(&self) -> CanvasState {
        self.graph.to_canvas(self.viewport)
    }

    /// Catalog entries grouped for the palette.
    #[must_use]
    pub fn palette(&self) -> Vec<PaletteSection> {
        self.catalog
            .categories()
            .into_iter()
            .map(|category| PaletteSection {
                category,
                title: category.display_name().to_string(),
                entries: self
                    .catalog
                    .list_by_category(category)
                    .into_iter()
                    .map(|definition| PaletteEntry {
                        token: definition.node_type.to_string(),
                        label: definition.label.clone(),
                        description: definition.description.clone(),
                        icon: definition.icon.clone(),
                        color: definition.color.clone(),
                    })
                    .collect(),
            })
            .collect()
    }

    fn touch(&mut self) {
        self.revision += 1;
        if let Some(saver) = &self.saver {
            saver.schedule(self.revision, self.graph.to_canvas(self.viewport));
        }
    }

    fn record(&mut self, command: GraphCommand) {
        self.history.record(command);
        self.touch();
    }

    // Palette gestures

    /// Starts dragging a palette entry. Unknown tokens are ignored.
    pub fn begin_palette_drag(&mut self, token: &str) -> bool {
        match self.catalog.resolve_token(token) {
            Some(definition) => {
                self.mode = InteractionMode::DraggingFromPalette {
                    node_type: definition.node_type.clone(),
                };
                true
            }
            None => {
                tracing::debug!(token, "ignoring drag of unknown node type");
                false
            }
        }
    }

    /// Drops a palette token at a client position and adds the node.
    ///
    /// Returns `None` and changes nothing if the token does not resolve.
    pub fn drop_node(&mut self, token: &str, at: ClientPoint) -> Option<NodeId> {
        self.mode = InteractionMode::Idle;
        let Some(definition) = self.catalog.resolve_token(token) else {
            tracing::debug!(token, "ignoring drop of unknown node type");
            return None;
        };
        let node_type = definition.node_type.clone();
        let position = self.to_canvas_point(at);
        self.add_node(&node_type, position).map(|node| node.id)
    }

    /// Adds a node at a canvas position.
    pub fn add_node(&mut self, node_type: &NodeType, position: Position) -> Option<WorkflowNode> {
        match self.graph.add_node(&self.catalog, node_type, position) {
            Ok(node) => {
                tracing::debug!(node_id = %node.id, %node_type, "node added");
                self.record(GraphCommand::AddNode { node: node.clone() });
                Some(node)
            }
            Err(error) => {
                tracing::debug!(%error, "node not added");
                None
            }
        }
    }

    // Pointer gestures

    /// Presses on a node: selects it and starts a drag.
    ///
    /// While connecting, pressing a node completes the wire onto its default
    /// input instead.
    pub fn press_node(&mut self, node_id: &NodeId, at: ClientPoint, extend_selection: bool) -> bool {
        if matches!(self.mode, InteractionMode::Connecting { .. }) {
            return self.release_on_port(node_id, None).is_some();
        }
        let Some(origin) = self.graph.node(node_id).map(|node| node.position) else {
            return false;
        };
        if extend_selection {
            if !self.selection.contains(node_id) {
                self.selection.push(node_id.clone());
            }
        } else if !self.selection.contains(node_id) {
            self.selection = vec![node_id.clone()];
        }
        self.mode = InteractionMode::DraggingNode {
            node_id: node_id.clone(),
            origin,
            grab: self.to_canvas_point(at),
        };
        true
    }

    /// Follows the pointer during a drag or a connection.
    ///
    /// Drag steps move the node in place only. The revision and the save
    /// schedule change once, when the drag is released.
    pub fn pointer_move(&mut self, at: ClientPoint) {
        let point = self.to_canvas_point(at);
        match &mut self.mode {
            InteractionMode::DraggingNode {
                node_id,
                origin,
                grab,
            } => {
                let node_id = node_id.clone();
                let position = origin.offset(point.x - grab.x, point.y - grab.y);
                if let Err(error) = self.graph.move_node(&node_id, position) {
                    tracing::debug!(%error, "dragged node disappeared");
                    self.mode = InteractionMode::Idle;
                }
            }
            InteractionMode::Connecting { pointer, .. } => *pointer = point,
            InteractionMode::Idle | InteractionMode::DraggingFromPalette { .. } => {}
        }
    }

    /// Releases the pointer over empty canvas.
    ///
    /// Ends a drag (recording one move) and cancels a pending connection.
    pub fn release_pointer(&mut self) {
        match std::mem::take(&mut self.mode) {
            InteractionMode::DraggingNode {
                node_id, origin, ..
            } => {
                if let Some(to) = self.graph.node(&node_id).map(|node| node.position)
                    && to != origin
                {
                    self.record(GraphCommand::MoveNode {
                        node_id,
                        from: origin,
                        to,
                    });
                }
            }
            InteractionMode::Connecting { source, .. } => {
                tracing::debug!(%source, "connection cancelled");
            }
            InteractionMode::Idle | InteractionMode::DraggingFromPalette { .. } => {}
        }
    }

    /// Starts dragging a wire from an output port.
    pub fn begin_connect(
        &mut self,
        source: &NodeId,
        source_handle: Option<&str>,
        at: ClientPoint,
    ) -> bool {
        let has_port = self
            .graph
            .node(source)
            .and_then(|node| self.catalog.get(&node.node_type))
            .is_some_and(|definition| definition.ports.output(source_handle).is_some());
        if !has_port {
            tracing::debug!(%source, ?source_handle, "no such output port");
            return false;
        }
        self.mode = InteractionMode::Connecting {
            source: source.clone(),
            source_handle: source_handle.map(str::to_string),
            pointer: self.to_canvas_point(at),
        };
        true
    }

    /// Releases a wire over an input port.
    ///
    /// Connects when the ports are compatible; otherwise cancels.
    pub fn release_on_port(
        &mut self,
        target: &NodeId,
        target_handle: Option<&str>,
    ) -> Option<WorkflowEdge> {
        let InteractionMode::Connecting {
            source,
            source_handle,
            ..
        } = std::mem::take(&mut self.mode)
        else {
            return None;
        };
        self.connect(&source, source_handle.as_deref(), target, target_handle)
    }

    /// Connects two ports if they are compatible.
    pub fn connect(
        &mut self,
        source: &NodeId,
        source_handle: Option<&str>,
        target: &NodeId,
        target_handle: Option<&str>,
    ) -> Option<WorkflowEdge> {
        if !self.can_connect(source, source_handle, target, target_handle) {
            tracing::debug!(%source, %target, "incompatible connection ignored");
            return None;
        }
        match self.graph.connect(
            source,
            target,
            source_handle.map(str::to_string),
            target_handle.map(str::to_string),
        ) {
            Ok(edge) => {
                self.record(GraphCommand::Connect { edge: edge.clone() });
                Some(edge)
            }
            Err(error) => {
                tracing::debug!(%error, "connection failed");
                None
            }
        }
    }

    /// Whether a wire from `source` to `target` may be created.
    ///
    /// The source handle must be an output of the source's definition, the
    /// target handle an input of the target's, the nodes must differ, and
    /// the same ports may not already be connected.
    #[must_use]
    pub fn can_connect(
        &self,
        source: &NodeId,
        source_handle: Option<&str>,
        target: &NodeId,
        target_handle: Option<&str>,
    ) -> bool {
        if source == target {
            return false;
        }
        let (Some(from), Some(to)) = (self.graph.node(source), self.graph.node(target)) else {
            return false;
        };
        let (Some(from_def), Some(to_def)) = (
            self.catalog.get(&from.node_type),
            self.catalog.get(&to.node_type),
        ) else {
            return false;
        };
        if from_def.ports.output(source_handle).is_none()
            || to_def.ports.input(target_handle).is_none()
        {
            return false;
        }
        let candidate = WorkflowEdge::new(source.clone(), target.clone()).with_handles(
            source_handle.map(str::to_string),
            target_handle.map(str::to_string),
        );
        !self
            .graph
            .neighbors(source)
            .outgoing
            .iter()
            .any(|edge| edge.is_parallel_to(&candidate))
    }

    /// Clicks empty canvas: clears the selection and cancels a connection.
    pub fn click_canvas(&mut self) {
        if matches!(self.mode, InteractionMode::Connecting { .. }) {
            self.mode = InteractionMode::Idle;
        }
        self.selection.clear();
    }

    // Selection

    /// Selects exactly one node.
    pub fn select(&mut self, node_id: &NodeId) -> bool {
        if !self.graph.contains_node(node_id) {
            return false;
        }
        self.selection = vec![node_id.clone()];
        true
    }

    pub fn select_all(&mut self) {
        self.selection = self.graph.nodes().map(|node| node.id.clone()).collect();
    }

    pub fn deselect(&mut self) {
        self.selection.clear();
    }

    fn prune_selection(&mut self) {
        let graph = &self.graph;
        self.selection.retain(|id| graph.contains_node(id));
    }

    // Removal

    /// Removes one node and its edges.
    pub fn remove_node(&mut self, node_id: &NodeId) -> bool {
        let Some((node, edges)) = self.graph.remove_node(node_id) else {
            return false;
        };
        tracing::debug!(%node_id, edges = edges.len(), "node removed");
        self.selection.retain(|id| id != node_id);
        self.record(GraphCommand::RemoveNode { node, edges });
        true
    }

    /// Removes every selected node as one undoable step.
    pub fn delete_selection(&mut self) -> usize {
        let selection = std::mem::take(&mut self.selection);
        let mut commands: Vec<GraphCommand> = selection
            .iter()
            .filter_map(|id| self.graph.remove_node(id))
            .map(|(node, edges)| GraphCommand::RemoveNode { node, edges })
            .collect();
        let removed = commands.len();
        match removed {
            0 => {}
            1 => self.record(commands.remove(0)),
            _ => self.record(GraphCommand::Batch(commands)),
        }
        removed
    }

    /// Removes one edge.
    pub fn disconnect(&mut self, edge_id: &EdgeId) -> Option<WorkflowEdge> {
        let edge = self.graph.disconnect(edge_id)?;
        self.record(GraphCommand::Disconnect { edge: edge.clone() });
        Some(edge)
    }

    // Node payload

    /// Replaces a node's payload as one undoable step.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn commit_node_data(
        &mut self,
        node_id: &NodeId,
        data: NodeData,
    ) -> Result<(), Report<GraphError>> {
        let before = self.graph.replace_node_data(node_id, data.clone())?;
        self.record(GraphCommand::ReplaceNodeData {
            node_id: node_id.clone(),
            before,
            after: data,
        });
        Ok(())
    }

    /// Renames a node as one undoable step.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn rename_node(
        &mut self,
        node_id: &NodeId,
        label: impl Into<String>,
    ) -> Result<(), Report<GraphError>> {
        let before = self
            .graph
            .node(node_id)
            .map(|node| node.data.clone())
            .ok_or_else(|| GraphError::NodeNotFound {
                node_id: node_id.clone(),
            })?;
        self.graph.set_node_label(node_id, label)?;
        let after = self
            .graph
            .node(node_id)
            .map(|node| node.data.clone())
            .unwrap_or_else(|| before.clone());
        self.record(GraphCommand::ReplaceNodeData {
            node_id: node_id.clone(),
            before,
            after,
        });
        Ok(())
    }

    /// Copies validation errors onto each node's error markers.
    ///
    /// Markers are derived data: they are neither undoable nor a mutation.
    pub fn mark_errors(&mut self, validation: &ValidationResult) {
        let mut messages: HashMap<NodeId, Vec<String>> = HashMap::new();
        for issue in &validation.errors {
            if let Some(node_id) = &issue.node_id {
                messages
                    .entry(node_id.clone())
                    .or_default()
                    .push(issue.message.clone());
            }
        }
        let updates: Vec<(NodeId, NodeData)> = self
            .graph
            .nodes()
            .filter_map(|node| {
                let errors = messages.remove(&node.id).unwrap_or_default();
                (errors != node.data.errors).then(|| {
                    let mut data = node.data.clone();
                    data.errors = errors;
                    (node.id.clone(), data)
                })
            })
            .collect();
        for (node_id, data) in updates {
            if let Err(error) = self.graph.replace_node_data(&node_id, data) {
                tracing::debug!(%error, "could not mark node errors");
            }
        }
    }

    // History

    /// Undoes the last gesture.
    pub fn undo(&mut self) -> bool {
        let outcome = self.history.undo(&mut self.graph);
        self.after_history(outcome, "undo")
    }

    /// Redoes the last undone gesture.
    pub fn redo(&mut self) -> bool {
        let outcome = self.history.redo(&mut self.graph);
        self.after_history(outcome, "redo")
    }

    fn after_history(&mut self, outcome: Result<bool, Report<GraphError>>, action: &str) -> bool {
        match outcome {
            Ok(true) => {
                self.mode = InteractionMode::Idle;
                self.prune_selection();
                self.touch();
                true
            }
            Ok(false) => false,
            Err(error) => {
                tracing::warn!(%error, action, "history out of sync with graph, cleared");
                self.prune_selection();
                false
            }
        }
    }

    // Clipboard

    /// Copies the selected nodes and the edges among them.
    pub fn copy(&mut self) -> usize {
        let (nodes, edges) = self.selected_subgraph();
        let copied = nodes.len();
        if copied > 0 {
            self.clipboard = Some(Clipboard {
                nodes,
                edges,
                pastes: 0,
            });
        }
        copied
    }

    /// Pastes the clipboard with fresh ids, offset further on each paste.
    pub fn paste(&mut self) -> Vec<NodeId> {
        let Some(clipboard) = self.clipboard.as_mut() else {
            return Vec::new();
        };
        clipboard.pastes += 1;
        let offset = self.paste_offset * f64::from(clipboard.pastes);
        let (nodes, edges) = (clipboard.nodes.clone(), clipboard.edges.clone());
        self.insert_copies(&nodes, &edges, offset)
    }

    /// Duplicates the selection without touching the clipboard.
    pub fn duplicate(&mut self) -> Vec<NodeId> {
        let (nodes, edges) = self.selected_subgraph();
        self.insert_copies(&nodes, &edges, self.paste_offset)
    }

    fn selected_subgraph(&self) -> (Vec<WorkflowNode>, Vec<WorkflowEdge>) {
        let nodes: Vec<WorkflowNode> = self
            .selection
            .iter()
            .filter_map(|id| self.graph.node(id).cloned())
            .collect();
        let edges = self
            .graph
            .edges()
            .filter(|edge| {
                self.selection.contains(&edge.source) && self.selection.contains(&edge.target)
            })
            .cloned()
            .collect();
        (nodes, edges)
    }

    fn insert_copies(
        &mut self,
        nodes: &[WorkflowNode],
        edges: &[WorkflowEdge],
        offset: f64,
    ) -> Vec<NodeId> {
        let mut ids: HashMap<&NodeId, NodeId> = HashMap::with_capacity(nodes.len());
        let mut commands = Vec::with_capacity(nodes.len() + edges.len());

        for original in nodes {
            let copy = WorkflowNode::new(
                original.node_type.clone(),
                original.position.offset(offset, offset),
                original.data.clone(),
            );
            if self.graph.insert_node(copy.clone()).is_ok() {
                ids.insert(&original.id, copy.id.clone());
                commands.push(GraphCommand::AddNode { node: copy });
            }
        }
        for original in edges {
            let (Some(source), Some(target)) = (ids.get(&original.source), ids.get(&original.target))
            else {
                continue;
            };
            let copy = WorkflowEdge::new(source.clone(), target.clone())
                .with_handles(original.source_handle.clone(), original.target_handle.clone());
            if self.graph.insert_edge(copy.clone()).is_ok() {
                commands.push(GraphCommand::Connect { edge: copy });
            }
        }

        let created: Vec<NodeId> = nodes
            .iter()
            .filter_map(|original| ids.get(&original.id).cloned())
            .collect();
        if !commands.is_empty() {
            self.record(GraphCommand::Batch(commands));
            self.selection = created.clone();
        }
        created
    }

    // Viewport

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.viewport.pan_by(dx, dy);
    }

    /// Zooms around a client position.
    pub fn zoom_at(&mut self, factor: f64, at: ClientPoint) {
        self.viewport.zoom_at(
            factor,
            at.x - self.canvas_origin.x,
            at.y - self.canvas_origin.y,
        );
    }

    // Saving

    /// Saves the current state immediately, cancelling any pending
    /// debounced save.
    ///
    /// # Errors
    ///
    /// Returns an error if no auto-saver is attached or the save fails. The
    /// in-memory state is kept either way.
    pub async fn save_now(&self) -> Result<(), Report<EditorError>> {
        let saver = self
            .saver
            .as_ref()
            .ok_or(EditorError::AutoSaveUnavailable)?;
        saver.flush(self.revision, self.canvas_state()).await
    }

    // Rendering

    /// Computes node boxes, edge paths, and the connection preview.
    #[must_use]
    pub fn layout(&self) -> CanvasLayout {
        let fallback_ports = Ports::pass_through();
        let nodes: Vec<NodeBox> = self
            .graph
            .nodes()
            .map(|node| {
                let definition = self.catalog.get(&node.node_type);
                let category = node.category();
                let ports = definition.map_or(&fallback_ports, |d| &d.ports);
                let Position { x, y } = node.position;
                NodeBox {
                    node_id: node.id.clone(),
                    node_type: node.node_type.clone(),
                    category,
                    label: node.data.label.clone(),
                    icon: definition.map_or_else(
                        || category.default_icon().to_string(),
                        |d| d.icon.clone(),
                    ),
                    color: category.color_token().to_string(),
                    x,
                    y,
                    width: NODE_WIDTH,
                    height: NODE_HEIGHT,
                    selected: self.selection.contains(&node.id),
                    is_configured: node.data.is_configured,
                    has_errors: !node.data.errors.is_empty(),
                    known_type: definition.is_some(),
                    inputs: anchors(&ports.inputs, x, y),
                    outputs: anchors(&ports.outputs, x + NODE_WIDTH, y),
                }
            })
            .collect();

        let boxes: HashMap<&NodeId, &NodeBox> = nodes.iter().map(|b| (&b.node_id, b)).collect();
        let edges = self
            .graph
            .edges()
            .filter_map(|edge| {
                let from = boxes.get(&edge.source)?;
                let to = boxes.get(&edge.target)?;
                let output = from.outputs.iter().find(|h| h.name == edge.source_port());
                let (x1, y1) = output.map_or((from.x + NODE_WIDTH, from.y + NODE_HEIGHT / 2.0), |h| {
                    (h.x, h.y)
                });
                let (x2, y2) = to
                    .inputs
                    .iter()
                    .find(|h| h.name == edge.target_port())
                    .map_or((to.x, to.y + NODE_HEIGHT / 2.0), |h| (h.x, h.y));
                Some(EdgePath {
                    edge_id: edge.id.clone(),
                    source: edge.source.clone(),
                    target: edge.target.clone(),
                    label: output
                        .filter(|_| from.outputs.len() > 1)
                        .map(|h| h.label.clone()),
                    path: bezier_path(x1, y1, x2, y2),
                })
            })
            .collect();

        let connection_preview = match &self.mode {
            InteractionMode::Connecting {
                source,
                source_handle,
                pointer,
            } => boxes.get(source).map(|from| {
                let (x1, y1) = from
                    .outputs
                    .iter()
                    .find(|h| Some(h.name.as_str()) == source_handle.as_deref())
                    .or_else(|| from.outputs.first())
                    .map_or((from.x + NODE_WIDTH, from.y + NODE_HEIGHT / 2.0), |h| {
                        (h.x, h.y)
                    });
                bezier_path(x1, y1, pointer.x, pointer.y)
            }),
            _ => None,
        };

        CanvasLayout {
            viewport: self.viewport,
            nodes,
            edges,
            connection_preview,
        }
    }
}
