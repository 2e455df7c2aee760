//! Configuration panel for the selected node.
//!
//! The panel edits a private copy of the node's values. Nothing reaches the
//! graph until [`ConfigPanel::commit`] succeeds, and a panel that is dropped
//! (for instance because the selection changed) discards its edits.

use crate::canvas::CanvasController;
use crate::error::PanelError;
use flowdesk_workflow::{
    ConfigFieldDefinition, ConfigMap, NodeCatalog, NodeData, NodeId, NodeType, WorkflowNode,
    is_blank,
};
use rootcause::Report;
use serde_json::Value as JsonValue;

/// One editable field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldState {
    pub definition: ConfigFieldDefinition,
    pub value: JsonValue,
    /// Message from the last failed check, if any.
    pub error: Option<String>,
}

impl FieldState {
    fn problem(&self) -> Option<String> {
        if is_blank(Some(&self.value)) {
            return self
                .definition
                .required
                .then(|| format!("{} is required", self.definition.label));
        }
        self.definition
            .value_problem(&self.value)
            .map(|problem| format!("{} {problem}", self.definition.label))
    }
}

/// Form state for one node.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigPanel {
    node_id: NodeId,
    node_type: NodeType,
    label: String,
    fields: Vec<FieldState>,
    seeded: (String, ConfigMap),
    /// Label and config of the node when the panel last synced with it.
    source: (String, ConfigMap),
}

impl ConfigPanel {
    /// Opens the panel over a node.
    ///
    /// Each field starts from the node's config, then the field default,
    /// then the empty value for its kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the node's type is not in the catalog.
    pub fn open(catalog: &NodeCatalog, node: &WorkflowNode) -> Result<Self, Report<PanelError>> {
        let definition = catalog
            .get(&node.node_type)
            .ok_or_else(|| PanelError::UnknownNodeType {
                node_type: node.node_type.to_string(),
            })?;
        let fields: Vec<FieldState> = definition
            .fields
            .iter()
            .map(|field| FieldState {
                value: node
                    .data
                    .config
                    .get(&field.name)
                    .cloned()
                    .unwrap_or_else(|| field.initial_value()),
                definition: field.clone(),
                error: None,
            })
            .collect();
        let mut panel = Self {
            node_id: node.id.clone(),
            node_type: node.node_type.clone(),
            label: node.data.label.clone(),
            fields,
            seeded: (String::new(), ConfigMap::new()),
            source: (node.data.label.clone(), node.data.config.clone()),
        };
        panel.seeded = (panel.label.clone(), panel.values());
        Ok(panel)
    }

    #[must_use]
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    #[must_use]
    pub fn node_type(&self) -> &NodeType {
        &self.node_type
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldState] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldState> {
        self.fields.iter().find(|f| f.definition.name == name)
    }

    /// The current values of every field.
    #[must_use]
    pub fn values(&self) -> ConfigMap {
        self.fields
            .iter()
            .map(|f| (f.definition.name.clone(), f.value.clone()))
            .collect()
    }

    /// Edits one field and clears its error marker.
    ///
    /// # Errors
    ///
    /// Returns an error if the node's definition has no such field.
    pub fn set_value(
        &mut self,
        name: &str,
        value: impl Into<JsonValue>,
    ) -> Result<(), Report<PanelError>> {
        let field = self
            .fields
            .iter_mut()
            .find(|f| f.definition.name == name)
            .ok_or_else(|| PanelError::UnknownField {
                field: name.to_string(),
            })?;
        field.value = value.into();
        field.error = None;
        Ok(())
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    /// Whether `node` changed since the panel was opened or last committed,
    /// e.g. by an undo. A stale panel should be reopened.
    #[must_use]
    pub fn is_stale(&self, node: &WorkflowNode) -> bool {
        node.id != self.node_id
            || node.data.label != self.source.0
            || node.data.config != self.source.1
    }

    /// Whether anything differs from the values the panel opened with.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.label != self.seeded.0 || self.values() != self.seeded.1
    }

    /// Runs the field checks and records their messages.
    ///
    /// Returns the names of failing fields.
    pub fn check(&mut self) -> Vec<String> {
        let mut failing = Vec::new();
        for field in &mut self.fields {
            field.error = field.problem();
            if field.error.is_some() {
                failing.push(field.definition.name.clone());
            }
        }
        failing
    }

    /// Writes the values to the node as one undoable step.
    ///
    /// On success the node becomes configured and its error markers are
    /// cleared. On failure nothing is written.
    ///
    /// # Errors
    ///
    /// Returns an error if a field fails its check or the node is gone.
    pub fn commit(&mut self, canvas: &mut CanvasController) -> Result<(), Report<PanelError>> {
        let failing = self.check();
        if !failing.is_empty() {
            tracing::debug!(node_id = %self.node_id, fields = ?failing, "panel commit rejected");
            return Err(PanelError::InvalidFields { fields: failing }.into());
        }

        let label = if self.label.trim().is_empty() {
            self.seeded.0.clone()
        } else {
            self.label.trim().to_string()
        };
        let data = NodeData {
            label: label.clone(),
            config: self.values(),
            is_configured: true,
            errors: Vec::new(),
        };
        let config = data.config.clone();
        canvas
            .commit_node_data(&self.node_id, data)
            .map_err(|_| PanelError::NodeNotFound {
                node_id: self.node_id.clone(),
            })?;
        tracing::debug!(node_id = %self.node_id, "node configuration committed");
        self.label = label.clone();
        self.seeded = (label.clone(), config.clone());
        self.source = (label, config);
        Ok(())
    }
}
