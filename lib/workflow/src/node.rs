//! Workflow node types.
//!
//! A node on the canvas has:
//! - An id unique within its graph
//! - A [`NodeType`] (`category/kind`) that selects its catalog definition
//! - A position used for layout
//! - A data payload with its label, configuration, and error markers

use crate::error::CatalogError;
use crate::id::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

/// Configuration payload of a node: field name to value.
pub type ConfigMap = serde_json::Map<String, JsonValue>;

/// The category of a workflow node.
///
/// Rendering, palette grouping, and category-specific validation rules all
/// dispatch on this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    /// Entry points that start the automation.
    Trigger,
    /// CRM side effects (send email, create task, update lead).
    Action,
    /// Control flow (conditions, delays, splits, loops).
    Logic,
    /// Model-backed processing steps.
    Ai,
    /// Calls into third-party systems.
    Integration,
}

impl NodeCategory {
    /// All categories in palette order.
    pub const ALL: [Self; 5] = [
        Self::Trigger,
        Self::Action,
        Self::Logic,
        Self::Ai,
        Self::Integration,
    ];

    /// Returns the tag used in node type tokens.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::Action => "action",
            Self::Logic => "logic",
            Self::Ai => "ai",
            Self::Integration => "integration",
        }
    }

    /// Returns the palette section heading.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Trigger => "Triggers",
            Self::Action => "Actions",
            Self::Logic => "Logic",
            Self::Ai => "AI",
            Self::Integration => "Integrations",
        }
    }

    /// Returns the color token used for node chrome in this category.
    #[must_use]
    pub const fn color_token(self) -> &'static str {
        match self {
            Self::Trigger => "emerald",
            Self::Action => "blue",
            Self::Logic => "amber",
            Self::Ai => "violet",
            Self::Integration => "slate",
        }
    }

    /// Returns the icon used when a definition does not name its own.
    #[must_use]
    pub const fn default_icon(self) -> &'static str {
        match self {
            Self::Trigger => "zap",
            Self::Action => "play",
            Self::Logic => "git-branch",
            Self::Ai => "sparkles",
            Self::Integration => "plug",
        }
    }

    /// Whether nodes in this category can start a run.
    #[must_use]
    pub const fn is_entry_point(self) -> bool {
        matches!(self, Self::Trigger)
    }
}

impl fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeCategory {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| CatalogError::UnknownCategory {
                category: s.to_string(),
            })
    }
}

/// Identifies which catalog entry governs a node, e.g. `action/send_email`.
///
/// Immutable once a node is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeType {
    category: NodeCategory,
    kind: String,
}

impl NodeType {
    /// Creates a node type from its category and kind tags.
    #[must_use]
    pub fn new(category: NodeCategory, kind: impl Into<String>) -> Self {
        Self {
            category,
            kind: kind.into(),
        }
    }

    /// Returns the category tag.
    #[must_use]
    pub const fn category(&self) -> NodeCategory {
        self.category
    }

    /// Returns the kind tag.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.kind)
    }
}

impl FromStr for NodeType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || CatalogError::MalformedNodeType {
            token: s.to_string(),
        };
        let (category, kind) = s.split_once('/').ok_or_else(malformed)?;
        if kind.is_empty() || kind.contains('/') {
            return Err(malformed());
        }
        Ok(Self::new(category.parse()?, kind))
    }
}

impl TryFrom<String> for NodeType {
    type Error = CatalogError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NodeType> for String {
    fn from(node_type: NodeType) -> Self {
        node_type.to_string()
    }
}

/// A point in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns this position shifted by the given delta.
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// The data payload carried by every node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    /// Display label shown on the canvas.
    pub label: String,
    /// Field values keyed by field name.
    #[serde(default)]
    pub config: ConfigMap,
    /// Set once the configuration panel committed a complete configuration.
    #[serde(default)]
    pub is_configured: bool,
    /// Node-level error markers shown on the canvas.
    #[serde(default)]
    pub errors: Vec<String>,
}

impl NodeData {
    /// Creates an unconfigured payload with the given label.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Shallow-merges `patch` into the configuration.
    pub fn merge_config(&mut self, patch: ConfigMap) {
        for (key, value) in patch {
            self.config.insert(key, value);
        }
    }
}

/// A node placed on the workflow canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    /// Unique identifier for this node within the graph.
    pub id: NodeId,
    /// Catalog entry governing this node.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Layout position in canvas coordinates.
    pub position: Position,
    /// Label, configuration, and status flags.
    pub data: NodeData,
}

impl WorkflowNode {
    /// Creates a node with a freshly generated id.
    #[must_use]
    pub fn new(node_type: NodeType, position: Position, data: NodeData) -> Self {
        Self::with_id(NodeId::generate(), node_type, position, data)
    }

    /// Creates a node with a specific id.
    #[must_use]
    pub fn with_id(id: NodeId, node_type: NodeType, position: Position, data: NodeData) -> Self {
        Self {
            id,
            node_type,
            position,
            data,
        }
    }

    /// Returns the category of this node.
    #[must_use]
    pub fn category(&self) -> NodeCategory {
        self.node_type.category()
    }

    /// Returns the display label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.data.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_type_parses_token() {
        let node_type: NodeType = "action/send_email".parse().expect("parse");
        assert_eq!(node_type.category(), NodeCategory::Action);
        assert_eq!(node_type.kind(), "send_email");
        assert_eq!(node_type.to_string(), "action/send_email");
    }

    #[test]
    fn node_type_rejects_malformed_tokens() {
        for token in ["send_email", "action/", "action/a/b", ""] {
            assert!(
                matches!(
                    token.parse::<NodeType>(),
                    Err(CatalogError::MalformedNodeType { .. })
                ),
                "{token} should be malformed"
            );
        }
        assert!(matches!(
            "robot/send".parse::<NodeType>(),
            Err(CatalogError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn node_serializes_in_canvas_shape() {
        let mut data = NodeData::new("Send Email");
        data.config.insert("to".to_string(), json!("a@example.com"));
        let node = WorkflowNode::with_id(
            NodeId::new("n1"),
            NodeType::new(NodeCategory::Action, "send_email"),
            Position::new(300.0, 100.0),
            data,
        );

        let value = serde_json::to_value(&node).expect("serialize");
        assert_eq!(
            value,
            json!({
                "id": "n1",
                "type": "action/send_email",
                "position": { "x": 300.0, "y": 100.0 },
                "data": {
                    "label": "Send Email",
                    "config": { "to": "a@example.com" },
                    "isConfigured": false,
                    "errors": []
                }
            })
        );
    }

    #[test]
    fn node_data_tolerates_missing_optional_fields() {
        let data: NodeData = serde_json::from_value(json!({ "label": "Delay" })).expect("parse");
        assert!(data.config.is_empty());
        assert!(!data.is_configured);
    }

    #[test]
    fn merge_config_is_shallow() {
        let mut data = NodeData::new("Task");
        data.config.insert("title".to_string(), json!("Call back"));
        data.config.insert("meta".to_string(), json!({ "a": 1, "b": 2 }));

        let mut patch = ConfigMap::new();
        patch.insert("meta".to_string(), json!({ "c": 3 }));
        data.merge_config(patch);

        assert_eq!(data.config["title"], json!("Call back"));
        assert_eq!(data.config["meta"], json!({ "c": 3 }));
    }
}
