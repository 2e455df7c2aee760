//! Node catalog: the static registry of node types.
//!
//! Every node on a canvas is governed by one [`NodeDefinition`]. The catalog
//! is built once at startup (see [`NodeCatalog::builtin`]) and then shared
//! read-only by the canvas, the configuration panel, and the validator. A
//! lookup miss is an ordinary `None`: callers treat the catalog as the only
//! authority on whether a node type can be rendered or connected.

use crate::error::CatalogError;
use crate::node::{ConfigMap, NodeCategory, NodeData, NodeType};
use crate::port::Ports;
use rootcause::Report;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};

/// The input widget and value shape of a configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Textarea,
    Number,
    Boolean,
    Select,
    Json,
    /// Reference to a workflow variable such as `{{lead.email}}`.
    Variable,
    /// A list of condition rules.
    Condition,
}

impl FieldKind {
    /// The value a form starts from when a field has no default.
    #[must_use]
    pub fn empty_value(self) -> JsonValue {
        match self {
            Self::Text | Self::Textarea | Self::Select | Self::Variable => {
                JsonValue::String(String::new())
            }
            Self::Number => JsonValue::Null,
            Self::Boolean => JsonValue::Bool(false),
            Self::Json => JsonValue::Object(serde_json::Map::new()),
            Self::Condition => JsonValue::Array(Vec::new()),
        }
    }
}

/// Returns true when a configuration value counts as not filled in.
///
/// Missing, `null`, whitespace-only strings, and empty arrays or objects are
/// blank. `false` and `0` are real values.
#[must_use]
pub fn is_blank(value: Option<&JsonValue>) -> bool {
    match value {
        None | Some(JsonValue::Null) => true,
        Some(JsonValue::String(s)) => s.trim().is_empty(),
        Some(JsonValue::Array(items)) => items.is_empty(),
        Some(JsonValue::Object(map)) => map.is_empty(),
        Some(JsonValue::Bool(_) | JsonValue::Number(_)) => false,
    }
}

/// One choice of a select field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// Schema of a single configuration field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFieldDefinition {
    /// Key in the node's config map. Unique within a node type.
    pub name: String,
    /// Form label.
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Allowed values when `kind` is [`FieldKind::Select`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
}

impl ConfigFieldDefinition {
    /// Creates an optional field of the given kind.
    #[must_use]
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            required: false,
            default_value: None,
            help_text: None,
            placeholder: None,
            options: Vec::new(),
        }
    }

    #[must_use]
    pub fn text(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Text)
    }

    #[must_use]
    pub fn textarea(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Textarea)
    }

    #[must_use]
    pub fn number(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Number)
    }

    #[must_use]
    pub fn boolean(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Boolean)
    }

    #[must_use]
    pub fn json(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Json)
    }

    #[must_use]
    pub fn variable(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Variable)
    }

    #[must_use]
    pub fn condition(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Condition)
    }

    /// Creates a select field from `(value, label)` pairs.
    #[must_use]
    pub fn select(
        name: impl Into<String>,
        label: impl Into<String>,
        options: &[(&str, &str)],
    ) -> Self {
        let mut field = Self::new(name, label, FieldKind::Select);
        field.options = options
            .iter()
            .map(|(value, label)| SelectOption {
                value: (*value).to_string(),
                label: (*label).to_string(),
            })
            .collect();
        field
    }

    /// Marks the field as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<JsonValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Sets the help text.
    #[must_use]
    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.help_text = Some(text.into());
        self
    }

    /// Sets the placeholder.
    #[must_use]
    pub fn placeholder(mut self, text: impl Into<String>) -> Self {
        self.placeholder = Some(text.into());
        self
    }

    /// The value a form starts from: the default, else the kind's empty value.
    ///
    /// A required boolean without a default starts as `null`, since `false`
    /// would already satisfy it.
    #[must_use]
    pub fn initial_value(&self) -> JsonValue {
        match &self.default_value {
            Some(value) => value.clone(),
            None if self.required && self.kind == FieldKind::Boolean => JsonValue::Null,
            None => self.kind.empty_value(),
        }
    }

    /// Whether `value` is one of the declared select options.
    #[must_use]
    pub fn accepts_option(&self, value: &str) -> bool {
        self.options.iter().any(|option| option.value == value)
    }

    /// Describes why a non-blank value does not fit this field's kind.
    ///
    /// Variable references are not resolved here, so text-like kinds accept
    /// any string.
    #[must_use]
    pub fn value_problem(&self, value: &JsonValue) -> Option<String> {
        match self.kind {
            FieldKind::Number => {
                let numeric = value.is_number()
                    || value
                        .as_str()
                        .is_some_and(|s| s.trim().parse::<f64>().is_ok());
                (!numeric).then(|| "must be a number".to_string())
            }
            FieldKind::Boolean => (!value.is_boolean()).then(|| "must be true or false".to_string()),
            FieldKind::Select if !self.options.is_empty() => match value.as_str() {
                Some(choice) if self.accepts_option(choice) => None,
                _ => Some(format!("has unsupported value {value}")),
            },
            FieldKind::Json => match value {
                JsonValue::String(raw) => serde_json::from_str::<JsonValue>(raw)
                    .err()
                    .map(|_| "must contain valid JSON".to_string()),
                _ => None,
            },
            FieldKind::Condition => (!value.is_array()).then(|| "must be a list of rules".to_string()),
            _ => None,
        }
    }
}

/// Catalog entry describing one node type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDefinition {
    pub node_type: NodeType,
    pub label: String,
    pub description: String,
    pub icon: String,
    pub color: String,
    /// Configuration fields in form order.
    pub fields: Vec<ConfigFieldDefinition>,
    pub ports: Ports,
    /// Exempts cycles through this node from the cycle rule.
    #[serde(default)]
    pub allows_cycles: bool,
}

impl NodeDefinition {
    /// Creates a definition with category-default icon, color, and ports.
    #[must_use]
    pub fn new(
        node_type: NodeType,
        label: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let category = node_type.category();
        let ports = if category.is_entry_point() {
            Ports::source()
        } else {
            Ports::pass_through()
        };
        Self {
            node_type,
            label: label.into(),
            description: description.into(),
            icon: category.default_icon().to_string(),
            color: category.color_token().to_string(),
            fields: Vec::new(),
            ports,
            allows_cycles: false,
        }
    }

    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    #[must_use]
    pub fn field(mut self, field: ConfigFieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn ports(mut self, ports: Ports) -> Self {
        self.ports = ports;
        self
    }

    #[must_use]
    pub fn allow_cycles(mut self) -> Self {
        self.allows_cycles = true;
        self
    }

    #[must_use]
    pub fn category(&self) -> NodeCategory {
        self.node_type.category()
    }

    /// Returns the field with the given name.
    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<&ConfigFieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &ConfigFieldDefinition> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Builds the payload of a freshly dropped node.
    ///
    /// The config holds exactly the fields that declare a default.
    #[must_use]
    pub fn default_payload(&self) -> NodeData {
        let config: ConfigMap = self
            .fields
            .iter()
            .filter_map(|f| f.default_value.clone().map(|v| (f.name.clone(), v)))
            .collect();
        NodeData {
            label: self.label.clone(),
            config,
            is_configured: false,
            errors: Vec::new(),
        }
    }
}

/// Read-only registry of node definitions.
#[derive(Debug, Clone, Default)]
pub struct NodeCatalog {
    definitions: Vec<NodeDefinition>,
    index: HashMap<NodeType, usize>,
}

impl NodeCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the catalog of built-in node types.
    #[must_use]
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for definition in crate::builtin::definitions() {
            if let Err(error) = catalog.register(definition) {
                tracing::error!(%error, "skipping invalid built-in node definition");
            }
        }
        catalog
    }

    /// Registers a definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the node type is already registered or the
    /// definition declares a field name twice.
    pub fn register(&mut self, definition: NodeDefinition) -> Result<(), Report<CatalogError>> {
        let node_type = definition.node_type.clone();
        if self.index.contains_key(&node_type) {
            return Err(CatalogError::DuplicateDefinition {
                node_type: node_type.to_string(),
            }
            .into());
        }
        let mut seen = HashSet::new();
        if let Some(field) = definition.fields.iter().find(|f| !seen.insert(f.name.as_str())) {
            return Err(CatalogError::DuplicateField {
                node_type: node_type.to_string(),
                field: field.name.clone(),
            }
            .into());
        }
        self.index.insert(node_type, self.definitions.len());
        self.definitions.push(definition);
        Ok(())
    }

    /// Returns the definition for a node type, if registered.
    #[must_use]
    pub fn get(&self, node_type: &NodeType) -> Option<&NodeDefinition> {
        self.index.get(node_type).map(|&i| &self.definitions[i])
    }

    /// Resolves a drag-and-drop token such as `"trigger/lead_created"`.
    ///
    /// Malformed and unregistered tokens both resolve to `None`.
    #[must_use]
    pub fn resolve_token(&self, token: &str) -> Option<&NodeDefinition> {
        let node_type: NodeType = token.trim().parse().ok()?;
        self.get(&node_type)
    }

    /// Lists the definitions of one category in registration order.
    #[must_use]
    pub fn list_by_category(&self, category: NodeCategory) -> Vec<&NodeDefinition> {
        self.definitions
            .iter()
            .filter(|d| d.category() == category)
            .collect()
    }

    /// Iterates over all definitions in registration order.
    pub fn list_all(&self) -> impl Iterator<Item = &NodeDefinition> {
        self.definitions.iter()
    }

    /// Returns the categories that have at least one definition, in palette order.
    #[must_use]
    pub fn categories(&self) -> Vec<NodeCategory> {
        NodeCategory::ALL
            .into_iter()
            .filter(|c| self.definitions.iter().any(|d| d.category() == *c))
            .collect()
    }

    /// Builds the default payload for a node type, if registered.
    #[must_use]
    pub fn create_default_payload(&self, node_type: &NodeType) -> Option<NodeData> {
        self.get(node_type).map(NodeDefinition::default_payload)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn send_email() -> NodeType {
        NodeType::new(NodeCategory::Action, "send_email")
    }

    #[test]
    fn unknown_type_is_absent() {
        let catalog = NodeCatalog::builtin();
        assert!(
            catalog
                .get(&NodeType::new(NodeCategory::Action, "teleport"))
                .is_none()
        );
        assert!(catalog.resolve_token("not a token").is_none());
        assert!(catalog.resolve_token("action/teleport").is_none());
    }

    #[test]
    fn resolve_token_finds_registered_type() {
        let catalog = NodeCatalog::builtin();
        let definition = catalog.resolve_token("action/send_email").expect("registered");
        assert_eq!(definition.node_type, send_email());
        assert_eq!(definition.category(), NodeCategory::Action);
    }

    #[test]
    fn default_payload_keys_are_exactly_the_defaulted_fields() {
        let catalog = NodeCatalog::builtin();
        for definition in catalog.list_all() {
            let payload = catalog
                .create_default_payload(&definition.node_type)
                .expect("registered");

            let mut keys: Vec<_> = payload.config.keys().cloned().collect();
            keys.sort();
            let mut expected: Vec<_> = definition
                .fields
                .iter()
                .filter(|f| f.default_value.is_some())
                .map(|f| f.name.clone())
                .collect();
            expected.sort();

            assert_eq!(keys, expected, "payload keys for {}", definition.node_type);
            assert!(!payload.is_configured);
            assert!(payload.errors.is_empty());
            assert_eq!(payload.label, definition.label);
        }
    }

    #[test]
    fn list_by_category_keeps_registration_order() {
        let catalog = NodeCatalog::builtin();
        let triggers: Vec<_> = catalog
            .list_by_category(NodeCategory::Trigger)
            .into_iter()
            .map(|d| d.node_type.kind().to_string())
            .collect();
        assert_eq!(triggers.first().map(String::as_str), Some("lead_created"));
        assert!(triggers.len() >= 2);
        assert_eq!(catalog.categories(), NodeCategory::ALL.to_vec());
    }

    #[test]
    fn register_rejects_duplicates() {
        let mut catalog = NodeCatalog::new();
        catalog
            .register(NodeDefinition::new(send_email(), "Send Email", "Email a lead"))
            .expect("first registration");
        assert!(
            catalog
                .register(NodeDefinition::new(send_email(), "Again", ""))
                .is_err()
        );

        let duplicate_field = NodeDefinition::new(
            NodeType::new(NodeCategory::Action, "dup"),
            "Dup",
            "",
        )
        .field(ConfigFieldDefinition::text("to", "To"))
        .field(ConfigFieldDefinition::text("to", "To again"));
        assert!(catalog.register(duplicate_field).is_err());
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn blank_values() {
        assert!(is_blank(None));
        assert!(is_blank(Some(&json!(null))));
        assert!(is_blank(Some(&json!("   "))));
        assert!(is_blank(Some(&json!([]))));
        assert!(is_blank(Some(&json!({}))));
        assert!(!is_blank(Some(&json!(false))));
        assert!(!is_blank(Some(&json!(0))));
        assert!(!is_blank(Some(&json!("x"))));
    }

    #[test]
    fn initial_value_prefers_default() {
        let with_default = ConfigFieldDefinition::number("minutes", "Minutes").default_value(15);
        let without = ConfigFieldDefinition::boolean("cc_owner", "CC owner");
        assert_eq!(with_default.initial_value(), json!(15));
        assert_eq!(without.initial_value(), json!(false));
    }

    #[test]
    fn required_boolean_starts_unanswered() {
        let consent = ConfigFieldDefinition::boolean("consent", "Consent").required();
        assert_eq!(consent.initial_value(), JsonValue::Null);
        assert!(is_blank(Some(&consent.initial_value())));
        assert!(!is_blank(Some(&json!(false))));

        let defaulted = ConfigFieldDefinition::boolean("consent", "Consent")
            .required()
            .default_value(true);
        assert_eq!(defaulted.initial_value(), json!(true));
    }

    #[test]
    fn value_problem_checks_kind() {
        let number = ConfigFieldDefinition::number("amount", "Amount");
        assert!(number.value_problem(&json!(3)).is_none());
        assert!(number.value_problem(&json!(" 2.5 ")).is_none());
        assert!(number.value_problem(&json!("soon")).is_some());

        let unit = ConfigFieldDefinition::select("unit", "Unit", &[("days", "Days")]);
        assert!(unit.value_problem(&json!("days")).is_none());
        assert!(unit.value_problem(&json!("weeks")).is_some());

        let headers = ConfigFieldDefinition::json("headers", "Headers");
        assert!(headers.value_problem(&json!("{\"a\": 1}")).is_none());
        assert!(headers.value_problem(&json!("{oops")).is_some());
    }

    #[test]
    fn trigger_definitions_have_no_inputs() {
        let catalog = NodeCatalog::builtin();
        for definition in catalog.list_by_category(NodeCategory::Trigger) {
            assert!(definition.ports.inputs.is_empty(), "{}", definition.node_type);
        }
    }
}
