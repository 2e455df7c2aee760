//! Port handles for workflow nodes.
//!
//! Ports are named connection points declared by a node definition. Edges
//! attach to them through their optional source/target handles. Nodes with
//! more than one output port branch: each output is a separate path.

use serde::{Deserialize, Serialize};

/// Name of the implicit input port.
pub const DEFAULT_INPUT: &str = "input";

/// Name of the implicit output port.
pub const DEFAULT_OUTPUT: &str = "output";

/// A single named port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDefinition {
    /// Handle name used by edges.
    pub name: String,
    /// Label drawn next to the handle.
    pub label: String,
}

impl PortDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
        }
    }
}

/// The input and output ports of a node definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Ports {
    pub inputs: Vec<PortDefinition>,
    pub outputs: Vec<PortDefinition>,
}

impl Ports {
    /// No inputs and a single output. Used by triggers.
    #[must_use]
    pub fn source() -> Self {
        Self {
            inputs: Vec::new(),
            outputs: vec![PortDefinition::new(DEFAULT_OUTPUT, "Output")],
        }
    }

    /// One input and one output.
    #[must_use]
    pub fn pass_through() -> Self {
        Self {
            inputs: vec![PortDefinition::new(DEFAULT_INPUT, "Input")],
            outputs: vec![PortDefinition::new(DEFAULT_OUTPUT, "Output")],
        }
    }

    /// One input and one output per branch.
    #[must_use]
    pub fn branching(branches: &[(&str, &str)]) -> Self {
        Self {
            inputs: vec![PortDefinition::new(DEFAULT_INPUT, "Input")],
            outputs: branches
                .iter()
                .map(|(name, label)| PortDefinition::new(*name, *label))
                .collect(),
        }
    }

    /// Returns the input port matching `handle`, treating `None` as the default.
    #[must_use]
    pub fn input(&self, handle: Option<&str>) -> Option<&PortDefinition> {
        Self::find(&self.inputs, handle, DEFAULT_INPUT)
    }

    /// Returns the output port matching `handle`, treating `None` as the default.
    #[must_use]
    pub fn output(&self, handle: Option<&str>) -> Option<&PortDefinition> {
        Self::find(&self.outputs, handle, DEFAULT_OUTPUT)
    }

    /// Whether the node has more than one output path.
    #[must_use]
    pub fn is_branching(&self) -> bool {
        self.outputs.len() > 1
    }

    /// A `None` handle resolves to the default name, or to the only port
    /// when exactly one is declared.
    fn find<'a>(
        ports: &'a [PortDefinition],
        handle: Option<&str>,
        default: &str,
    ) -> Option<&'a PortDefinition> {
        match handle {
            Some(name) => ports.iter().find(|p| p.name == name),
            None => ports
                .iter()
                .find(|p| p.name == default)
                .or_else(|| (ports.len() == 1).then(|| &ports[0])),
        }
    }
}
