//! Editor configuration.

use flowdesk_workflow::{Reachability, ValidationPolicy};
use serde::Deserialize;
use std::time::Duration;

/// Tunables for an editing session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EditorConfig {
    /// Quiet period after the last mutation before the canvas is saved.
    #[serde(default = "default_autosave_debounce_ms")]
    pub autosave_debounce_ms: u64,

    /// Number of undoable gestures kept.
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,

    /// Offset in canvas units applied to pasted and duplicated nodes.
    #[serde(default = "default_paste_offset")]
    pub paste_offset: f64,

    /// Which triggers a node must be reachable from to validate.
    #[serde(default)]
    pub reachability: Reachability,
}

fn default_autosave_debounce_ms() -> u64 {
    2000
}

fn default_history_depth() -> usize {
    100
}

fn default_paste_offset() -> f64 {
    40.0
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            autosave_debounce_ms: default_autosave_debounce_ms(),
            history_depth: default_history_depth(),
            paste_offset: default_paste_offset(),
            reachability: Reachability::default(),
        }
    }
}

impl EditorConfig {
    #[must_use]
    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    #[must_use]
    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            reachability: self.reachability,
        }
    }
}
