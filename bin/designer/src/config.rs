//! Designer configuration.
//!
//! Loaded via the `config` crate from an optional TOML file, then from
//! environment variables prefixed with `FLOWDESK`, using `__` between
//! nesting levels (`FLOWDESK__EDITOR__AUTOSAVE_DEBOUNCE_MS=500`).

use ::config::{Config, ConfigError, Environment, File, FileFormat};
use flowdesk_editor::EditorConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration file read when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "flowdesk.toml";

/// Designer configuration composed from library configs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DesignerConfig {
    /// Directory holding one JSON file per workflow.
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,

    #[serde(default)]
    pub editor: EditorConfig,
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("workflows")
}

impl Default for DesignerConfig {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            editor: EditorConfig::default(),
        }
    }
}

impl DesignerConfig {
    /// Loads configuration from a file and the environment.
    ///
    /// An explicit `path` must exist; the default file is optional.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable or a value is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false),
        };
        Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("FLOWDESK")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
