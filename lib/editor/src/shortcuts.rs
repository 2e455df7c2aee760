//! Keyboard surface of the editor.
//!
//! Hosts translate their key events into [`KeyPress`] and ask a [`Keymap`]
//! which [`EditorCommand`] to run. Bindings use the platform's primary
//! modifier: Cmd on macOS, Ctrl elsewhere.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A no-argument editor action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorCommand {
    Save,
    Undo,
    Redo,
    Delete,
    Deselect,
    SelectAll,
    Copy,
    Paste,
    Duplicate,
}

impl EditorCommand {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Save => "save",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::Delete => "delete",
            Self::Deselect => "deselect",
            Self::SelectAll => "select_all",
            Self::Copy => "copy",
            Self::Paste => "paste",
            Self::Duplicate => "duplicate",
        }
    }
}

impl fmt::Display for EditorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Other,
}

impl Platform {
    /// The platform this binary was built for.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A printable key. Letters are matched case-insensitively.
    Char(char),
    Delete,
    Backspace,
    Escape,
}

impl Key {
    fn normalized(self) -> Self {
        match self {
            Self::Char(c) => Self::Char(c.to_ascii_lowercase()),
            other => other,
        }
    }
}

/// A key event as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

impl KeyPress {
    #[must_use]
    pub const fn plain(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            meta: false,
            shift: false,
        }
    }

    /// `key` with the primary modifier of `platform` held.
    #[must_use]
    pub const fn primary(key: Key, platform: Platform) -> Self {
        let mac = matches!(platform, Platform::MacOs);
        Self {
            key,
            ctrl: !mac,
            meta: mac,
            shift: false,
        }
    }

    #[must_use]
    pub const fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }
}

/// One key binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortcut {
    pub key: Key,
    /// Whether the primary modifier must be held.
    pub primary: bool,
    pub shift: bool,
    pub command: EditorCommand,
}

impl Shortcut {
    const fn new(key: Key, primary: bool, shift: bool, command: EditorCommand) -> Self {
        Self {
            key,
            primary,
            shift,
            command,
        }
    }

    /// The stock bindings for a platform.
    #[must_use]
    pub fn default_bindings(platform: Platform) -> Vec<Self> {
        use EditorCommand::*;
        let mut bindings = vec![
            Self::new(Key::Char('s'), true, false, Save),
            Self::new(Key::Char('z'), true, false, Undo),
            Self::new(Key::Char('z'), true, true, Redo),
            Self::new(Key::Char('a'), true, false, SelectAll),
            Self::new(Key::Char('c'), true, false, Copy),
            Self::new(Key::Char('v'), true, false, Paste),
            Self::new(Key::Char('d'), true, false, Duplicate),
            Self::new(Key::Delete, false, false, Delete),
            Self::new(Key::Backspace, false, false, Delete),
            Self::new(Key::Escape, false, false, Deselect),
        ];
        if platform == Platform::Other {
            bindings.push(Self::new(Key::Char('y'), true, false, Redo));
        }
        bindings
    }

    /// Human-readable accelerator, e.g. `Ctrl+Shift+Z`.
    #[must_use]
    pub fn label(&self, platform: Platform) -> String {
        let mut parts: Vec<String> = Vec::new();
        if self.primary {
            parts.push(match platform {
                Platform::MacOs => "Cmd".to_string(),
                Platform::Other => "Ctrl".to_string(),
            });
        }
        if self.shift {
            parts.push("Shift".to_string());
        }
        parts.push(match self.key {
            Key::Char(c) => c.to_ascii_uppercase().to_string(),
            Key::Delete => "Delete".to_string(),
            Key::Backspace => "Backspace".to_string(),
            Key::Escape => "Escape".to_string(),
        });
        parts.join("+")
    }

    fn matches(&self, press: &KeyPress, platform: Platform) -> bool {
        let primary_held = match platform {
            Platform::MacOs => press.meta,
            Platform::Other => press.ctrl,
        };
        self.key.normalized() == press.key.normalized()
            && self.primary == primary_held
            && self.shift == press.shift
    }
}

/// Resolves key presses to commands.
#[derive(Debug, Clone)]
pub struct Keymap {
    platform: Platform,
    bindings: Vec<Shortcut>,
}

impl Keymap {
    #[must_use]
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            bindings: Shortcut::default_bindings(platform),
        }
    }

    #[must_use]
    pub fn bindings(&self) -> &[Shortcut] {
        &self.bindings
    }

    #[must_use]
    pub fn resolve(&self, press: &KeyPress) -> Option<EditorCommand> {
        self.bindings
            .iter()
            .find(|binding| binding.matches(press, self.platform))
            .map(|binding| binding.command)
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::new(Platform::current())
    }
}
