//! Interactive editing of flowdesk workflows.
//!
//! This crate turns the pure graph model of `flowdesk-workflow` into an
//! editor: pointer gestures on a canvas, a configuration form for the
//! selected node, undo/redo, debounced auto-save, a keyboard surface, and
//! the draft submission procedure.
//!
//! Storage and approval are collaborators behind the [`WorkflowStore`] and
//! [`ApprovalService`] traits. Everything else runs on the caller's task;
//! the only background work is the auto-save task owned by [`AutoSaver`].

pub mod autosave;
pub mod canvas;
pub mod config;
pub mod error;
pub mod history;
pub mod panel;
pub mod session;
pub mod shortcuts;
pub mod store;
pub mod submission;

pub use autosave::{AutoSaver, SaveStatus};
pub use canvas::{
    CanvasController, CanvasLayout, ClientPoint, EdgePath, HandleAnchor, InteractionMode,
    NODE_HEIGHT, NODE_WIDTH, NodeBox, PaletteEntry, PaletteSection, bezier_path,
};
pub use config::EditorConfig;
pub use error::{ApprovalError, EditorError, PanelError, StoreError, SubmissionError};
pub use history::{GraphCommand, History};
pub use panel::{ConfigPanel, FieldState};
pub use session::EditorSession;
pub use shortcuts::{EditorCommand, Key, KeyPress, Keymap, Platform, Shortcut};
pub use store::{ApprovalService, FileWorkflowStore, WorkflowStore};
pub use submission::{SubmissionOutcome, SubmissionWorkflow};
