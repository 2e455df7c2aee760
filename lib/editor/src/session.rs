//! One open workflow in the designer.

use crate::autosave::{AutoSaver, SaveStatus};
use crate::canvas::CanvasController;
use crate::config::EditorConfig;
use crate::error::{EditorError, PanelError, SubmissionError};
use crate::panel::ConfigPanel;
use crate::shortcuts::{EditorCommand, KeyPress, Keymap};
use crate::store::{ApprovalService, WorkflowStore};
use crate::submission::{SubmissionOutcome, SubmissionWorkflow};
use flowdesk_core::WorkflowId;
use flowdesk_workflow::{
    NodeCatalog, SubmissionRequest, ValidationResult, WorkflowStats, WorkflowStatus, get_stats,
};
use rootcause::Report;
use std::sync::Arc;
use tracing::instrument;

/// Editing state of one workflow.
pub struct EditorSession {
    workflow_id: WorkflowId,
    name: String,
    description: Option<String>,
    status: WorkflowStatus,
    canvas: CanvasController,
    panel: Option<ConfigPanel>,
    store: Arc<dyn WorkflowStore>,
    submission: SubmissionWorkflow,
    keymap: Keymap,
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("workflow_id", &self.workflow_id)
            .field("name", &self.name)
            .field("status", &self.status)
            .field("canvas", &self.canvas)
            .field("panel", &self.panel)
            .finish_non_exhaustive()
    }
}

impl EditorSession {
    /// Loads a workflow and starts its auto-saver.
    ///
    /// Returns `Ok(None)` when the store has no such workflow.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails to load the record.
    #[instrument(skip(catalog, store, approval, config), fields(workflow_id = %workflow_id))]
    pub async fn open(
        workflow_id: WorkflowId,
        catalog: Arc<NodeCatalog>,
        store: Arc<dyn WorkflowStore>,
        approval: Arc<dyn ApprovalService>,
        config: &EditorConfig,
    ) -> Result<Option<Self>, Report<EditorError>> {
        let stored = store
            .load(workflow_id)
            .await
            .map_err(|e| EditorError::LoadFailed {
                workflow_id,
                details: e.to_string(),
            })?;
        let Some(stored) = stored else {
            tracing::info!("workflow not found");
            return Ok(None);
        };

        let saver = AutoSaver::spawn(
            Arc::clone(&store),
            workflow_id,
            config.autosave_debounce(),
            0,
        );
        let canvas =
            CanvasController::load(catalog, &stored.canvas_state, config).with_autosave(saver);
        tracing::info!(
            nodes = canvas.graph().node_count(),
            edges = canvas.graph().edge_count(),
            status = %stored.status,
            "workflow opened"
        );

        Ok(Some(Self {
            workflow_id,
            name: stored.name,
            description: stored.description,
            status: stored.status,
            canvas,
            panel: None,
            store,
            submission: SubmissionWorkflow::new(approval, config.validation_policy()),
            keymap: Keymap::default(),
        }))
    }

    #[must_use]
    pub fn workflow_id(&self) -> WorkflowId {
        self.workflow_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    /// Whether the status still allows edits.
    #[must_use]
    pub fn is_editable(&self) -> bool {
        self.status.is_editable()
    }

    #[must_use]
    pub fn canvas(&self) -> &CanvasController {
        &self.canvas
    }

    /// Mutable canvas access, or `None` once the workflow left editing.
    pub fn canvas_mut(&mut self) -> Option<&mut CanvasController> {
        self.is_editable().then_some(&mut self.canvas)
    }

    /// Replaces the keymap, e.g. to force a platform in tests.
    pub fn set_keymap(&mut self, keymap: Keymap) {
        self.keymap = keymap;
    }

    /// The panel for the single selected node.
    ///
    /// A panel left over from a previous selection is discarded together
    /// with its unsaved edits.
    pub fn panel(&mut self) -> Option<&mut ConfigPanel> {
        let selected = self.canvas.selected_node();
        let in_sync = match (&self.panel, selected) {
            (Some(panel), Some(node)) => !panel.is_stale(node),
            (None, None) => true,
            _ => false,
        };
        if !in_sync {
            self.panel = match selected {
                Some(node) => match ConfigPanel::open(self.canvas.catalog(), node) {
                    Ok(panel) => Some(panel),
                    Err(error) => {
                        tracing::debug!(%error, "no panel for selected node");
                        None
                    }
                },
                None => None,
            };
        }
        self.panel.as_mut()
    }

    /// Commits the open panel into the graph.
    ///
    /// # Errors
    ///
    /// Returns an error if no node is selected, the workflow is not
    /// editable, or a field fails its check.
    pub fn commit_panel(&mut self) -> Result<(), Report<PanelError>> {
        if !self.is_editable() {
            return Err(PanelError::ReadOnly {
                status: self.status,
            }
            .into());
        }
        self.panel();
        let (Some(panel), canvas) = (self.panel.as_mut(), &mut self.canvas) else {
            return Err(PanelError::NothingSelected.into());
        };
        panel.commit(canvas)
    }

    /// Resolves a key press and runs the bound command.
    ///
    /// Returns the command that ran, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the command was a save and it failed.
    pub async fn handle_key(
        &mut self,
        press: &KeyPress,
    ) -> Result<Option<EditorCommand>, Report<EditorError>> {
        let Some(command) = self.keymap.resolve(press) else {
            return Ok(None);
        };
        self.dispatch(command).await?;
        Ok(Some(command))
    }

    /// Runs one keyboard-surface command.
    ///
    /// Commands that would change the graph are ignored when the workflow
    /// is not editable.
    ///
    /// # Errors
    ///
    /// Returns an error if a save fails.
    pub async fn dispatch(&mut self, command: EditorCommand) -> Result<(), Report<EditorError>> {
        tracing::debug!(%command, "editor command");
        let editable = self.is_editable();
        match command {
            EditorCommand::Save => return self.save_now().await,
            EditorCommand::Deselect => self.canvas.click_canvas(),
            EditorCommand::SelectAll => self.canvas.select_all(),
            EditorCommand::Copy => {
                self.canvas.copy();
            }
            EditorCommand::Undo if editable => {
                self.canvas.undo();
            }
            EditorCommand::Redo if editable => {
                self.canvas.redo();
            }
            EditorCommand::Delete if editable => {
                self.canvas.delete_selection();
            }
            EditorCommand::Paste if editable => {
                self.canvas.paste();
            }
            EditorCommand::Duplicate if editable => {
                self.canvas.duplicate();
            }
            EditorCommand::Undo
            | EditorCommand::Redo
            | EditorCommand::Delete
            | EditorCommand::Paste
            | EditorCommand::Duplicate => {
                tracing::debug!(%command, status = %self.status, "ignored on read-only workflow");
            }
        }
        Ok(())
    }

    /// Saves immediately, bypassing the debounce.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the save. Edits stay in memory.
    pub async fn save_now(&self) -> Result<(), Report<EditorError>> {
        self.canvas.save_now().await
    }

    /// Renames the workflow in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the rename.
    #[instrument(skip(self), fields(workflow_id = %self.workflow_id))]
    pub async fn rename(&mut self, name: &str) -> Result<(), Report<EditorError>> {
        let name = name.trim();
        self.store
            .rename(self.workflow_id, name)
            .await
            .map_err(|e| EditorError::RenameFailed {
                workflow_id: self.workflow_id,
                details: e.to_string(),
            })?;
        self.name = name.to_string();
        Ok(())
    }

    /// Validates the canvas and marks nodes that have errors.
    pub fn validate(&mut self) -> ValidationResult {
        let result = self.submission.validate(&self.canvas);
        self.canvas.mark_errors(&result);
        result
    }

    #[must_use]
    pub fn stats(&self) -> WorkflowStats {
        let snapshot = self.canvas.snapshot();
        get_stats(&snapshot.nodes, &snapshot.edges)
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.submission.is_in_flight()
    }

    /// Submits the workflow for review.
    ///
    /// A blocked submission marks the offending nodes. A successful one
    /// adopts the status returned by the approval service.
    ///
    /// # Errors
    ///
    /// Returns an error if the workflow is not a draft or an I/O step fails.
    pub async fn submit(
        &mut self,
        request: SubmissionRequest,
    ) -> Result<SubmissionOutcome, Report<SubmissionError>> {
        let outcome = self
            .submission
            .submit(self.workflow_id, self.status, &self.canvas, request)
            .await?;
        match &outcome {
            SubmissionOutcome::Blocked(result) => self.canvas.mark_errors(result),
            SubmissionOutcome::Submitted { status, .. } => {
                self.status = *status;
                self.panel = None;
            }
        }
        Ok(outcome)
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.canvas.is_dirty()
    }

    #[must_use]
    pub fn save_status(&self) -> Option<SaveStatus> {
        self.canvas.save_status()
    }

    /// Saves outstanding edits and stops the auto-saver.
    ///
    /// # Errors
    ///
    /// Returns an error if the final save fails.
    #[instrument(skip(self), fields(workflow_id = %self.workflow_id))]
    pub async fn close(mut self) -> Result<(), Report<EditorError>> {
        let saved = if self.canvas.is_dirty() {
            self.canvas.save_now().await
        } else {
            Ok(())
        };
        if let Some(saver) = self.canvas.take_autosave() {
            saver.shutdown().await;
        }
        saved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::ClientPoint;
    use crate::error::{ApprovalError, StoreError};
    use crate::shortcuts::{Key, Platform};
    use async_trait::async_trait;
    use flowdesk_workflow::{CanvasState, Priority, StoredWorkflow};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryStore {
        workflows: Mutex<HashMap<WorkflowId, StoredWorkflow>>,
    }

    impl InMemoryStore {
        fn with(workflow: StoredWorkflow) -> Arc<Self> {
            let store = Self::default();
            store
                .workflows
                .lock()
                .expect("lock")
                .insert(workflow.id, workflow);
            Arc::new(store)
        }

        fn stored(&self, id: WorkflowId) -> StoredWorkflow {
            self.workflows
                .lock()
                .expect("lock")
                .get(&id)
                .cloned()
                .expect("stored")
        }
    }

    #[async_trait]
    impl WorkflowStore for InMemoryStore {
        async fn load(&self, id: WorkflowId) -> Result<Option<StoredWorkflow>, StoreError> {
            Ok(self.workflows.lock().expect("lock").get(&id).cloned())
        }

        async fn save(&self, id: WorkflowId, canvas: &CanvasState) -> Result<(), StoreError> {
            let mut workflows = self.workflows.lock().expect("lock");
            let workflow = workflows
                .get_mut(&id)
                .ok_or(StoreError::NotFound { workflow_id: id })?;
            workflow.canvas_state = canvas.clone();
            Ok(())
        }

        async fn rename(&self, id: WorkflowId, name: &str) -> Result<(), StoreError> {
            let mut workflows = self.workflows.lock().expect("lock");
            let workflow = workflows
                .get_mut(&id)
                .ok_or(StoreError::NotFound { workflow_id: id })?;
            workflow.name = name.to_string();
            Ok(())
        }
    }

    struct AcceptingApproval;

    #[async_trait]
    impl ApprovalService for AcceptingApproval {
        async fn submit(
            &self,
            _: WorkflowId,
            _: SubmissionRequest,
        ) -> Result<WorkflowStatus, ApprovalError> {
            Ok(WorkflowStatus::PendingReview)
        }
    }

    async fn open(store: Arc<InMemoryStore>, id: WorkflowId) -> EditorSession {
        EditorSession::open(
            id,
            Arc::new(NodeCatalog::builtin()),
            store,
            Arc::new(AcceptingApproval),
            &EditorConfig::default(),
        )
        .await
        .expect("load")
        .expect("present")
    }

    #[tokio::test]
    async fn missing_workflow_opens_as_none() {
        let store = Arc::new(InMemoryStore::default());
        let session = EditorSession::open(
            WorkflowId::new(),
            Arc::new(NodeCatalog::builtin()),
            store,
            Arc::new(AcceptingApproval),
            &EditorConfig::default(),
        )
        .await
        .expect("load");
        assert!(session.is_none());
    }

    #[tokio::test]
    async fn panel_follows_selection_and_discards_edits() {
        let workflow = StoredWorkflow::new("Onboarding");
        let store = InMemoryStore::with(workflow.clone());
        let mut session = open(store, workflow.id).await;
        assert!(session.panel().is_none());

        let canvas = session.canvas_mut().expect("editable");
        let first = canvas
            .drop_node("action/send_email", ClientPoint::new(0.0, 0.0))
            .expect("node");
        let second = canvas
            .drop_node("action/send_email", ClientPoint::new(200.0, 0.0))
            .expect("node");
        canvas.select(&first);

        let panel = session.panel().expect("panel for first");
        panel.set_value("to", "a@example.com").expect("field");

        session.canvas_mut().expect("editable").select(&second);
        assert_eq!(session.panel().map(|p| p.node_id().clone()), Some(second.clone()));
        session.canvas_mut().expect("editable").select(&first);
        let reopened = session.panel().expect("panel for first");
        assert_eq!(reopened.field("to").map(|f| f.value.clone()), Some("".into()));
        assert!(
            !session
                .canvas()
                .graph()
                .node(&first)
                .expect("first")
                .data
                .is_configured
        );
    }

    #[tokio::test]
    async fn panel_reloads_after_undo_and_redo() {
        let workflow = StoredWorkflow::new("Onboarding");
        let store = InMemoryStore::with(workflow.clone());
        let mut session = open(store, workflow.id).await;
        let canvas = session.canvas_mut().expect("editable");
        let email = canvas
            .drop_node("action/send_email", ClientPoint::new(0.0, 0.0))
            .expect("node");
        canvas.select(&email);

        let panel = session.panel().expect("panel");
        panel.set_value("to", "a@example.com").expect("field");
        session.commit_panel().expect("valid");

        session.dispatch(EditorCommand::Undo).await.expect("undo");
        let graph_to = session
            .canvas()
            .graph()
            .node(&email)
            .and_then(|n| n.data.config.get("to").cloned());
        assert_eq!(graph_to, None);
        let panel = session.panel().expect("panel");
        assert_eq!(panel.field("to").map(|f| f.value.clone()), Some("".into()));
        assert!(!panel.is_dirty());

        session.dispatch(EditorCommand::Redo).await.expect("redo");
        let panel = session.panel().expect("panel");
        assert_eq!(
            panel.field("to").map(|f| f.value.clone()),
            Some("a@example.com".into())
        );
        assert!(!panel.is_dirty());
    }

    #[tokio::test]
    async fn commit_panel_requires_selection() {
        let workflow = StoredWorkflow::new("Onboarding");
        let store = InMemoryStore::with(workflow.clone());
        let mut session = open(store, workflow.id).await;
        let err = session.commit_panel().expect_err("nothing selected");
        assert!(err.to_string().contains("no node is selected"));
    }

    #[tokio::test]
    async fn keyboard_commands_reach_the_canvas() {
        let workflow = StoredWorkflow::new("Onboarding");
        let store = InMemoryStore::with(workflow.clone());
        let mut session = open(store.clone(), workflow.id).await;
        session.set_keymap(Keymap::new(Platform::Other));

        session
            .canvas_mut()
            .expect("editable")
            .drop_node("trigger/lead_created", ClientPoint::new(0.0, 0.0))
            .expect("node");

        let ctrl = |c| KeyPress::primary(Key::Char(c), Platform::Other);
        assert_eq!(
            session.handle_key(&ctrl('a')).await.expect("select all"),
            Some(EditorCommand::SelectAll)
        );
        session.handle_key(&ctrl('d')).await.expect("duplicate");
        assert_eq!(session.canvas().graph().node_count(), 2);
        session.handle_key(&ctrl('z')).await.expect("undo");
        assert_eq!(session.canvas().graph().node_count(), 1);
        session
            .handle_key(&KeyPress::plain(Key::Escape))
            .await
            .expect("deselect");
        assert!(session.canvas().selection().is_empty());

        session.handle_key(&ctrl('s')).await.expect("save");
        assert!(!session.is_dirty());
        assert_eq!(store.stored(workflow.id).canvas_state.nodes.len(), 1);
    }

    #[tokio::test]
    async fn blocked_submit_marks_nodes_and_success_locks_editing() {
        let workflow = StoredWorkflow::new("Onboarding");
        let store = InMemoryStore::with(workflow.clone());
        let mut session = open(store, workflow.id).await;

        let canvas = session.canvas_mut().expect("editable");
        let trigger = canvas
            .drop_node("trigger/lead_created", ClientPoint::new(100.0, 100.0))
            .expect("trigger");
        let email = canvas
            .drop_node("action/send_email", ClientPoint::new(300.0, 100.0))
            .expect("email");
        canvas.connect(&trigger, None, &email, None).expect("edge");

        let outcome = session
            .submit(SubmissionRequest::new("", Priority::Medium))
            .await
            .expect("no I/O error");
        assert!(!outcome.is_submitted());
        let marked = &session.canvas().graph().node(&email).expect("email").data.errors;
        assert_eq!(marked.len(), 1);

        session.canvas_mut().expect("editable").select(&email);
        session
            .panel()
            .expect("panel")
            .set_value("to", "{{lead.email}}")
            .expect("field");
        session.commit_panel().expect("commit");

        let outcome = session
            .submit(SubmissionRequest::new("", Priority::Medium))
            .await
            .expect("submitted");
        assert!(outcome.is_submitted());
        assert_eq!(session.status(), WorkflowStatus::PendingReview);
        assert!(session.canvas_mut().is_none());

        session.dispatch(EditorCommand::Delete).await.expect("ignored");
        assert_eq!(session.canvas().graph().node_count(), 2);
    }

    #[tokio::test]
    async fn rename_updates_store_and_session() {
        let workflow = StoredWorkflow::new("Onboarding");
        let store = InMemoryStore::with(workflow.clone());
        let mut session = open(store.clone(), workflow.id).await;
        session.rename("  Lead nurture ").await.expect("rename");
        assert_eq!(session.name(), "Lead nurture");
        assert_eq!(store.stored(workflow.id).name, "Lead nurture");
    }

    #[tokio::test]
    async fn close_flushes_pending_edits() {
        let workflow = StoredWorkflow::new("Onboarding");
        let store = InMemoryStore::with(workflow.clone());
        let mut session = open(store.clone(), workflow.id).await;
        session
            .canvas_mut()
            .expect("editable")
            .drop_node("trigger/schedule", ClientPoint::new(0.0, 0.0))
            .expect("node");
        session.close().await.expect("close");
        assert_eq!(store.stored(workflow.id).canvas_state.nodes.len(), 1);
    }
}
