//! Persistence and approval collaborators.
//!
//! The editor never talks to storage directly. It goes through these traits
//! so the host can plug in its own backend and tests can use in-memory fakes.

use crate::error::{ApprovalError, StoreError};
use async_trait::async_trait;
use flowdesk_core::WorkflowId;
use flowdesk_workflow::{CanvasState, StoredWorkflow, SubmissionRequest, WorkflowStatus};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::instrument;

/// Loads and saves workflow records.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Loads a workflow. A missing record is `Ok(None)`, not an error.
    async fn load(&self, workflow_id: WorkflowId) -> Result<Option<StoredWorkflow>, StoreError>;

    /// Overwrites the stored canvas of a workflow.
    async fn save(&self, workflow_id: WorkflowId, canvas: &CanvasState) -> Result<(), StoreError>;

    async fn rename(&self, workflow_id: WorkflowId, name: &str) -> Result<(), StoreError>;
}

/// Receives workflows submitted for review.
///
/// The service owns every status transition after `Draft`.
#[async_trait]
pub trait ApprovalService: Send + Sync {
    /// Hands off a saved workflow and returns its new status.
    async fn submit(
        &self,
        workflow_id: WorkflowId,
        request: SubmissionRequest,
    ) -> Result<WorkflowStatus, ApprovalError>;
}

/// Stores each workflow as a JSON file in one directory.
///
/// Writes go to a temporary file that is then renamed over the record, and
/// are serialized through a lock so read-modify-write cycles never interleave.
#[derive(Debug)]
pub struct FileWorkflowStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileWorkflowStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(io_error)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, workflow_id: WorkflowId) -> PathBuf {
        self.dir.join(format!("{workflow_id}.json"))
    }

    /// Writes a new record, replacing any existing one with the same id.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    pub async fn create(&self, workflow: &StoredWorkflow) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.write(workflow).await
    }

    /// Records a status chosen by the approval side.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is missing or cannot be written.
    pub async fn set_status(
        &self,
        workflow_id: WorkflowId,
        status: WorkflowStatus,
    ) -> Result<(), StoreError> {
        self.update(workflow_id, |workflow| workflow.status = status)
            .await
    }

    /// Lists every readable record in the directory, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub async fn list(&self) -> Result<Vec<StoredWorkflow>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(io_error)?;
        let mut workflows = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let raw = tokio::fs::read_to_string(&path).await.map_err(io_error)?;
            match serde_json::from_str::<StoredWorkflow>(&raw) {
                Ok(workflow) => workflows.push(workflow),
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "skipping unreadable workflow file");
                }
            }
        }
        workflows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(workflows)
    }

    async fn read(&self, workflow_id: WorkflowId) -> Result<Option<StoredWorkflow>, StoreError> {
        let raw = match tokio::fs::read_to_string(self.path_for(workflow_id)).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(io_error(error)),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                workflow_id,
                details: e.to_string(),
            })
    }

    async fn write(&self, workflow: &StoredWorkflow) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(workflow).map_err(|e| StoreError::Io {
            details: e.to_string(),
        })?;
        let path = self.path_for(workflow.id);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(io_error)?;
        tokio::fs::rename(&tmp, &path).await.map_err(io_error)
    }

    async fn update(
        &self,
        workflow_id: WorkflowId,
        change: impl FnOnce(&mut StoredWorkflow) + Send,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut workflow = self
            .read(workflow_id)
            .await?
            .ok_or(StoreError::NotFound { workflow_id })?;
        change(&mut workflow);
        workflow.touch();
        self.write(&workflow).await
    }
}

fn io_error(error: std::io::Error) -> StoreError {
    StoreError::Io {
        details: error.to_string(),
    }
}

#[async_trait]
impl WorkflowStore for FileWorkflowStore {
    #[instrument(skip(self), fields(workflow_id = %workflow_id))]
    async fn load(&self, workflow_id: WorkflowId) -> Result<Option<StoredWorkflow>, StoreError> {
        self.read(workflow_id).await
    }

    #[instrument(skip(self, canvas), fields(workflow_id = %workflow_id, nodes = canvas.nodes.len()))]
    async fn save(&self, workflow_id: WorkflowId, canvas: &CanvasState) -> Result<(), StoreError> {
        let canvas = canvas.clone();
        self.update(workflow_id, move |workflow| workflow.canvas_state = canvas)
            .await
    }

    #[instrument(skip(self), fields(workflow_id = %workflow_id))]
    async fn rename(&self, workflow_id: WorkflowId, name: &str) -> Result<(), StoreError> {
        let name = name.to_string();
        self.update(workflow_id, move |workflow| workflow.name = name)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdesk_workflow::Viewport;

    #[tokio::test]
    async fn missing_record_loads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileWorkflowStore::open(dir.path()).await.expect("open");
        assert_eq!(store.load(WorkflowId::new()).await, Ok(None));
    }

    #[tokio::test]
    async fn save_replaces_canvas_and_keeps_metadata() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileWorkflowStore::open(dir.path()).await.expect("open");
        let workflow = StoredWorkflow::new("Lead nurture").with_description("Welcome series");
        store.create(&workflow).await.expect("create");

        let canvas = CanvasState {
            viewport: Viewport {
                x: 10.0,
                y: 20.0,
                zoom: 1.5,
            },
            ..CanvasState::default()
        };
        store.save(workflow.id, &canvas).await.expect("save");

        let loaded = store.load(workflow.id).await.expect("load").expect("present");
        assert_eq!(loaded.canvas_state, canvas);
        assert_eq!(loaded.name, "Lead nurture");
        assert_eq!(loaded.description.as_deref(), Some("Welcome series"));
        assert!(loaded.updated_at >= workflow.updated_at);
    }

    #[tokio::test]
    async fn save_of_unknown_workflow_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileWorkflowStore::open(dir.path()).await.expect("open");
        let id = WorkflowId::new();
        let result = store.save(id, &CanvasState::default()).await;
        assert_eq!(result, Err(StoreError::NotFound { workflow_id: id }));
    }

    #[tokio::test]
    async fn rename_status_and_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileWorkflowStore::open(dir.path()).await.expect("open");
        let first = StoredWorkflow::new("Zeta");
        let second = StoredWorkflow::new("Alpha");
        store.create(&first).await.expect("create");
        store.create(&second).await.expect("create");

        store.rename(first.id, "Beta").await.expect("rename");
        store
            .set_status(first.id, WorkflowStatus::PendingReview)
            .await
            .expect("status");

        let names: Vec<_> = store
            .list()
            .await
            .expect("list")
            .into_iter()
            .map(|w| (w.name, w.status))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Alpha".to_string(), WorkflowStatus::Draft),
                ("Beta".to_string(), WorkflowStatus::PendingReview),
            ]
        );
    }

    #[tokio::test]
    async fn corrupt_record_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileWorkflowStore::open(dir.path()).await.expect("open");
        let id = WorkflowId::new();
        tokio::fs::write(store.path_for(id), "not json")
            .await
            .expect("write");
        assert!(matches!(
            store.load(id).await,
            Err(StoreError::Corrupt { .. })
        ));
    }
}
