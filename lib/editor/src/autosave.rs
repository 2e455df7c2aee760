//! Debounced auto-save.
//!
//! [`AutoSaver`] owns a background task that is the only caller of
//! [`WorkflowStore::save`] for one workflow. Every canvas state handed to it
//! carries a revision number that increases with each mutation.
//!
//! - `schedule` replaces the pending state and restarts the quiet period, so a
//!   burst of edits produces one save of the settled state.
//! - `flush` drops the pending state and saves immediately.
//! - Saves run one at a time inside the task, so at most one request is ever
//!   outstanding and an older revision is never written after a newer one.
//!
//! A failed save is not retried. The status keeps the last saved revision so
//! the editor stays dirty until the next mutation or explicit save succeeds.

use crate::error::{EditorError, StoreError};
use crate::store::WorkflowStore;
use chrono::{DateTime, Utc};
use flowdesk_core::WorkflowId;
use flowdesk_workflow::CanvasState;
use rootcause::Report;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// What the auto-saver last reported.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SaveStatus {
    /// Highest revision known to be stored.
    pub saved_revision: u64,
    /// True while a save request is outstanding.
    pub saving: bool,
    pub last_saved_at: Option<DateTime<Utc>>,
    /// Message of the most recent failure, cleared by the next success.
    pub last_error: Option<String>,
}

impl SaveStatus {
    /// Whether `revision` has changes that are not stored yet.
    #[must_use]
    pub fn is_dirty(&self, revision: u64) -> bool {
        revision > self.saved_revision
    }
}

enum SaveRequest {
    Schedule {
        revision: u64,
        state: CanvasState,
    },
    Flush {
        revision: u64,
        state: CanvasState,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
}

/// Handle to the auto-save task of one workflow.
///
/// Dropping the handle lets the task write any pending state and exit.
#[derive(Debug)]
pub struct AutoSaver {
    workflow_id: WorkflowId,
    requests: mpsc::UnboundedSender<SaveRequest>,
    status: watch::Receiver<SaveStatus>,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for SaveRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Schedule { revision, .. } => write!(f, "Schedule({revision})"),
            Self::Flush { revision, .. } => write!(f, "Flush({revision})"),
        }
    }
}

impl AutoSaver {
    /// Spawns the auto-save task on the current tokio runtime.
    ///
    /// `saved_revision` is the revision of the state the store already holds.
    #[must_use]
    pub fn spawn(
        store: Arc<dyn WorkflowStore>,
        workflow_id: WorkflowId,
        debounce: Duration,
        saved_revision: u64,
    ) -> Self {
        let (requests, receiver) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(SaveStatus {
            saved_revision,
            ..SaveStatus::default()
        });
        let worker = SaveWorker {
            store,
            workflow_id,
            debounce,
            status: status_tx,
        };
        let task = tokio::spawn(worker.run(receiver));
        Self {
            workflow_id,
            requests,
            status,
            task,
        }
    }

    #[must_use]
    pub fn workflow_id(&self) -> WorkflowId {
        self.workflow_id
    }

    /// Queues `state` to be saved once no newer state arrives for the
    /// debounce period.
    pub fn schedule(&self, revision: u64, state: CanvasState) {
        if self
            .requests
            .send(SaveRequest::Schedule { revision, state })
            .is_err()
        {
            tracing::warn!(workflow_id = %self.workflow_id, revision, "auto-save task is gone, dropping scheduled save");
        }
    }

    /// Saves `state` now, cancelling any pending debounced save, and waits
    /// for the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the save or the task has stopped.
    pub async fn flush(&self, revision: u64, state: CanvasState) -> Result<(), Report<EditorError>> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(SaveRequest::Flush {
                revision,
                state,
                reply,
            })
            .map_err(|_| EditorError::AutoSaveStopped)?;
        match response.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(EditorError::SaveFailed {
                workflow_id: self.workflow_id,
                details: error.to_string(),
            }
            .into()),
            Err(_) => Err(EditorError::AutoSaveStopped.into()),
        }
    }

    /// Returns the latest status.
    #[must_use]
    pub fn status(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    /// Returns a receiver that observes status changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    /// Closes the request channel and waits for the task to write any
    /// pending state.
    pub async fn shutdown(self) {
        let Self { requests, task, .. } = self;
        drop(requests);
        if let Err(error) = task.await {
            tracing::warn!(%error, "auto-save task ended abnormally");
        }
    }
}

struct SaveWorker {
    store: Arc<dyn WorkflowStore>,
    workflow_id: WorkflowId,
    debounce: Duration,
    status: watch::Sender<SaveStatus>,
}

impl SaveWorker {
    async fn run(self, mut requests: mpsc::UnboundedReceiver<SaveRequest>) {
        let mut pending: Option<(u64, CanvasState)> = None;
        let mut deadline: Option<Instant> = None;

        loop {
            let request = match deadline {
                Some(at) => {
                    tokio::select! {
                        biased;
                        request = requests.recv() => request,
                        () = tokio::time::sleep_until(at) => {
                            deadline = None;
                            if let Some((revision, state)) = pending.take() {
                                // Failures are recorded in the status.
                                let _ = self.save(revision, &state).await;
                            }
                            continue;
                        }
                    }
                }
                None => requests.recv().await,
            };

            match request {
                Some(SaveRequest::Schedule { revision, state }) => {
                    if pending.as_ref().is_none_or(|(current, _)| revision >= *current) {
                        pending = Some((revision, state));
                    }
                    deadline = Some(Instant::now() + self.debounce);
                }
                Some(SaveRequest::Flush {
                    revision,
                    state,
                    reply,
                }) => {
                    if pending.as_ref().is_some_and(|(current, _)| *current <= revision) {
                        pending = None;
                        deadline = None;
                    }
                    let result = self.save(revision, &state).await;
                    if reply.send(result).is_err() {
                        tracing::debug!(workflow_id = %self.workflow_id, revision, "flush caller went away");
                    }
                }
                None => {
                    if let Some((revision, state)) = pending.take() {
                        let _ = self.save(revision, &state).await;
                    }
                    break;
                }
            }
        }
        tracing::debug!(workflow_id = %self.workflow_id, "auto-save task stopped");
    }

    async fn save(&self, revision: u64, state: &CanvasState) -> Result<(), StoreError> {
        let saved_revision = self.status.borrow().saved_revision;
        if revision <= saved_revision {
            tracing::debug!(
                workflow_id = %self.workflow_id,
                revision,
                saved_revision,
                "skipping save of stale revision"
            );
            return Ok(());
        }

        self.status.send_modify(|status| status.saving = true);
        let result = self.store.save(self.workflow_id, state).await;
        self.status.send_modify(|status| {
            status.saving = false;
            match &result {
                Ok(()) => {
                    status.saved_revision = revision;
                    status.last_saved_at = Some(Utc::now());
                    status.last_error = None;
                }
                Err(error) => status.last_error = Some(error.to_string()),
            }
        });

        match &result {
            Ok(()) => tracing::info!(
                workflow_id = %self.workflow_id,
                revision,
                nodes = state.nodes.len(),
                edges = state.edges.len(),
                "workflow saved"
            ),
            Err(error) => tracing::warn!(
                workflow_id = %self.workflow_id,
                revision,
                %error,
                "workflow save failed"
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use flowdesk_workflow::{StoredWorkflow, Viewport};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// In-memory store that records every save.
    #[derive(Default)]
    struct RecordingStore {
        saves: Mutex<Vec<CanvasState>>,
        fail: AtomicBool,
    }

    impl RecordingStore {
        fn saves(&self) -> Vec<CanvasState> {
            self.saves.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WorkflowStore for RecordingStore {
        async fn load(&self, _: WorkflowId) -> Result<Option<StoredWorkflow>, StoreError> {
            Ok(None)
        }

        async fn save(&self, _: WorkflowId, canvas: &CanvasState) -> Result<(), StoreError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(StoreError::Io {
                    details: "disk full".to_string(),
                });
            }
            self.saves.lock().unwrap().push(canvas.clone());
            Ok(())
        }

        async fn rename(&self, _: WorkflowId, _: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn state(marker: f64) -> CanvasState {
        CanvasState {
            viewport: Viewport {
                x: marker,
                y: 0.0,
                zoom: 1.0,
            },
            ..CanvasState::default()
        }
    }

    fn spawn(store: &Arc<RecordingStore>) -> AutoSaver {
        AutoSaver::spawn(
            store.clone(),
            WorkflowId::new(),
            Duration::from_millis(2000),
            0,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_mutations_coalesces_into_one_save() {
        let store = Arc::new(RecordingStore::default());
        let saver = spawn(&store);

        saver.schedule(1, state(1.0));
        tokio::time::sleep(Duration::from_millis(100)).await;
        saver.schedule(2, state(2.0));

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert!(store.saves().is_empty());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(store.saves(), vec![state(2.0)]);
        assert_eq!(saver.status().saved_revision, 2);
        assert!(!saver.status().is_dirty(2));
    }

    #[tokio::test(start_paused = true)]
    async fn flush_cancels_pending_save() {
        let store = Arc::new(RecordingStore::default());
        let saver = spawn(&store);

        saver.schedule(1, state(1.0));
        saver.flush(2, state(2.0)).await.expect("flush");
        tokio::time::sleep(Duration::from_millis(5000)).await;

        assert_eq!(store.saves(), vec![state(2.0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_revision_is_never_written() {
        let store = Arc::new(RecordingStore::default());
        let saver = spawn(&store);

        saver.flush(5, state(5.0)).await.expect("flush");
        saver.flush(3, state(3.0)).await.expect("stale flush is a no-op");
        saver.schedule(4, state(4.0));
        tokio::time::sleep(Duration::from_millis(3000)).await;

        assert_eq!(store.saves(), vec![state(5.0)]);
        assert_eq!(saver.status().saved_revision, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_keeps_state_dirty() {
        let store = Arc::new(RecordingStore::default());
        store.fail.store(true, Ordering::SeqCst);
        let saver = spawn(&store);

        assert!(saver.flush(1, state(1.0)).await.is_err());
        let status = saver.status();
        assert!(status.is_dirty(1));
        assert_eq!(status.last_error.as_deref(), Some("storage error: disk full"));

        store.fail.store(false, Ordering::SeqCst);
        saver.flush(1, state(1.0)).await.expect("retry by explicit save");
        assert!(saver.status().last_error.is_none());
        assert!(!saver.status().is_dirty(1));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_writes_pending_state() {
        let store = Arc::new(RecordingStore::default());
        let saver = spawn(&store);

        saver.schedule(1, state(1.0));
        saver.shutdown().await;
        assert_eq!(store.saves(), vec![state(1.0)]);
    }
}
