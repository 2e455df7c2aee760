//! Approval hand-off for the command-line host.
//!
//! There is no review queue behind the CLI, so a submission is recorded in
//! the log and the stored record moves to `PendingReview`.

use async_trait::async_trait;
use flowdesk_core::{SubmissionId, WorkflowId};
use flowdesk_editor::{ApprovalError, ApprovalService, FileWorkflowStore};
use flowdesk_workflow::{SubmissionRequest, WorkflowStatus};
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug)]
pub struct LoggingApprovalService {
    store: Arc<FileWorkflowStore>,
}

impl LoggingApprovalService {
    pub fn new(store: Arc<FileWorkflowStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ApprovalService for LoggingApprovalService {
    #[instrument(skip(self, request), fields(workflow_id = %workflow_id))]
    async fn submit(
        &self,
        workflow_id: WorkflowId,
        request: SubmissionRequest,
    ) -> Result<WorkflowStatus, ApprovalError> {
        let submission_id = SubmissionId::new();
        self.store
            .set_status(workflow_id, WorkflowStatus::PendingReview)
            .await
            .map_err(|e| ApprovalError::Unavailable {
                details: e.to_string(),
            })?;
        tracing::info!(
            %submission_id,
            priority = %request.priority,
            notes_len = request.notes.len(),
            "workflow handed off for review"
        );
        Ok(WorkflowStatus::PendingReview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdesk_editor::WorkflowStore;
    use flowdesk_workflow::{Priority, StoredWorkflow};

    #[tokio::test]
    async fn hand_off_marks_record_pending_review() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(FileWorkflowStore::open(dir.path()).await.expect("open"));
        let workflow = StoredWorkflow::new("Renewal reminder");
        store.create(&workflow).await.expect("create");

        let approval = LoggingApprovalService::new(Arc::clone(&store));
        let status = approval
            .submit(workflow.id, SubmissionRequest::new("", Priority::Low))
            .await
            .expect("submit");

        assert_eq!(status, WorkflowStatus::PendingReview);
        let stored = store.load(workflow.id).await.expect("load").expect("present");
        assert_eq!(stored.status, WorkflowStatus::PendingReview);
    }

    #[tokio::test]
    async fn unknown_workflow_is_unavailable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(FileWorkflowStore::open(dir.path()).await.expect("open"));
        let approval = LoggingApprovalService::new(store);
        let err = approval
            .submit(WorkflowId::new(), SubmissionRequest::default())
            .await
            .expect_err("missing record");
        assert!(matches!(err, ApprovalError::Unavailable { .. }));
    }
}
