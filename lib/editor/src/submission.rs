//! Submission of a draft for review.
//!
//! A submission validates the current snapshot, saves it, then hands it to
//! the approval service. The two I/O steps are strictly sequenced: if the
//! save fails the approval service is never called. A failure at either step
//! leaves the workflow in `Draft` with the in-memory canvas untouched.

use crate::canvas::CanvasController;
use crate::error::SubmissionError;
use crate::store::ApprovalService;
use flowdesk_core::WorkflowId;
use flowdesk_workflow::{
    SubmissionRequest, ValidationIssue, ValidationPolicy, ValidationResult, WorkflowStats,
    WorkflowStatus, get_stats, validate_with,
};
use rootcause::Report;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::instrument;

/// Result of a submission attempt that did not fail on I/O.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// Validation found errors. Nothing was saved or sent.
    Blocked(ValidationResult),
    /// The approval service accepted the workflow.
    Submitted {
        status: WorkflowStatus,
        stats: WorkflowStats,
        warnings: Vec<ValidationIssue>,
    },
}

impl SubmissionOutcome {
    #[must_use]
    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted { .. })
    }
}

/// Clears the in-flight flag when the submission ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs validate, save, and hand-off for one workflow at a time.
pub struct SubmissionWorkflow {
    approval: Arc<dyn ApprovalService>,
    policy: ValidationPolicy,
    in_flight: AtomicBool,
}

impl std::fmt::Debug for SubmissionWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionWorkflow")
            .field("policy", &self.policy)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl SubmissionWorkflow {
    #[must_use]
    pub fn new(approval: Arc<dyn ApprovalService>, policy: ValidationPolicy) -> Self {
        Self {
            approval,
            policy,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a submission is outstanding. Hosts disable the submit
    /// control while this is true.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Validates the canvas without submitting.
    #[must_use]
    pub fn validate(&self, canvas: &CanvasController) -> ValidationResult {
        let snapshot = canvas.snapshot();
        validate_with(canvas.catalog(), &snapshot.nodes, &snapshot.edges, &self.policy)
    }

    /// Submits the canvas for review.
    ///
    /// Returns [`SubmissionOutcome::Blocked`] with every validation error when
    /// the workflow is invalid.
    ///
    /// # Errors
    ///
    /// Returns an error if the workflow is not a draft, another submission
    /// is outstanding, the save fails, or the approval service fails.
    #[instrument(skip(self, canvas, request), fields(workflow_id = %workflow_id, priority = %request.priority))]
    pub async fn submit(
        &self,
        workflow_id: WorkflowId,
        status: WorkflowStatus,
        canvas: &CanvasController,
        request: SubmissionRequest,
    ) -> Result<SubmissionOutcome, Report<SubmissionError>> {
        if status != WorkflowStatus::Draft {
            return Err(SubmissionError::NotDraft { status }.into());
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SubmissionError::AlreadyInFlight.into());
        }
        let _guard = InFlight(&self.in_flight);

        let snapshot = canvas.snapshot();
        let validation =
            validate_with(canvas.catalog(), &snapshot.nodes, &snapshot.edges, &self.policy);
        if !validation.is_valid {
            tracing::info!(errors = validation.errors.len(), "submission blocked by validation");
            return Ok(SubmissionOutcome::Blocked(validation));
        }

        canvas.save_now().await.map_err(|e| {
            tracing::warn!(error = %e, "save before submit failed");
            SubmissionError::SaveFailed {
                details: e.to_string(),
            }
        })?;

        let status = self
            .approval
            .submit(workflow_id, request)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "approval hand-off failed");
                SubmissionError::ApprovalFailed {
                    details: e.to_string(),
                }
            })?;

        tracing::info!(%status, "workflow submitted");
        Ok(SubmissionOutcome::Submitted {
            status,
            stats: get_stats(&snapshot.nodes, &snapshot.edges),
            warnings: validation.warnings,
        })
    }
}
