//! Stored workflow records.
//!
//! A workflow is a named canvas owned by the CRM. The designer edits its
//! canvas, saves it through the persistence collaborator, and hands it to
//! the approval service once it validates.

use crate::canvas::CanvasState;
use chrono::{DateTime, Utc};
use flowdesk_core::WorkflowId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Being edited; never submitted.
    #[default]
    Draft,
    /// Submitted and waiting for a reviewer.
    PendingReview,
    /// Approved and being built out.
    InImplementation,
    Active,
    Paused,
}

impl WorkflowStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingReview => "pending_review",
            Self::InImplementation => "in_implementation",
            Self::Active => "active",
            Self::Paused => "paused",
        }
    }

    /// Whether the designer still accepts edits in this status.
    #[must_use]
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Draft | Self::Paused)
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Urgency attached to a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Urgent];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePriorityError(String);

impl fmt::Display for ParsePriorityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown priority '{}', expected low, medium, high, or urgent",
            self.0
        )
    }
}

impl std::error::Error for ParsePriorityError {}

impl FromStr for Priority {
    type Err = ParsePriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| ParsePriorityError(s.to_string()))
    }
}

/// What the user sends along with a workflow for review.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubmissionRequest {
    /// Free-form notes for the reviewer. May be empty.
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub priority: Priority,
}

impl SubmissionRequest {
    #[must_use]
    pub fn new(notes: impl Into<String>, priority: Priority) -> Self {
        Self {
            notes: notes.into(),
            priority,
        }
    }
}

/// A workflow as held by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredWorkflow {
    pub id: WorkflowId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: WorkflowStatus,
    /// Named as in the persistence contract, unlike the camelCase fields.
    #[serde(default, rename = "canvas_state")]
    pub canvas_state: CanvasState,
    pub updated_at: DateTime<Utc>,
}

impl StoredWorkflow {
    /// Creates an empty draft.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(WorkflowId::new(), name)
    }

    /// Creates an empty draft with a specific id.
    #[must_use]
    pub fn with_id(id: WorkflowId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            status: WorkflowStatus::Draft,
            canvas_state: CanvasState::default(),
            updated_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Bumps the update timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
