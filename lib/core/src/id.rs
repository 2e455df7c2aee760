//! Strongly-typed ID types for domain entities.
//!
//! Record-level IDs use ULID format and display with a short type prefix
//! (`wf_01H...`). Node and edge ids inside a canvas are opaque strings and
//! live in the workflow crate instead.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

fn parse_prefixed(s: &str, prefix: &str, id_type: &'static str) -> Result<Ulid, ParseIdError> {
    let body = s
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('_'))
        .unwrap_or(s);
    Ulid::from_str(body).map_err(|e| ParseIdError {
        id_type,
        reason: e.to_string(),
    })
}

/// Declares a record id: a ULID that displays as `<prefix>_<ulid>` and
/// serializes as the bare ULID.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Display prefix, without the separating underscore.
            pub const PREFIX: &'static str = $prefix;

            /// Generates a fresh id.
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
            }

            #[must_use]
            pub const fn ulid(self) -> Ulid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", Self::PREFIX, self.0)
            }
        }

        // Accepts both `<prefix>_<ulid>` and a bare ULID.
        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_prefixed(s, Self::PREFIX, stringify!($name)).map(Self)
            }
        }
    };
}

define_id!(
    /// Unique identifier for a stored workflow record.
    WorkflowId,
    "wf"
);

define_id!(
    /// Identifier the approval pipeline assigns to a submission.
    SubmissionId,
    "sub"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_id_display_format() {
        let id = WorkflowId::new();
        assert!(id.to_string().starts_with("wf_"));
    }

    #[test]
    fn submission_id_display_format() {
        let id = SubmissionId::new();
        assert!(id.to_string().starts_with("sub_"));
    }

    #[test]
    fn parse_with_prefix() {
        let id = WorkflowId::new();
        let parsed: WorkflowId = id.to_string().parse().expect("should parse");
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_without_prefix() {
        let ulid = Ulid::new();
        let id: WorkflowId = ulid.to_string().parse().expect("should parse");
        assert_eq!(id.ulid(), ulid);
    }

    #[test]
    fn parse_rejects_foreign_prefix() {
        let submission = SubmissionId::new();
        let result: Result<WorkflowId, _> = submission.to_string().parse();
        let err = result.unwrap_err();
        assert_eq!(err.id_type, "WorkflowId");
    }

    #[test]
    fn ids_are_usable_as_map_keys() {
        use std::collections::HashSet;

        let first = WorkflowId::new();
        let second = WorkflowId::new();

        let mut set = HashSet::new();
        set.insert(first);
        set.insert(second);
        set.insert(first);

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn id_serializes_as_bare_ulid() {
        let id = WorkflowId::new();
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, format!("\"{}\"", id.ulid()));
        let parsed: WorkflowId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(id, parsed);
    }
}
