//! Typed errors for the polling core.
//!
//! `PollError` is the single closed set of failure kinds shared by the store
//! and the domain operations. HTTP handlers pick the status and the
//! client-facing message per operation.

use serde::Serialize;
use thiserror::Error;

/// One failed field check, rendered as `"<field path> is <reason>"`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldIssue {
    pub message: String,
}

impl FieldIssue {
    pub fn new(path: &str, reason: &str) -> Self {
        Self {
            message: format!("{} is {}", path, reason),
        }
    }
}

/// Serialize issues as a JSON array string: `[{"message":"body.question is Required"}]`.
pub fn render_issues(issues: &[FieldIssue]) -> String {
    serde_json::to_string(issues).unwrap_or_else(|_| "[]".to_string())
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("{}", render_issues(.0))]
    Validation(Vec<FieldIssue>),

    #[error("Poll {id} not found")]
    NotFound { id: String },

    #[error("Item {id} conflicts with the stored item")]
    Conflict { id: String },

    #[error("Persistence error: {0}")]
    Persistence(#[source] anyhow::Error),

    #[error("{0} used before initialization")]
    Uninitialized(&'static str),
}

impl PollError {
    pub fn invalid(path: &str, reason: &str) -> Self {
        PollError::Validation(vec![FieldIssue::new(path, reason)])
    }

    pub fn persistence(err: impl Into<anyhow::Error>) -> Self {
        PollError::Persistence(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_issue_message_format() {
        let issue = FieldIssue::new("body.options", "At least two options are required");
        assert_eq!(issue.message, "body.options is At least two options are required");
    }

    #[test]
    fn validation_error_renders_json_array() {
        let err = PollError::Validation(vec![
            FieldIssue::new("body.question", "Required"),
            FieldIssue::new("body.createdBy", "empty"),
        ]);
        assert_eq!(
            err.to_string(),
            r#"[{"message":"body.question is Required"},{"message":"body.createdBy is empty"}]"#
        );
    }

    #[test]
    fn not_found_carries_id() {
        let err = PollError::NotFound { id: "abc".into() };
        match &err {
            PollError::NotFound { id } => assert_eq!(id, "abc"),
            _ => panic!("Expected NotFound"),
        }
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn persistence_keeps_source() {
        use std::error::Error as _;
        let err = PollError::persistence(anyhow::anyhow!("table unreachable"));
        assert!(err.source().is_some());
        assert!(err.to_string().contains("table unreachable"));
    }

    #[test]
    fn poll_error_implements_std_error() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&PollError::Uninitialized("store"));
    }
}
