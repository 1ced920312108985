//! # Error Taxonomy
//!
//! Typed failures shared by the gateway, runtime, stores and orchestrator.
//! Retries are scoped to the gateway and the search adapter; everything else
//! bubbles to the orchestrator, which turns it into a failed Workflow Run.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used across the core crate
pub type TeamflowResult<T> = Result<T, TeamflowError>;

/// Core error type for all teamflow failures
#[derive(Debug, Clone, Error)]
pub enum TeamflowError {
    /// Malformed query, unknown workflow kind, invalid coordinates
    #[error("invalid input: {0}")]
    InputInvalid(String),

    /// Retryable upstream failure (LLM or web search)
    #[error("transient upstream failure: {0}")]
    TransientUpstream(String),

    /// Upstream rejected the request; never retried
    #[error("permanent upstream failure: {0}")]
    PermanentUpstream(String),

    /// Per-request, per-task or per-team time budget exceeded
    #[error("timed out: {operation}")]
    Timeout { operation: String },

    /// The caller-supplied outer deadline expired
    #[error("deadline exceeded while running {operation}")]
    DeadlineExceeded { operation: String },

    /// Memory store or output archive I/O failed
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Programmer error, e.g. a task referencing an undeclared upstream
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

/// Stable classification of a [`TeamflowError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InputInvalid,
    TransientUpstream,
    PermanentUpstream,
    Timeout,
    DeadlineExceeded,
    StorageUnavailable,
    InternalInvariant,
}

impl ErrorKind {
    /// Upper-case code shown in status lines
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::InputInvalid => "INPUT_INVALID",
            ErrorKind::TransientUpstream => "TRANSIENT_UPSTREAM",
            ErrorKind::PermanentUpstream => "PERMANENT_UPSTREAM",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::DeadlineExceeded => "DEADLINE_EXCEEDED",
            ErrorKind::StorageUnavailable => "STORAGE_UNAVAILABLE",
            ErrorKind::InternalInvariant => "INTERNAL_INVARIANT",
        }
    }
}

impl TeamflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TeamflowError::InputInvalid(_) => ErrorKind::InputInvalid,
            TeamflowError::TransientUpstream(_) => ErrorKind::TransientUpstream,
            TeamflowError::PermanentUpstream(_) => ErrorKind::PermanentUpstream,
            TeamflowError::Timeout { .. } => ErrorKind::Timeout,
            TeamflowError::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
            TeamflowError::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
            TeamflowError::InternalInvariant(_) => ErrorKind::InternalInvariant,
        }
    }

    /// Whether the gateway/adapter may retry this failure
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TeamflowError::TransientUpstream(_) | TeamflowError::Timeout { .. }
        )
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        TeamflowError::Timeout {
            operation: operation.into(),
        }
    }

    pub fn deadline(operation: impl Into<String>) -> Self {
        TeamflowError::DeadlineExceeded {
            operation: operation.into(),
        }
    }

    /// Wrap a storage-layer failure (anyhow chains are flattened)
    pub fn storage(err: impl std::fmt::Display) -> Self {
        TeamflowError::StorageUnavailable(format!("{:#}", err))
    }
}

impl From<anyhow::Error> for TeamflowError {
    fn from(err: anyhow::Error) -> Self {
        TeamflowError::StorageUnavailable(format!("{:#}", err))
    }
}

impl From<std::io::Error> for TeamflowError {
    fn from(err: std::io::Error) -> Self {
        TeamflowError::StorageUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(TeamflowError::TransientUpstream("503".into()).is_retryable());
        assert!(TeamflowError::timeout("llm call").is_retryable());
        assert!(!TeamflowError::PermanentUpstream("401".into()).is_retryable());
        assert!(!TeamflowError::deadline("team").is_retryable());
        assert!(!TeamflowError::InternalInvariant("dag".into()).is_retryable());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(TeamflowError::timeout("x").kind().code(), "TIMEOUT");
        assert_eq!(
            TeamflowError::storage("disk full").kind(),
            ErrorKind::StorageUnavailable
        );
    }

    #[test]
    fn test_anyhow_conversion_keeps_context() {
        let err = anyhow::anyhow!("locked").context("Failed to insert memory");
        let converted: TeamflowError = err.into();
        let message = converted.to_string();
        assert!(message.contains("Failed to insert memory"));
        assert!(message.contains("locked"));
    }
}
