//! Result and error types for the core library

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Assistant error: {0}")]
    Assistant(String),

    #[error("Assistant request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Assistant request cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an assistant error
    pub fn assistant(msg: impl Into<String>) -> Self {
        Self::Assistant(msg.into())
    }

    /// Whether this failure came from the generative-text path
    ///
    /// These are transient and shown to the user as a notice; nothing in
    /// the feed changes.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Assistant(_) | Self::Timeout(_) | Self::Cancelled
        )
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Envelope for `--json` output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_result_ok() {
        let result: OperationResult<i32> = OperationResult::ok(42);
        assert!(result.success);
        assert_eq!(result.data, Some(42));
        assert!(result.error.is_none());
    }

    #[test]
    fn test_operation_result_fail() {
        let result: OperationResult<()> =
            OperationResult::fail(Error::validation("bad input").to_string());
        assert!(!result.success);
        assert!(result.data.is_none());
        assert_eq!(result.error.as_deref(), Some("Validation error: bad input"));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert!(json["data"].is_null());
    }

    #[test]
    fn test_transient_errors() {
        assert!(Error::Timeout(30).is_transient());
        assert!(Error::Cancelled.is_transient());
        assert!(Error::assistant("503").is_transient());
        assert!(!Error::storage("disk full").is_transient());
    }
}
