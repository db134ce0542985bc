//! Gateway-specific error types.

use thiserror::Error;

/// Result type for gateway operations.
pub type ExecutionResult<T> = Result<T, ExecutionError>;

/// Errors that can occur while executing a compiled plan.
///
/// Every variant is recoverable from the engine's point of view: the caller
/// keeps its previous result and may retry on explicit user action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// The backend could not be reached.
    #[error("backend unreachable: {0}")]
    Network(String),

    /// The backend refused the session or the row-level policy denied access.
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// The backend rejected the query text or its parameters.
    #[error("query rejected: {message} (code: {code})")]
    Rejected {
        /// Error code from the backend.
        code: String,
        /// Error message from the backend.
        message: String,
    },

    /// The adapter could not express the plan in the backend's query form.
    #[error("cannot translate plan: {0}")]
    Untranslatable(String),

    /// The response could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The backend is temporarily unavailable.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl ExecutionError {
    /// Create a rejected-query error from a backend error response.
    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Check if retrying the same plan may succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Unavailable(_))
    }
}

impl From<serde_json::Error> for ExecutionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<std::io::Error> for ExecutionError {
    fn from(err: std::io::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}
