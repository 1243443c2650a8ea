//! Error types for the gitscribe domain.
//!
//! One `thiserror` enum per bounded context: providers, tools and the
//! conversation history. Repository and config errors live in their crates.

use thiserror::Error;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

/// Violations of the append-only history contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("Tool results appended without a preceding model message that requested tools")]
    NoPendingToolCalls,

    #[error("Tool result for unknown call id '{0}'")]
    UnknownCallId(String),

    #[error("Tool result for call id '{0}' was already recorded")]
    DuplicateCallId(String),

    #[error("Expected a {expected} message, got {actual}")]
    UnexpectedRole {
        expected: &'static str,
        actual: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        };
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = ToolError::ExecutionFailed {
            tool_name: "write_file".into(),
            reason: "connection reset".into(),
        };
        assert!(err.to_string().contains("write_file"));
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn history_error_names_call_id() {
        let err = HistoryError::UnknownCallId("call_9".into());
        assert!(err.to_string().contains("call_9"));
    }
}
