//! A2A Protocol Error Types
//!
//! This module defines error types for the A2A protocol client.

use thiserror::Error;

/// Result type for A2A operations
pub type A2aResult<T> = Result<T, A2aError>;

/// Errors that can occur in A2A protocol operations
#[derive(Debug, Error)]
pub enum A2aError {
    /// Agent not found at the given endpoint
    #[error("Agent not found: {endpoint}")]
    AgentNotFound { endpoint: String },

    /// Agent card could not be parsed or is incomplete
    #[error("Invalid agent card: {reason}")]
    InvalidAgentCard { reason: String },

    /// Message validation failed
    #[error("Invalid message: {reason}")]
    InvalidMessage { reason: String },

    /// Authentication required
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Authorization failed
    #[error("Not authorized: {reason}")]
    NotAuthorized { reason: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded: retry after {retry_after_seconds} seconds")]
    RateLimitExceeded { retry_after_seconds: u64 },

    /// Connection error
    #[error("Connection error: {message}")]
    ConnectionError { message: String },

    /// Request timeout
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Protocol error
    #[error("Protocol error: {message}")]
    ProtocolError { message: String },

    /// Error object returned by the agent in a JSON-RPC response
    #[error("JSON-RPC error {code}: {message}")]
    RpcError { code: i64, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    /// Internal error on the agent side
    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl A2aError {
    /// Create an agent not found error
    pub fn agent_not_found(endpoint: impl Into<String>) -> Self {
        Self::AgentNotFound {
            endpoint: endpoint.into(),
        }
    }

    /// Create an invalid agent card error
    pub fn invalid_agent_card(reason: impl Into<String>) -> Self {
        Self::InvalidAgentCard {
            reason: reason.into(),
        }
    }

    /// Create an invalid message error
    pub fn invalid_message(reason: impl Into<String>) -> Self {
        Self::InvalidMessage {
            reason: reason.into(),
        }
    }

    /// Create a connection error
    pub fn connection_error(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol_error(message: impl Into<String>) -> Self {
        Self::ProtocolError {
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            A2aError::ConnectionError { .. }
                | A2aError::Timeout { .. }
                | A2aError::RateLimitExceeded { .. }
        )
    }

    /// Check if the endpoint could not be reached at all
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            A2aError::ConnectionError { .. } | A2aError::AgentNotFound { .. }
        )
    }
}

/// JSON-RPC error object carried in a failed response
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Error code
    pub code: i64,
    /// Error message
    pub message: String,
    /// Additional error data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl From<ErrorResponse> for A2aError {
    fn from(err: ErrorResponse) -> Self {
        A2aError::RpcError {
            code: err.code,
            message: err.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = A2aError::agent_not_found("http://localhost:8002");
        assert!(matches!(err, A2aError::AgentNotFound { .. }));
        assert_eq!(err.to_string(), "Agent not found: http://localhost:8002");
    }

    #[test]
    fn test_error_retryable() {
        let connection_err = A2aError::connection_error("connection refused");
        assert!(connection_err.is_retryable());
        assert!(connection_err.is_unreachable());

        let invalid = A2aError::invalid_agent_card("missing name");
        assert!(!invalid.is_retryable());
        assert!(!invalid.is_unreachable());
    }

    #[test]
    fn test_rpc_error_conversion() {
        let err: A2aError = ErrorResponse::new(-32601, "Method not found").into();
        assert_eq!(err.to_string(), "JSON-RPC error -32601: Method not found");
    }
}
