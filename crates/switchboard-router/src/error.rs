//! Error types for routing, discovery and workflow execution.

use thiserror::Error;

use crate::config::ConfigError;

/// Failure of a single call to a remote agent.
///
/// These never abort a workflow or a coordination run; they are recorded
/// next to the step or sub-query that caused them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Nothing answered at the endpoint.
    #[error("Agent unreachable at {endpoint}: {message}")]
    Unreachable { endpoint: String, message: String },

    /// The call did not finish within the call timeout.
    #[error("Call to {endpoint} timed out after {timeout_ms}ms")]
    Timeout { endpoint: String, timeout_ms: u64 },

    /// The agent answered but reported a failure.
    #[error("Agent at {endpoint} reported an error: {message}")]
    RemoteError { endpoint: String, message: String },

    /// The capability descriptor could not be used.
    #[error("Malformed capability descriptor from {endpoint}: {reason}")]
    MalformedDescriptor { endpoint: String, reason: String },
}

impl TransportError {
    /// Create an unreachable error.
    pub fn unreachable(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unreachable {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a remote error.
    pub fn remote(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteError {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a malformed descriptor error.
    pub fn malformed(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedDescriptor {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Endpoint the failed call was made to.
    pub fn endpoint(&self) -> &str {
        match self {
            TransportError::Unreachable { endpoint, .. }
            | TransportError::Timeout { endpoint, .. }
            | TransportError::RemoteError { endpoint, .. }
            | TransportError::MalformedDescriptor { endpoint, .. } => endpoint,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Unreachable { .. } | TransportError::Timeout { .. }
        )
    }
}

/// Errors surfaced to callers of the router, workflow engine and coordinator.
#[derive(Debug, Error)]
pub enum RouterError {
    /// A candidate endpoint could not be described. Appears inside
    /// discovery reports rather than failing discovery as a whole.
    #[error("Discovery failed for {endpoint}: {source}")]
    Discovery {
        endpoint: String,
        source: TransportError,
    },

    /// No agent is available to take the query.
    #[error("No capable agent: {0}")]
    NoCapableAgent(String),

    /// A call to a routed agent failed.
    #[error("Call to agent '{agent}' failed: {source}")]
    RemoteCall {
        agent: String,
        source: TransportError,
    },

    /// The workflow name is not registered.
    #[error("Unknown workflow: {0}")]
    UnknownWorkflow(String),

    /// The workflow definition cannot be registered.
    #[error("Invalid workflow '{name}': {reason}")]
    InvalidWorkflow { name: String, reason: String },

    /// Discovery was asked to probe nothing.
    #[error("Discovery needs at least one candidate endpoint")]
    EmptyCandidates,

    /// Configuration could not be loaded or validated.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The transport could not be set up.
    #[error("Transport setup failed: {0}")]
    TransportSetup(String),
}

impl RouterError {
    /// Create an invalid workflow error.
    pub fn invalid_workflow(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidWorkflow {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            RouterError::Discovery { source, .. } | RouterError::RemoteCall { source, .. } => {
                source.is_retryable()
            }
            _ => false,
        }
    }

    /// Get the error code suitable for logging or reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            RouterError::Discovery { .. } => "DISCOVERY_FAILED",
            RouterError::NoCapableAgent(_) => "NO_CAPABLE_AGENT",
            RouterError::RemoteCall { .. } => "REMOTE_CALL_FAILED",
            RouterError::UnknownWorkflow(_) => "UNKNOWN_WORKFLOW",
            RouterError::InvalidWorkflow { .. } => "INVALID_WORKFLOW",
            RouterError::EmptyCandidates => "EMPTY_CANDIDATES",
            RouterError::Config(_) => "CONFIG_ERROR",
            RouterError::TransportSetup(_) => "TRANSPORT_SETUP_FAILED",
        }
    }
}

/// Result type for router operations.
pub type RouterResult<T> = Result<T, RouterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RouterError::UnknownWorkflow("nightly".to_string());
        assert_eq!(err.to_string(), "Unknown workflow: nightly");

        let err = RouterError::RemoteCall {
            agent: "Calculator".to_string(),
            source: TransportError::Timeout {
                endpoint: "http://localhost:8002".to_string(),
                timeout_ms: 1500,
            },
        };
        assert_eq!(
            err.to_string(),
            "Call to agent 'Calculator' failed: Call to http://localhost:8002 timed out after 1500ms"
        );
    }

    #[test]
    fn test_is_retryable() {
        assert!(TransportError::unreachable("http://x", "refused").is_retryable());
        assert!(!TransportError::remote("http://x", "task failed").is_retryable());
        assert!(!RouterError::EmptyCandidates.is_retryable());
        assert!(
            RouterError::Discovery {
                endpoint: "http://x".to_string(),
                source: TransportError::unreachable("http://x", "refused"),
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_error_code() {
        assert_eq!(
            RouterError::NoCapableAgent("empty store".to_string()).error_code(),
            "NO_CAPABLE_AGENT"
        );
        assert_eq!(
            RouterError::invalid_workflow("w", "no steps").error_code(),
            "INVALID_WORKFLOW"
        );
    }

    #[test]
    fn test_transport_endpoint() {
        let err = TransportError::malformed("http://localhost:8001", "empty name");
        assert_eq!(err.endpoint(), "http://localhost:8001");
    }
}
