//! The transport boundary between the router and remote agents.
//!
//! The router never speaks a wire protocol itself. It asks an
//! [`AgentTransport`] for an agent's capability descriptor and for the text
//! answer to one query; the A2A implementation lives in [`crate::a2a`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::TransportError;

/// Capability metadata fetched from an agent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    /// Agent display name
    pub name: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Declared skills
    #[serde(default)]
    pub skills: Vec<SkillInfo>,
    /// Whether the agent streams responses
    #[serde(default)]
    pub supports_streaming: bool,
    /// Whether the agent can push notifications
    #[serde(default)]
    pub supports_push_notifications: bool,
}

/// One declared skill.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SkillInfo {
    /// Skill name
    pub name: String,
    /// Tags used as extra routing keywords
    #[serde(default)]
    pub tags: Vec<String>,
    /// Example prompts
    #[serde(default)]
    pub examples: Vec<String>,
}

/// Talks to remote agents.
///
/// Implementations report failures through [`TransportError`] and must not
/// panic on bad input from the remote side.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    /// Fetch the capability descriptor published at `endpoint`.
    async fn fetch_descriptor(&self, endpoint: &str)
    -> Result<CapabilityDescriptor, TransportError>;

    /// Send `query` to the agent at `endpoint` and return its text answer.
    async fn send_query(&self, endpoint: &str, query: &str) -> Result<String, TransportError>;
}

/// Run a transport call under `limit`, mapping an elapsed timer to
/// [`TransportError::Timeout`].
pub async fn with_timeout<T, F>(endpoint: &str, limit: Duration, call: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!(endpoint = %endpoint, timeout_ms = limit.as_millis() as u64, "Agent call timed out");
            Err(TransportError::Timeout {
                endpoint: endpoint.to_string(),
                timeout_ms: limit.as_millis() as u64,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_elapses() {
        let result: Result<(), _> = with_timeout("http://slow", Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;

        assert_eq!(
            result,
            Err(TransportError::Timeout {
                endpoint: "http://slow".to_string(),
                timeout_ms: 50,
            })
        );
    }

    #[tokio::test]
    async fn test_with_timeout_passes_result_through() {
        let ok = with_timeout("http://fast", Duration::from_secs(1), async {
            Ok::<_, TransportError>("42".to_string())
        })
        .await;
        assert_eq!(ok.as_deref(), Ok("42"));

        let err: Result<String, _> = with_timeout("http://fast", Duration::from_secs(1), async {
            Err(TransportError::remote("http://fast", "task failed"))
        })
        .await;
        assert!(matches!(err, Err(TransportError::RemoteError { .. })));
    }
}
