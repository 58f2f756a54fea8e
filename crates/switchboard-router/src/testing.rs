//! In-memory transport for tests and offline demos.
//!
//! ```rust
//! use switchboard_router::testing::{MockReply, MockTransport};
//!
//! let transport = MockTransport::new()
//!     .with_agent("http://calc", "Calculator", MockReply::text("4"))
//!     .with_unreachable("http://down");
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::TransportError;
use crate::transport::{AgentTransport, CapabilityDescriptor, SkillInfo};

/// How a mock agent answers queries.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Always answer with this text
    Text(String),
    /// Answer with this prefix followed by the query
    Echo(String),
    /// Fail with this error
    Fail(TransportError),
    /// Wait, then answer as the inner reply
    Delayed(Duration, Box<MockReply>),
}

impl MockReply {
    /// Fixed text reply.
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }

    /// Echo reply with a prefix.
    pub fn echo(prefix: impl Into<String>) -> Self {
        MockReply::Echo(prefix.into())
    }

    /// Remote failure.
    pub fn remote_error(endpoint: &str, message: impl Into<String>) -> Self {
        MockReply::Fail(TransportError::remote(endpoint, message))
    }

    /// Delay the reply.
    pub fn delayed(self, delay: Duration) -> Self {
        MockReply::Delayed(delay, Box::new(self))
    }
}

#[derive(Debug, Clone)]
struct MockAgent {
    descriptor: Option<CapabilityDescriptor>,
    reply: MockReply,
}

/// A scripted [`AgentTransport`].
///
/// Endpoints without a registered agent are unreachable. Every query sent
/// is recorded and available through [`MockTransport::calls`].
#[derive(Debug, Default)]
pub struct MockTransport {
    agents: Mutex<HashMap<String, MockAgent>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockTransport {
    /// Create a transport with no agents.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an agent with a one-skill descriptor.
    pub fn with_agent(self, endpoint: &str, name: &str, reply: MockReply) -> Self {
        let descriptor = CapabilityDescriptor {
            name: name.to_string(),
            description: format!("{name} (mock)"),
            skills: vec![SkillInfo {
                name: name.to_string(),
                tags: Vec::new(),
                examples: Vec::new(),
            }],
            supports_streaming: false,
            supports_push_notifications: false,
        };
        self.with_descriptor(endpoint, descriptor, reply)
    }

    /// Add an agent with a full descriptor.
    pub fn with_descriptor(
        self,
        endpoint: &str,
        descriptor: CapabilityDescriptor,
        reply: MockReply,
    ) -> Self {
        self.set_agent(endpoint, Some(descriptor), reply);
        self
    }

    /// Add an endpoint whose descriptor fetch and queries fail as unreachable.
    pub fn with_unreachable(self, endpoint: &str) -> Self {
        self.set_reply(
            endpoint,
            MockReply::Fail(TransportError::unreachable(endpoint, "connection refused")),
        );
        self
    }

    /// Replace how the agent at `endpoint` answers queries.
    pub fn set_reply(&self, endpoint: &str, reply: MockReply) {
        let mut agents = self.lock_agents();
        match agents.get_mut(endpoint) {
            Some(agent) => agent.reply = reply,
            None => {
                agents.insert(
                    endpoint.to_string(),
                    MockAgent {
                        descriptor: None,
                        reply,
                    },
                );
            }
        }
    }

    /// Make an endpoint stop answering entirely.
    pub fn take_offline(&self, endpoint: &str) {
        self.lock_agents().remove(endpoint);
    }

    /// Queries sent so far, as `(endpoint, query)` pairs.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .map(|c| c.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn set_agent(&self, endpoint: &str, descriptor: Option<CapabilityDescriptor>, reply: MockReply) {
        self.lock_agents()
            .insert(endpoint.to_string(), MockAgent { descriptor, reply });
    }

    fn lock_agents(&self) -> std::sync::MutexGuard<'_, HashMap<String, MockAgent>> {
        self.agents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn agent(&self, endpoint: &str) -> Option<MockAgent> {
        self.lock_agents().get(endpoint).cloned()
    }
}

#[async_trait]
impl AgentTransport for MockTransport {
    async fn fetch_descriptor(
        &self,
        endpoint: &str,
    ) -> Result<CapabilityDescriptor, TransportError> {
        match self.agent(endpoint) {
            Some(MockAgent {
                descriptor: Some(descriptor),
                ..
            }) => Ok(descriptor),
            Some(MockAgent {
                reply: MockReply::Fail(err),
                ..
            }) => Err(err),
            _ => Err(TransportError::unreachable(endpoint, "connection refused")),
        }
    }

    async fn send_query(&self, endpoint: &str, query: &str) -> Result<String, TransportError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((endpoint.to_string(), query.to_string()));
        }

        let Some(agent) = self.agent(endpoint) else {
            return Err(TransportError::unreachable(endpoint, "connection refused"));
        };

        let mut reply = agent.reply;
        loop {
            match reply {
                MockReply::Text(text) => return Ok(text),
                MockReply::Echo(prefix) => return Ok(format!("{prefix}{query}")),
                MockReply::Fail(err) => return Err(err),
                MockReply::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
            }
        }
    }
}
