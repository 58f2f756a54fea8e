//! [`AgentTransport`] over the A2A protocol.
//!
//! Descriptors are the agents' A2A cards and queries go out as
//! `message/send` calls. One `reqwest::Client` is shared by every agent so
//! connections are pooled.

use async_trait::async_trait;
use std::time::Duration;
use switchboard_a2a::{
    A2aClient, A2aError, A2aResult, AgentCard, SendMessageResult, TaskState,
};
use tracing::debug;

use crate::error::TransportError;
use crate::transport::{AgentTransport, CapabilityDescriptor, SkillInfo};

/// Talks to agents over HTTP using the A2A protocol.
#[derive(Debug, Clone)]
pub struct A2aTransport {
    http: reqwest::Client,
    timeout: Duration,
}

impl A2aTransport {
    /// Create a transport whose HTTP requests give up after `timeout`.
    pub fn new(timeout: Duration) -> A2aResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("switchboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                A2aError::connection_error(format!("Failed to create HTTP client: {}", e))
            })?;
        Ok(Self::with_http_client(http, timeout))
    }

    /// Create a transport reusing an existing HTTP client.
    pub fn with_http_client(http: reqwest::Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    fn client(&self, endpoint: &str) -> Result<A2aClient, TransportError> {
        A2aClient::with_http_client(endpoint, self.http.clone())
            .map(|client| client.with_timeout(self.timeout))
            .map_err(|e| to_transport_error(endpoint, e))
    }
}

#[async_trait]
impl AgentTransport for A2aTransport {
    async fn fetch_descriptor(
        &self,
        endpoint: &str,
    ) -> Result<CapabilityDescriptor, TransportError> {
        let card = self
            .client(endpoint)?
            .get_agent_card()
            .await
            .map_err(|e| to_transport_error(endpoint, e))?;
        debug!(endpoint = %endpoint, agent = %card.name, skills = card.skills.len(), "Fetched agent card");
        Ok(card_to_descriptor(card))
    }

    async fn send_query(&self, endpoint: &str, query: &str) -> Result<String, TransportError> {
        let result = self
            .client(endpoint)?
            .send_message(query)
            .await
            .map_err(|e| to_transport_error(endpoint, e))?;
        reply_to_text(endpoint, result)
    }
}

/// Capability descriptor carried by an agent card.
pub fn card_to_descriptor(card: AgentCard) -> CapabilityDescriptor {
    CapabilityDescriptor {
        name: card.name,
        description: card.description.unwrap_or_default(),
        skills: card
            .skills
            .into_iter()
            .map(|skill| SkillInfo {
                name: skill.name,
                tags: skill.tags,
                examples: skill.examples,
            })
            .collect(),
        supports_streaming: card.capabilities.streaming,
        supports_push_notifications: card.capabilities.push_notifications,
    }
}

/// Answer text of a `message/send` result.
///
/// Failed, canceled and rejected tasks are errors. A completed task with no
/// text answers with an empty string; an unfinished one is an error.
pub fn reply_to_text(endpoint: &str, result: SendMessageResult) -> Result<String, TransportError> {
    let task = match result {
        SendMessageResult::Message(message) => return Ok(message.text()),
        SendMessageResult::Task(task) => task,
    };

    let state = task.state();
    let text = task.reply_text();
    if state.is_failure() {
        let detail = text.unwrap_or_else(|| "no details given".to_string());
        return Err(TransportError::remote(
            endpoint,
            format!("task {} {}: {}", task.id, state, detail),
        ));
    }

    match (text, state) {
        (Some(text), _) => Ok(text),
        (None, TaskState::Completed) => Ok(String::new()),
        (None, state) => Err(TransportError::remote(
            endpoint,
            format!("task {} ended in state {} without a reply", task.id, state),
        )),
    }
}

/// Fold an A2A error into the transport taxonomy.
pub fn to_transport_error(endpoint: &str, err: A2aError) -> TransportError {
    match err {
        A2aError::ConnectionError { message } => TransportError::unreachable(endpoint, message),
        A2aError::AgentNotFound { .. } => TransportError::unreachable(endpoint, err.to_string()),
        A2aError::UrlError(e) => TransportError::unreachable(endpoint, format!("invalid URL: {e}")),
        A2aError::Timeout { timeout_ms } => TransportError::Timeout {
            endpoint: endpoint.to_string(),
            timeout_ms,
        },
        A2aError::InvalidAgentCard { reason } => TransportError::malformed(endpoint, reason),
        other => TransportError::remote(endpoint, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_a2a::{AgentSkill, Artifact, Message, Task, TaskStatus};

    #[test]
    fn test_card_conversion() {
        let card = AgentCard::new("Calculator", "http://localhost:8002")
            .with_description("Does math")
            .with_streaming()
            .with_skill(AgentSkill::new("calc", "Arithmetic").with_tag("math"));
        let descriptor = card_to_descriptor(card);
        assert_eq!(descriptor.name, "Calculator");
        assert_eq!(descriptor.description, "Does math");
        assert!(descriptor.supports_streaming);
        assert_eq!(descriptor.skills[0].tags, vec!["math"]);
    }

    #[test]
    fn test_completed_task_text() {
        let mut task = Task::new("t-1", TaskState::Completed);
        task.add_message(Message::user("2+2"));
        task.add_message(Message::agent("4"));
        let text = reply_to_text("http://calc", SendMessageResult::Task(task)).unwrap();
        assert_eq!(text, "4");
    }

    #[test]
    fn test_completed_task_without_text() {
        let task = Task::new("t-2", TaskState::Completed);
        let text = reply_to_text("http://calc", SendMessageResult::Task(task)).unwrap();
        assert_eq!(text, "");
    }

    #[test]
    fn test_failed_task_is_remote_error() {
        let mut task = Task::new("t-3", TaskState::Failed);
        task.status = TaskStatus {
            message: Some(Message::agent("division by zero")),
            ..TaskStatus::new(TaskState::Failed)
        };
        let err = reply_to_text("http://calc", SendMessageResult::Task(task)).unwrap_err();
        assert!(matches!(err, TransportError::RemoteError { .. }));
        assert!(err.to_string().contains("division by zero"));
    }

    #[test]
    fn test_working_task_without_reply_is_error() {
        let task = Task::new("t-4", TaskState::Working);
        assert!(reply_to_text("http://calc", SendMessageResult::Task(task)).is_err());
    }

    #[test]
    fn test_input_required_with_text_succeeds() {
        let mut task = Task::new("t-5", TaskState::InputRequired);
        task.add_artifact(Artifact::text("a-1", "which unit?"));
        let text = reply_to_text("http://calc", SendMessageResult::Task(task)).unwrap();
        assert_eq!(text, "which unit?");
    }

    #[test]
    fn test_direct_message_reply() {
        let text = reply_to_text(
            "http://echo",
            SendMessageResult::Message(Message::agent("Echo: hi")),
        )
        .unwrap();
        assert_eq!(text, "Echo: hi");
    }

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            to_transport_error("http://x", A2aError::connection_error("refused")),
            TransportError::Unreachable { .. }
        ));
        assert!(matches!(
            to_transport_error("http://x", A2aError::Timeout { timeout_ms: 5 }),
            TransportError::Timeout { timeout_ms: 5, .. }
        ));
        assert!(matches!(
            to_transport_error("http://x", A2aError::invalid_agent_card("no name")),
            TransportError::MalformedDescriptor { .. }
        ));
        assert!(matches!(
            to_transport_error(
                "http://x",
                A2aError::RpcError {
                    code: -32601,
                    message: "nope".into()
                }
            ),
            TransportError::RemoteError { .. }
        ));
    }
}
