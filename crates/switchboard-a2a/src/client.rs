//! A2A Protocol Client
//!
//! HTTP client for the two calls a router needs from an A2A agent: fetching
//! its agent card and sending it a single message.
//!
//! # Overview
//!
//! - **Agent Discovery**: `GET /.well-known/agent-card.json`, retried at the
//!   legacy `/.well-known/agent.json` path when the first answers 404
//! - **Message Sending**: JSON-RPC 2.0 `message/send` POSTed to the agent's
//!   endpoint URL
//!
//! # Timeouts
//!
//! Every request carries the client's timeout (30 seconds unless changed
//! with [`A2aClient::with_timeout`]). An elapsed timeout surfaces as
//! [`A2aError::Timeout`].
//!
//! The client does **not** retry. Callers decide based on
//! [`A2aError::is_retryable`].
//!
//! # Error Handling
//!
//! | Status | Error Type |
//! |--------|------------|
//! | 400 | `InvalidMessage` |
//! | 401 | `AuthenticationRequired` |
//! | 403 | `NotAuthorized` |
//! | 404 | `AgentNotFound` |
//! | 429 | `RateLimitExceeded` |
//! | 500 | `InternalError` |
//! | other | `ProtocolError` |
//!
//! # Example
//!
//! ```rust,ignore
//! use switchboard_a2a::client::A2aClient;
//!
//! let client = A2aClient::new("http://localhost:8002")?;
//! let card = client.get_agent_card().await?;
//! let reply = client.send_message("calculate sqrt(16)").await?;
//! println!("{}: {:?}", card.name, reply.reply_text());
//! ```

use crate::error::{A2aError, A2aResult};
use crate::types::{
    AgentCard, JsonRpcRequest, JsonRpcResponse, METHOD_MESSAGE_SEND, Message, MessageSendParams,
    SendMessageResult,
};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Default timeout for HTTP requests
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Well-known path of the agent card
pub const AGENT_CARD_PATH: &str = "/.well-known/agent-card.json";

/// Path used by agents implementing older protocol revisions
pub const LEGACY_AGENT_CARD_PATH: &str = "/.well-known/agent.json";

/// A2A protocol client for one remote agent
#[derive(Clone)]
pub struct A2aClient {
    /// Base URL of the A2A agent
    base_url: Url,
    /// HTTP client
    http: Client,
    /// Per-request timeout
    timeout: Duration,
}

impl std::fmt::Debug for A2aClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("A2aClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl A2aClient {
    /// Create a new A2A client for the given agent URL
    pub fn new(base_url: impl AsRef<str>) -> A2aResult<Self> {
        let http = Client::builder()
            .user_agent(format!("switchboard-a2a/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                A2aError::connection_error(format!("Failed to create HTTP client: {}", e))
            })?;

        Self::with_http_client(base_url, http)
    }

    /// Create a new A2A client sharing an existing HTTP client
    ///
    /// Sharing one `reqwest::Client` across agents reuses its connection pool.
    pub fn with_http_client(base_url: impl AsRef<str>, http: Client) -> A2aResult<Self> {
        let base_url = Url::parse(base_url.as_ref())?;

        Ok(Self {
            base_url,
            http,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build a URL for an endpoint
    fn endpoint(&self, path: &str) -> A2aResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| A2aError::protocol_error(format!("Invalid endpoint path: {}", e)))
    }

    fn transport_error(&self, context: &str, err: reqwest::Error) -> A2aError {
        if err.is_timeout() {
            A2aError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            A2aError::connection_error(format!("{}: {}", context, err))
        }
    }

    // =========================================================================
    // Agent Discovery
    // =========================================================================

    /// Fetch the agent card from the well-known endpoint
    ///
    /// Falls back to the legacy path when the current one is not served.
    /// The returned card has passed [`AgentCard::validate`].
    pub async fn get_agent_card(&self) -> A2aResult<AgentCard> {
        let card = match self.fetch_card(AGENT_CARD_PATH).await {
            Err(A2aError::AgentNotFound { .. }) => {
                debug!(
                    base_url = %self.base_url,
                    "Agent card not found, trying legacy path"
                );
                self.fetch_card(LEGACY_AGENT_CARD_PATH).await?
            }
            other => other?,
        };

        card.validate().map_err(A2aError::invalid_agent_card)?;

        info!(
            name = %card.name,
            skills = card.skills.len(),
            "Fetched agent card"
        );

        Ok(card)
    }

    async fn fetch_card(&self, path: &str) -> A2aResult<AgentCard> {
        let url = self.endpoint(path)?;

        debug!(url = %url, "Fetching agent card");

        let response = self
            .http
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error("Failed to fetch agent card", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.handle_error_response(status, response).await);
        }

        response
            .json()
            .await
            .map_err(|e| A2aError::invalid_agent_card(format!("Failed to parse agent card: {}", e)))
    }

    // =========================================================================
    // Messaging
    // =========================================================================

    /// Send a text message to the agent
    pub async fn send_message(&self, text: impl Into<String>) -> A2aResult<SendMessageResult> {
        self.send(Message::user(text)).await
    }

    /// Send a message with `message/send` and return the agent's result
    pub async fn send(&self, message: Message) -> A2aResult<SendMessageResult> {
        if message.parts.is_empty() {
            return Err(A2aError::invalid_message("message has no parts"));
        }

        let url = self.base_url.clone();
        let request_body =
            JsonRpcRequest::new(METHOD_MESSAGE_SEND, MessageSendParams::new(message).blocking());

        debug!(url = %url, request_id = %request_body.id, "Sending message to agent");

        let response = self
            .http
            .post(url)
            .timeout(self.timeout)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| self.transport_error("Failed to send message", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.handle_error_response(status, response).await);
        }

        let rpc: JsonRpcResponse<SendMessageResult> = response
            .json()
            .await
            .map_err(|e| A2aError::protocol_error(format!("Failed to parse response: {}", e)))?;

        if let Some(error) = rpc.error {
            return Err(error.into());
        }

        let result = rpc
            .result
            .ok_or_else(|| A2aError::protocol_error("Response has neither result nor error"))?;

        match &result {
            SendMessageResult::Task(task) => debug!(
                task_id = %task.id,
                state = %task.state(),
                "Message sent successfully"
            ),
            SendMessageResult::Message(message) => debug!(
                message_id = %message.message_id,
                "Agent replied with a message"
            ),
        }

        Ok(result)
    }

    /// Handle error responses from the agent
    async fn handle_error_response(
        &self,
        status: StatusCode,
        response: reqwest::Response,
    ) -> A2aError {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let error_text = response.text().await.unwrap_or_default();

        match status {
            StatusCode::NOT_FOUND => A2aError::agent_not_found(self.base_url.as_str()),
            StatusCode::UNAUTHORIZED => A2aError::AuthenticationRequired,
            StatusCode::FORBIDDEN => A2aError::NotAuthorized { reason: error_text },
            StatusCode::TOO_MANY_REQUESTS => A2aError::RateLimitExceeded {
                retry_after_seconds: retry_after.unwrap_or(60),
            },
            StatusCode::BAD_REQUEST => A2aError::InvalidMessage { reason: error_text },
            StatusCode::INTERNAL_SERVER_ERROR => A2aError::InternalError {
                message: error_text,
            },
            StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT => {
                A2aError::connection_error(format!("HTTP {}: {}", status, error_text))
            }
            _ => A2aError::protocol_error(format!("HTTP {}: {}", status, error_text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = A2aClient::new("http://localhost:8002").unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:8002/");
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_with_timeout() {
        let client = A2aClient::new("http://localhost:8002")
            .unwrap()
            .with_timeout(Duration::from_secs(5));
        assert_eq!(client.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_endpoint_building() {
        let client = A2aClient::new("http://localhost:8001").unwrap();

        let url = client.endpoint(AGENT_CARD_PATH).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8001/.well-known/agent-card.json"
        );

        let url = client.endpoint(LEGACY_AGENT_CARD_PATH).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8001/.well-known/agent.json");
    }

    #[test]
    fn test_invalid_url() {
        let result = A2aClient::new("not a valid url");
        assert!(matches!(result, Err(A2aError::UrlError(_))));
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let client = A2aClient::new("http://localhost:9").unwrap();
        let mut message = Message::user("x");
        message.parts.clear();

        let err = client.send(message).await.unwrap_err();
        assert!(matches!(err, A2aError::InvalidMessage { .. }));
    }
}
