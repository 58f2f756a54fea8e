//! JSON-RPC envelope and `message/send` types for the A2A protocol.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::{Message, Task};
use crate::error::ErrorResponse;

/// JSON-RPC protocol version tag
pub const JSONRPC_VERSION: &str = "2.0";

/// Method name for sending a message
pub const METHOD_MESSAGE_SEND: &str = "message/send";

/// A JSON-RPC 2.0 request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest<P> {
    /// Always `"2.0"`
    pub jsonrpc: String,

    /// Request identifier echoed in the response
    pub id: String,

    /// Method name
    pub method: String,

    /// Method parameters
    pub params: P,
}

impl<P> JsonRpcRequest<P> {
    /// Create a request with a generated id
    pub fn new(method: impl Into<String>, params: P) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Uuid::new_v4().to_string(),
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 response carrying either a result or an error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse<R> {
    /// Always `"2.0"`
    pub jsonrpc: String,

    /// Identifier of the request this answers
    #[serde(default)]
    pub id: Option<serde_json::Value>,

    /// Result on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<R>,

    /// Error on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

/// Parameters of a `message/send` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSendParams {
    /// The message to send
    pub message: Message,

    /// Optional send configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<MessageSendConfiguration>,

    /// Additional metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl MessageSendParams {
    /// Wrap a message with no extra configuration
    pub fn new(message: Message) -> Self {
        Self {
            message,
            configuration: None,
            metadata: HashMap::new(),
        }
    }

    /// Ask the agent to answer synchronously
    pub fn blocking(mut self) -> Self {
        self.configuration
            .get_or_insert_with(MessageSendConfiguration::default)
            .blocking = Some(true);
        self
    }
}

/// Per-call configuration of `message/send`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSendConfiguration {
    /// Output modes the client accepts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accepted_output_modes: Vec<String>,

    /// Wait for the task to reach a terminal or interrupted state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocking: Option<bool>,

    /// Number of history messages to include in the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_length: Option<u32>,
}

/// Result of `message/send`: a task, or a direct message reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SendMessageResult {
    /// The agent created or updated a task
    Task(Task),

    /// The agent answered directly
    Message(Message),
}

impl SendMessageResult {
    /// Text of the agent's reply, if any
    pub fn reply_text(&self) -> Option<String> {
        match self {
            SendMessageResult::Task(task) => task.reply_text(),
            SendMessageResult::Message(message) => {
                Some(message.text()).filter(|t| !t.is_empty())
            }
        }
    }
}
