//! Message types for the A2A protocol.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::{Part, TextPart};

/// A message exchanged between a client and an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message identifier
    pub message_id: String,

    /// Role of the message sender
    pub role: Role,

    /// Content parts of the message
    pub parts: Vec<Part>,

    /// Task the message belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    /// Context grouping related tasks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,

    /// Additional metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Message {
    fn with_role(role: Role, text: impl Into<String>) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            role,
            parts: vec![Part::Text(TextPart {
                text: text.into(),
                metadata: HashMap::new(),
            })],
            task_id: None,
            context_id: None,
            metadata: HashMap::new(),
        }
    }

    /// Create a new user message with text content
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_role(Role::User, text)
    }

    /// Create a new agent message with text content
    pub fn agent(text: impl Into<String>) -> Self {
        Self::with_role(Role::Agent, text)
    }

    /// Add a part to the message
    pub fn with_part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Concatenated text of all text parts, newline separated
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message from a user (or client agent acting on behalf of a user)
    User,

    /// Message from an agent
    Agent,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Agent => write!(f, "agent"),
        }
    }
}
