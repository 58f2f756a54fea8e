//! # Switchboard A2A - Agent2Agent Protocol Client
//!
//! Protocol types and an HTTP client for talking to agents that speak the
//! A2A (Agent2Agent) protocol.
//!
//! ## Features
//!
//! - **Core Types**: AgentCard, Message, Part, Task and the JSON-RPC envelope
//! - **A2A Client**: Discover an agent and send it a message (requires the
//!   `client` feature, on by default)
//!
//! ## Protocol Overview
//!
//! 1. **Agent Card**: A JSON document at a well-known path describing an
//!    agent's name, skills and capabilities
//! 2. **message/send**: A JSON-RPC call carrying a user message
//! 3. **Result**: Either a task (with status, history and artifacts) or a
//!    direct message reply
//!
//! ## Example: Reading a reply
//!
//! ```rust
//! use switchboard_a2a::{Message, Task, TaskState};
//!
//! let mut task = Task::new("task-001", TaskState::Completed);
//! task.add_message(Message::user("What is 2+2?"));
//! task.add_message(Message::agent("4"));
//!
//! assert!(task.is_terminal());
//! assert_eq!(task.reply_text().as_deref(), Some("4"));
//! ```

pub mod error;
pub mod types;

#[cfg(feature = "client")]
pub mod client;

pub use error::{A2aError, A2aResult, ErrorResponse};
pub use types::{
    AgentCapabilities, AgentCard, AgentProvider, AgentSkill, Artifact, DataPart, FileContent,
    FilePart, JsonRpcRequest, JsonRpcResponse, Message, MessageSendConfiguration,
    MessageSendParams, Part, Role, SendMessageResult, Task, TaskState, TaskStatus, TextPart,
};

#[cfg(feature = "client")]
pub use client::A2aClient;
