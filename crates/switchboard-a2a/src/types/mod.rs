//! A2A Protocol Core Types
//!
//! The subset of the Agent2Agent data model a client needs to discover an
//! agent and exchange a single message with it.
//!
//! ## Module Structure
//!
//! - [`agent_card`] - Agent capability discovery
//! - [`message`] - Message and role types
//! - [`part`] - Content part types (text, file, data)
//! - [`task`] - Task lifecycle, status and artifacts
//! - [`request`] - JSON-RPC envelope and `message/send` types

mod agent_card;
mod message;
mod part;
mod request;
mod task;

pub use agent_card::{AgentCapabilities, AgentCard, AgentProvider, AgentSkill};
pub use message::{Message, Role};
pub use part::{DataPart, FileContent, FilePart, Part, TextPart};
pub use request::{
    JSONRPC_VERSION, JsonRpcRequest, JsonRpcResponse, METHOD_MESSAGE_SEND,
    MessageSendConfiguration, MessageSendParams, SendMessageResult,
};
pub use task::{Artifact, Task, TaskState, TaskStatus};
