//! Task types for the A2A protocol.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Message, Part, Role};

/// A task represents a unit of work in the A2A protocol.
///
/// The agent owns the task lifecycle; a client only observes the state it
/// reports and reads the message history and artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier for the task
    pub id: String,

    /// Context ID grouping related tasks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,

    /// Current status of the task
    pub status: TaskStatus,

    /// Messages exchanged during the task
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Message>,

    /// Artifacts produced by the task
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,

    /// Additional metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Task {
    /// Create a new task in the given state
    pub fn new(id: impl Into<String>, state: TaskState) -> Self {
        Self {
            id: id.into(),
            context_id: None,
            status: TaskStatus::new(state),
            history: Vec::new(),
            artifacts: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Add a message to the history
    pub fn add_message(&mut self, message: Message) {
        self.history.push(message);
    }

    /// Add an artifact to the task
    pub fn add_artifact(&mut self, artifact: Artifact) {
        self.artifacts.push(artifact);
    }

    /// Current lifecycle state
    pub fn state(&self) -> TaskState {
        self.status.state
    }

    /// Check if the task is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.state.is_terminal()
    }

    /// Text of the agent's reply.
    ///
    /// Prefers the last agent-authored message in the history, then the
    /// status message, then the text of the artifacts.
    pub fn reply_text(&self) -> Option<String> {
        let from_history = self
            .history
            .iter()
            .rev()
            .find(|m| m.role == Role::Agent)
            .map(Message::text)
            .filter(|t| !t.is_empty());
        if from_history.is_some() {
            return from_history;
        }

        let from_status = self
            .status
            .message
            .as_ref()
            .filter(|m| m.role == Role::Agent)
            .map(Message::text)
            .filter(|t| !t.is_empty());
        if from_status.is_some() {
            return from_status;
        }

        let from_artifacts = self
            .artifacts
            .iter()
            .map(Artifact::text_content)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        (!from_artifacts.is_empty()).then_some(from_artifacts)
    }
}

/// Status of a task: lifecycle state plus an optional status message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    /// Lifecycle state
    pub state: TaskState,

    /// Message attached to the state change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,

    /// When the state was entered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl TaskStatus {
    /// Create a status entered now
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            message: None,
            timestamp: Some(Utc::now()),
        }
    }
}

/// Task state in the task lifecycle
///
/// `Submitted → Working → {Completed | Failed | Canceled}`, with
/// `InputRequired` and `Rejected` as the protocol's other outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// Task accepted but not started
    Submitted,

    /// Task is actively being processed
    Working,

    /// Task requires additional input to proceed
    InputRequired,

    /// Task completed successfully
    Completed,

    /// Task was canceled
    Canceled,

    /// Task failed due to an error
    Failed,

    /// Task was rejected by the agent
    Rejected,

    /// Agent reported a state this client does not know
    #[serde(other)]
    Unknown,
}

impl TaskState {
    /// Check if this state is final.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Canceled | TaskState::Failed | TaskState::Rejected
        )
    }

    /// Check if this state reports an unsuccessful outcome.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            TaskState::Canceled | TaskState::Failed | TaskState::Rejected
        )
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Submitted => write!(f, "submitted"),
            TaskState::Working => write!(f, "working"),
            TaskState::InputRequired => write!(f, "input-required"),
            TaskState::Completed => write!(f, "completed"),
            TaskState::Canceled => write!(f, "canceled"),
            TaskState::Failed => write!(f, "failed"),
            TaskState::Rejected => write!(f, "rejected"),
            TaskState::Unknown => write!(f, "unknown"),
        }
    }
}

/// An output produced by a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Artifact identifier
    pub artifact_id: String,

    /// Optional artifact name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Content parts
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Artifact {
    /// Create a text artifact
    pub fn text(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            artifact_id: id.into(),
            name: None,
            description: None,
            parts: vec![Part::text(content)],
        }
    }

    /// Concatenated text of all text parts
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
