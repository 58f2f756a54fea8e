//! Agent Card types for capability discovery in the A2A protocol.

use serde::{Deserialize, Serialize};

/// Agent Card for capability discovery
///
/// The Agent Card is a JSON document served from a well-known path that
/// describes an agent's capabilities, skills, and how to interact with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    /// Human-readable name of the agent
    pub name: String,

    /// Description of the agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// URL the agent accepts requests at
    #[serde(default)]
    pub url: String,

    /// Agent version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Protocol version implemented by the agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<String>,

    /// Provider information
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<AgentProvider>,

    /// Agent capabilities
    #[serde(default)]
    pub capabilities: AgentCapabilities,

    /// Content types accepted by default
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_input_modes: Vec<String>,

    /// Content types produced by default
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_output_modes: Vec<String>,

    /// Skills the agent can perform
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<AgentSkill>,
}

impl AgentCard {
    /// Create a new agent card with required fields
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            url: url.into(),
            version: Some("1.0.0".to_string()),
            protocol_version: Some("0.3.0".to_string()),
            provider: None,
            capabilities: AgentCapabilities::default(),
            default_input_modes: vec!["text".to_string()],
            default_output_modes: vec!["text".to_string()],
            skills: Vec::new(),
        }
    }

    /// Add a skill to the agent card
    pub fn with_skill(mut self, skill: AgentSkill) -> Self {
        self.skills.push(skill);
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Enable streaming capability
    pub fn with_streaming(mut self) -> Self {
        self.capabilities.streaming = true;
        self
    }

    /// Check the fields a client relies on
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("agent card has an empty name".to_string());
        }
        if self.skills.iter().any(|s| s.id.trim().is_empty()) {
            return Err(format!("agent card '{}' has a skill without id", self.name));
        }
        Ok(())
    }

    /// All skill tags in declaration order
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.skills
            .iter()
            .flat_map(|s| s.tags.iter().map(String::as_str))
    }
}

/// Information about the agent provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProvider {
    /// Provider organization
    pub organization: String,

    /// Provider URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Agent capabilities
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    /// Whether the agent supports streaming responses
    #[serde(default)]
    pub streaming: bool,

    /// Whether the agent supports push notifications
    #[serde(default)]
    pub push_notifications: bool,

    /// Whether the agent records task state transition history
    #[serde(default)]
    pub state_transition_history: bool,
}

/// A skill that the agent can perform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSkill {
    /// Unique identifier for the skill
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Description of what the skill does
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Tags for categorization
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Example prompts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

impl AgentSkill {
    /// Create a new skill
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            tags: Vec::new(),
            examples: Vec::new(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}
