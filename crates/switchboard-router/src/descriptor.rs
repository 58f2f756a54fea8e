//! Agent descriptors: what the router knows about one discovered agent.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::transport::CapabilityDescriptor;

// ============================================================================
// AgentRole
// ============================================================================

/// The part an agent plays in the ecosystem.
///
/// The role is declared by configuration, not by the agent itself, and
/// contributes a default keyword set used for routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Knows about other agents
    Discovery,
    /// Echo-style handler; the usual fallback
    Testing,
    /// Looks things up
    Information,
    /// Evaluates arithmetic
    Computation,
    /// Splits queries across other agents
    Orchestration,
}

impl AgentRole {
    /// Every role, in declaration order.
    pub const ALL: [AgentRole; 5] = [
        AgentRole::Discovery,
        AgentRole::Testing,
        AgentRole::Information,
        AgentRole::Computation,
        AgentRole::Orchestration,
    ];

    /// Lower-case name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            AgentRole::Discovery => "discovery",
            AgentRole::Testing => "testing",
            AgentRole::Information => "information",
            AgentRole::Computation => "computation",
            AgentRole::Orchestration => "orchestration",
        }
    }

    /// Keywords every agent of this role matches on, before skill tags.
    pub fn default_keywords(self) -> &'static [&'static str] {
        match self {
            AgentRole::Discovery => &["registry", "discover", "list agents", "available agents"],
            AgentRole::Testing => &["echo", "repeat", "say back", "test", "hello"],
            AgentRole::Information => &[
                "search",
                "find",
                "what is",
                "who is",
                "where is",
                "how to",
                "latest",
                "news",
                "information",
                "lookup",
            ],
            AgentRole::Computation => &[
                "calculate",
                "math",
                "compute",
                "+",
                "*",
                "/",
                "sqrt",
                "sin",
                "cos",
                "pi",
                "equation",
                "formula",
            ],
            AgentRole::Orchestration => &["coordinate", "orchestrate", "multi-step", "combine"],
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        AgentRole::ALL
            .into_iter()
            .find(|r| r.as_str() == lower)
            .ok_or_else(|| {
                format!(
                    "unknown agent role '{s}', expected one of: discovery, testing, information, computation, orchestration"
                )
            })
    }
}

// ============================================================================
// AgentDescriptor
// ============================================================================

/// A discovered agent as the router sees it.
///
/// Stored behind `Arc` and never mutated; re-discovery replaces it whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Display name, unique within a store
    pub name: String,
    /// Endpoint the agent was discovered at
    pub endpoint: String,
    /// Declared role
    pub role: AgentRole,
    /// Lower-cased, de-duplicated matching keywords in declaration order
    pub keywords: Vec<String>,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Skill names, for summaries
    #[serde(default)]
    pub skills: Vec<String>,
    /// Whether the agent streams responses
    #[serde(default)]
    pub supports_streaming: bool,
    /// Whether the agent can push notifications
    #[serde(default)]
    pub supports_push_notifications: bool,
}

impl AgentDescriptor {
    /// Create a descriptor carrying the role's default keywords.
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, role: AgentRole) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            role,
            keywords: Vec::new(),
            description: String::new(),
            skills: Vec::new(),
            supports_streaming: false,
            supports_push_notifications: false,
        }
        .with_keywords(role.default_keywords().iter().copied())
    }

    /// Build a descriptor from a fetched capability descriptor.
    ///
    /// Keywords are the role defaults followed by every skill tag.
    pub fn from_capabilities(
        endpoint: impl Into<String>,
        role: AgentRole,
        caps: CapabilityDescriptor,
    ) -> Self {
        let tags: Vec<String> = caps
            .skills
            .iter()
            .flat_map(|s| s.tags.iter().cloned())
            .collect();

        let mut descriptor = Self::new(caps.name, endpoint, role).with_keywords(tags);
        descriptor.description = caps.description;
        descriptor.skills = caps.skills.into_iter().map(|s| s.name).collect();
        descriptor.supports_streaming = caps.supports_streaming;
        descriptor.supports_push_notifications = caps.supports_push_notifications;
        descriptor
    }

    /// Append keywords, lower-cased, skipping empties and duplicates.
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if !keyword.is_empty() && !self.keywords.contains(&keyword) {
                self.keywords.push(keyword);
            }
        }
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a skill name.
    pub fn with_skill(mut self, skill: impl Into<String>) -> Self {
        self.skills.push(skill.into());
        self
    }

    /// Keywords of this agent that occur in an already lower-cased query.
    pub fn matches<'a>(&'a self, query_lower: &str) -> Vec<&'a str> {
        self.keywords
            .iter()
            .filter(|k| query_lower.contains(k.as_str()))
            .map(String::as_str)
            .collect()
    }
}
