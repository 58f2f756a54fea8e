//! The agent descriptor store.

use std::sync::Arc;

use crate::descriptor::AgentDescriptor;

/// Outcome of [`AgentStore::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// A new entry was appended
    Inserted,
    /// An existing entry was replaced in place
    Replaced,
}

/// Known agents in registration order.
///
/// Names are unique. Entries are `Arc`s so a snapshot is a cheap clone and
/// readers holding an old snapshot keep seeing the old descriptor.
#[derive(Debug, Clone, Default)]
pub struct AgentStore {
    agents: Vec<Arc<AgentDescriptor>>,
}

impl AgentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Agents in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<AgentDescriptor>> {
        self.agents.iter()
    }

    /// Agent names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.agents.iter().map(|a| a.name.clone()).collect()
    }

    /// Look up an agent by name.
    pub fn get(&self, name: &str) -> Option<&Arc<AgentDescriptor>> {
        self.agents.iter().find(|a| a.name == name)
    }

    /// Look up an agent by endpoint.
    pub fn by_endpoint(&self, endpoint: &str) -> Option<&Arc<AgentDescriptor>> {
        self.agents.iter().find(|a| a.endpoint == endpoint)
    }

    /// Insert a descriptor or replace the entry it supersedes.
    ///
    /// The superseded entry is the one with the same endpoint, else the one
    /// with the same name. Replacement keeps the entry's position. Any other
    /// entry carrying the incoming name is dropped so names stay unique.
    pub fn upsert(&mut self, descriptor: AgentDescriptor) -> Upsert {
        let slot = self
            .agents
            .iter()
            .position(|a| a.endpoint == descriptor.endpoint)
            .or_else(|| self.agents.iter().position(|a| a.name == descriptor.name));

        let name = descriptor.name.clone();
        let descriptor = Arc::new(descriptor);

        match slot {
            Some(index) => {
                self.agents[index] = descriptor;
                let mut position = 0;
                self.agents.retain(|a| {
                    let keep = position == index || a.name != name;
                    position += 1;
                    keep
                });
                Upsert::Replaced
            }
            None => {
                self.agents.push(descriptor);
                Upsert::Inserted
            }
        }
    }

    /// Remove an agent by name.
    pub fn remove(&mut self, name: &str) -> Option<Arc<AgentDescriptor>> {
        let index = self.agents.iter().position(|a| a.name == name)?;
        Some(self.agents.remove(index))
    }

    /// Forget every agent.
    pub fn clear(&mut self) {
        self.agents.clear();
    }

    /// Human-readable listing of the store.
    pub fn summary(&self) -> String {
        if self.agents.is_empty() {
            return "No agents discovered.".to_string();
        }

        let mut out = format!("Discovered agents ({}):\n", self.agents.len());
        for agent in &self.agents {
            out.push_str(&format!(
                "- {} [{}] at {}\n",
                agent.name, agent.role, agent.endpoint
            ));
            if !agent.description.is_empty() {
                out.push_str(&format!("    {}\n", agent.description));
            }
            if !agent.skills.is_empty() {
                out.push_str(&format!("    skills: {}\n", agent.skills.join(", ")));
            }
            out.push_str(&format!(
                "    streaming: {}, push notifications: {}\n",
                agent.supports_streaming, agent.supports_push_notifications
            ));
        }
        out
    }
}

impl FromIterator<AgentDescriptor> for AgentStore {
    fn from_iter<I: IntoIterator<Item = AgentDescriptor>>(iter: I) -> Self {
        let mut store = AgentStore::new();
        for descriptor in iter {
            store.upsert(descriptor);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::AgentRole;

    fn agent(name: &str, endpoint: &str) -> AgentDescriptor {
        AgentDescriptor::new(name, endpoint, AgentRole::Testing)
    }

    #[test]
    fn test_insert_preserves_order() {
        let mut store = AgentStore::new();
        assert_eq!(store.upsert(agent("a", "http://a")), Upsert::Inserted);
        assert_eq!(store.upsert(agent("b", "http://b")), Upsert::Inserted);
        assert_eq!(store.names(), vec!["a", "b"]);
    }

    #[test]
    fn test_replace_by_endpoint_in_place() {
        let mut store: AgentStore = [agent("a", "http://a"), agent("b", "http://b")]
            .into_iter()
            .collect();

        let before = Arc::clone(store.get("a").unwrap());
        let outcome = store.upsert(agent("a2", "http://a").with_description("renamed"));

        assert_eq!(outcome, Upsert::Replaced);
        assert_eq!(store.names(), vec!["a2", "b"]);
        // old snapshot is untouched
        assert_eq!(before.name, "a");
        assert!(before.description.is_empty());
    }

    #[test]
    fn test_replace_by_name_when_endpoint_moves() {
        let mut store: AgentStore = [agent("a", "http://a"), agent("b", "http://b")]
            .into_iter()
            .collect();

        store.upsert(agent("a", "http://a-moved"));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a").unwrap().endpoint, "http://a-moved");
        assert_eq!(store.names(), vec!["a", "b"]);
    }

    #[test]
    fn test_names_stay_unique() {
        let mut store: AgentStore = [agent("a", "http://a"), agent("b", "http://b")]
            .into_iter()
            .collect();

        // b's endpoint now reports a's name
        store.upsert(agent("a", "http://b"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().endpoint, "http://b");
    }

    #[test]
    fn test_remove_and_clear() {
        let mut store: AgentStore = [agent("a", "http://a"), agent("b", "http://b")]
            .into_iter()
            .collect();

        assert!(store.remove("a").is_some());
        assert!(store.remove("a").is_none());
        assert_eq!(store.names(), vec!["b"]);

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.summary(), "No agents discovered.");
    }

    #[test]
    fn test_summary_lists_agents() {
        let store: AgentStore = [agent("Echo Agent", "http://localhost:9999").with_skill("Echo")]
            .into_iter()
            .collect();

        let summary = store.summary();
        assert!(summary.contains("Echo Agent [testing] at http://localhost:9999"));
        assert!(summary.contains("skills: Echo"));
    }
}
