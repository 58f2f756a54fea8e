//! The capability router.
//!
//! Routing is a deterministic keyword count: every agent scores one point
//! per keyword that occurs in the lower-cased query, the strictly highest
//! score wins, and ties go to the agent registered first. When nothing
//! matches, the designated fallback agent takes the query.

use std::sync::Arc;
use tracing::debug;

use crate::descriptor::{AgentDescriptor, AgentRole};
use crate::error::{RouterError, RouterResult};
use crate::store::AgentStore;

/// Reason given when no keyword matched.
pub const FALLBACK_REASON: &str = "no keyword matched; used fallback";

/// The outcome of routing one query.
#[derive(Debug, Clone)]
pub struct RoutingDecision {
    /// The routed query
    pub query: String,
    /// The chosen agent
    pub agent: Arc<AgentDescriptor>,
    /// Number of matched keywords
    pub score: usize,
    /// Matched keywords in declaration order
    pub matched: Vec<String>,
    /// Human-readable justification
    pub reason: String,
    /// Whether the fallback agent was used
    pub is_fallback: bool,
}

impl RoutingDecision {
    /// Name of the chosen agent.
    pub fn agent_name(&self) -> &str {
        &self.agent.name
    }
}

/// Selects agents for queries.
#[derive(Debug, Clone, Copy)]
pub struct Router {
    fallback_role: AgentRole,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(AgentRole::Testing)
    }
}

impl Router {
    /// Create a router whose fallback is the first agent of `fallback_role`.
    pub fn new(fallback_role: AgentRole) -> Self {
        Self { fallback_role }
    }

    /// The role the fallback agent is taken from.
    pub fn fallback_role(&self) -> AgentRole {
        self.fallback_role
    }

    /// Route a query across every stored agent.
    pub fn route(&self, query: &str, store: &AgentStore) -> RouterResult<RoutingDecision> {
        self.route_for(query, store, None, &[])
    }

    /// Route a query among agents of `role`.
    ///
    /// When no agent has that role the query is routed across all agents.
    pub fn route_within(
        &self,
        query: &str,
        store: &AgentStore,
        role: AgentRole,
    ) -> RouterResult<RoutingDecision> {
        self.route_for(query, store, Some(role), &[])
    }

    /// Route a query, preferring agents of `preferred` and never choosing an
    /// agent whose role is in `excluded`.
    pub fn route_for(
        &self,
        query: &str,
        store: &AgentStore,
        preferred: Option<AgentRole>,
        excluded: &[AgentRole],
    ) -> RouterResult<RoutingDecision> {
        if store.is_empty() {
            return Err(RouterError::NoCapableAgent(
                "no agents have been discovered".to_string(),
            ));
        }

        let eligible: Vec<&Arc<AgentDescriptor>> = store
            .iter()
            .filter(|a| !excluded.contains(&a.role))
            .collect();
        if eligible.is_empty() {
            return Err(RouterError::NoCapableAgent(format!(
                "every discovered agent has an excluded role ({})",
                excluded
                    .iter()
                    .map(|role| role.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        let candidates = match preferred {
            Some(role) if eligible.iter().any(|a| a.role == role) => eligible
                .into_iter()
                .filter(|a| a.role == role)
                .collect(),
            Some(role) => {
                debug!(role = %role, "No agent with preferred role, routing across all");
                eligible
            }
            None => eligible,
        };

        Ok(self.decide(query, &candidates))
    }

    /// Decision naming the fallback agent, whatever the query says.
    pub fn fallback(&self, query: &str, store: &AgentStore) -> RouterResult<RoutingDecision> {
        let candidates: Vec<&Arc<AgentDescriptor>> = store.iter().collect();
        let agent = self.fallback_agent(&candidates).ok_or_else(|| {
            RouterError::NoCapableAgent("no agents have been discovered".to_string())
        })?;
        Ok(fallback_decision(query, agent))
    }

    /// Every agent's score for a query, in registration order.
    pub fn rank(&self, query: &str, store: &AgentStore) -> Vec<(Arc<AgentDescriptor>, usize)> {
        let lower = query.to_lowercase();
        store
            .iter()
            .map(|a| (Arc::clone(a), a.matches(&lower).len()))
            .collect()
    }

    /// Human-readable listing of how agents match and which one falls back.
    pub fn summary(&self, store: &AgentStore) -> String {
        if store.is_empty() {
            return "No agents available for routing.".to_string();
        }

        let candidates: Vec<&Arc<AgentDescriptor>> = store.iter().collect();
        let fallback = self.fallback_agent(&candidates).map(|a| a.name.clone());

        let mut out = String::from("Routing table:\n");
        for agent in store.iter() {
            let marker = if fallback.as_deref() == Some(agent.name.as_str()) {
                " (fallback)"
            } else {
                ""
            };
            out.push_str(&format!(
                "- {} [{}]{}: {}\n",
                agent.name,
                agent.role,
                marker,
                agent.keywords.join(", ")
            ));
        }
        out
    }

    fn fallback_agent<'a>(
        &self,
        candidates: &[&'a Arc<AgentDescriptor>],
    ) -> Option<&'a Arc<AgentDescriptor>> {
        candidates
            .iter()
            .find(|a| a.role == self.fallback_role)
            .or_else(|| candidates.first())
            .copied()
    }

    fn decide(&self, query: &str, candidates: &[&Arc<AgentDescriptor>]) -> RoutingDecision {
        let lower = query.to_lowercase();

        let mut best: Option<(&Arc<AgentDescriptor>, Vec<&str>)> = None;
        for &agent in candidates {
            let matched = agent.matches(&lower);
            let better = match &best {
                Some((_, top)) => matched.len() > top.len(),
                None => !matched.is_empty(),
            };
            if better {
                best = Some((agent, matched));
            }
        }

        match best {
            Some((agent, matched)) => {
                let decision = RoutingDecision {
                    query: query.to_string(),
                    agent: Arc::clone(agent),
                    score: matched.len(),
                    reason: format!("matched keywords: {}", matched.join(", ")),
                    matched: matched.into_iter().map(str::to_string).collect(),
                    is_fallback: false,
                };
                debug!(
                    agent = %decision.agent.name,
                    score = decision.score,
                    "Routed query"
                );
                decision
            }
            None => {
                // candidates is never empty here
                let agent = self
                    .fallback_agent(candidates)
                    .unwrap_or(candidates[0]);
                debug!(agent = %agent.name, "No keyword matched, using fallback");
                fallback_decision(query, agent)
            }
        }
    }
}

fn fallback_decision(query: &str, agent: &Arc<AgentDescriptor>) -> RoutingDecision {
    RoutingDecision {
        query: query.to_string(),
        agent: Arc::clone(agent),
        score: 0,
        matched: Vec::new(),
        reason: FALLBACK_REASON.to_string(),
        is_fallback: true,
    }
}
