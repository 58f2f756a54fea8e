//! Query decomposition and concurrent dispatch.
//!
//! A query that mixes categories ("calculate pi * 2 and search for
//! mathematics") is split at conjunctions into one sub-query per category
//! run, each sub-query is routed to an agent of the category's role, and the
//! answers are joined in the order the sub-queries appeared.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::category::{self, Category};
use crate::descriptor::AgentRole;
use crate::error::{RouterError, RouterResult};
use crate::router::Router;
use crate::store::AgentStore;
use crate::transport::{AgentTransport, with_timeout};

/// Conjunctions a query is split at, longest first.
const SEPARATORS: &[&str] = &[" and then ", " and ", " then ", ";", " also "];

/// Agents of these roles never take sub-queries, so a coordinator agent
/// cannot be handed its own work.
const EXCLUDED_ROLES: &[AgentRole] = &[AgentRole::Orchestration];

/// One independently answerable part of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubQuery {
    /// Text sent to the agent
    pub text: String,
    /// Recognized category, if any
    pub category: Option<Category>,
}

/// The answer, or failure, for one sub-query.
#[derive(Debug, Clone, PartialEq)]
pub struct SubQueryResult {
    /// The sub-query
    pub sub_query: SubQuery,
    /// Agent that was called, if routing succeeded
    pub agent_used: Option<String>,
    /// Agent text on success, explanation on failure
    pub outcome: Result<String, String>,
}

/// Every sub-query result of one coordination run, in decomposition order.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinationOutcome {
    /// The original query
    pub query: String,
    /// Per sub-query results
    pub results: Vec<SubQueryResult>,
}

impl CoordinationOutcome {
    /// Check if no sub-query produced an answer.
    pub fn all_failed(&self) -> bool {
        self.results.iter().all(|r| r.outcome.is_err())
    }

    /// The merged answer.
    ///
    /// Each contribution is labeled with the agent that produced it. When
    /// nothing succeeded the result is one explanatory message instead.
    pub fn answer(&self) -> String {
        if self.all_failed() {
            let mut out = format!(
                "Unable to answer \"{}\": all {} sub-queries failed.",
                self.query,
                self.results.len()
            );
            for result in &self.results {
                if let Err(error) = &result.outcome {
                    out.push_str(&format!("\n- \"{}\": {}", result.sub_query.text, error));
                }
            }
            return out;
        }

        let joined = self
            .results
            .iter()
            .filter_map(|r| {
                let label = r.agent_used.as_deref().unwrap_or("unrouted");
                match &r.outcome {
                    Ok(text) if text.trim().is_empty() => None,
                    Ok(text) => Some(format!("**{label}:** {text}")),
                    Err(error) => Some(format!("**{label}:** failed: {error}")),
                }
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        if joined.is_empty() {
            format!("No agent returned any text for \"{}\".", self.query)
        } else {
            joined
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    start: usize,
    end: usize,
    category: Option<Category>,
}

/// Split a query into independent sub-queries.
///
/// Only queries mentioning at least two categories are split; anything else
/// comes back as a single sub-query carrying the whole query.
pub fn decompose(query: &str) -> Vec<SubQuery> {
    let whole = || {
        vec![SubQuery {
            text: query.trim().to_string(),
            category: category::classify(query),
        }]
    };

    if category::detect(query).len() < 2 {
        return whole();
    }

    let segments = merge_segments(split_segments(query));
    let distinct: HashSet<Category> = segments.iter().filter_map(|s| s.category).collect();
    if segments.len() < 2 || distinct.len() < 2 {
        return whole();
    }

    segments
        .into_iter()
        .map(|s| SubQuery {
            text: query[s.start..s.end].trim().to_string(),
            category: s.category,
        })
        .collect()
}

/// Byte ranges of the query between separators, classified.
fn split_segments(query: &str) -> Vec<Segment> {
    // ASCII lowering keeps byte offsets aligned with `query`
    let lower = query.to_ascii_lowercase();
    let mut segments = Vec::new();
    let mut start = 0;
    let mut skip_until = 0;

    for (index, _) in lower.char_indices() {
        if index < skip_until {
            continue;
        }
        if let Some(sep) = SEPARATORS.iter().find(|sep| lower[index..].starts_with(**sep)) {
            push_segment(query, &mut segments, start, index);
            start = index + sep.len();
            skip_until = start;
        }
    }
    push_segment(query, &mut segments, start, query.len());
    segments
}

fn push_segment(query: &str, segments: &mut Vec<Segment>, start: usize, end: usize) {
    let text = &query[start..end];
    if text.trim().is_empty() {
        return;
    }
    segments.push(Segment {
        start,
        end,
        category: category::classify(text),
    });
}

/// Fold unclassified segments into a neighbour, then join adjacent segments
/// of the same category.
fn merge_segments(segments: Vec<Segment>) -> Vec<Segment> {
    let mut classified: Vec<Segment> = Vec::with_capacity(segments.len());
    let mut pending_start: Option<usize> = None;

    for segment in segments {
        match segment.category {
            None => match classified.last_mut() {
                Some(previous) => previous.end = segment.end,
                None => {
                    pending_start.get_or_insert(segment.start);
                }
            },
            Some(_) => {
                let start = pending_start.take().unwrap_or(segment.start);
                classified.push(Segment { start, ..segment });
            }
        }
    }

    let mut merged: Vec<Segment> = Vec::with_capacity(classified.len());
    for segment in classified {
        match merged.last_mut() {
            Some(previous) if previous.category == segment.category => {
                previous.end = segment.end;
            }
            _ => merged.push(segment),
        }
    }
    merged
}

/// Dispatches decomposed queries.
pub struct Coordinator<'a> {
    router: &'a Router,
    transport: &'a dyn AgentTransport,
    call_timeout: Duration,
    max_fanout: usize,
}

impl<'a> Coordinator<'a> {
    /// Create a coordinator.
    pub fn new(
        router: &'a Router,
        transport: &'a dyn AgentTransport,
        call_timeout: Duration,
        max_fanout: usize,
    ) -> Self {
        Self {
            router,
            transport,
            call_timeout,
            max_fanout: max_fanout.max(1),
        }
    }

    /// Decompose, dispatch and collect.
    ///
    /// Only an empty store is an error; individual failures are recorded in
    /// the outcome.
    pub async fn coordinate(
        &self,
        query: &str,
        store: &AgentStore,
    ) -> RouterResult<CoordinationOutcome> {
        if store.is_empty() {
            return Err(RouterError::NoCapableAgent(
                "no agents have been discovered".to_string(),
            ));
        }

        let sub_queries = decompose(query);
        info!(
            sub_queries = sub_queries.len(),
            max_fanout = self.max_fanout,
            "Coordinating query"
        );

        let results = stream::iter(sub_queries)
            .map(|sub_query| self.dispatch(sub_query, store))
            .buffered(self.max_fanout)
            .collect::<Vec<_>>()
            .await;

        let outcome = CoordinationOutcome {
            query: query.to_string(),
            results,
        };
        if outcome.all_failed() {
            warn!(query = %query, "Every sub-query failed");
        }
        Ok(outcome)
    }

    async fn dispatch(&self, sub_query: SubQuery, store: &AgentStore) -> SubQueryResult {
        let preferred = sub_query.category.map(Category::preferred_role);
        let decision =
            match self
                .router
                .route_for(&sub_query.text, store, preferred, EXCLUDED_ROLES)
            {
                Ok(decision) => decision,
                Err(err) => {
                    return SubQueryResult {
                        sub_query,
                        agent_used: None,
                        outcome: Err(err.to_string()),
                    };
                }
            };

        debug!(
            agent = %decision.agent.name,
            category = ?sub_query.category,
            "Dispatching sub-query"
        );

        let endpoint = decision.agent.endpoint.as_str();
        let outcome = with_timeout(
            endpoint,
            self.call_timeout,
            self.transport.send_query(endpoint, &sub_query.text),
        )
        .await
        .map_err(|err| {
            warn!(agent = %decision.agent.name, error = %err, "Sub-query failed");
            err.to_string()
        });

        SubQueryResult {
            agent_used: Some(decision.agent.name.clone()),
            sub_query,
            outcome,
        }
    }
}
