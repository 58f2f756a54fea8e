//! Discovery: probing candidate endpoints and filling the store.
//!
//! Probing and applying are separate steps. [`probe_all`] talks to the
//! network and touches no shared state; [`apply`] folds the results into a
//! store in candidate order. The facade runs the first without a lock and
//! the second under a single write lock.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::descriptor::{AgentDescriptor, AgentRole};
use crate::error::{RouterError, TransportError};
use crate::store::AgentStore;
use crate::transport::{AgentTransport, with_timeout};

/// An endpoint to probe and the role it is expected to play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Base URL of the agent
    pub endpoint: String,
    /// Declared role
    pub role: AgentRole,
}

impl Candidate {
    /// Create a candidate.
    pub fn new(endpoint: impl Into<String>, role: AgentRole) -> Self {
        Self {
            endpoint: endpoint.into(),
            role,
        }
    }
}

/// A candidate that could not be described.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryFailure {
    /// Endpoint that failed
    pub endpoint: String,
    /// Role it was declared with
    pub role: AgentRole,
    /// Why it failed
    pub cause: TransportError,
}

impl DiscoveryFailure {
    /// The failure as a router error.
    pub fn to_error(&self) -> RouterError {
        RouterError::Discovery {
            endpoint: self.endpoint.clone(),
            source: self.cause.clone(),
        }
    }
}

/// What one discovery run did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryReport {
    /// Number of candidates probed
    pub attempted: usize,
    /// Number of candidates described and stored
    pub succeeded: usize,
    /// Names stored by this run, in candidate order
    pub discovered: Vec<String>,
    /// Candidates that failed, in candidate order
    pub failures: Vec<DiscoveryFailure>,
    /// Agents kept from earlier runs whose endpoint failed this time
    pub stale: Vec<String>,
    /// Earlier entries replaced by a same-named agent at another endpoint,
    /// as `name (old endpoint)`
    pub displaced: Vec<String>,
}

impl DiscoveryReport {
    /// Check if every candidate was described.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for DiscoveryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Discovered {}/{} agents",
            self.succeeded, self.attempted
        )?;
        for name in &self.discovered {
            writeln!(f, "  + {name}")?;
        }
        for failure in &self.failures {
            writeln!(
                f,
                "  ! {} ({}): {}",
                failure.endpoint, failure.role, failure.cause
            )?;
        }
        if !self.stale.is_empty() {
            writeln!(f, "  stale entries kept: {}", self.stale.join(", "))?;
        }
        if !self.displaced.is_empty() {
            writeln!(f, "  entries replaced: {}", self.displaced.join(", "))?;
        }
        Ok(())
    }
}

/// Result of probing one candidate.
pub type Probe = (Candidate, Result<AgentDescriptor, TransportError>);

/// Fetch a descriptor for one candidate.
pub async fn probe(
    transport: &dyn AgentTransport,
    candidate: &Candidate,
    call_timeout: Duration,
) -> Result<AgentDescriptor, TransportError> {
    debug!(endpoint = %candidate.endpoint, role = %candidate.role, "Probing agent");

    let caps = with_timeout(
        &candidate.endpoint,
        call_timeout,
        transport.fetch_descriptor(&candidate.endpoint),
    )
    .await?;

    if caps.name.trim().is_empty() {
        return Err(TransportError::malformed(
            &candidate.endpoint,
            "descriptor has an empty name",
        ));
    }

    Ok(AgentDescriptor::from_capabilities(
        candidate.endpoint.clone(),
        candidate.role,
        caps,
    ))
}

/// Probe every candidate with at most `concurrency` probes in flight.
///
/// Results come back in candidate order.
pub async fn probe_all(
    transport: &dyn AgentTransport,
    candidates: &[Candidate],
    concurrency: usize,
    call_timeout: Duration,
) -> Vec<Probe> {
    stream::iter(candidates.iter().cloned())
        .map(|candidate| async move {
            let result = probe(transport, &candidate, call_timeout).await;
            (candidate, result)
        })
        .buffered(concurrency.max(1))
        .collect()
        .await
}

/// Fold probe results into `store`.
///
/// Agent names are unique. A candidate publishing a name that an earlier
/// candidate of the same run already took is recorded as a failure; an
/// entry left from an earlier run is replaced and listed as displaced.
pub fn apply(store: &mut AgentStore, probes: Vec<Probe>) -> DiscoveryReport {
    let mut report = DiscoveryReport {
        attempted: probes.len(),
        ..Default::default()
    };
    // name -> endpoint, for agents stored by this run
    let mut claimed: HashMap<String, String> = HashMap::new();

    for (candidate, result) in probes {
        let result = result.and_then(|descriptor| match claimed.get(&descriptor.name) {
            Some(owner) if *owner != descriptor.endpoint => Err(TransportError::malformed(
                &descriptor.endpoint,
                format!(
                    "agent name '{}' is already published by {}",
                    descriptor.name, owner
                ),
            )),
            _ => Ok(descriptor),
        });

        match result {
            Ok(descriptor) => {
                info!(
                    agent = %descriptor.name,
                    endpoint = %descriptor.endpoint,
                    role = %descriptor.role,
                    keywords = descriptor.keywords.len(),
                    "Discovered agent"
                );
                for previous in store
                    .iter()
                    .filter(|a| a.name == descriptor.name && a.endpoint != descriptor.endpoint)
                {
                    warn!(
                        agent = %previous.name,
                        old_endpoint = %previous.endpoint,
                        new_endpoint = %descriptor.endpoint,
                        "Replacing agent registered at another endpoint"
                    );
                    report
                        .displaced
                        .push(format!("{} ({})", previous.name, previous.endpoint));
                }

                claimed.insert(descriptor.name.clone(), descriptor.endpoint.clone());
                report.discovered.push(descriptor.name.clone());
                report.succeeded += 1;
                store.upsert(descriptor);
            }
            Err(cause) => {
                warn!(
                    endpoint = %candidate.endpoint,
                    role = %candidate.role,
                    error = %cause,
                    "Agent discovery failed"
                );
                report.failures.push(DiscoveryFailure {
                    endpoint: candidate.endpoint,
                    role: candidate.role,
                    cause,
                });
            }
        }
    }

    report.stale = report
        .failures
        .iter()
        .filter_map(|f| store.by_endpoint(&f.endpoint).map(|a| a.name.clone()))
        .collect();

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockReply, MockTransport};
    use crate::transport::CapabilityDescriptor;

    fn candidates() -> Vec<Candidate> {
        vec![
            Candidate::new("http://echo", AgentRole::Testing),
            Candidate::new("http://down", AgentRole::Information),
            Candidate::new("http://calc", AgentRole::Computation),
        ]
    }

    #[tokio::test]
    async fn test_probe_all_keeps_candidate_order() {
        let transport = MockTransport::new()
            .with_agent("http://echo", "Echo", MockReply::echo("Echo: "))
            .with_unreachable("http://down")
            .with_agent("http://calc", "Calculator", MockReply::text("4"));

        let probes = probe_all(&transport, &candidates(), 2, Duration::from_secs(1)).await;

        let endpoints: Vec<_> = probes.iter().map(|(c, _)| c.endpoint.as_str()).collect();
        assert_eq!(endpoints, vec!["http://echo", "http://down", "http://calc"]);
        assert!(probes[0].1.is_ok());
        assert!(matches!(
            probes[1].1,
            Err(TransportError::Unreachable { .. })
        ));
    }

    #[tokio::test]
    async fn test_apply_reports_failures() {
        let transport = MockTransport::new()
            .with_agent("http://echo", "Echo", MockReply::echo("Echo: "))
            .with_agent("http://calc", "Calculator", MockReply::text("4"));

        let mut store = AgentStore::new();
        let probes = probe_all(&transport, &candidates(), 4, Duration::from_secs(1)).await;
        let report = apply(&mut store, probes);

        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.discovered, vec!["Echo", "Calculator"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].endpoint, "http://down");
        assert_eq!(report.failures[0].role, AgentRole::Information);
        assert!(report.stale.is_empty());
        assert_eq!(store.names(), vec!["Echo", "Calculator"]);
        assert!(report.to_string().contains("Discovered 2/3 agents"));
    }

    #[tokio::test]
    async fn test_rediscovery_keeps_stale_entries() {
        let transport = MockTransport::new()
            .with_agent("http://echo", "Echo", MockReply::echo("Echo: "))
            .with_agent("http://calc", "Calculator", MockReply::text("4"));
        let list = vec![
            Candidate::new("http://echo", AgentRole::Testing),
            Candidate::new("http://calc", AgentRole::Computation),
        ];

        let mut store = AgentStore::new();
        apply(
            &mut store,
            probe_all(&transport, &list, 4, Duration::from_secs(1)).await,
        );

        transport.take_offline("http://calc");
        let report = apply(
            &mut store,
            probe_all(&transport, &list, 4, Duration::from_secs(1)).await,
        );

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.stale, vec!["Calculator"]);
        assert_eq!(store.names(), vec!["Echo", "Calculator"]);
    }

    #[tokio::test]
    async fn test_duplicate_name_in_one_run_is_a_failure() {
        let transport = MockTransport::new()
            .with_agent("http://a", "Echo", MockReply::echo("A: "))
            .with_agent("http://b", "Echo", MockReply::echo("B: "));
        let list = vec![
            Candidate::new("http://a", AgentRole::Testing),
            Candidate::new("http://b", AgentRole::Testing),
        ];

        let mut store = AgentStore::new();
        let report = apply(
            &mut store,
            probe_all(&transport, &list, 4, Duration::from_secs(1)).await,
        );

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.discovered, vec!["Echo"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].endpoint, "http://b");
        assert!(matches!(
            report.failures[0].cause,
            TransportError::MalformedDescriptor { .. }
        ));
        assert!(report.failures[0].cause.to_string().contains("http://a"));
        assert_eq!(store.get("Echo").unwrap().endpoint, "http://a");
    }

    #[tokio::test]
    async fn test_moved_agent_is_reported_as_displaced() {
        let transport = MockTransport::new()
            .with_agent("http://old", "Echo", MockReply::echo("Echo: "))
            .with_agent("http://new", "Echo", MockReply::echo("Echo: "));

        let mut store = AgentStore::new();
        apply(
            &mut store,
            probe_all(
                &transport,
                &[Candidate::new("http://old", AgentRole::Testing)],
                1,
                Duration::from_secs(1),
            )
            .await,
        );
        let report = apply(
            &mut store,
            probe_all(
                &transport,
                &[Candidate::new("http://new", AgentRole::Testing)],
                1,
                Duration::from_secs(1),
            )
            .await,
        );

        assert_eq!(report.displaced, vec!["Echo (http://old)"]);
        assert!(report.to_string().contains("entries replaced: Echo (http://old)"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("Echo").unwrap().endpoint, "http://new");
    }

    #[tokio::test]
    async fn test_empty_name_is_malformed() {
        let transport = MockTransport::new().with_descriptor(
            "http://anon",
            CapabilityDescriptor::default(),
            MockReply::text("?"),
        );

        let err = probe(
            &transport,
            &Candidate::new("http://anon", AgentRole::Testing),
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TransportError::MalformedDescriptor { .. }));
    }

    #[tokio::test]
    async fn test_failure_converts_to_router_error() {
        let failure = DiscoveryFailure {
            endpoint: "http://down".to_string(),
            role: AgentRole::Information,
            cause: TransportError::unreachable("http://down", "connection refused"),
        };
        let err = failure.to_error();
        assert_eq!(err.error_code(), "DISCOVERY_FAILED");
        assert!(err.is_retryable());
    }
}
