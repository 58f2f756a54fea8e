//! The owned state every operation works on.
//!
//! A [`Switchboard`] holds the agent store, the workflow registry, the
//! transport and the runtime settings. Routing, workflows and coordination
//! read a snapshot of the store taken under a short read lock; discovery
//! probes without any lock and applies its results under one write lock.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::{EcosystemConfig, SwitchboardConfig};
use crate::coordinator::{CoordinationOutcome, Coordinator};
use crate::descriptor::AgentDescriptor;
use crate::discovery::{self, Candidate, DiscoveryReport};
use crate::error::{RouterError, RouterResult};
use crate::router::{Router, RoutingDecision};
use crate::store::AgentStore;
use crate::transport::{AgentTransport, with_timeout};
use crate::workflow::{self, WorkflowDefinition, WorkflowEngine, WorkflowExecution, WorkflowRegistry};

/// A routed query and the agent's answer.
#[derive(Debug, Clone)]
pub struct Answer {
    /// How the agent was chosen
    pub decision: RoutingDecision,
    /// What it said
    pub text: String,
}

/// Agent store, workflows and transport behind one handle.
pub struct Switchboard {
    store: RwLock<AgentStore>,
    workflows: RwLock<WorkflowRegistry>,
    transport: Arc<dyn AgentTransport>,
    router: Router,
    config: SwitchboardConfig,
    candidates: Vec<Candidate>,
}

impl std::fmt::Debug for Switchboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Switchboard")
            .field("router", &self.router)
            .field("config", &self.config)
            .field("candidates", &self.candidates.len())
            .finish_non_exhaustive()
    }
}

impl Switchboard {
    /// Create a switchboard with the built-in workflows and no candidates.
    pub fn new(transport: Arc<dyn AgentTransport>, config: SwitchboardConfig) -> Self {
        Self {
            store: RwLock::new(AgentStore::new()),
            workflows: RwLock::new(WorkflowRegistry::with_builtins()),
            router: Router::new(config.fallback_role),
            transport,
            config,
            candidates: Vec::new(),
        }
    }

    /// Create a switchboard from an ecosystem file's agents and workflows.
    pub fn from_ecosystem(
        transport: Arc<dyn AgentTransport>,
        config: SwitchboardConfig,
        ecosystem: EcosystemConfig,
    ) -> RouterResult<Self> {
        let mut registry = WorkflowRegistry::with_builtins();
        for definition in ecosystem.workflows {
            registry.register(definition)?;
        }

        let mut switchboard = Self::new(transport, config);
        switchboard.workflows = RwLock::new(registry);
        switchboard.candidates = ecosystem.agents;
        Ok(switchboard)
    }

    /// Create a switchboard talking A2A over HTTP.
    #[cfg(feature = "a2a")]
    pub fn a2a(config: SwitchboardConfig, ecosystem: EcosystemConfig) -> RouterResult<Self> {
        let transport = crate::a2a::A2aTransport::new(config.call_timeout)
            .map_err(|e| RouterError::TransportSetup(e.to_string()))?;
        Self::from_ecosystem(Arc::new(transport), config, ecosystem)
    }

    /// Runtime settings.
    pub fn config(&self) -> &SwitchboardConfig {
        &self.config
    }

    /// The router used for every decision.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Candidates probed by [`Switchboard::discover_configured`].
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    // ========================================================================
    // Discovery and store lifecycle
    // ========================================================================

    /// Probe `candidates` and fold the results into the store.
    pub async fn discover(&self, candidates: &[Candidate]) -> RouterResult<DiscoveryReport> {
        if candidates.is_empty() {
            return Err(RouterError::EmptyCandidates);
        }

        info!(candidates = candidates.len(), "Starting discovery");
        let probes = discovery::probe_all(
            self.transport.as_ref(),
            candidates,
            self.config.discovery_concurrency,
            self.config.call_timeout,
        )
        .await;

        let report = {
            let mut store = self.store.write().await;
            discovery::apply(&mut store, probes)
        };

        if report.is_complete() {
            info!(succeeded = report.succeeded, "Discovery finished");
        } else {
            warn!(
                succeeded = report.succeeded,
                failed = report.failures.len(),
                stale = report.stale.len(),
                "Discovery finished with failures"
            );
        }
        Ok(report)
    }

    /// Probe the candidates this switchboard was configured with.
    pub async fn discover_configured(&self) -> RouterResult<DiscoveryReport> {
        self.discover(&self.candidates).await
    }

    /// Forget every discovered agent.
    pub async fn clear_store(&self) {
        self.store.write().await.clear();
        info!("Agent store cleared");
    }

    /// A consistent copy of the store.
    pub async fn store_snapshot(&self) -> AgentStore {
        self.store.read().await.clone()
    }

    /// Human-readable listing of discovered agents.
    pub async fn store_summary(&self) -> String {
        self.store.read().await.summary()
    }

    // ========================================================================
    // Routing
    // ========================================================================

    /// Choose an agent for `query`.
    pub async fn route(&self, query: &str) -> RouterResult<RoutingDecision> {
        let store = self.store_snapshot().await;
        self.router.route(query, &store)
    }

    /// Routing table with fallback marker.
    pub async fn routing_summary(&self) -> String {
        let store = self.store_snapshot().await;
        self.router.summary(&store)
    }

    /// The decision for `query` plus every agent's score.
    pub async fn explain(&self, query: &str) -> RouterResult<String> {
        let store = self.store_snapshot().await;
        let decision = self.router.route(query, &store)?;

        let mut out = format!(
            "Query: {}\nChosen agent: {}{}\nReason: {}\nScores:\n",
            query,
            decision.agent_name(),
            if decision.is_fallback { " (fallback)" } else { "" },
            decision.reason
        );
        for (agent, score) in self.router.rank(query, &store) {
            out.push_str(&format!("  {}: {}\n", agent.name, score));
        }
        Ok(out)
    }

    /// Route `query` and send it to the chosen agent.
    pub async fn ask(&self, query: &str) -> RouterResult<Answer> {
        let decision = self.route(query).await?;
        info!(agent = %decision.agent.name, fallback = decision.is_fallback, "Sending query");
        let text = self.call(&decision.agent, query).await?;
        Ok(Answer { decision, text })
    }

    /// Send `query` straight to the agent called `name`, skipping routing.
    ///
    /// Names match exactly first, then ignoring ASCII case.
    pub async fn send_to(&self, name: &str, query: &str) -> RouterResult<String> {
        let agent = {
            let store = self.store.read().await;
            store
                .get(name)
                .or_else(|| store.iter().find(|a| a.name.eq_ignore_ascii_case(name)))
                .cloned()
        };
        let agent = agent.ok_or_else(|| {
            RouterError::NoCapableAgent(format!("no discovered agent is named '{name}'"))
        })?;

        info!(agent = %agent.name, "Sending query directly");
        self.call(&agent, query).await
    }

    async fn call(&self, agent: &AgentDescriptor, query: &str) -> RouterResult<String> {
        let endpoint = agent.endpoint.as_str();
        with_timeout(
            endpoint,
            self.config.call_timeout,
            self.transport.send_query(endpoint, query),
        )
        .await
        .map_err(|source| RouterError::RemoteCall {
            agent: agent.name.clone(),
            source,
        })
    }

    // ========================================================================
    // Workflows
    // ========================================================================

    /// Names of registered workflows in registration order.
    pub async fn list_workflows(&self) -> Vec<String> {
        self.workflows.read().await.names()
    }

    /// Human-readable listing of registered workflows.
    pub async fn workflow_listing(&self) -> String {
        self.workflows.read().await.listing()
    }

    /// Register a workflow under its name.
    pub async fn register_workflow(&self, definition: WorkflowDefinition) -> RouterResult<()> {
        self.workflows.write().await.register(definition)
    }

    /// Run a registered workflow.
    pub async fn execute(&self, name: &str) -> RouterResult<WorkflowExecution> {
        let definition = self
            .workflows
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| RouterError::UnknownWorkflow(name.to_string()))?;
        Ok(self.run_definition(&definition).await)
    }

    /// Run every registered workflow in registration order.
    pub async fn run_all(&self) -> Vec<WorkflowExecution> {
        let definitions: Vec<WorkflowDefinition> =
            self.workflows.read().await.iter().cloned().collect();

        let mut executions = Vec::with_capacity(definitions.len());
        for definition in &definitions {
            executions.push(self.run_definition(definition).await);
        }
        executions
    }

    /// Build a one-off workflow from a description without registering or
    /// running it.
    ///
    /// Use [`Switchboard::run_dynamic`] to build and execute in one call.
    pub fn create_dynamic(&self, description: &str) -> WorkflowDefinition {
        workflow::synthesize(description)
    }

    /// Build a one-off workflow from a description and run it.
    pub async fn run_dynamic(&self, description: &str) -> (WorkflowDefinition, WorkflowExecution) {
        let definition = self.create_dynamic(description);
        let execution = self.run_definition(&definition).await;
        (definition, execution)
    }

    async fn run_definition(&self, definition: &WorkflowDefinition) -> WorkflowExecution {
        let store = self.store_snapshot().await;
        WorkflowEngine::new(&self.router, self.transport.as_ref(), self.config.call_timeout)
            .execute(definition, &store)
            .await
    }

    // ========================================================================
    // Coordination
    // ========================================================================

    /// Decompose, dispatch and join into one answer.
    pub async fn coordinate(&self, query: &str) -> RouterResult<String> {
        Ok(self.coordinate_outcome(query).await?.answer())
    }

    /// Decompose and dispatch, keeping per sub-query results.
    pub async fn coordinate_outcome(&self, query: &str) -> RouterResult<CoordinationOutcome> {
        let store = self.store_snapshot().await;
        Coordinator::new(
            &self.router,
            self.transport.as_ref(),
            self.config.call_timeout,
            self.config.max_fanout,
        )
        .coordinate(query, &store)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::AgentRole;
    use crate::testing::{MockReply, MockTransport};

    fn switchboard() -> (Arc<MockTransport>, Switchboard) {
        let transport = Arc::new(
            MockTransport::new()
                .with_agent("http://echo", "Echo", MockReply::echo("Echo: "))
                .with_agent("http://calc", "Calculator", MockReply::text("42")),
        );
        let switchboard = Switchboard::new(transport.clone(), SwitchboardConfig::default());
        (transport, switchboard)
    }

    fn candidates() -> Vec<Candidate> {
        vec![
            Candidate::new("http://echo", AgentRole::Testing),
            Candidate::new("http://calc", AgentRole::Computation),
        ]
    }

    #[tokio::test]
    async fn test_empty_candidates_rejected() {
        let (_, switchboard) = switchboard();
        let err = switchboard.discover(&[]).await.unwrap_err();
        assert!(matches!(err, RouterError::EmptyCandidates));
    }

    #[tokio::test]
    async fn test_ask_routes_and_answers() {
        let (_, switchboard) = switchboard();
        switchboard.discover(&candidates()).await.unwrap();

        let answer = switchboard.ask("calculate 6 * 7").await.unwrap();
        assert_eq!(answer.decision.agent_name(), "Calculator");
        assert_eq!(answer.text, "42");
    }

    #[tokio::test]
    async fn test_ask_remote_failure_is_error() {
        let (transport, switchboard) = switchboard();
        switchboard.discover(&candidates()).await.unwrap();
        transport.set_reply("http://calc", MockReply::remote_error("http://calc", "overflow"));

        let err = switchboard.ask("calculate 6 * 7").await.unwrap_err();
        assert_eq!(err.error_code(), "REMOTE_CALL_FAILED");
        assert!(err.to_string().contains("Calculator"));
    }

    #[tokio::test]
    async fn test_send_to_named_agent_skips_routing() {
        let (transport, switchboard) = switchboard();
        switchboard.discover(&candidates()).await.unwrap();

        // a calculation query sent to Echo still goes to Echo
        let text = switchboard.send_to("echo", "calculate 6 * 7").await.unwrap();
        assert_eq!(text, "Echo: calculate 6 * 7");
        assert!(transport.calls().iter().all(|(endpoint, _)| endpoint == "http://echo"));
    }

    #[tokio::test]
    async fn test_send_to_errors() {
        let (transport, switchboard) = switchboard();
        switchboard.discover(&candidates()).await.unwrap();

        let err = switchboard.send_to("Weather", "rain?").await.unwrap_err();
        assert_eq!(err.error_code(), "NO_CAPABLE_AGENT");
        assert!(err.to_string().contains("'Weather'"));

        transport.set_reply("http://calc", MockReply::remote_error("http://calc", "overflow"));
        let err = switchboard.send_to("Calculator", "1e999").await.unwrap_err();
        assert_eq!(err.error_code(), "REMOTE_CALL_FAILED");
    }

    #[tokio::test]
    async fn test_clear_store() {
        let (_, switchboard) = switchboard();
        switchboard.discover(&candidates()).await.unwrap();
        assert_eq!(switchboard.store_snapshot().await.len(), 2);

        switchboard.clear_store().await;
        assert!(switchboard.store_snapshot().await.is_empty());
        assert!(matches!(
            switchboard.route("hello").await,
            Err(RouterError::NoCapableAgent(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_workflow() {
        let (_, switchboard) = switchboard();
        let err = switchboard.execute("nope").await.unwrap_err();
        assert!(matches!(err, RouterError::UnknownWorkflow(name) if name == "nope"));
    }

    #[tokio::test]
    async fn test_dynamic_is_not_registered() {
        let (_, switchboard) = switchboard();
        switchboard.discover(&candidates()).await.unwrap();

        let (definition, execution) = switchboard.run_dynamic("calculate 2 + 2").await;
        assert_eq!(execution.workflow_name, definition.name);
        assert_eq!(switchboard.list_workflows().await.len(), 2);

        switchboard.register_workflow(definition.clone()).await.unwrap();
        assert!(switchboard.list_workflows().await.contains(&definition.name));
        let again = switchboard.execute(&definition.name).await.unwrap();
        assert_eq!(again.agents_used(), execution.agents_used());
    }

    #[tokio::test]
    async fn test_explain_lists_scores() {
        let (_, switchboard) = switchboard();
        switchboard.discover(&candidates()).await.unwrap();

        let explanation = switchboard.explain("hello there").await.unwrap();
        assert!(explanation.contains("Chosen agent: Echo"));
        assert!(explanation.contains("Calculator: 0"));
    }
}
