//! Multi-step workflows.
//!
//! A workflow is an ordered list of steps, each naming the role of the agent
//! that should take it and a query template. Steps run strictly in sequence;
//! a step may feed on the previous step's output through the `{previous}`
//! placeholder. A failing step is recorded and the run goes on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::coordinator;
use crate::descriptor::AgentRole;
use crate::error::{RouterError, RouterResult};
use crate::router::{Router, RoutingDecision};
use crate::store::AgentStore;
use crate::transport::{AgentTransport, with_timeout};

/// Placeholder replaced with the previous step's output.
pub const PREVIOUS_PLACEHOLDER: &str = "{previous}";

// ============================================================================
// Definitions
// ============================================================================

/// Which agent a step goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StepTarget {
    /// Best-matching agent of this role
    Role(AgentRole),
    /// The router's fallback agent
    Fallback,
}

impl fmt::Display for StepTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepTarget::Role(role) => write!(f, "{role}"),
            StepTarget::Fallback => f.write_str("fallback"),
        }
    }
}

impl TryFrom<String> for StepTarget {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.trim().eq_ignore_ascii_case("fallback") {
            return Ok(StepTarget::Fallback);
        }
        value.parse().map(StepTarget::Role)
    }
}

impl From<StepTarget> for String {
    fn from(target: StepTarget) -> Self {
        target.to_string()
    }
}

/// One step of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Agent the step goes to
    pub target: StepTarget,
    /// Query sent, possibly containing `{previous}`
    #[serde(rename = "query")]
    pub query_template: String,
    /// Whether the previous step's output is fed into the query
    #[serde(default)]
    pub uses_prior_output: bool,
}

impl WorkflowStep {
    /// A step for the best agent of `role`.
    pub fn new(role: AgentRole, query: impl Into<String>) -> Self {
        Self {
            target: StepTarget::Role(role),
            query_template: query.into(),
            uses_prior_output: false,
        }
    }

    /// A step for the fallback agent.
    pub fn fallback(query: impl Into<String>) -> Self {
        Self {
            target: StepTarget::Fallback,
            query_template: query.into(),
            uses_prior_output: false,
        }
    }

    /// Feed the previous step's output into this step.
    pub fn chained(mut self) -> Self {
        self.uses_prior_output = true;
        self
    }

    /// The query to send, given the previous step's output.
    ///
    /// Without a placeholder in the template the previous output is appended
    /// as context.
    pub fn render(&self, previous: Option<&str>) -> String {
        match previous {
            Some(previous) if self.uses_prior_output => {
                if self.query_template.contains(PREVIOUS_PLACEHOLDER) {
                    self.query_template.replace(PREVIOUS_PLACEHOLDER, previous)
                } else {
                    format!("{} (context: {})", self.query_template, previous)
                }
            }
            _ => self.query_template.clone(),
        }
    }
}

/// A named, ordered sequence of steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Unique name
    pub name: String,
    /// What the workflow is for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Steps in execution order
    pub steps: Vec<WorkflowStep>,
}

impl WorkflowDefinition {
    /// Create a workflow with no steps.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            steps: Vec::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a step.
    pub fn with_step(mut self, step: WorkflowStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Check the definition can be executed.
    pub fn validate(&self) -> RouterResult<()> {
        if self.name.trim().is_empty() {
            return Err(RouterError::invalid_workflow(
                &self.name,
                "workflow name is empty",
            ));
        }
        if self.steps.is_empty() {
            return Err(RouterError::invalid_workflow(&self.name, "workflow has no steps"));
        }
        if self.steps[0].uses_prior_output {
            return Err(RouterError::invalid_workflow(
                &self.name,
                "first step cannot use prior output",
            ));
        }
        if let Some(index) = self.steps.iter().position(|s| s.query_template.trim().is_empty()) {
            return Err(RouterError::invalid_workflow(
                &self.name,
                format!("step {} has an empty query", index + 1),
            ));
        }
        Ok(())
    }
}

/// Workflows shipped with the router.
pub fn builtin_workflows() -> Vec<WorkflowDefinition> {
    vec![
        WorkflowDefinition::new("research_calculate")
            .with_description("Look up a fact, then compute with it")
            .with_step(WorkflowStep::new(
                AgentRole::Information,
                "What is the speed of light in meters per second?",
            ))
            .with_step(
                WorkflowStep::new(
                    AgentRole::Computation,
                    "Calculate 299792458 * 60 using the value from: {previous}",
                )
                .chained(),
            )
            .with_step(
                WorkflowStep::fallback("Echo the result back: {previous}").chained(),
            ),
        WorkflowDefinition::new("problem_solving")
            .with_description("Break a problem down, research it and compute an answer")
            .with_step(WorkflowStep::new(
                AgentRole::Information,
                "Find information about the area of a circle formula",
            ))
            .with_step(
                WorkflowStep::new(AgentRole::Computation, "Calculate pi * 5 * 5 given {previous}")
                    .chained(),
            )
            .with_step(WorkflowStep::new(
                AgentRole::Information,
                "Search for real-world applications of circle area",
            ))
            .with_step(WorkflowStep::fallback("Summarize: {previous}").chained()),
    ]
}

/// Build a one-off workflow from a free-text description.
///
/// Each recognized fragment of the description becomes a step for the
/// category's role; a description with no recognized fragment becomes a
/// single step for the fallback agent.
pub fn synthesize(description: &str) -> WorkflowDefinition {
    let name = format!("dynamic_{}", &Uuid::new_v4().simple().to_string()[..8]);
    let mut definition = WorkflowDefinition::new(name).with_description(description.trim());

    for sub_query in coordinator::decompose(description) {
        let step = match sub_query.category {
            Some(category) => WorkflowStep::new(category.preferred_role(), sub_query.text),
            None => WorkflowStep::fallback(sub_query.text),
        };
        definition.steps.push(step);
    }

    debug!(
        workflow = %definition.name,
        steps = definition.steps.len(),
        "Synthesized dynamic workflow"
    );
    definition
}

// ============================================================================
// Registry
// ============================================================================

/// Registered workflows in registration order.
#[derive(Debug, Clone, Default)]
pub struct WorkflowRegistry {
    definitions: Vec<WorkflowDefinition>,
}

impl WorkflowRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in workflows.
    pub fn with_builtins() -> Self {
        Self {
            definitions: builtin_workflows(),
        }
    }

    /// Register a workflow; names must be unique.
    pub fn register(&mut self, definition: WorkflowDefinition) -> RouterResult<()> {
        definition.validate()?;
        if self.get(&definition.name).is_some() {
            return Err(RouterError::invalid_workflow(
                &definition.name,
                "a workflow with this name is already registered",
            ));
        }
        info!(workflow = %definition.name, steps = definition.steps.len(), "Registered workflow");
        self.definitions.push(definition);
        Ok(())
    }

    /// Look up a workflow.
    pub fn get(&self, name: &str) -> Option<&WorkflowDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    /// Workflow names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.definitions.iter().map(|d| d.name.clone()).collect()
    }

    /// Workflows in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &WorkflowDefinition> {
        self.definitions.iter()
    }

    /// Number of registered workflows.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Human-readable listing.
    pub fn listing(&self) -> String {
        if self.definitions.is_empty() {
            return "No workflows registered.".to_string();
        }
        let mut out = String::from("Available workflows:\n");
        for definition in &self.definitions {
            out.push_str(&format!("- {}", definition.name));
            if let Some(description) = &definition.description {
                out.push_str(&format!(": {description}"));
            }
            out.push('\n');
            for (index, step) in definition.steps.iter().enumerate() {
                out.push_str(&format!(
                    "    {}. [{}] {}\n",
                    index + 1,
                    step.target,
                    step.query_template
                ));
            }
        }
        out
    }
}

// ============================================================================
// Execution
// ============================================================================

/// Where a workflow run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Steps are still being executed
    Running,
    /// Every step succeeded
    Completed,
    /// The run finished with at least one failed step
    PartiallyFailed,
    /// No step could be dispatched
    Failed,
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowStatus::Running => f.write_str("running"),
            WorkflowStatus::Completed => f.write_str("completed"),
            WorkflowStatus::PartiallyFailed => f.write_str("partially failed"),
            WorkflowStatus::Failed => f.write_str("failed"),
        }
    }
}

/// What happened in one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// Zero-based position in the workflow
    pub step_index: usize,
    /// Query actually sent
    pub query: String,
    /// Agent the step was dispatched to
    pub agent_used: Option<String>,
    /// Agent answer; empty on failure
    pub output_text: String,
    /// Whether the agent answered
    pub succeeded: bool,
    /// Why the step failed
    pub error_detail: Option<String>,
}

impl StepResult {
    /// Text handed to the next step.
    fn carried_output(&self) -> String {
        match &self.error_detail {
            Some(detail) if !self.succeeded => format!("(previous step failed: {detail})"),
            _ => self.output_text.clone(),
        }
    }
}

/// One run of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecution {
    /// Run identifier
    pub id: Uuid,
    /// Workflow that ran
    pub workflow_name: String,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the last step resolved
    pub finished_at: Option<DateTime<Utc>>,
    /// Step results in step order
    pub steps: Vec<StepResult>,
    /// Overall status
    pub status: WorkflowStatus,
}

impl WorkflowExecution {
    fn start(workflow_name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_name: workflow_name.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            steps: Vec::new(),
            status: WorkflowStatus::Running,
        }
    }

    fn finish(&mut self) {
        let dispatched = self.steps.iter().any(|s| s.agent_used.is_some());
        self.status = if self.steps.iter().all(|s| s.succeeded) {
            WorkflowStatus::Completed
        } else if dispatched {
            WorkflowStatus::PartiallyFailed
        } else {
            WorkflowStatus::Failed
        };
        self.finished_at = Some(Utc::now());
    }

    /// Agents used by each step, in step order.
    pub fn agents_used(&self) -> Vec<Option<&str>> {
        self.steps.iter().map(|s| s.agent_used.as_deref()).collect()
    }

    /// Number of failed steps.
    pub fn failed_steps(&self) -> usize {
        self.steps.iter().filter(|s| !s.succeeded).count()
    }

    /// Output of the last successful step.
    pub fn final_output(&self) -> Option<&str> {
        self.steps
            .iter()
            .rev()
            .find(|s| s.succeeded)
            .map(|s| s.output_text.as_str())
    }

    /// Human-readable report of the run.
    pub fn report(&self) -> String {
        let mut out = format!(
            "Workflow '{}' ({}): {}\n",
            self.workflow_name, self.id, self.status
        );
        for step in &self.steps {
            let agent = step.agent_used.as_deref().unwrap_or("no agent");
            out.push_str(&format!(
                "  Step {} -> {}\n    query: {}\n",
                step.step_index + 1,
                agent,
                step.query
            ));
            match (&step.error_detail, step.succeeded) {
                (Some(detail), false) => out.push_str(&format!("    error: {detail}\n")),
                _ => out.push_str(&format!("    output: {}\n", step.output_text)),
            }
        }
        if let Some(finished_at) = self.finished_at {
            let elapsed = finished_at - self.started_at;
            out.push_str(&format!(
                "  {} of {} steps succeeded in {}ms\n",
                self.steps.len() - self.failed_steps(),
                self.steps.len(),
                elapsed.num_milliseconds()
            ));
        }
        out
    }
}

/// Executes workflow definitions against a store snapshot.
pub struct WorkflowEngine<'a> {
    router: &'a Router,
    transport: &'a dyn AgentTransport,
    call_timeout: Duration,
}

impl<'a> WorkflowEngine<'a> {
    /// Create an engine.
    pub fn new(router: &'a Router, transport: &'a dyn AgentTransport, call_timeout: Duration) -> Self {
        Self {
            router,
            transport,
            call_timeout,
        }
    }

    /// Run every step in order and collect the results.
    pub async fn execute(
        &self,
        definition: &WorkflowDefinition,
        store: &AgentStore,
    ) -> WorkflowExecution {
        let mut execution = WorkflowExecution::start(&definition.name);
        info!(
            workflow = %definition.name,
            execution_id = %execution.id,
            steps = definition.steps.len(),
            "Executing workflow"
        );

        for (index, step) in definition.steps.iter().enumerate() {
            let previous = execution.steps.last().map(StepResult::carried_output);
            let query = step.render(previous.as_deref());
            let result = self.run_step(index, step, query, store).await;
            execution.steps.push(result);
        }

        execution.finish();
        info!(
            workflow = %definition.name,
            execution_id = %execution.id,
            status = %execution.status,
            failed_steps = execution.failed_steps(),
            "Workflow finished"
        );
        execution
    }

    async fn run_step(
        &self,
        index: usize,
        step: &WorkflowStep,
        query: String,
        store: &AgentStore,
    ) -> StepResult {
        let decision = match self.route(step, &query, store) {
            Ok(decision) => decision,
            Err(err) => {
                warn!(step = index, error = %err, "Workflow step could not be routed");
                return StepResult {
                    step_index: index,
                    query,
                    agent_used: None,
                    output_text: String::new(),
                    succeeded: false,
                    error_detail: Some(err.to_string()),
                };
            }
        };

        debug!(
            step = index,
            agent = %decision.agent.name,
            reason = %decision.reason,
            "Dispatching workflow step"
        );

        let endpoint = decision.agent.endpoint.as_str();
        let outcome = with_timeout(
            endpoint,
            self.call_timeout,
            self.transport.send_query(endpoint, &query),
        )
        .await;

        let agent_used = Some(decision.agent.name.clone());
        match outcome {
            Ok(output_text) => StepResult {
                step_index: index,
                query,
                agent_used,
                output_text,
                succeeded: true,
                error_detail: None,
            },
            Err(source) => {
                let err = RouterError::RemoteCall {
                    agent: decision.agent.name.clone(),
                    source,
                };
                warn!(step = index, error = %err, "Workflow step failed");
                StepResult {
                    step_index: index,
                    query,
                    agent_used,
                    output_text: String::new(),
                    succeeded: false,
                    error_detail: Some(err.to_string()),
                }
            }
        }
    }

    fn route(
        &self,
        step: &WorkflowStep,
        query: &str,
        store: &AgentStore,
    ) -> RouterResult<RoutingDecision> {
        match step.target {
            StepTarget::Role(role) => self.router.route_within(query, store, role),
            StepTarget::Fallback => self.router.fallback(query, store),
        }
    }
}
