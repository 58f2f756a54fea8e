//! # Switchboard Router
//!
//! Routes natural-language queries to a fleet of independently deployed
//! agents. Agents are discovered from their capability descriptors, each
//! query goes to the agent whose keywords it matches best, named workflows
//! chain several agents in sequence, and mixed queries are decomposed and
//! answered by several agents at once.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use switchboard_router::testing::{MockReply, MockTransport};
//! use switchboard_router::{AgentRole, Candidate, Switchboard, SwitchboardConfig};
//!
//! # tokio_test::block_on(async {
//! let transport = MockTransport::new()
//!     .with_agent("http://echo", "Echo", MockReply::echo("Echo: "))
//!     .with_agent("http://calc", "Calculator", MockReply::text("345"));
//! let switchboard = Switchboard::new(Arc::new(transport), SwitchboardConfig::default());
//!
//! switchboard
//!     .discover(&[
//!         Candidate::new("http://echo", AgentRole::Testing),
//!         Candidate::new("http://calc", AgentRole::Computation),
//!     ])
//!     .await
//!     .unwrap();
//!
//! let decision = switchboard.route("calculate 15 * 23").await.unwrap();
//! assert_eq!(decision.agent_name(), "Calculator");
//! # });
//! ```

pub mod category;
pub mod config;
pub mod coordinator;
pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod router;
pub mod store;
pub mod switchboard;
pub mod testing;
pub mod transport;
pub mod workflow;

#[cfg(feature = "a2a")]
pub mod a2a;

pub use category::Category;
pub use config::{ConfigError, EcosystemConfig, SettingsFile, SwitchboardConfig, SwitchboardConfigBuilder};
pub use coordinator::{CoordinationOutcome, Coordinator, SubQuery, SubQueryResult, decompose};
pub use descriptor::{AgentDescriptor, AgentRole};
pub use discovery::{Candidate, DiscoveryFailure, DiscoveryReport};
pub use error::{RouterError, RouterResult, TransportError};
pub use router::{FALLBACK_REASON, Router, RoutingDecision};
pub use store::AgentStore;
pub use switchboard::{Answer, Switchboard};
pub use transport::{AgentTransport, CapabilityDescriptor, SkillInfo};
pub use workflow::{
    StepResult, StepTarget, WorkflowDefinition, WorkflowEngine, WorkflowExecution,
    WorkflowRegistry, WorkflowStatus, WorkflowStep,
};

#[cfg(feature = "a2a")]
pub use a2a::A2aTransport;
