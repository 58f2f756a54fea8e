//! # Configuration
//!
//! Runtime settings come from three layers, later layers winning: built-in
//! defaults, the `settings` block of the ecosystem file, then environment
//! variables.
//!
//! ## Environment Variables
//!
//! - `SWITCHBOARD_CALL_TIMEOUT_SECS` - Per-call timeout in seconds (default: 30)
//! - `SWITCHBOARD_DISCOVERY_CONCURRENCY` - Descriptor fetches in flight (default: 8)
//! - `SWITCHBOARD_MAX_FANOUT` - Sub-queries dispatched at once (default: 4)
//! - `SWITCHBOARD_FALLBACK_ROLE` - Role of the fallback agent (default: testing)
//!
//! ## Ecosystem File
//!
//! ```yaml
//! agents:
//!   - endpoint: http://localhost:9999
//!     role: testing
//! workflows:
//!   - name: greet
//!     steps:
//!       - target: fallback
//!         query: hello
//! settings:
//!   call_timeout_secs: 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs, time::Duration};
use tracing::info;

use crate::descriptor::AgentRole;
use crate::discovery::Candidate;
use crate::workflow::WorkflowDefinition;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },

    #[error("Invalid configuration file '{}': {message}", path.display())]
    InvalidFile { path: PathBuf, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

const MAX_CALL_TIMEOUT_SECS: u64 = 300;
const MAX_PARALLELISM: usize = 64;

/// Validated runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchboardConfig {
    /// Limit applied to every descriptor fetch and query
    pub call_timeout: Duration,
    /// Descriptor fetches in flight during discovery
    pub discovery_concurrency: usize,
    /// Sub-queries in flight during coordination
    pub max_fanout: usize,
    /// Role the fallback agent is taken from
    pub fallback_role: AgentRole,
}

impl Default for SwitchboardConfig {
    fn default() -> Self {
        let builder = SwitchboardConfigBuilder::default();
        Self {
            call_timeout: Duration::from_secs(builder.call_timeout_secs),
            discovery_concurrency: builder.discovery_concurrency,
            max_fanout: builder.max_fanout,
            fallback_role: builder.fallback_role,
        }
    }
}

/// Settings block of the ecosystem file; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_concurrency: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fanout: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_role: Option<AgentRole>,
}

/// Builder for [`SwitchboardConfig`] with environment variable support
#[derive(Debug, Clone)]
pub struct SwitchboardConfigBuilder {
    call_timeout_secs: u64,
    discovery_concurrency: usize,
    max_fanout: usize,
    fallback_role: AgentRole,
}

impl Default for SwitchboardConfigBuilder {
    fn default() -> Self {
        Self {
            call_timeout_secs: 30,
            discovery_concurrency: 8,
            max_fanout: 4,
            fallback_role: AgentRole::Testing,
        }
    }
}

impl SwitchboardConfigBuilder {
    /// Create a new builder with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any environment variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env()
    }

    /// Override the current values with any `SWITCHBOARD_*` variables set.
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        if let Some(secs) = get_env_u64("SWITCHBOARD_CALL_TIMEOUT_SECS")? {
            self = self.call_timeout_secs(secs);
        }
        if let Some(concurrency) = get_env_usize("SWITCHBOARD_DISCOVERY_CONCURRENCY")? {
            self = self.discovery_concurrency(concurrency);
        }
        if let Some(fanout) = get_env_usize("SWITCHBOARD_MAX_FANOUT")? {
            self = self.max_fanout(fanout);
        }
        if let Some(role) = get_env_role("SWITCHBOARD_FALLBACK_ROLE")? {
            self = self.fallback_role(role);
        }
        Ok(self)
    }

    /// Override the current values with those present in a settings block.
    #[must_use]
    pub fn apply_settings(mut self, settings: &SettingsFile) -> Self {
        if let Some(secs) = settings.call_timeout_secs {
            self.call_timeout_secs = secs;
        }
        if let Some(concurrency) = settings.discovery_concurrency {
            self.discovery_concurrency = concurrency;
        }
        if let Some(fanout) = settings.max_fanout {
            self.max_fanout = fanout;
        }
        if let Some(role) = settings.fallback_role {
            self.fallback_role = role;
        }
        self
    }

    /// Set per-call timeout in seconds
    #[must_use]
    pub fn call_timeout_secs(mut self, secs: u64) -> Self {
        self.call_timeout_secs = secs;
        self
    }

    /// Set how many descriptor fetches run at once
    #[must_use]
    pub fn discovery_concurrency(mut self, concurrency: usize) -> Self {
        self.discovery_concurrency = concurrency;
        self
    }

    /// Set how many sub-queries run at once
    #[must_use]
    pub fn max_fanout(mut self, fanout: usize) -> Self {
        self.max_fanout = fanout;
        self
    }

    /// Set the fallback role
    #[must_use]
    pub fn fallback_role(mut self, role: AgentRole) -> Self {
        self.fallback_role = role;
        self
    }

    /// Validate configuration and build [`SwitchboardConfig`]
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the configuration is invalid.
    pub fn build(self) -> Result<SwitchboardConfig, ConfigError> {
        self.validate()?;

        Ok(SwitchboardConfig {
            call_timeout: Duration::from_secs(self.call_timeout_secs),
            discovery_concurrency: self.discovery_concurrency,
            max_fanout: self.max_fanout,
            fallback_role: self.fallback_role,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.call_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "call_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.call_timeout_secs > MAX_CALL_TIMEOUT_SECS {
            return Err(ConfigError::ValidationError(format!(
                "call_timeout_secs must be <= {MAX_CALL_TIMEOUT_SECS}"
            )));
        }
        check_parallelism("discovery_concurrency", self.discovery_concurrency)?;
        check_parallelism("max_fanout", self.max_fanout)?;
        Ok(())
    }
}

fn check_parallelism(field: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::ValidationError(format!(
            "{field} must be greater than 0"
        )));
    }
    if value > MAX_PARALLELISM {
        return Err(ConfigError::ValidationError(format!(
            "{field} must be <= {MAX_PARALLELISM}"
        )));
    }
    Ok(())
}

// ============================================================================
// Ecosystem file
// ============================================================================

/// Candidate endpoints, extra workflows and settings, usually read from YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcosystemConfig {
    /// Endpoints probed by discovery, in order
    #[serde(default)]
    pub agents: Vec<Candidate>,
    /// Workflows registered after the built-ins
    #[serde(default)]
    pub workflows: Vec<WorkflowDefinition>,
    /// Settings overriding the defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<SettingsFile>,
}

impl Default for EcosystemConfig {
    /// The five local agents of the reference deployment.
    fn default() -> Self {
        Self {
            agents: vec![
                Candidate::new("http://localhost:8000", AgentRole::Discovery),
                Candidate::new("http://localhost:9999", AgentRole::Testing),
                Candidate::new("http://localhost:8001", AgentRole::Information),
                Candidate::new("http://localhost:8002", AgentRole::Computation),
                Candidate::new("http://localhost:8003", AgentRole::Orchestration),
            ],
            workflows: Vec::new(),
            settings: None,
        }
    }
}

impl EcosystemConfig {
    /// Read and validate an ecosystem file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::InvalidFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config = Self::from_yaml(&contents).map_err(|e| match e {
            ConfigError::ValidationError(message) => ConfigError::InvalidFile {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        info!(
            path = %path.display(),
            agents = config.agents.len(),
            workflows = config.workflows.len(),
            "Loaded ecosystem file"
        );
        Ok(config)
    }

    /// Parse and validate YAML text.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(contents)
            .map_err(|e| ConfigError::ValidationError(format!("invalid YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check endpoints and workflows.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for candidate in &self.agents {
            let endpoint = candidate.endpoint.trim();
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(ConfigError::ValidationError(format!(
                    "agent endpoint '{}' must be an http(s) URL",
                    candidate.endpoint
                )));
            }
        }
        for (index, workflow) in self.workflows.iter().enumerate() {
            workflow
                .validate()
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
            if self.workflows[..index].iter().any(|w| w.name == workflow.name) {
                return Err(ConfigError::ValidationError(format!(
                    "workflow '{}' is defined twice",
                    workflow.name
                )));
            }
        }
        Ok(())
    }

    /// Builder seeded with this file's settings block.
    pub fn config_builder(&self) -> SwitchboardConfigBuilder {
        match &self.settings {
            Some(settings) => SwitchboardConfigBuilder::new().apply_settings(settings),
            None => SwitchboardConfigBuilder::new(),
        }
    }
}

// Environment variable helper functions

fn get_env_u64(key: &str) -> Result<Option<u64>, ConfigError> {
    match env::var(key) {
        Ok(val) => val
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid u64 value '{val}': {e}"),
            }),
        Err(_) => Ok(None),
    }
}

fn get_env_usize(key: &str) -> Result<Option<usize>, ConfigError> {
    match env::var(key) {
        Ok(val) => val
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid usize value '{val}': {e}"),
            }),
        Err(_) => Ok(None),
    }
}

fn get_env_role(key: &str) -> Result<Option<AgentRole>, ConfigError> {
    match env::var(key) {
        Ok(val) => val
            .parse::<AgentRole>()
            .map(Some)
            .map_err(|message| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message,
            }),
        Err(_) => Ok(None),
    }
}
