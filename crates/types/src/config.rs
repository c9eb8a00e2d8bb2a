//! Configuration models.
//!
//! [`ExecutorConfig`] is passed explicitly into every run. [`ProspectConfig`] is
//! the on-disk document read once at process start; see `prospect_util::config`
//! for discovery and loading.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{duration::serde_text, errors::ConfigError};

/// What the executor does after a step fails terminally.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop processing remaining steps; the run finishes Incomplete.
    #[default]
    #[serde(alias = "halt")]
    HaltOnFailure,
    /// Keep going with steps that do not need the failed step's output.
    #[serde(alias = "continue")]
    ContinueOnFailure,
}

/// Per-run executor options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExecutorConfig {
    pub failure_policy: FailurePolicy,
    /// Total handler invocations allowed per step, first attempt included.
    pub max_attempts: u32,
    /// Delay between attempts after a retryable handler error.
    #[serde(with = "serde_text")]
    pub retry_backoff: Duration,
    /// Treat sink failures like step failures and stop the run.
    pub halt_on_write_error: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::HaltOnFailure,
            max_attempts: 3,
            retry_backoff: Duration::from_secs(1),
            halt_on_write_error: false,
        }
    }
}

impl ExecutorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("max_attempts must be at least 1".into()));
        }
        Ok(())
    }
}

/// Manually curated designation used when search results yield none.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DesignationOverride {
    pub name: String,
    pub company: String,
    pub designation: String,
}

/// Web search provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SearchSettings {
    /// Overrides the provider endpoint (useful for local mocks).
    pub base_url: Option<String>,
    /// Upper bound on results requested per query.
    pub results_per_query: u32,
    /// Per-request timeout.
    #[serde(with = "serde_text")]
    pub timeout: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            results_per_query: 5,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ProspectConfig {
    pub executor: ExecutorConfig,
    pub search: SearchSettings,
    pub designation_overrides: Vec<DesignationOverride>,
}

impl ProspectConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.executor.validate()?;
        if self.search.results_per_query == 0 {
            return Err(ConfigError::Invalid("search.results_per_query must be at least 1".into()));
        }
        Ok(())
    }
}
