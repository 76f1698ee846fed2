//! Orchestrator configuration
//!
//! Resolution order: defaults, then an optional TOML file, then `QF_*`
//! environment variables. The result is validated before use.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_MAX_CONCURRENT_AGENTS: &str = "QF_MAX_CONCURRENT_AGENTS";
pub const ENV_EXECUTION_TIMEOUT: &str = "QF_EXECUTION_TIMEOUT";
pub const ENV_RESULTS_DIR: &str = "QF_RESULTS_DIR";

/// Orchestrator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Concurrency slots shared by all executions
    pub max_concurrent_agents: usize,
    /// Per-execution deadline in seconds, armed on entering RUNNING
    pub execution_timeout: f64,
    /// Root directory of the file result store
    pub results_dir: PathBuf,
}

impl OrchestratorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With max concurrent agents
    #[inline]
    #[must_use]
    pub fn with_max_agents(mut self, max: usize) -> Self {
        self.max_concurrent_agents = max;
        self
    }

    /// With execution timeout
    #[inline]
    #[must_use]
    pub fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout = timeout.as_secs_f64();
        self
    }

    /// With results directory
    #[inline]
    #[must_use]
    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    /// Execution timeout as a duration
    ///
    /// # Errors
    /// - `ConfigError::Invalid` if the seconds value is negative, NaN or too large
    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        Duration::try_from_secs_f64(self.execution_timeout)
            .map_err(|e| ConfigError::Invalid(format!("execution_timeout: {e}")))
    }

    /// Parse a TOML file; absent keys keep their defaults
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - `ConfigError::Parse` if it is not valid TOML for this config
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `QF_*` overrides from the process environment
    ///
    /// # Errors
    /// - `ConfigError::InvalidEnv` if a numeric override does not parse
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply `QF_*` overrides from an arbitrary lookup
    ///
    /// # Errors
    /// - `ConfigError::InvalidEnv` if a numeric override does not parse
    pub fn apply_env_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_MAX_CONCURRENT_AGENTS) {
            self.max_concurrent_agents =
                value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                    key: ENV_MAX_CONCURRENT_AGENTS,
                    value,
                })?;
        }
        if let Some(value) = lookup(ENV_EXECUTION_TIMEOUT) {
            self.execution_timeout = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: ENV_EXECUTION_TIMEOUT,
                value,
            })?;
        }
        if let Some(value) = lookup(ENV_RESULTS_DIR) {
            self.results_dir = PathBuf::from(value);
        }
        Ok(self)
    }

    /// Defaults, optional file, environment; validated
    ///
    /// # Errors
    /// Any error from [`Self::from_file`], [`Self::apply_env`] or [`Self::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = base.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the orchestrator cannot run with
    ///
    /// # Errors
    /// - `ConfigError::Invalid` for a zero concurrency limit or a non-positive timeout
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_agents == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_agents must be at least 1".into(),
            ));
        }
        if !(self.execution_timeout.is_finite() && self.execution_timeout > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "execution_timeout must be a positive number of seconds, got {}",
                self.execution_timeout
            )));
        }
        self.timeout().map(|_| ())
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_agents: 10,
            execution_timeout: 3600.0,
            results_dir: PathBuf::from("test_results"),
        }
    }
}
