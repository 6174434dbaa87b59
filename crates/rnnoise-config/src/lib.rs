//! Invoker configuration.
//!
//! Values come from built-in defaults, then an optional JSON file, then
//! `RNNOISE_*` environment variables. The CLI applies its own flags last.

use std::path::Path;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stack given to each worker unless configured otherwise (bytes).
pub const DEFAULT_STACK_BYTES: usize = 45_000;
/// Maximum wait for one invocation (milliseconds).
pub const DEFAULT_DEADLINE_MS: u64 = 2_000;
/// Extra time the caller waits for a cancelled worker to exit (milliseconds).
/// Zero returns control at the deadline and leaves stragglers to the reaper.
pub const DEFAULT_GRACE_MS: u64 = 0;
/// Thread name given to worker contexts.
pub const DEFAULT_WORKER_NAME: &str = "rnnoise_task";

pub const ENV_STACK_BYTES: &str = "RNNOISE_STACK_BYTES";
pub const ENV_DEADLINE_MS: &str = "RNNOISE_DEADLINE_MS";
pub const ENV_GRACE_MS: &str = "RNNOISE_GRACE_MS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("environment variable {name}={value} is not a valid number")]
    InvalidEnv { name: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for the bounded-stack invoker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvokerConfig {
    pub stack_bytes: usize,
    pub deadline_ms: u64,
    pub grace_ms: u64,
    pub worker_name: String,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            stack_bytes: DEFAULT_STACK_BYTES,
            deadline_ms: DEFAULT_DEADLINE_MS,
            grace_ms: DEFAULT_GRACE_MS,
            worker_name: DEFAULT_WORKER_NAME.to_string(),
        }
    }
}

impl InvokerConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    /// Reject values no invocation could succeed with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stack_bytes == 0 {
            return Err(ConfigError::Invalid("stack_bytes must be positive".into()));
        }
        if self.deadline_ms == 0 {
            return Err(ConfigError::Invalid("deadline_ms must be positive".into()));
        }
        if self.worker_name.trim().is_empty() {
            return Err(ConfigError::Invalid("worker_name must not be empty".into()));
        }
        if self.worker_name.contains('\0') {
            return Err(ConfigError::Invalid(
                "worker_name must not contain NUL bytes".into(),
            ));
        }
        Ok(())
    }

    /// Apply `RNNOISE_*` overrides read through `lookup`.
    ///
    /// Taking the lookup as a closure keeps tests off the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_STACK_BYTES) {
            self.stack_bytes = parse_env(ENV_STACK_BYTES, &v)?;
        }
        if let Some(v) = lookup(ENV_DEADLINE_MS) {
            self.deadline_ms = parse_env(ENV_DEADLINE_MS, &v)?;
        }
        if let Some(v) = lookup(ENV_GRACE_MS) {
            self.grace_ms = parse_env(ENV_GRACE_MS, &v)?;
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name,
        value: value.to_string(),
    })
}

/// Read a JSON config file. Missing keys keep their defaults.
pub fn load_config_file(path: &Path) -> Result<InvokerConfig, ConfigError> {
    let display = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: display.clone(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: display,
        source,
    })
}

/// Defaults, then the optional file, then the process environment.
pub fn load_config(path: Option<&Path>) -> Result<InvokerConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            debug!("Loading invoker config from {}", p.display());
            load_config_file(p)?
        }
        None => InvokerConfig::default(),
    };
    config.apply_env(|name| std::env::var(name).ok())?;
    config.validate()?;
    debug!("Invoker config: {config:?}");
    Ok(config)
}
