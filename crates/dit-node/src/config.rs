//! # Node Configuration
//!
//! Runtime parameters read from the environment, with sane defaults.
//!
//! | Variable           | Default     | Description                       |
//! |--------------------|-------------|-----------------------------------|
//! | `DIT_EXPERTS`      | `Echo,Upper`| Comma-separated expert identities |
//! | `DIT_TIMEOUT_MS`   | `800`       | Per-attempt ask timeout           |
//! | `DIT_RETRIES`      | `1`         | Retries after a timed-out attempt |
//! | `DIT_MAX_INFLIGHT` | `64`        | Responder admission limit         |
//! | `DIT_LOG`          | `info`      | Log level filter                  |

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable did not parse.
    #[error("invalid value for {key}: {message}")]
    Invalid {
        /// The offending variable.
        key: &'static str,
        /// Parse failure detail.
        message: String,
    },

    /// The expert list is empty.
    #[error("DIT_EXPERTS must name at least one expert")]
    NoExperts,

    /// The timeout is zero.
    #[error("DIT_TIMEOUT_MS must be positive")]
    ZeroTimeout,
}

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Expert identities served by this node.
    pub experts: Vec<String>,
    /// Per-attempt ask timeout in milliseconds.
    pub timeout_ms: u64,
    /// Retries after a timed-out attempt.
    pub retries: u32,
    /// Responder admission limit.
    pub max_inflight: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            experts: vec!["Echo".to_string(), "Upper".to_string()],
            timeout_ms: 800,
            retries: 1,
            max_inflight: 64,
        }
    }
}

impl NodeConfig {
    /// Read configuration from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let experts = match env::var("DIT_EXPERTS") {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect(),
            Err(_) => defaults.experts,
        };
        Ok(Self {
            experts,
            timeout_ms: env_or("DIT_TIMEOUT_MS", defaults.timeout_ms)?,
            retries: env_or("DIT_RETRIES", defaults.retries)?,
            max_inflight: env_or("DIT_MAX_INFLIGHT", defaults.max_inflight)?,
        })
    }

    /// Validate for startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.experts.is_empty() {
            return Err(ConfigError::NoExperts);
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

fn env_or<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
