//! Configuration management for the gradekit client
//!
//! This module handles loading and validating configuration from
//! environment variables and TOML files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::dispatch::retry::RetryPolicy;
use crate::pool::{PoolSeed, ServerKind};
use crate::trace::DEFAULT_TRACE_CAPACITY;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Network and transport configuration
    #[serde(default)]
    pub network: NetworkConfig,

    /// Session cookie configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Retry pacing for poll-until-ready operations
    #[serde(default)]
    pub retry: RetryConfig,

    /// Trace buffer configuration
    #[serde(default)]
    pub trace: TraceConfig,

    /// Pre-registered instances per server kind
    #[serde(default = "default_pools")]
    pub pools: Vec<PoolSeed>,
}

/// Network-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Domain suffix for conventionally-named hosts
    pub domain: String,

    /// Request timeout in seconds, enforced by the transport
    pub request_timeout_secs: u64,
}

/// Session cookie configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session token
    pub cookie_name: String,
}

/// Retry pacing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Seconds between poll attempts
    pub step_delay_secs: u64,

    /// Total attempt budget
    pub max_attempts: u32,
}

/// Trace buffer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Number of trace entries kept
    pub capacity: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            domain: String::from("grading.example.org"),
            request_timeout_secs: 30,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: String::from("u"),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            step_delay_secs: 3,
            max_attempts: 30,
        }
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_TRACE_CAPACITY,
        }
    }
}

fn default_pools() -> Vec<PoolSeed> {
    ServerKind::all()
        .into_iter()
        .map(|kind| PoolSeed::conventional(kind, 1))
        .collect()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let domain = std::env::var("GRADEKIT_DOMAIN")
            .unwrap_or_else(|_| NetworkConfig::default().domain);

        let request_timeout_secs = std::env::var("GRADEKIT_REQUEST_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let cookie_name = std::env::var("GRADEKIT_SESSION_COOKIE")
            .unwrap_or_else(|_| SessionConfig::default().cookie_name);

        let step_delay_secs = std::env::var("GRADEKIT_RETRY_STEP")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(3);

        let max_attempts = std::env::var("GRADEKIT_RETRY_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(30);

        let capacity = std::env::var("GRADEKIT_TRACE_CAPACITY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_TRACE_CAPACITY);

        Ok(Self {
            network: NetworkConfig {
                domain,
                request_timeout_secs,
            },
            session: SessionConfig { cookie_name },
            retry: RetryConfig {
                step_delay_secs,
                max_attempts,
            },
            trace: TraceConfig { capacity },
            pools: default_pools(),
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.network.domain.is_empty() {
            anyhow::bail!("domain must not be empty");
        }

        if self.network.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        let name = &self.session.cookie_name;
        if name.is_empty() || name.contains('=') || name.contains(';') {
            anyhow::bail!("cookie_name must be a plain cookie name");
        }

        if self.retry.max_attempts == 0 {
            anyhow::bail!("max_attempts must be greater than 0");
        }

        if self.trace.capacity == 0 {
            anyhow::bail!("trace capacity must be greater than 0");
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.network.request_timeout_secs)
    }

    /// Build the default retry policy for poll operations
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry.max_attempts)
            .with_step_delay(Duration::from_secs(self.retry.step_delay_secs))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            session: SessionConfig::default(),
            retry: RetryConfig::default(),
            trace: TraceConfig::default(),
            pools: default_pools(),
        }
    }
}
