//! Node configuration
//!
//! Loaded from a JSON file. Every field has a default, so `{}` is a
//! complete configuration:
//!
//! ```json
//! {
//!   "snapshot": {
//!     "poll_fragment_limit": 20,
//!     "idle": { "max_spins": 10, "max_yields": 5, "min_park_micros": 1, "max_park_micros": 1000 },
//!     "file_max_bytes": 67108864
//!   },
//!   "responder": { "initial_buffer_capacity": 1024 },
//!   "log": { "min_severity": "INFO" }
//! }
//! ```

mod errors;

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::observability::{JsonLogger, Severity};
use crate::responder::DEFAULT_REPLY_BUFFER_CAPACITY;
use crate::snapshot::{BackoffIdleStrategy, DEFAULT_MAX_SNAPSHOT_BYTES, DEFAULT_POLL_FRAGMENT_LIMIT};

pub use errors::{ConfigError, ConfigErrorCode, ConfigResult};

/// Top-level node configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub responder: ResponderConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotConfig {
    /// Fragments handed over per poll while loading (default 20)
    #[serde(default = "default_poll_fragment_limit")]
    pub poll_fragment_limit: usize,

    #[serde(default)]
    pub idle: IdleConfig,

    /// Byte limit for file-backed snapshots (default 64 MiB)
    #[serde(default = "default_file_max_bytes")]
    pub file_max_bytes: u64,
}

/// Backoff idle strategy parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdleConfig {
    #[serde(default = "default_max_spins")]
    pub max_spins: u64,
    #[serde(default = "default_max_yields")]
    pub max_yields: u64,
    #[serde(default = "default_min_park_micros")]
    pub min_park_micros: u64,
    #[serde(default = "default_max_park_micros")]
    pub max_park_micros: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponderConfig {
    #[serde(default = "default_initial_buffer_capacity")]
    pub initial_buffer_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// One of TRACE, INFO, WARN, ERROR, FATAL (case-insensitive)
    #[serde(default = "default_min_severity")]
    pub min_severity: String,
}

fn default_poll_fragment_limit() -> usize {
    DEFAULT_POLL_FRAGMENT_LIMIT
}
fn default_file_max_bytes() -> u64 {
    DEFAULT_MAX_SNAPSHOT_BYTES
}
fn default_max_spins() -> u64 {
    10
}
fn default_max_yields() -> u64 {
    5
}
fn default_min_park_micros() -> u64 {
    1
}
fn default_max_park_micros() -> u64 {
    1000
}
fn default_initial_buffer_capacity() -> usize {
    DEFAULT_REPLY_BUFFER_CAPACITY
}
fn default_min_severity() -> String {
    "INFO".to_string()
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            poll_fragment_limit: default_poll_fragment_limit(),
            idle: IdleConfig::default(),
            file_max_bytes: default_file_max_bytes(),
        }
    }
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            max_spins: default_max_spins(),
            max_yields: default_max_yields(),
            min_park_micros: default_min_park_micros(),
            max_park_micros: default_max_park_micros(),
        }
    }
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            initial_buffer_capacity: default_initial_buffer_capacity(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            min_severity: default_min_severity(),
        }
    }
}

impl NodeConfig {
    /// Load and validate configuration from a JSON file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::read(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration from JSON text
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: NodeConfig = serde_json::from_str(content)
            .map_err(|e| ConfigError::parse(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.snapshot.poll_fragment_limit == 0 {
            return Err(ConfigError::invalid("snapshot.poll_fragment_limit must be > 0"));
        }
        if self.snapshot.file_max_bytes == 0 {
            return Err(ConfigError::invalid("snapshot.file_max_bytes must be > 0"));
        }
        if self.snapshot.idle.max_park_micros == 0 {
            return Err(ConfigError::invalid("snapshot.idle.max_park_micros must be > 0"));
        }
        if self.snapshot.idle.min_park_micros > self.snapshot.idle.max_park_micros {
            return Err(ConfigError::invalid(format!(
                "snapshot.idle.min_park_micros ({}) exceeds max_park_micros ({})",
                self.snapshot.idle.min_park_micros, self.snapshot.idle.max_park_micros
            )));
        }
        if self.responder.initial_buffer_capacity == 0 {
            return Err(ConfigError::invalid(
                "responder.initial_buffer_capacity must be > 0",
            ));
        }
        self.min_severity()?;
        Ok(())
    }

    pub fn min_severity(&self) -> ConfigResult<Severity> {
        Severity::parse(&self.log.min_severity).ok_or_else(|| {
            ConfigError::invalid(format!(
                "Invalid log.min_severity: '{}'. Must be one of TRACE, INFO, WARN, ERROR, FATAL.",
                self.log.min_severity
            ))
        })
    }

    /// Logger honouring `log.min_severity`
    pub fn logger(&self) -> ConfigResult<JsonLogger> {
        Ok(JsonLogger::new(self.min_severity()?))
    }

    /// Backoff strategy built from `snapshot.idle`
    pub fn idle_strategy(&self) -> BackoffIdleStrategy {
        let idle = &self.snapshot.idle;
        BackoffIdleStrategy::new(
            idle.max_spins,
            idle.max_yields,
            Duration::from_micros(idle.min_park_micros),
            Duration::from_micros(idle.max_park_micros),
        )
    }

    /// Pretty JSON of the effective configuration
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
