//! Crawler configuration.
//!
//! Loaded from an optional YAML file; every field has a default, so an empty
//! file (or no file) yields a working crawler on port 6881:
//!
//! ```yaml
//! listen_addr: "0.0.0.0:6881"
//! bootstrap_nodes:
//!   - "router.bittorrent.com:6881"
//! rejoin_interval_secs: 5
//! pending_timeout_secs: 60
//! sink_capacity: 1024
//! flow:
//!   initial: 16
//!   step: 16
//!   ceiling: 512
//!   tick_millis: 1000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    BOOTSTRAP_NODES, DEFAULT_PORT, PENDING_TIMEOUT, RECV_BUFFER_SIZE, REJOIN_INTERVAL,
    SINK_CAPACITY, STATS_INTERVAL,
};
use crate::flow::FlowConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// UDP address the crawler binds for both sending and receiving.
    pub listen_addr: String,
    /// `host:port` entries contacted at startup and on every rejoin.
    pub bootstrap_nodes: Vec<String>,
    pub rejoin_interval_secs: u64,
    /// Unanswered queries older than this are dropped on the next rejoin.
    pub pending_timeout_secs: u64,
    /// Harvested announces buffered before the crawler blocks.
    pub sink_capacity: usize,
    pub recv_buffer_size: usize,
    pub stats_interval_secs: u64,
    pub flow: FlowConfig,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            listen_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            bootstrap_nodes: BOOTSTRAP_NODES.iter().map(|s| s.to_string()).collect(),
            rejoin_interval_secs: REJOIN_INTERVAL.as_secs(),
            pending_timeout_secs: PENDING_TIMEOUT.as_secs(),
            sink_capacity: SINK_CAPACITY,
            recv_buffer_size: RECV_BUFFER_SIZE,
            stats_interval_secs: STATS_INTERVAL.as_secs(),
            flow: FlowConfig::default(),
        }
    }
}

impl CrawlerConfig {
    /// Reads and validates a YAML config file.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = serde_yaml::from_str(&contents).map_err(|e| ConfigError::ParseYaml {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| Err(ConfigError::Invalid(reason.to_string()));

        if self.bootstrap_nodes.is_empty() {
            return invalid("bootstrap_nodes must not be empty");
        }
        if self.rejoin_interval_secs == 0 {
            return invalid("rejoin_interval_secs must be positive");
        }
        if self.pending_timeout_secs == 0 {
            return invalid("pending_timeout_secs must be positive");
        }
        if self.stats_interval_secs == 0 {
            return invalid("stats_interval_secs must be positive");
        }
        if self.sink_capacity == 0 {
            return invalid("sink_capacity must be positive");
        }
        if self.recv_buffer_size == 0 {
            return invalid("recv_buffer_size must be positive");
        }
        if self.flow.ceiling == 0 {
            return invalid("flow.ceiling must be positive");
        }
        if self.flow.step == 0 {
            return invalid("flow.step must be positive");
        }
        if self.flow.tick_millis == 0 {
            return invalid("flow.tick_millis must be positive");
        }
        if self.flow.initial > self.flow.ceiling {
            return invalid("flow.initial must not exceed flow.ceiling");
        }

        Ok(())
    }

    pub fn rejoin_interval(&self) -> Duration {
        Duration::from_secs(self.rejoin_interval_secs)
    }

    pub fn pending_timeout(&self) -> Duration {
        Duration::from_secs(self.pending_timeout_secs)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }
}
