/*!
 * Network Configuration
 *
 * Runtime configuration for the network stack: buffer pool sizing,
 * per-connection limits and receive defaults.
 */

use crate::core::limits::*;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration loading errors
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    #[diagnostic(code(config::io), help("Check the path set in KERNEL_NET_CONFIG."))]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    #[diagnostic(code(config::parse), help("The config file must be a JSON object."))]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    #[diagnostic(code(config::invalid))]
    Invalid(String),
}

/// Network stack configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct NetConfig {
    /// Payload bytes per I/O buffer
    pub iob_bufsize: usize,

    /// Number of I/O buffers in the shared pool
    pub iob_nbuffers: usize,

    /// Maximum read-ahead bytes held per connection
    pub readahead_limit: usize,

    /// Callback registrations available per connection
    pub max_callbacks: usize,

    /// Default receive timeout in milliseconds (None or 0 = block until data)
    pub recv_timeout_ms: Option<u64>,

    /// Maximum segment size, used for window update thresholds
    pub mss: usize,

    /// Track the CPU servicing each connection and report changes
    pub rss_enabled: bool,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            iob_bufsize: DEFAULT_IOB_BUFSIZE,
            iob_nbuffers: DEFAULT_IOB_NBUFFERS,
            readahead_limit: DEFAULT_READAHEAD_LIMIT,
            max_callbacks: DEFAULT_MAX_CALLBACKS,
            recv_timeout_ms: DEFAULT_RECV_TIMEOUT.map(|d| d.as_millis() as u64),
            mss: DEFAULT_TCP_MSS,
            rss_enabled: true,
        }
    }
}

impl NetConfig {
    /// Tiny pools and limits for exercising exhaustion paths
    pub fn minimal() -> Self {
        Self {
            iob_bufsize: 16,
            iob_nbuffers: 16,
            readahead_limit: 64,
            max_callbacks: 1,
            recv_timeout_ms: Some(100),
            mss: 16,
            rss_enabled: false,
        }
    }

    /// Load from the file named by `KERNEL_NET_CONFIG`, or defaults if unset
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(NET_CONFIG_ENV) {
            Ok(path) => Self::from_file(path),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.iob_bufsize == 0 {
            return Err(ConfigError::Invalid("iob_bufsize must be non-zero".into()));
        }
        if self.iob_nbuffers == 0 {
            return Err(ConfigError::Invalid("iob_nbuffers must be non-zero".into()));
        }
        if self.max_callbacks == 0 {
            return Err(ConfigError::Invalid("max_callbacks must be non-zero".into()));
        }
        if let Some(ms) = self.recv_timeout_ms {
            if Duration::from_millis(ms) > MAX_RECV_TIMEOUT {
                return Err(ConfigError::Invalid(format!(
                    "recv_timeout_ms {} exceeds {}s",
                    ms,
                    MAX_RECV_TIMEOUT.as_secs()
                )));
            }
        }
        Ok(())
    }

    /// Receive timeout, with zero meaning no timeout at all
    #[inline]
    pub fn recv_timeout(&self) -> Option<Duration> {
        self.recv_timeout_ms
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
    }
}
