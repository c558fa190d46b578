//! Engine and store configuration
//!
//! Configuration is plain data with sensible defaults. A YAML file can supply
//! any subset of fields; the binary then layers CLI flags on top.
//!
//! ```yaml
//! engine:
//!   chunk_size: 4194304
//!   workers: 8
//!   codec: zlib
//! store:
//!   kind: swift
//!   storage_url: https://storage.example.com/v1/AUTH_demo
//!   token: secret
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::transfer::codec::CodecKind;

/// Default chunk size (4MB, pre-compression)
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Default number of upload/rebuild workers per transfer
pub const DEFAULT_WORKERS: usize = 8;

/// Default name of the hidden sibling directory that holds chunk entries
pub const DEFAULT_STORE_DIR_NAME: &str = ".DT_Store";

// =============================================================================
// Engine Configuration
// =============================================================================

/// Configuration for the chunked transfer engine
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Size of each chunk before compression
    pub chunk_size: usize,
    /// Worker threads per upload/rebuild pool
    pub workers: usize,
    /// Codec used for chunk payloads
    pub codec: CodecKind,
    /// Delete chunks left over from a longer previous version on overwrite
    pub reap_stale_chunks: bool,
    /// Hidden sibling directory holding chunk entries
    pub store_dir_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: DEFAULT_WORKERS,
            codec: CodecKind::default(),
            reap_stale_chunks: true,
            store_dir_name: DEFAULT_STORE_DIR_NAME.to_string(),
        }
    }
}

impl EngineConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be > 0".into()));
        }
        if self.workers == 0 {
            return Err(Error::Config("workers must be > 0".into()));
        }
        if self.store_dir_name.is_empty() || self.store_dir_name.contains('/') {
            return Err(Error::Config(format!(
                "store_dir_name must be a single path segment, got '{}'",
                self.store_dir_name
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Retry Configuration
// =============================================================================

/// Bounded retry policy for the HTTP transport
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per request, including the first one
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub base_delay_ms: u64,
    /// Upper bound on any single delay
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 8_000,
            max_delay_ms: 64_000,
        }
    }
}

impl RetryConfig {
    /// Delay to wait after failed attempt number `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let delay = self.base_delay_ms.saturating_mul(factor);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    /// Policy that never sleeps (tests, local runs)
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }
}

// =============================================================================
// Store Configuration
// =============================================================================

/// Which object store the engine talks to
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Process-local store, lost on exit
    Memory,
    /// Directory on the local filesystem
    Local { root: PathBuf },
    /// OpenStack Swift compatible HTTP endpoint
    Swift {
        storage_url: String,
        token: String,
        #[serde(default = "default_verify_tls")]
        verify_tls: bool,
        #[serde(default = "default_connect_timeout_secs")]
        connect_timeout_secs: u64,
        #[serde(default)]
        retry: RetryConfig,
    },
}

fn default_verify_tls() -> bool {
    true
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Memory
    }
}

impl StoreConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        match self {
            StoreConfig::Memory => Ok(()),
            StoreConfig::Local { root } => {
                if root.as_os_str().is_empty() {
                    return Err(Error::Config("local store root must not be empty".into()));
                }
                Ok(())
            }
            StoreConfig::Swift {
                storage_url,
                token,
                retry,
                ..
            } => {
                if storage_url.is_empty() {
                    return Err(Error::Config("swift storage_url must not be empty".into()));
                }
                if token.is_empty() {
                    return Err(Error::Config("swift token must not be empty".into()));
                }
                if retry.max_attempts == 0 {
                    return Err(Error::Config("retry.max_attempts must be > 0".into()));
                }
                Ok(())
            }
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level configuration file layout
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub store: StoreConfig,
}

impl AppConfig {
    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    /// Validate both sections
    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        self.store.validate()
    }
}
