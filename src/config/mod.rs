//! Engine configuration
//!
//! Describes the ports the control plane manages, the worker cores bound to
//! each, and how commands are queued to those cores.
//!
//! # File formats
//!
//! The format follows the file extension:
//! - `.toml` - parsed with `toml`
//! - `.json` (or anything else) - parsed with `serde_json`
//!
//! Every field has a default, so a partial file is valid.
//!
//! # Example
//!
//! ```toml
//! ring_capacity = 512
//! owner_handle_len = 8
//!
//! [enqueue_policy]
//! mode = "timeout"
//! millis = 50
//!
//! [[ports]]
//! id = 0
//! cores = [1, 2]
//! driver = "ixgbe"
//! speed = "10 Gbps"
//! ```

use crate::dispatch::{EnqueuePolicy, DEFAULT_RING_CAPACITY};
use crate::error::{PortctlError, Result, ResultExt};
use crate::port::DEFAULT_HANDLE_LEN;
use crate::types::{CoreId, PortId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default log filter when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "info,portctl=debug";

/// One managed port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortConfig {
    pub id: PortId,
    /// Worker cores that transmit for this port
    pub cores: Vec<CoreId>,
    pub driver: String,
    pub speed: String,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            id: PortId(0),
            cores: vec![CoreId(1)],
            driver: "e1000".to_string(),
            speed: "1 Gbps".to_string(),
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Slots in each worker core's dispatch ring
    pub ring_capacity: usize,

    /// Length of generated owner handles
    pub owner_handle_len: usize,

    /// Directory for rolling log files; stdout only when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is not set
    pub log_filter: String,

    /// Behaviour when a ring is full
    pub enqueue_policy: EnqueuePolicy,

    pub ports: Vec<PortConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ring_capacity: DEFAULT_RING_CAPACITY,
            owner_handle_len: DEFAULT_HANDLE_LEN,
            log_dir: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            enqueue_policy: EnqueuePolicy::default(),
            ports: vec![PortConfig::default()],
        }
    }
}

impl EngineConfig {
    /// Load and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        let config = if is_toml(path) {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
        .with_context(|| format!("Failed to parse config file {:?}", path))?;

        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load engine config, using defaults: {}", e);
            Self::default()
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| PortctlError::Config(e.to_string()))
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| PortctlError::Config(e.to_string()))
    }

    /// Save to disk in the format matching the extension
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let content = if is_toml(path) {
            toml::to_string_pretty(self)
                .map_err(|e| PortctlError::Config(format!("Failed to serialize config: {}", e)))?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file {:?}", path))
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.ring_capacity == 0 {
            return Err(PortctlError::Config("ring_capacity must be non-zero".to_string()));
        }
        if self.owner_handle_len == 0 {
            return Err(PortctlError::Config(
                "owner_handle_len must be non-zero".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for port in &self.ports {
            if !seen.insert(port.id) {
                return Err(PortctlError::Config(format!("duplicate port id {}", port.id)));
            }
            if port.cores.is_empty() {
                return Err(PortctlError::Config(format!(
                    "port {} has no worker cores",
                    port.id
                )));
            }
        }
        Ok(())
    }

    /// Every worker core referenced by any port, sorted and deduplicated
    pub fn all_cores(&self) -> Vec<CoreId> {
        let mut cores: Vec<_> = self
            .ports
            .iter()
            .flat_map(|p| p.cores.iter().copied())
            .collect();
        cores.sort_unstable();
        cores.dedup();
        cores
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "toml")
}
