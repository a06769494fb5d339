//! Platform collaborator: NIC counters, port properties, port to core topology
//!
//! [`PlatformApi`] is what the port controller consumes. [`StaticPlatform`]
//! answers from the engine configuration and keeps the latest counters pushed
//! by whoever polls the driver.

use crate::config::EngineConfig;
use crate::types::{CoreId, PortId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Interface counters and rates for one port
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceStats {
    pub tx_bps: u64,
    pub rx_bps: u64,
    pub tx_pps: u64,
    pub rx_pps: u64,
    pub total_tx_pkts: u64,
    pub total_rx_pkts: u64,
    pub total_tx_bytes: u64,
    pub total_rx_bytes: u64,
    pub tx_rx_errors: u64,
}

/// Static description of a port's device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortProperties {
    pub driver: String,
    pub speed: String,
}

impl Default for PortProperties {
    fn default() -> Self {
        Self {
            driver: "e1000".to_string(),
            speed: "1 Gbps".to_string(),
        }
    }
}

/// Platform services consumed by the port controller
#[cfg_attr(test, mockall::automock)]
pub trait PlatformApi: Send + Sync {
    /// Current counters for the port
    fn get_interface_stats(&self, port_id: PortId) -> InterfaceStats;

    /// Worker cores responsible for the port
    fn port_id_to_cores(&self, port_id: PortId) -> Vec<CoreId>;

    /// Driver and link speed of the port
    fn port_properties(&self, port_id: PortId) -> PortProperties;
}

/// Platform backed by a fixed topology
#[derive(Debug, Default)]
pub struct StaticPlatform {
    topology: HashMap<PortId, Vec<CoreId>>,
    properties: HashMap<PortId, PortProperties>,
    stats: RwLock<HashMap<PortId, InterfaceStats>>,
}

impl StaticPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build topology and properties from configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut platform = Self::new();
        for port in &config.ports {
            platform = platform
                .with_port(port.id, port.cores.clone())
                .with_properties(
                    port.id,
                    PortProperties {
                        driver: port.driver.clone(),
                        speed: port.speed.clone(),
                    },
                );
        }
        platform
    }

    /// Bind a port to its worker cores
    pub fn with_port(mut self, port_id: PortId, cores: Vec<CoreId>) -> Self {
        self.topology.insert(port_id, cores);
        self
    }

    pub fn with_properties(mut self, port_id: PortId, properties: PortProperties) -> Self {
        self.properties.insert(port_id, properties);
        self
    }

    /// Replace the counters reported for a port
    pub fn update_stats(&self, port_id: PortId, stats: InterfaceStats) {
        match self.stats.write() {
            Ok(mut guard) => {
                guard.insert(port_id, stats);
            }
            Err(poisoned) => {
                tracing::warn!("Stats lock poisoned, recovering");
                poisoned.into_inner().insert(port_id, stats);
            }
        }
    }

    /// Every port with a topology entry, sorted
    pub fn ports(&self) -> Vec<PortId> {
        let mut ports: Vec<_> = self.topology.keys().copied().collect();
        ports.sort_unstable();
        ports
    }
}

impl PlatformApi for StaticPlatform {
    fn get_interface_stats(&self, port_id: PortId) -> InterfaceStats {
        let guard = match self.stats.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.get(&port_id).copied().unwrap_or_default()
    }

    fn port_id_to_cores(&self, port_id: PortId) -> Vec<CoreId> {
        self.topology.get(&port_id).cloned().unwrap_or_default()
    }

    fn port_properties(&self, port_id: PortId) -> PortProperties {
        self.properties.get(&port_id).cloned().unwrap_or_default()
    }
}
