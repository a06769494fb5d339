//! Port control plane
//!
//! [`PortController`] owns one port's state machine, stream table and
//! ownership lock, and turns start/stop requests into commands for the
//! worker cores bound to the port.
//!
//! # State machine
//!
//! ```text
//!            start_traffic            set_link_down
//!   Idle ──────────────────► Transmitting ──────────► Down
//!    ▲  ◄──────────────────                             │
//!    │        stop_traffic                              │
//!    └──────────────────────────────────────────────────┘
//!                         set_link_up
//! ```
//!
//! Request failures (`BadStateForOperation`, `NoStreamsConfigured`,
//! `CompilationFailed`) and dispatch failures never change the state.
//!
//! # Concurrency
//!
//! The controller is driven by a single control thread; every mutating
//! operation takes `&mut self` and there is no internal locking. Only the
//! commands cross into the worker cores, through their dispatch rings.

pub mod ownership;

pub use ownership::{Owner, OwnershipLock, DEFAULT_HANDLE_LEN};

use crate::compiler::StreamCompiler;
use crate::dispatch::{fan_out, CommandMessage, DispatchRingRegistry};
use crate::error::{PortError, Result};
use crate::platform::{PlatformApi, PortProperties};
use crate::stream::StreamTable;
use crate::types::{PortId, PortState};
use std::sync::Arc;

/// Owner name reported while the port is unowned
pub const NO_OWNER: &str = "none";

/// Control-plane side of one physical port
pub struct PortController {
    port_id: PortId,
    state: PortState,
    ownership: OwnershipLock,
    streams: StreamTable,
    compiler: Box<dyn StreamCompiler>,
    platform: Arc<dyn PlatformApi>,
    registry: Arc<dyn DispatchRingRegistry>,
}

impl PortController {
    /// Create an idle, unowned port with an empty stream table
    pub fn new(
        port_id: PortId,
        compiler: Box<dyn StreamCompiler>,
        platform: Arc<dyn PlatformApi>,
        registry: Arc<dyn DispatchRingRegistry>,
    ) -> Self {
        Self {
            port_id,
            state: PortState::Idle,
            ownership: OwnershipLock::default(),
            streams: StreamTable::new(),
            compiler,
            platform,
            registry,
        }
    }

    /// Use owner handles of `len` characters
    pub fn with_owner_handle_len(mut self, len: usize) -> Self {
        self.ownership = OwnershipLock::new(len);
        self
    }

    pub fn get_port_id(&self) -> PortId {
        self.port_id
    }

    pub fn get_state(&self) -> PortState {
        self.state
    }

    pub fn get_state_as_string(&self) -> &'static str {
        self.state.as_str()
    }

    // ==================== Traffic ====================

    /// Compile the configured streams and start them on every bound core
    pub fn start_traffic(&mut self, multiplier: f64) -> std::result::Result<(), PortError> {
        if self.state != PortState::Idle {
            return Err(self.reject(PortError::BadStateForOperation {
                operation: "start traffic",
                state: self.state,
            }));
        }

        if self.streams.is_empty() {
            return Err(self.reject(PortError::NoStreamsConfigured));
        }

        let streams = self.streams.snapshot();
        let program = match self.compiler.compile(self.port_id, &streams, multiplier) {
            Ok(program) => program,
            Err(e) => return Err(self.reject(PortError::CompilationFailed(e))),
        };
        let stream_count = program.streams.len();

        self.send_to_cores(CommandMessage::start(program))?;

        self.state = PortState::Transmitting;
        tracing::info!(
            "Port {} transmitting {} streams at x{}",
            self.port_id,
            stream_count,
            multiplier
        );
        Ok(())
    }

    /// Stop transmission on every bound core
    pub fn stop_traffic(&mut self) -> std::result::Result<(), PortError> {
        if self.state != PortState::Transmitting {
            return Err(self.reject(PortError::BadStateForOperation {
                operation: "stop traffic",
                state: self.state,
            }));
        }

        self.send_to_cores(CommandMessage::stop(self.port_id))?;

        self.state = PortState::Idle;
        tracing::info!("Port {} stopped", self.port_id);
        Ok(())
    }

    fn send_to_cores(&self, command: CommandMessage) -> std::result::Result<(), PortError> {
        let cores = self.platform.port_id_to_cores(self.port_id);
        let kind = command.kind();

        match fan_out(self.registry.as_ref(), self.port_id, &cores, command) {
            Ok(delivered) => {
                tracing::debug!("Port {} {} delivered to {} cores", self.port_id, kind, delivered);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Port {} {} dispatch failed: {}", self.port_id, kind, e);
                Err(PortError::Dispatch(e))
            }
        }
    }

    fn reject(&self, err: PortError) -> PortError {
        tracing::warn!("Port {} request rejected: {}", self.port_id, err);
        err
    }

    // ==================== Device lifecycle ====================

    /// Device went away; stop any traffic and mark the port down
    pub fn set_link_down(&mut self) -> std::result::Result<(), PortError> {
        if self.state == PortState::Transmitting {
            self.stop_traffic()?;
        }
        if self.state != PortState::Down {
            tracing::info!("Port {} link down", self.port_id);
            self.state = PortState::Down;
        }
        Ok(())
    }

    /// Device is usable again
    pub fn set_link_up(&mut self) {
        if self.state == PortState::Down {
            tracing::info!("Port {} link up", self.port_id);
            self.state = PortState::Idle;
        }
    }

    // ==================== Ownership ====================

    pub fn get_owner(&self) -> Option<&str> {
        self.ownership.owner().map(|o| o.id.as_str())
    }

    /// Owner as reported to clients, `"none"` when unowned
    pub fn owner_name(&self) -> &str {
        self.get_owner().unwrap_or(NO_OWNER)
    }

    pub fn get_owner_handle(&self) -> Option<&str> {
        self.ownership.owner().map(|o| o.handle.as_str())
    }

    pub fn is_free_to_acquire(&self) -> bool {
        self.ownership.is_free()
    }

    /// Take ownership, returning the new handle
    pub fn acquire_owner(&mut self, owner_id: impl Into<String>) -> String {
        let owner_id = owner_id.into();
        tracing::info!("Port {} acquired by '{}'", self.port_id, owner_id);
        self.ownership.acquire(owner_id)
    }

    pub fn release_owner(&mut self) {
        if let Some(owner) = self.ownership.owner() {
            tracing::info!("Port {} released by '{}'", self.port_id, owner.id);
        }
        self.ownership.release();
    }

    pub fn verify_owner_handle(&self, handle: &str) -> bool {
        self.ownership.verify(handle)
    }

    // ==================== Streams & platform ====================

    pub fn stream_table(&self) -> &StreamTable {
        &self.streams
    }

    pub fn stream_table_mut(&mut self) -> &mut StreamTable {
        &mut self.streams
    }

    pub fn get_properties(&self) -> PortProperties {
        self.platform.port_properties(self.port_id)
    }

    /// Current interface counters as a JSON record
    ///
    /// Counters are emitted as JSON integers, so 64-bit values survive a
    /// text round trip exactly.
    pub fn encode_stats(&self) -> Result<serde_json::Value> {
        let stats = self.platform.get_interface_stats(self.port_id);
        Ok(serde_json::to_value(stats)?)
    }
}
