//! # portctl: port control plane for a multi-core traffic generator
//!
//! One control thread owns each port's configuration and lifecycle; worker
//! cores own transmission. This crate is the control side: the port state
//! machine, the single-owner lock, and the protocol that hands start/stop
//! commands to every worker core bound to a port.
//!
//! ## Architecture
//!
//! - **Port**: [`PortController`] validates state, compiles streams and dispatches
//! - **Compiler**: [`StreamCompiler`] turns a stream snapshot into a [`CompiledProgram`]
//! - **Dispatch**: one bounded crossbeam ring per worker core, found through an
//!   injected [`DispatchRingRegistry`]
//! - **Platform**: [`PlatformApi`] supplies NIC counters and the port to core map
//! - **Workers**: [`WorkerCore`] drains a ring and takes ownership of programs
//!
//! ## Example
//!
//! ```ignore
//! use portctl::{
//!     ChannelRingRegistry, EngineConfig, PortController, RateCompiler, StaticPlatform,
//!     Stream, StreamId,
//! };
//! use std::sync::Arc;
//!
//! let config = EngineConfig::default();
//! let (registry, consumers) =
//!     ChannelRingRegistry::new(config.all_cores(), config.ring_capacity, config.enqueue_policy);
//! let platform = Arc::new(StaticPlatform::from_config(&config));
//!
//! let mut port = PortController::new(
//!     config.ports[0].id,
//!     Box::new(RateCompiler::new()),
//!     platform,
//!     Arc::new(registry),
//! );
//! let handle = port.acquire_owner("alice");
//! assert!(port.verify_owner_handle(&handle));
//!
//! port.stream_table_mut().insert(Stream::new(StreamId(1), 1000.0));
//! port.start_traffic(1.0)?;
//! port.stop_traffic()?;
//! ```

pub mod compiler;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod platform;
pub mod port;
pub mod stream;
pub mod types;
pub mod worker;

// Re-export commonly used types
pub use compiler::{CompiledProgram, CompiledStream, RateCompiler, StreamCompiler};
pub use config::{EngineConfig, PortConfig};
pub use dispatch::{
    ChannelRingRegistry, CommandKind, CommandMessage, CoreDispatchRing, DispatchRingRegistry,
    EnqueuePolicy, RingConsumer,
};
pub use error::{CompilationError, DispatchError, PortError, PortctlError, Result};
pub use platform::{InterfaceStats, PlatformApi, PortProperties, StaticPlatform};
pub use port::{OwnershipLock, PortController};
pub use stream::{Stream, StreamTable};
pub use types::{CoreId, PortId, PortState, StreamId};
pub use worker::{WorkerCore, WorkerEvent, WorkerStats};
