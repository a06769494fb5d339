//! Control plane to worker core command delivery
//!
//! # Components
//!
//! - [`CommandMessage`] - Closed set of instructions (`Start`, `Stop`)
//! - [`CoreDispatchRing`] - Producer side of one core's FIFO ring
//! - [`DispatchRingRegistry`] - Core id to ring lookup, injected into each port
//! - [`ChannelRingRegistry`] - Registry backed by bounded crossbeam channels
//! - [`fan_out`] - Delivers one copy of a command to every bound core
//!
//! # Delivery
//!
//! Fan-out resolves every ring before the first enqueue, so a core without a
//! ring aborts the command before any core sees it. Once enqueueing starts it
//! is not atomic across cores: a failure part way through is reported with
//! the number of cores that already received the command.

pub mod command;
pub mod ring;

pub use command::{CommandKind, CommandMessage};
pub use ring::{
    ChannelRing, ChannelRingRegistry, CoreDispatchRing, DispatchRingRegistry, EnqueuePolicy,
    RingConsumer, DEFAULT_ENQUEUE_TIMEOUT_MS, DEFAULT_RING_CAPACITY,
};

use crate::error::DispatchError;
use crate::types::{CoreId, PortId};
use std::collections::HashSet;
use std::sync::Arc;

/// Deliver `command` to the ring of every core in `cores`
///
/// Each distinct core gets exactly one copy, in topology order; the last
/// core receives the original. Returns the number of cores the command was
/// delivered to.
pub fn fan_out(
    registry: &dyn DispatchRingRegistry,
    port_id: PortId,
    cores: &[CoreId],
    command: CommandMessage,
) -> Result<usize, DispatchError> {
    let mut seen = HashSet::new();
    let rings = cores
        .iter()
        .filter(|&&core_id| seen.insert(core_id))
        .map(|&core_id| {
            registry
                .get_ring(core_id)
                .ok_or(DispatchError::RingNotFound { core_id })
        })
        .collect::<Result<Vec<Arc<dyn CoreDispatchRing>>, _>>()?;

    let Some((last, rest)) = rings.split_last() else {
        return Err(DispatchError::NoCoresBound { port_id });
    };

    let kind = command.kind();
    for (delivered, ring) in rest.iter().enumerate() {
        ring.enqueue(command.duplicate())
            .map_err(|e| e.with_delivered(delivered))?;
        tracing::debug!("Enqueued {} for port {} on core {}", kind, port_id, ring.core_id());
    }

    last.enqueue(command)
        .map_err(|e| e.with_delivered(rest.len()))?;
    tracing::debug!("Enqueued {} for port {} on core {}", kind, port_id, last.core_id());

    Ok(rings.len())
}
