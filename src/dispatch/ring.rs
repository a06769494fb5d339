//! Per-core dispatch rings and the registry that hands them out.
//!
//! Each worker core owns the consuming end of exactly one ring; the control
//! plane holds the single producing end. Rings are bounded crossbeam channels,
//! which gives per-ring FIFO delivery and move-only hand-off: `enqueue` takes
//! the command by value.

use super::command::CommandMessage;
use crate::error::DispatchError;
use crate::types::CoreId;
use crossbeam_channel::{
    bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TrySendError,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Default ring capacity per core
pub const DEFAULT_RING_CAPACITY: usize = 1024;

/// Default time the control thread waits on a full ring
pub const DEFAULT_ENQUEUE_TIMEOUT_MS: u64 = 100;

/// What to do when a ring is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EnqueuePolicy {
    /// Block the control thread until the core frees a slot
    Block,
    /// Block up to `millis`, then fail with `RingFull`
    Timeout { millis: u64 },
    /// Fail with `RingFull` immediately
    FailFast,
}

impl Default for EnqueuePolicy {
    fn default() -> Self {
        EnqueuePolicy::Timeout {
            millis: DEFAULT_ENQUEUE_TIMEOUT_MS,
        }
    }
}

/// Producer side of one worker core's command ring
pub trait CoreDispatchRing: Send + Sync {
    /// Core that drains this ring
    fn core_id(&self) -> CoreId;

    /// Append a command at the tail; ownership moves to the ring
    fn enqueue(&self, command: CommandMessage) -> Result<(), DispatchError>;
}

/// Lookup from worker core to its ring, injected into each port controller
pub trait DispatchRingRegistry: Send + Sync {
    fn get_ring(&self, core_id: CoreId) -> Option<Arc<dyn CoreDispatchRing>>;
}

/// Ring backed by a bounded crossbeam channel
pub struct ChannelRing {
    core_id: CoreId,
    sender: Sender<CommandMessage>,
    policy: EnqueuePolicy,
}

impl ChannelRing {
    /// Create a ring pair for one core
    pub fn new(core_id: CoreId, capacity: usize, policy: EnqueuePolicy) -> (Self, RingConsumer) {
        let (sender, receiver) = bounded(capacity);
        (
            Self {
                core_id,
                sender,
                policy,
            },
            RingConsumer { core_id, receiver },
        )
    }

    /// Commands waiting to be drained
    pub fn len(&self) -> usize {
        self.sender.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sender.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.sender.capacity()
    }
}

impl CoreDispatchRing for ChannelRing {
    fn core_id(&self) -> CoreId {
        self.core_id
    }

    fn enqueue(&self, command: CommandMessage) -> Result<(), DispatchError> {
        let core_id = self.core_id;
        let full = DispatchError::RingFull {
            core_id,
            delivered: 0,
        };
        let disconnected = DispatchError::RingDisconnected {
            core_id,
            delivered: 0,
        };

        match self.policy {
            EnqueuePolicy::Block => self.sender.send(command).map_err(|_| disconnected),
            EnqueuePolicy::Timeout { millis } => self
                .sender
                .send_timeout(command, Duration::from_millis(millis))
                .map_err(|e| match e {
                    SendTimeoutError::Timeout(_) => full,
                    SendTimeoutError::Disconnected(_) => disconnected,
                }),
            EnqueuePolicy::FailFast => self.sender.try_send(command).map_err(|e| match e {
                TrySendError::Full(_) => full,
                TrySendError::Disconnected(_) => disconnected,
            }),
        }
    }
}

/// Worker-core side of a ring
pub struct RingConsumer {
    core_id: CoreId,
    receiver: Receiver<CommandMessage>,
}

impl RingConsumer {
    pub fn core_id(&self) -> CoreId {
        self.core_id
    }

    /// Take the next command without blocking
    pub fn try_recv(&self) -> Option<CommandMessage> {
        self.receiver.try_recv().ok()
    }

    /// Wait up to `timeout` for the next command
    pub fn recv_timeout(&self, timeout: Duration) -> Result<CommandMessage, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Take every pending command, oldest first
    pub fn drain(&self) -> Vec<CommandMessage> {
        let mut commands = Vec::new();
        while let Ok(cmd) = self.receiver.try_recv() {
            commands.push(cmd);
        }
        commands
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

/// Registry of channel rings, one per worker core
#[derive(Default)]
pub struct ChannelRingRegistry {
    rings: HashMap<CoreId, Arc<ChannelRing>>,
}

impl ChannelRingRegistry {
    /// Build one ring per core, returning the consumers for the worker threads
    pub fn new(
        cores: impl IntoIterator<Item = CoreId>,
        capacity: usize,
        policy: EnqueuePolicy,
    ) -> (Self, Vec<RingConsumer>) {
        let mut rings = HashMap::new();
        let mut consumers = Vec::new();

        for core_id in cores {
            if rings.contains_key(&core_id) {
                continue;
            }
            let (ring, consumer) = ChannelRing::new(core_id, capacity, policy);
            rings.insert(core_id, Arc::new(ring));
            consumers.push(consumer);
        }

        tracing::debug!("Created {} dispatch rings (capacity {})", rings.len(), capacity);
        (Self { rings }, consumers)
    }

    /// Sorted ids of every core with a ring
    pub fn cores(&self) -> Vec<CoreId> {
        let mut cores: Vec<_> = self.rings.keys().copied().collect();
        cores.sort_unstable();
        cores
    }

    /// Concrete ring, for inspecting queue depth
    pub fn ring(&self, core_id: CoreId) -> Option<&Arc<ChannelRing>> {
        self.rings.get(&core_id)
    }
}

impl DispatchRingRegistry for ChannelRingRegistry {
    fn get_ring(&self, core_id: CoreId) -> Option<Arc<dyn CoreDispatchRing>> {
        self.rings
            .get(&core_id)
            .map(|ring| ring.clone() as Arc<dyn CoreDispatchRing>)
    }
}
