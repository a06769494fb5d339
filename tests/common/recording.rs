//! Dispatch ring double that records every enqueued command

use portctl::{CommandMessage, CoreDispatchRing, CoreId, DispatchError, DispatchRingRegistry};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<(CoreId, CommandMessage)>>>;
type FullCores = Arc<Mutex<HashSet<CoreId>>>;

struct RecordingRing {
    core_id: CoreId,
    log: Log,
    full_cores: FullCores,
}

impl CoreDispatchRing for RecordingRing {
    fn core_id(&self) -> CoreId {
        self.core_id
    }

    fn enqueue(&self, command: CommandMessage) -> Result<(), DispatchError> {
        if self.full_cores.lock().unwrap().contains(&self.core_id) {
            return Err(DispatchError::RingFull {
                core_id: self.core_id,
                delivered: 0,
            });
        }
        self.log.lock().unwrap().push((self.core_id, command));
        Ok(())
    }
}

/// Registry handing out recording rings for any core
#[derive(Default)]
pub struct RecordingRegistry {
    log: Log,
    full_cores: FullCores,
}

impl RecordingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rings for `core` reject every command as full
    pub fn with_full_core(self, core: CoreId) -> Self {
        self.fill_core(core);
        self
    }

    /// From now on `core` rejects every command as full
    pub fn fill_core(&self, core: CoreId) {
        self.full_cores.lock().unwrap().insert(core);
    }

    /// Everything enqueued so far, in enqueue order
    pub fn sent(&self) -> Vec<(CoreId, CommandMessage)> {
        self.log.lock().unwrap().clone()
    }

    /// Commands received by one core, in FIFO order
    pub fn sent_to(&self, core: CoreId) -> Vec<CommandMessage> {
        self.sent()
            .into_iter()
            .filter(|(c, _)| *c == core)
            .map(|(_, cmd)| cmd)
            .collect()
    }
}

impl DispatchRingRegistry for RecordingRegistry {
    fn get_ring(&self, core_id: CoreId) -> Option<Arc<dyn CoreDispatchRing>> {
        Some(Arc::new(RecordingRing {
            core_id,
            log: self.log.clone(),
            full_cores: self.full_cores.clone(),
        }))
    }
}
