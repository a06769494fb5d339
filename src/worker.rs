//! Worker core command loop
//!
//! A [`WorkerCore`] owns the consuming end of one dispatch ring. It drains
//! commands in FIFO order and tracks which compiled program each port is
//! running on this core. Packet generation itself lives elsewhere; this loop
//! is the hand-off point where a program becomes the core's to execute.
//!
//! # Shutdown
//!
//! The loop exits when the shared `running` flag is cleared or when every
//! producer of its ring has been dropped.

use crate::compiler::CompiledProgram;
use crate::dispatch::{CommandMessage, RingConsumer};
use crate::types::{CoreId, PortId};
use crossbeam_channel::{RecvTimeoutError, Sender};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long the loop waits on an empty ring before re-checking `running`
const IDLE_POLL: Duration = Duration::from_millis(10);

/// Notification emitted after a command takes effect on a core
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    Started {
        core_id: CoreId,
        port_id: PortId,
        streams: usize,
    },
    Stopped {
        core_id: CoreId,
        port_id: PortId,
    },
}

/// Counters for one worker core
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub commands: u64,
    pub starts: u64,
    pub stops: u64,
    /// Start for a port that was already running here (program replaced)
    pub restarts: u64,
    /// Stop for a port that was not running here
    pub idle_stops: u64,
}

/// Consumer loop for one worker core's ring
pub struct WorkerCore {
    core_id: CoreId,
    ring: RingConsumer,
    running: Arc<AtomicBool>,
    active: HashMap<PortId, Arc<CompiledProgram>>,
    stats: WorkerStats,
    events: Option<Sender<WorkerEvent>>,
}

impl WorkerCore {
    pub fn new(ring: RingConsumer, running: Arc<AtomicBool>) -> Self {
        Self {
            core_id: ring.core_id(),
            ring,
            running,
            active: HashMap::new(),
            stats: WorkerStats::default(),
            events: None,
        }
    }

    /// Report every applied command on `events`
    pub fn with_events(mut self, events: Sender<WorkerEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn core_id(&self) -> CoreId {
        self.core_id
    }

    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Program currently running for `port_id` on this core
    pub fn active_program(&self, port_id: PortId) -> Option<&CompiledProgram> {
        self.active.get(&port_id).map(Arc::as_ref)
    }

    pub fn active_ports(&self) -> Vec<PortId> {
        let mut ports: Vec<_> = self.active.keys().copied().collect();
        ports.sort_unstable();
        ports
    }

    /// Run until shutdown, returning the final counters
    pub fn run(mut self) -> WorkerStats {
        tracing::info!("Worker core {} started", self.core_id);

        while self.running.load(Ordering::SeqCst) {
            match self.ring.recv_timeout(IDLE_POLL) {
                Ok(cmd) => self.handle_command(cmd),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::debug!("Worker core {} ring closed", self.core_id);
                    break;
                }
            }
        }

        // Anything already queued was committed by the control plane
        self.process_pending();

        tracing::info!(
            "Worker core {} stopped after {} commands",
            self.core_id,
            self.stats.commands
        );
        self.stats
    }

    /// Apply every queued command without blocking; returns how many
    pub fn process_pending(&mut self) -> usize {
        let mut count = 0;
        while let Some(cmd) = self.ring.try_recv() {
            self.handle_command(cmd);
            count += 1;
        }
        count
    }

    fn handle_command(&mut self, cmd: CommandMessage) {
        self.stats.commands += 1;

        match cmd {
            CommandMessage::Start { port_id, program } => {
                let streams = program.streams.len();
                self.stats.starts += 1;
                if self.active.insert(port_id, program).is_some() {
                    self.stats.restarts += 1;
                    tracing::warn!(
                        "Core {} replaced running program for port {}",
                        self.core_id,
                        port_id
                    );
                }
                tracing::debug!(
                    "Core {} start port {} ({} streams)",
                    self.core_id,
                    port_id,
                    streams
                );
                self.emit(WorkerEvent::Started {
                    core_id: self.core_id,
                    port_id,
                    streams,
                });
            }
            CommandMessage::Stop { port_id } => {
                self.stats.stops += 1;
                if self.active.remove(&port_id).is_none() {
                    self.stats.idle_stops += 1;
                }
                tracing::debug!("Core {} stop port {}", self.core_id, port_id);
                self.emit(WorkerEvent::Stopped {
                    core_id: self.core_id,
                    port_id,
                });
            }
        }
    }

    fn emit(&self, event: WorkerEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{RateCompiler, StreamCompiler};
    use crate::dispatch::{ChannelRing, CoreDispatchRing, EnqueuePolicy};
    use crate::stream::Stream;
    use crate::types::StreamId;
    use crossbeam_channel::unbounded;

    fn start(port_id: PortId) -> CommandMessage {
        let program = RateCompiler::new()
            .compile(port_id, &[Stream::new(StreamId(1), 10.0)], 1.0)
            .unwrap();
        CommandMessage::start(program)
    }

    fn worker(capacity: usize) -> (ChannelRing, WorkerCore) {
        let (ring, consumer) = ChannelRing::new(CoreId(1), capacity, EnqueuePolicy::Block);
        (ring, WorkerCore::new(consumer, Arc::new(AtomicBool::new(true))))
    }

    #[test]
    fn test_start_and_stop_track_active_programs() {
        let (ring, mut worker) = worker(8);
        ring.enqueue(start(PortId(0))).unwrap();
        ring.enqueue(start(PortId(1))).unwrap();
        ring.enqueue(CommandMessage::stop(PortId(0))).unwrap();

        assert_eq!(worker.process_pending(), 3);
        assert_eq!(worker.active_ports(), vec![PortId(1)]);
        assert_eq!(worker.active_program(PortId(1)).map(|p| p.streams.len()), Some(1));
        assert_eq!(worker.stats().starts, 2);
        assert_eq!(worker.stats().stops, 1);
        assert_eq!(worker.stats().idle_stops, 0);
    }

    #[test]
    fn test_unexpected_commands_are_counted() {
        let (ring, mut worker) = worker(8);
        ring.enqueue(CommandMessage::stop(PortId(0))).unwrap();
        ring.enqueue(start(PortId(0))).unwrap();
        ring.enqueue(start(PortId(0))).unwrap();
        worker.process_pending();

        assert_eq!(worker.stats().idle_stops, 1);
        assert_eq!(worker.stats().restarts, 1);
        assert_eq!(worker.active_ports(), vec![PortId(0)]);
    }

    #[test]
    fn test_events_are_emitted_in_order() {
        let (ring, worker) = worker(8);
        let (tx, rx) = unbounded();
        let mut worker = worker.with_events(tx);

        ring.enqueue(start(PortId(2))).unwrap();
        ring.enqueue(CommandMessage::stop(PortId(2))).unwrap();
        worker.process_pending();

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                WorkerEvent::Started {
                    core_id: CoreId(1),
                    port_id: PortId(2),
                    streams: 1
                },
                WorkerEvent::Stopped {
                    core_id: CoreId(1),
                    port_id: PortId(2)
                },
            ]
        );
    }

    #[test]
    fn test_run_exits_when_ring_closes() {
        let (ring, worker) = worker(8);
        ring.enqueue(start(PortId(0))).unwrap();
        drop(ring);

        let handle = std::thread::spawn(move || worker.run());
        let stats = handle.join().unwrap();
        assert_eq!(stats.starts, 1);
    }

    #[test]
    fn test_run_exits_on_shutdown_flag() {
        let (ring, consumer) = ChannelRing::new(CoreId(0), 8, EnqueuePolicy::Block);
        let running = Arc::new(AtomicBool::new(true));
        let worker = WorkerCore::new(consumer, running.clone());

        let handle = std::thread::spawn(move || worker.run());
        ring.enqueue(CommandMessage::stop(PortId(0))).unwrap();
        running.store(false, Ordering::SeqCst);

        let stats = handle.join().unwrap();
        assert_eq!(stats.commands, 1);
    }
}
