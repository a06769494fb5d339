//! Commands sent from the control plane to worker cores.

use crate::compiler::CompiledProgram;
use crate::types::PortId;
use std::fmt;
use std::sync::Arc;

/// Instruction to one worker core
///
/// The command set is closed. Every bound core receives its own copy made
/// with [`CommandMessage::duplicate`]; a `Start` copy shares the immutable
/// program, never anything mutable.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandMessage {
    /// Begin transmitting the compiled program on the port
    Start {
        port_id: PortId,
        program: Arc<CompiledProgram>,
    },
    /// Stop all transmission on the port
    Stop { port_id: PortId },
}

/// Discriminant of a [`CommandMessage`], handy for logging and assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Start,
    Stop,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::Start => f.write_str("start"),
            CommandKind::Stop => f.write_str("stop"),
        }
    }
}

impl CommandMessage {
    /// Wrap a freshly compiled program; the command takes ownership of it
    pub fn start(program: CompiledProgram) -> Self {
        CommandMessage::Start {
            port_id: program.port_id,
            program: Arc::new(program),
        }
    }

    pub fn stop(port_id: PortId) -> Self {
        CommandMessage::Stop { port_id }
    }

    pub fn port_id(&self) -> PortId {
        match self {
            CommandMessage::Start { port_id, .. } | CommandMessage::Stop { port_id } => *port_id,
        }
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            CommandMessage::Start { .. } => CommandKind::Start,
            CommandMessage::Stop { .. } => CommandKind::Stop,
        }
    }

    /// The program carried by a `Start`
    pub fn program(&self) -> Option<&CompiledProgram> {
        match self {
            CommandMessage::Start { program, .. } => Some(program),
            CommandMessage::Stop { .. } => None,
        }
    }

    /// Independent copy for one more worker core
    #[inline]
    pub fn duplicate(&self) -> Self {
        self.clone()
    }
}
