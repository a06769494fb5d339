//! Error handling for portctl
//!
//! Request-level failures of a port operation live in [`PortError`]; the
//! cross-core delivery failures in [`DispatchError`]; the compiler's
//! rejections in [`CompilationError`]. [`PortctlError`] covers the
//! configuration layer: IO, parsing and validation.

use crate::types::{CoreId, PortId, PortState, StreamId};
use thiserror::Error;

/// Rejection reported by a stream compiler
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompilationError {
    /// Rate multiplier is not a finite positive number
    #[error("invalid rate multiplier {0}")]
    InvalidMultiplier(f64),

    /// A stream carries a rate the compiler cannot honour
    #[error("stream {stream_id} has invalid rate {rate} pps")]
    InvalidRate { stream_id: StreamId, rate: f64 },

    /// The same stream id appeared twice in the input
    #[error("duplicate stream id {0}")]
    DuplicateStreamId(StreamId),

    /// All streams were disabled
    #[error("no enabled streams to compile")]
    NoEnabledStreams,

    /// Combination the compiler does not support
    #[error("unsupported stream configuration: {0}")]
    Unsupported(String),
}

/// Failure to place a command on a worker core's ring
///
/// These are operational conditions, not part of the request taxonomy:
/// a half-delivered command leaves worker cores disagreeing about the port.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Topology lookup returned no cores for the port
    #[error("no worker cores bound to port {port_id}")]
    NoCoresBound { port_id: PortId },

    /// The registry has no ring for a bound core
    #[error("no dispatch ring registered for core {core_id}")]
    RingNotFound { core_id: CoreId },

    /// Ring stayed full for longer than the enqueue policy allows
    #[error("dispatch ring for core {core_id} is full ({delivered} cores already delivered)")]
    RingFull { core_id: CoreId, delivered: usize },

    /// The consuming worker core has gone away
    #[error("dispatch ring for core {core_id} is disconnected ({delivered} cores already delivered)")]
    RingDisconnected { core_id: CoreId, delivered: usize },
}

impl DispatchError {
    /// Record how many cores had already received the command
    pub(crate) fn with_delivered(self, count: usize) -> Self {
        match self {
            DispatchError::RingFull { core_id, .. } => DispatchError::RingFull {
                core_id,
                delivered: count,
            },
            DispatchError::RingDisconnected { core_id, .. } => DispatchError::RingDisconnected {
                core_id,
                delivered: count,
            },
            other => other,
        }
    }
}

/// Errors returned by port operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PortError {
    /// The operation is not legal in the port's current state
    #[error("cannot {operation} while port is {state}")]
    BadStateForOperation {
        operation: &'static str,
        state: PortState,
    },

    /// Start requested with an empty stream table
    #[error("no streams configured on port")]
    NoStreamsConfigured,

    /// The stream compiler rejected the stream set
    #[error("failed to compile streams: {0}")]
    CompilationFailed(#[from] CompilationError),

    /// Command could not be delivered to every bound core
    #[error("command dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),
}

impl PortError {
    /// True for failures caused by the request itself
    pub fn is_request_error(&self) -> bool {
        !self.is_operational()
    }

    /// True for infrastructure failures that must be escalated
    pub fn is_operational(&self) -> bool {
        matches!(self, PortError::Dispatch(_))
    }
}

/// Main error type for portctl outside of the port operations
#[derive(Error, Debug)]
pub enum PortctlError {
    /// Errors related to configuration loading/saving/validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PortctlError>,
    },
}

impl PortctlError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PortctlError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for PortctlError {
    fn from(err: serde_json::Error) -> Self {
        PortctlError::Serialization(err.to_string())
    }
}

/// Result type alias for portctl operations
pub type Result<T> = std::result::Result<T, PortctlError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<PortctlError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_state_display() {
        let err = PortError::BadStateForOperation {
            operation: "stop traffic",
            state: PortState::Idle,
        };
        assert_eq!(err.to_string(), "cannot stop traffic while port is idle");
    }

    #[test]
    fn test_error_classification() {
        assert!(PortError::NoStreamsConfigured.is_request_error());
        assert!(PortError::from(CompilationError::NoEnabledStreams).is_request_error());

        let dispatch = PortError::from(DispatchError::NoCoresBound { port_id: PortId(3) });
        assert!(dispatch.is_operational());
        assert!(!dispatch.is_request_error());
    }

    #[test]
    fn test_with_delivered() {
        let err = DispatchError::RingFull {
            core_id: CoreId(2),
            delivered: 0,
        }
        .with_delivered(1);
        assert_eq!(
            err,
            DispatchError::RingFull {
                core_id: CoreId(2),
                delivered: 1
            }
        );
        assert!(err.to_string().contains("1 cores already delivered"));
    }

    #[test]
    fn test_io_error_with_context() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = std::result::Result::<(), _>::Err(io)
            .context("Failed to read config file")
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to read config file: IO error: no such file");
    }

    #[test]
    fn test_error_with_context() {
        let err = PortctlError::Config("ring_capacity must be non-zero".to_string());
        let with_ctx = err.with_context("Failed to load engine config");
        assert!(with_ctx.to_string().contains("Failed to load engine config"));
        assert!(with_ctx.to_string().contains("ring_capacity"));
    }
}
