//! Stream compilation boundary
//!
//! The control plane treats compilation as a pure transform from a stream
//! snapshot and a rate multiplier to a [`CompiledProgram`]. [`StreamCompiler`]
//! is the seam; [`RateCompiler`] is the reference implementation used by the
//! binary and by tests that do not need a double.

use crate::error::CompilationError;
use crate::stream::Stream;
use crate::types::{PortId, StreamId};
use std::collections::HashSet;

/// One stream as the worker cores will execute it
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStream {
    pub stream_id: StreamId,
    /// Effective rate after applying the multiplier
    pub rate_pps: f64,
    pub packet: Vec<u8>,
}

/// Summary of a compilation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramStats {
    /// Streams handed to the compiler
    pub total_streams: usize,
    /// Streams present in the program
    pub compiled_streams: usize,
    /// Disabled streams left out
    pub skipped_streams: usize,
    /// Sum of effective rates
    pub total_rate_pps: f64,
}

/// Executable per-core program for one port
///
/// Immutable once built; commands share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledProgram {
    pub port_id: PortId,
    pub multiplier: f64,
    pub streams: Vec<CompiledStream>,
    pub stats: ProgramStats,
}

impl CompiledProgram {
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

/// Turns a stream set into a compiled program
///
/// Implementations must be pure: identical inputs give equal programs.
#[cfg_attr(test, mockall::automock)]
pub trait StreamCompiler: Send {
    fn compile(
        &self,
        port_id: PortId,
        streams: &[Stream],
        multiplier: f64,
    ) -> Result<CompiledProgram, CompilationError>;
}

/// Scales every enabled stream's rate by the multiplier
#[derive(Debug, Clone, Copy, Default)]
pub struct RateCompiler;

impl RateCompiler {
    pub fn new() -> Self {
        Self
    }

    fn check_multiplier(multiplier: f64) -> Result<(), CompilationError> {
        if multiplier.is_finite() && multiplier > 0.0 {
            Ok(())
        } else {
            Err(CompilationError::InvalidMultiplier(multiplier))
        }
    }
}

impl StreamCompiler for RateCompiler {
    fn compile(
        &self,
        port_id: PortId,
        streams: &[Stream],
        multiplier: f64,
    ) -> Result<CompiledProgram, CompilationError> {
        Self::check_multiplier(multiplier)?;

        let mut seen = HashSet::with_capacity(streams.len());
        let mut compiled = Vec::with_capacity(streams.len());
        let mut skipped = 0;

        for stream in streams {
            if !seen.insert(stream.id) {
                return Err(CompilationError::DuplicateStreamId(stream.id));
            }
            if !stream.enabled {
                skipped += 1;
                continue;
            }
            if !stream.rate_pps.is_finite() || stream.rate_pps <= 0.0 {
                return Err(CompilationError::InvalidRate {
                    stream_id: stream.id,
                    rate: stream.rate_pps,
                });
            }

            let rate_pps = stream.rate_pps * multiplier;
            if !rate_pps.is_finite() {
                return Err(CompilationError::InvalidRate {
                    stream_id: stream.id,
                    rate: rate_pps,
                });
            }

            compiled.push(CompiledStream {
                stream_id: stream.id,
                rate_pps,
                packet: stream.packet.clone(),
            });
        }

        if compiled.is_empty() {
            return Err(CompilationError::NoEnabledStreams);
        }

        let stats = ProgramStats {
            total_streams: streams.len(),
            compiled_streams: compiled.len(),
            skipped_streams: skipped,
            total_rate_pps: compiled.iter().map(|s| s.rate_pps).sum(),
        };

        Ok(CompiledProgram {
            port_id,
            multiplier,
            streams: compiled,
            stats,
        })
    }
}
