//! Core data types for portctl
//!
//! Identity newtypes and the port state enum shared by every module.
//!
//! # Main Types
//!
//! - [`PortId`] - Physical port number (fits in a `u8`, as the NIC layer uses)
//! - [`CoreId`] - Worker core number
//! - [`StreamId`] - Stream identifier, unique within one port
//! - [`PortState`] - What the port is currently doing

use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical port identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortId(pub u8);

impl PortId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PortId({})", self.0)
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Worker core identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoreId(pub u8);

impl fmt::Debug for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CoreId({})", self.0)
    }
}

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stream identifier within one port's stream table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(pub u32);

impl fmt::Debug for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreamId({})", self.0)
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Port state
///
/// `Down` is only entered and left through the device lifecycle hooks;
/// traffic operations move between `Idle` and `Transmitting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum PortState {
    /// Device not usable
    Down = 0,
    /// Device up, no traffic
    #[default]
    Idle = 1,
    /// Traffic active
    Transmitting = 2,
}

impl PortState {
    /// Name used by the request layer
    pub fn as_str(&self) -> &'static str {
        match self {
            PortState::Down => "down",
            PortState::Idle => "idle",
            PortState::Transmitting => "transmitting",
        }
    }

    /// Decode a raw state code as carried over the wire
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(PortState::Down),
            1 => Some(PortState::Idle),
            2 => Some(PortState::Transmitting),
            _ => None,
        }
    }
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render a raw state code, falling back to `"unknown"` for unmapped values
pub fn state_name_from_raw(raw: u8) -> &'static str {
    PortState::from_raw(raw).map_or("unknown", |s| s.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_names() {
        assert_eq!(PortState::Down.as_str(), "down");
        assert_eq!(PortState::Idle.as_str(), "idle");
        assert_eq!(PortState::Transmitting.as_str(), "transmitting");
        assert_eq!(PortState::default(), PortState::Idle);
    }

    #[test]
    fn test_raw_state_codes() {
        for state in [PortState::Down, PortState::Idle, PortState::Transmitting] {
            assert_eq!(PortState::from_raw(state as u8), Some(state));
            assert_eq!(state_name_from_raw(state as u8), state.as_str());
        }
        assert_eq!(PortState::from_raw(7), None);
        assert_eq!(state_name_from_raw(7), "unknown");
    }

    #[test]
    fn test_id_formatting() {
        assert_eq!(format!("{:?}", PortId(1)), "PortId(1)");
        assert_eq!(CoreId(4).to_string(), "4");
        assert_eq!(StreamId(12).to_string(), "12");
        assert_eq!(PortId(3).index(), 3);
    }

    #[test]
    fn test_state_serde() {
        let json = serde_json::to_string(&PortState::Transmitting).unwrap();
        assert_eq!(json, "\"transmitting\"");
        let back: PortState = serde_json::from_str("\"down\"").unwrap();
        assert_eq!(back, PortState::Down);
    }
}
