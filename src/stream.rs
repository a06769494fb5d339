//! Stream definitions and the per-port stream table
//!
//! A [`Stream`] is a user-configured traffic pattern. The control plane never
//! looks inside the packet template; it only hands a snapshot of all streams
//! to the compiler when traffic starts.

use crate::types::StreamId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A configured traffic stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    /// Identifier, unique within the owning port
    pub id: StreamId,

    /// Disabled streams stay configured but are not compiled
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Base transmit rate in packets per second, before the multiplier
    pub rate_pps: f64,

    /// Raw packet template
    #[serde(default)]
    pub packet: Vec<u8>,
}

fn default_enabled() -> bool {
    true
}

impl Stream {
    /// Create an enabled stream with an empty packet template
    pub fn new(id: StreamId, rate_pps: f64) -> Self {
        Self {
            id,
            enabled: true,
            rate_pps,
            packet: Vec::new(),
        }
    }

    /// Builder-style packet template
    pub fn with_packet(mut self, packet: impl Into<Vec<u8>>) -> Self {
        self.packet = packet.into();
        self
    }

    /// Builder-style enable flag
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Keyed collection of the streams configured on one port
///
/// Not internally synchronized: the port owns it and only the control
/// thread touches it.
#[derive(Debug, Clone, Default)]
pub struct StreamTable {
    streams: HashMap<StreamId, Stream>,
}

impl StreamTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a stream, returning the one it replaced
    pub fn insert(&mut self, stream: Stream) -> Option<Stream> {
        self.streams.insert(stream.id, stream)
    }

    pub fn remove(&mut self, id: StreamId) -> Option<Stream> {
        self.streams.remove(&id)
    }

    pub fn get(&self, id: StreamId) -> Option<&Stream> {
        self.streams.get(&id)
    }

    pub fn contains(&self, id: StreamId) -> bool {
        self.streams.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn clear(&mut self) {
        self.streams.clear();
    }

    /// Sorted ids of every configured stream
    pub fn ids(&self) -> Vec<StreamId> {
        let mut ids: Vec<_> = self.streams.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Copy of every configured stream, ordered by id
    ///
    /// This is the compiler's input; later table edits do not affect it.
    pub fn snapshot(&self) -> Vec<Stream> {
        let mut streams: Vec<_> = self.streams.values().cloned().collect();
        streams.sort_by_key(|s| s.id);
        streams
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replace_remove() {
        let mut table = StreamTable::new();
        assert!(table.is_empty());

        assert!(table.insert(Stream::new(StreamId(1), 100.0)).is_none());
        let replaced = table.insert(Stream::new(StreamId(1), 200.0));
        assert_eq!(replaced.map(|s| s.rate_pps), Some(100.0));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(StreamId(1)).map(|s| s.rate_pps), Some(200.0));

        assert!(table.remove(StreamId(1)).is_some());
        assert!(table.remove(StreamId(1)).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_snapshot_contains_all_streams_in_id_order() {
        let mut table = StreamTable::new();
        table.insert(Stream::new(StreamId(9), 1.0));
        table.insert(Stream::new(StreamId(2), 1.0));
        table.insert(Stream::new(StreamId(5), 1.0).with_enabled(false));

        let snapshot = table.snapshot();
        let ids: Vec<_> = snapshot.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![StreamId(2), StreamId(5), StreamId(9)]);
        assert_eq!(table.ids(), ids);
    }

    #[test]
    fn test_snapshot_is_detached_from_table() {
        let mut table = StreamTable::new();
        table.insert(Stream::new(StreamId(1), 10.0));
        let snapshot = table.snapshot();

        table.clear();
        assert_eq!(snapshot.len(), 1);
        assert!(!table.contains(StreamId(1)));
    }

    #[test]
    fn test_stream_deserialize_defaults() {
        let stream: Stream = serde_json::from_str(r#"{"id": 4, "rate_pps": 50.0}"#).unwrap();
        assert_eq!(stream.id, StreamId(4));
        assert!(stream.enabled);
        assert!(stream.packet.is_empty());
    }
}
