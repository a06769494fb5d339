//! Test data builders for creating ports and streams

use portctl::{
    CoreId, DispatchRingRegistry, PortController, PortId, RateCompiler, StaticPlatform, Stream,
    StreamId,
};
use std::sync::Arc;

/// Builder for creating test Streams
pub struct StreamBuilder {
    id: u32,
    rate_pps: f64,
    packet: Vec<u8>,
    enabled: bool,
}

impl StreamBuilder {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            rate_pps: 1000.0,
            packet: vec![0u8; 64],
            enabled: true,
        }
    }

    pub fn rate(mut self, rate_pps: f64) -> Self {
        self.rate_pps = rate_pps;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn build(self) -> Stream {
        Stream::new(StreamId(self.id), self.rate_pps)
            .with_packet(self.packet)
            .with_enabled(self.enabled)
    }
}

/// Port 0 bound to `cores`, using the rate compiler and the given registry
pub fn port_with_registry(
    cores: &[u8],
    registry: Arc<dyn DispatchRingRegistry>,
) -> PortController {
    let platform = StaticPlatform::new().with_port(
        PortId(0),
        cores.iter().copied().map(CoreId).collect(),
    );
    PortController::new(
        PortId(0),
        Box::new(RateCompiler::new()),
        Arc::new(platform),
        registry,
    )
}
