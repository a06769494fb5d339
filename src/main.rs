//! portctl - Main Entry Point
//!
//! Brings up the worker cores and a controller per configured port, runs one
//! start/stop cycle on each port and reports its counters. Intended as a
//! smoke run of the control plane against the configured topology.

use anyhow::Context;
use portctl::{
    ChannelRingRegistry, EngineConfig, PortController, RateCompiler, StaticPlatform, Stream,
    StreamId, WorkerCore,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(&path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => EngineConfig::default(),
    };

    // Keep the appender guard alive until exit so buffered lines are flushed
    let _log_guard = init_logging(&config);

    tracing::info!("Starting port control plane ({} ports)", config.ports.len());

    let running = Arc::new(AtomicBool::new(true));
    let (registry, consumers) =
        ChannelRingRegistry::new(config.all_cores(), config.ring_capacity, config.enqueue_policy);
    let registry = Arc::new(registry);
    let platform = Arc::new(StaticPlatform::from_config(&config));

    let workers: Vec<_> = consumers
        .into_iter()
        .map(|consumer| {
            let worker = WorkerCore::new(consumer, running.clone());
            std::thread::Builder::new()
                .name(format!("worker-{}", worker.core_id()))
                .spawn(move || worker.run())
        })
        .collect::<std::io::Result<_>>()
        .context("Failed to spawn worker core")?;

    for port_config in &config.ports {
        let mut port = PortController::new(
            port_config.id,
            Box::new(RateCompiler::new()),
            platform.clone(),
            registry.clone(),
        )
        .with_owner_handle_len(config.owner_handle_len);

        let handle = port.acquire_owner("portctl");
        if !port.verify_owner_handle(&handle) {
            anyhow::bail!("ownership handle rejected on port {}", port_config.id);
        }

        port.stream_table_mut()
            .insert(Stream::new(StreamId(1), 1000.0).with_packet(vec![0u8; 64]));

        port.start_traffic(1.0)
            .with_context(|| format!("Failed to start traffic on port {}", port_config.id))?;
        tracing::info!("Port {} is {}", port.get_port_id(), port.get_state_as_string());

        port.stop_traffic()
            .with_context(|| format!("Failed to stop traffic on port {}", port_config.id))?;

        let properties = port.get_properties();
        tracing::info!(
            "Port {} ({}, {}) stats: {}",
            port.get_port_id(),
            properties.driver,
            properties.speed,
            port.encode_stats()?
        );
        port.release_owner();
    }

    tracing::info!("Shutting down...");
    running.store(false, Ordering::SeqCst);
    for worker in workers {
        match worker.join() {
            Ok(stats) => tracing::debug!("Worker finished: {:?}", stats),
            Err(_) => tracing::error!("Worker core panicked"),
        }
    }

    Ok(())
}

fn init_logging(config: &EngineConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "portctl.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            None
        }
    }
}
