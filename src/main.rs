//! Predata AMM Swap Engine — Entry Point
//!
//! Initializes configuration, logging, persistence recovery, and the
//! metrics/health endpoint. Runs until SIGINT/SIGTERM.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Open the persistent store (snapshot + journal recovery)
//! 4. Wire the swap executor and query service over the store
//! 5. Spawn the metrics/health server (/live, /ready, /metrics)
//! 6. Spawn the periodic snapshot loop
//! 7. Wait for SIGINT → graceful shutdown (drain → final snapshot → exit)

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::{broadcast, watch};
use tracing::{error, info};

mod adapters;
mod config;
mod domain;
mod ports;
mod usecases;

use adapters::metrics::{self, MetricsRegistry};
use adapters::persistence::PersistentStore;
use usecases::market_queries::MarketQueries;
use usecases::swap_executor::SwapExecutor;

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration from config.toml ──────────────
    let config = config::loader::load_config("config.toml")
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(&config.service.log_level)
                }),
        )
        .json()
        .init();

    info!(
        name = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %config.persistence.data_dir,
        "Starting Predata AMM engine"
    );

    // ── 3. Shutdown signal channels ─────────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    let (health_tx, health_rx) = watch::channel(true);

    // ── 4. Metrics registry ─────────────────────────────────
    let metrics_registry =
        Arc::new(MetricsRegistry::new().context("Failed to create metrics registry")?);

    // ── 5. Open the persistent store (recovers prior state) ─
    let store = Arc::new(
        PersistentStore::open(&config.persistence.data_dir)
            .await
            .context("Failed to open persistent store")?
            .with_metrics(Arc::clone(&metrics_registry)),
    );

    // ── 6. Wire the engine surface over the store ───────────
    // Swap traffic arrives through the surrounding platform services,
    // which embed these two; the binary keeps them alive alongside the
    // snapshot loop and the health endpoint.
    let _executor = Arc::new(SwapExecutor::new(Arc::clone(&store), &config.engine));
    let _queries = Arc::new(MarketQueries::new(Arc::clone(&store)));

    // ── 7. Spawn metrics/health server ──────────────────────
    let metrics_handle = if config.metrics.enabled {
        let bind = config.metrics.bind_address.clone();
        let registry = Arc::clone(&metrics_registry);
        let ready = health_rx.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = metrics::prometheus::serve(&bind, registry, ready).await {
                error!(error = %e, "Metrics server failed");
            }
        }))
    } else {
        None
    };

    // ── 8. Spawn periodic snapshot loop ─────────────────────
    let snapshot_store = Arc::clone(&store);
    let snapshot_interval = config.persistence.snapshot_interval_seconds;
    let mut snapshot_shutdown = shutdown_tx.subscribe();
    let snapshot_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(
            snapshot_interval,
        ));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = snapshot_shutdown.recv() => break,
                _ = ticker.tick() => {
                    if let Err(e) = snapshot_store.snapshot().await {
                        error!(error = %e, "Periodic snapshot failed");
                    }
                }
            }
        }
    });

    info!("All tasks spawned — engine is running");

    // ── 9. Wait for SIGINT ──────────────────────────────────
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("SIGINT received, initiating graceful shutdown");
        }
    }

    // ── Graceful shutdown ───────────────────────────────────

    // 1. Mark unready (readiness probe → 503) and stop the loops
    let _ = health_tx.send(false);
    let _ = shutdown_tx.send(());

    // 2. Let the snapshot loop drain
    let _ = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        snapshot_handle,
    )
    .await;

    // 3. Final snapshot so restart recovery is current
    match store.snapshot().await {
        Ok(()) => info!("Final snapshot written"),
        Err(e) => error!(error = %e, "Final snapshot failed"),
    }

    // 4. Stop the metrics server
    if let Some(handle) = metrics_handle {
        handle.abort();
    }

    info!("Shutdown complete");
    Ok(())
}
