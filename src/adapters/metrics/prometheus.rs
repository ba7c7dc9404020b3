//! Prometheus Metrics Registry - Swap Engine Observability
//!
//! Registers and exposes Prometheus metrics alongside the /live and
//! /ready probes. Covers committed swaps, optimistic-lock conflicts,
//! seeded pool count, and journal health.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use tokio::sync::watch;
use tracing::info;

/// Centralized Prometheus metrics for the swap engine.
///
/// All metrics follow the naming convention `predata_amm_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Committed swaps, labelled by action (BUY/SELL).
    pub swaps_committed: IntCounterVec,
    /// Commit attempts rejected by the pool version check.
    pub lock_conflicts: IntCounter,
    /// Journal appends that failed after a successful commit.
    pub journal_failures: IntCounter,
    /// Number of seeded pools currently held.
    pub pools_seeded: IntGauge,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let swaps_committed = IntCounterVec::new(
            Opts::new("predata_amm_swaps_committed_total", "Total committed swaps"),
            &["action"],
        )?;

        let lock_conflicts = IntCounter::new(
            "predata_amm_lock_conflicts_total",
            "Optimistic-lock version conflicts at commit",
        )?;

        let journal_failures = IntCounter::new(
            "predata_amm_journal_failures_total",
            "Failed journal appends after a committed swap",
        )?;

        let pools_seeded = IntGauge::new(
            "predata_amm_pools_seeded",
            "Number of seeded market pools",
        )?;

        registry.register(Box::new(swaps_committed.clone()))?;
        registry.register(Box::new(lock_conflicts.clone()))?;
        registry.register(Box::new(journal_failures.clone()))?;
        registry.register(Box::new(pools_seeded.clone()))?;

        Ok(Self {
            registry,
            swaps_committed,
            lock_conflicts,
            journal_failures,
            pools_seeded,
        })
    }

    /// Render all registered metrics in the Prometheus text format.
    pub fn export(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[derive(Clone)]
struct ServerState {
    metrics: Arc<MetricsRegistry>,
    ready: watch::Receiver<bool>,
}

/// Serve /live, /ready, and /metrics on the given address.
///
/// - `/live`  — liveness probe: 200 while the process runs
/// - `/ready` — readiness probe: 503 once graceful shutdown begins
/// - `/metrics` — Prometheus text exposition
pub async fn serve(
    bind_address: &str,
    metrics: Arc<MetricsRegistry>,
    ready: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let state = ServerState { metrics, ready };

    let app = Router::new()
        .route("/live", get(|| async { StatusCode::OK }))
        .route(
            "/ready",
            get(|State(state): State<ServerState>| async move {
                if *state.ready.borrow() {
                    StatusCode::OK
                } else {
                    StatusCode::SERVICE_UNAVAILABLE
                }
            }),
        )
        .route(
            "/metrics",
            get(|State(state): State<ServerState>| async move {
                match state.metrics.export() {
                    Ok(body) => (StatusCode::OK, body),
                    Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, String::new()),
                }
            }),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!(address = bind_address, "Metrics server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
