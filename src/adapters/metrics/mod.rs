//! Metrics and Monitoring Adapters
//!
//! Provides Prometheus metrics export and health check endpoints
//! (/live, /ready, /metrics) via axum 0.7.

pub mod prometheus;

pub use prometheus::MetricsRegistry;
