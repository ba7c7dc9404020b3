//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! infrastructure (file I/O, process-local state, HTTP metrics export).
//!
//! Adapter categories:
//! - `metrics`: Prometheus metrics export and health probes
//! - `persistence`: versioned in-memory store, JSONL swap journal,
//!   atomic state snapshots

pub mod metrics;
pub mod persistence;
