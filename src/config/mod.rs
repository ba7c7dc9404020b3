//! Configuration Module - TOML-based Engine Configuration
//!
//! Loads and validates configuration from `config.toml`. Engine
//! parameters (minimum trade size, retry budget, backoff) and all
//! persistence/metrics settings are externalized here - nothing is
//! hardcoded in the domain layer.

pub mod loader;

use rust_decimal::Decimal;
use serde::Deserialize;

/// Top-level engine configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the engine begins operation.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Service identity and logging.
  pub service: ServiceConfig,
  /// Swap execution parameters.
  pub engine: EngineConfig,
  /// Persistence configuration.
  pub persistence: PersistenceConfig,
  /// Metrics and monitoring.
  pub metrics: MetricsConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
  /// Human-readable service name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

/// Swap execution parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
  /// Smallest accepted trade: USDC for BUY, shares for SELL.
  #[serde(default = "default_min_trade_amount")]
  pub min_trade_amount: Decimal,
  /// Optimistic-lock attempt budget per swap.
  #[serde(default = "default_max_swap_attempts")]
  pub max_swap_attempts: u32,
  /// First retry backoff in milliseconds; doubles per attempt.
  #[serde(default = "default_retry_base_delay_ms")]
  pub retry_base_delay_ms: u64,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      min_trade_amount: default_min_trade_amount(),
      max_swap_attempts: default_max_swap_attempts(),
      retry_base_delay_ms: default_retry_base_delay_ms(),
    }
  }
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
  /// Directory for JSONL swap journals and state snapshots.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
  /// State snapshot interval (seconds).
  #[serde(default = "default_snapshot_interval")]
  pub snapshot_interval_seconds: u64,
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable the Prometheus/health HTTP endpoint.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_bind_address")]
  pub bind_address: String,
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_min_trade_amount() -> Decimal {
  Decimal::ONE
}

fn default_max_swap_attempts() -> u32 {
  3
}

fn default_retry_base_delay_ms() -> u64 {
  50
}

fn default_data_dir() -> String {
  "data".to_string()
}

fn default_snapshot_interval() -> u64 {
  60
}

fn default_true() -> bool {
  true
}

fn default_bind_address() -> String {
  "0.0.0.0:9090".to_string()
}
