//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Arguments
/// * `path` - Path to the config.toml file
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config: AppConfig = toml::from_str(&content)
    .with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;

  info!(
    service = %config.service.name,
    min_trade = %config.engine.min_trade_amount,
    attempts = config.engine.max_swap_attempts,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
  anyhow::ensure!(
    !config.service.name.is_empty(),
    "Service name must not be empty"
  );

  // Engine validation
  anyhow::ensure!(
    config.engine.min_trade_amount > Decimal::ZERO,
    "min_trade_amount must be positive, got {}",
    config.engine.min_trade_amount
  );
  anyhow::ensure!(
    config.engine.max_swap_attempts >= 1 && config.engine.max_swap_attempts <= 100,
    "max_swap_attempts must be in [1, 100], got {}",
    config.engine.max_swap_attempts
  );
  anyhow::ensure!(
    config.engine.retry_base_delay_ms > 0,
    "retry_base_delay_ms must be positive"
  );

  // Persistence validation
  anyhow::ensure!(
    !config.persistence.data_dir.is_empty(),
    "Persistence data_dir must not be empty"
  );
  anyhow::ensure!(
    config.persistence.snapshot_interval_seconds > 0,
    "snapshot_interval_seconds must be positive"
  );

  // Metrics validation
  if config.metrics.enabled {
    anyhow::ensure!(
      !config.metrics.bind_address.is_empty(),
      "Metrics bind_address must not be empty"
    );
  }

  Ok(())
}
