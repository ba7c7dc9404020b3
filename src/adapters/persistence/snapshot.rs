//! Snapshot Store - Atomic JSON Engine State Persistence
//!
//! Saves pool and ledger snapshots to `state.json` using atomic writes
//! (write to tmp file, then rename), so the file on disk is always either
//! the old or the new version — never a partial write.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, instrument};

use crate::domain::pool::MarketPool;
use crate::domain::shares::UserShares;

/// Recoverable engine state: every pool and every ledger row.
///
/// Swap history is not part of the snapshot; the JSONL journal is its
/// durable form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,
    pub pools: Vec<MarketPool>,
    pub shares: Vec<UserShares>,
}

/// Atomic JSON state store for crash recovery.
pub struct SnapshotStore {
    /// Path to state.json.
    state_path: PathBuf,
    /// Temporary path for atomic writes.
    tmp_path: PathBuf,
}

impl SnapshotStore {
    /// Create a new snapshot store in the given data directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub async fn new(data_dir: &str) -> Result<Self> {
        let dir = Path::new(data_dir);
        fs::create_dir_all(dir)
            .await
            .context("Failed to create data directory")?;

        Ok(Self {
            state_path: dir.join("state.json"),
            tmp_path: dir.join("state.json.tmp"),
        })
    }

    /// Save a snapshot atomically (tmp then rename).
    #[instrument(skip(self, snapshot))]
    pub async fn save(&self, snapshot: &EngineSnapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)
            .context("Failed to serialize snapshot")?;

        fs::write(&self.tmp_path, &json)
            .await
            .context("Failed to write tmp snapshot file")?;

        fs::rename(&self.tmp_path, &self.state_path)
            .await
            .context("Failed to rename snapshot file")?;

        info!(
            path = %self.state_path.display(),
            pools = snapshot.pools.len(),
            "Engine snapshot saved"
        );

        Ok(())
    }

    /// Load the most recent snapshot.
    ///
    /// Returns `None` if no snapshot exists (first startup).
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Option<EngineSnapshot>> {
        if !self.state_path.exists() {
            info!("No snapshot file found, starting fresh");
            return Ok(None);
        }

        let json = fs::read_to_string(&self.state_path)
            .await
            .context("Failed to read snapshot file")?;

        let snapshot: EngineSnapshot =
            serde_json::from_str(&json).context("Failed to parse snapshot JSON")?;

        info!(
            pools = snapshot.pools.len(),
            shares = snapshot.shares.len(),
            "Engine snapshot loaded"
        );

        Ok(Some(snapshot))
    }

    /// Check if the snapshot file, when present, is readable.
    pub async fn is_healthy(&self) -> bool {
        if !self.state_path.exists() {
            return true; // First run is OK
        }
        fs::metadata(&self.state_path).await.is_ok()
    }
}
