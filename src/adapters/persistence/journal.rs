//! Swap Journal - Append-only JSONL Swap Records
//!
//! Persists executed swaps to daily JSONL files in the format
//! `swaps/YYYY-MM-DD.jsonl`. Each line is a self-contained JSON record,
//! which keeps writes append-only, makes the files streamable for
//! analysis, and partitions the audit trail naturally by day.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};

use crate::domain::swap::SwapRecord;

/// Append-only JSONL journal with daily file rotation.
pub struct SwapJournal {
    /// Base directory for swap files.
    swaps_dir: PathBuf,
}

impl SwapJournal {
    /// Create a new journal in the given data directory.
    pub async fn new(data_dir: &str) -> Result<Self> {
        let swaps_dir = Path::new(data_dir).join("swaps");

        fs::create_dir_all(&swaps_dir)
            .await
            .context("Failed to create swaps directory")?;

        Ok(Self { swaps_dir })
    }

    /// Append a swap record to today's JSONL file.
    #[instrument(skip(self, record), fields(swap_id = %record.swap_id))]
    pub async fn append(&self, record: &SwapRecord) -> Result<()> {
        let date = Utc::now().format("%Y-%m-%d").to_string();
        let path = self.swaps_dir.join(format!("{date}.jsonl"));

        let mut json =
            serde_json::to_string(record).context("Failed to serialize swap record")?;
        json.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .context("Failed to open swap journal file")?;

        file.write_all(json.as_bytes())
            .await
            .context("Failed to write swap record")?;

        file.flush().await.context("Failed to flush swap journal")?;

        Ok(())
    }

    /// Load all swap records from all daily files, oldest first.
    #[instrument(skip(self))]
    pub async fn load_all(&self) -> Result<Vec<SwapRecord>> {
        let mut swaps = Vec::new();
        let mut entries = fs::read_dir(&self.swaps_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "jsonl") {
                let content = fs::read_to_string(&path).await?;
                for line in content.lines() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<SwapRecord>(line) {
                        Ok(record) => swaps.push(record),
                        Err(e) => {
                            tracing::warn!(
                                file = %path.display(),
                                error = %e,
                                "Skipping malformed swap record"
                            );
                        }
                    }
                }
            }
        }

        swaps.sort_by_key(|s| s.created_at);
        info!(count = swaps.len(), "Loaded swap records");
        Ok(swaps)
    }

    /// Check if the journal directory is writable.
    pub async fn is_healthy(&self) -> bool {
        let test_path = self.swaps_dir.join(".health_check");
        let result = fs::write(&test_path, b"ok").await;
        let _ = fs::remove_file(&test_path).await;
        result.is_ok()
    }
}
