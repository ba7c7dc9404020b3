//! Persistent Store — Concrete Adapter for the MarketStore Port
//!
//! Wraps `InMemoryStore` (authoritative, transactional hot state),
//! `SwapJournal` (append-only JSONL audit trail), and `SnapshotStore`
//! (atomic crash-recovery snapshots) into a single struct implementing
//! the `MarketStore` trait from `crate::ports::store`.
//!
//! This is the hexagonal architecture glue: the usecases layer only knows
//! the port, never files or JSON. The memory commit is the transaction;
//! the journal is written through after it succeeds and is replayed
//! together with the latest snapshot at startup.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

use super::journal::SwapJournal;
use super::memory::InMemoryStore;
use super::snapshot::{EngineSnapshot, SnapshotStore};
use crate::adapters::metrics::MetricsRegistry;
use crate::domain::error::AmmError;
use crate::domain::pool::{MarketPool, QuestionId};
use crate::domain::shares::UserShares;
use crate::domain::swap::{MemberId, Outcome, SwapRecord};
use crate::ports::store::{CommitOutcome, MarketStore, Page, PageRequest};

/// Durable repository adapter combining hot state, journal, and snapshots.
pub struct PersistentStore {
    memory: InMemoryStore,
    journal: SwapJournal,
    snapshots: SnapshotStore,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl PersistentStore {
    /// Open (or create) the store under a data directory and recover
    /// state: latest snapshot for pools and ledger, journal replay for
    /// the swap history.
    pub async fn open(data_dir: &str) -> Result<Self> {
        let snapshots = SnapshotStore::new(data_dir).await?;
        let journal = SwapJournal::new(data_dir).await?;
        let memory = InMemoryStore::new();

        let swaps = journal.load_all().await?;
        if let Some(snapshot) = snapshots.load().await? {
            info!(
                pools = snapshot.pools.len(),
                shares = snapshot.shares.len(),
                swaps = swaps.len(),
                "Recovered engine state"
            );
            memory
                .restore(snapshot.pools, snapshot.shares, swaps)
                .await;
        } else if !swaps.is_empty() {
            // History without a snapshot: keep the audit trail queryable;
            // pools must be re-seeded by the operator.
            memory.restore(Vec::new(), Vec::new(), swaps).await;
        }

        Ok(Self {
            memory,
            journal,
            snapshots,
            metrics: None,
        })
    }

    /// Attach a metrics registry; commit outcomes are counted there.
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Write the current pools and ledger to the snapshot file.
    pub async fn snapshot(&self) -> Result<()> {
        let (pools, shares) = self.memory.export_state().await;
        self.snapshots
            .save(&EngineSnapshot {
                taken_at: Utc::now(),
                pools,
                shares,
            })
            .await
    }
}

#[async_trait]
impl MarketStore for PersistentStore {
    async fn insert_pool(&self, pool: &MarketPool) -> Result<(), AmmError> {
        self.memory.insert_pool(pool).await?;
        if let Some(metrics) = &self.metrics {
            metrics.pools_seeded.inc();
        }
        Ok(())
    }

    async fn load_pool(&self, question_id: QuestionId) -> Result<Option<MarketPool>, AmmError> {
        self.memory.load_pool(question_id).await
    }

    async fn update_pool(
        &self,
        expected_version: u64,
        pool: &MarketPool,
    ) -> Result<CommitOutcome, AmmError> {
        self.memory.update_pool(expected_version, pool).await
    }

    async fn commit_swap(
        &self,
        expected_version: u64,
        pool: &MarketPool,
        record: &SwapRecord,
        shares: &UserShares,
    ) -> Result<CommitOutcome, AmmError> {
        let outcome = self
            .memory
            .commit_swap(expected_version, pool, record, shares)
            .await?;

        match outcome {
            CommitOutcome::Committed => {
                if let Some(metrics) = &self.metrics {
                    let action = record.action.to_string();
                    metrics
                        .swaps_committed
                        .with_label_values(&[action.as_str()])
                        .inc();
                }
                // The memory commit is the transaction; the journal is a
                // write-behind audit trail, so a failed append degrades
                // auditability but must not fail the already-applied swap.
                if let Err(e) = self.journal.append(record).await {
                    if let Some(metrics) = &self.metrics {
                        metrics.journal_failures.inc();
                    }
                    error!(
                        swap_id = %record.swap_id,
                        error = %e,
                        "Swap journal append failed — audit trail degraded"
                    );
                }
            }
            CommitOutcome::VersionConflict => {
                if let Some(metrics) = &self.metrics {
                    metrics.lock_conflicts.inc();
                }
            }
        }

        Ok(outcome)
    }

    async fn load_shares(
        &self,
        member_id: MemberId,
        question_id: QuestionId,
        outcome: Outcome,
    ) -> Result<Option<UserShares>, AmmError> {
        self.memory.load_shares(member_id, question_id, outcome).await
    }

    async fn shares_for_question(
        &self,
        member_id: MemberId,
        question_id: QuestionId,
    ) -> Result<Vec<UserShares>, AmmError> {
        self.memory.shares_for_question(member_id, question_id).await
    }

    async fn swaps_by_question(
        &self,
        question_id: QuestionId,
        page: PageRequest,
    ) -> Result<Page<SwapRecord>, AmmError> {
        self.memory.swaps_by_question(question_id, page).await
    }

    async fn swaps_by_member(
        &self,
        member_id: MemberId,
        page: PageRequest,
    ) -> Result<Page<SwapRecord>, AmmError> {
        self.memory.swaps_by_member(member_id, page).await
    }

    async fn is_healthy(&self) -> bool {
        self.memory.is_healthy().await
            && self.journal.is_healthy().await
            && self.snapshots.is_healthy().await
    }
}
