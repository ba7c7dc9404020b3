//! In-memory Market Store - Versioned CAS over Process-local Maps
//!
//! The authoritative hot state of the engine. One `tokio` write lock
//! spans the version check and all three writes of a swap commit, which
//! gives the all-or-nothing semantics the port demands; readers share a
//! read lock and never block each other.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::error::AmmError;
use crate::domain::pool::{MarketPool, QuestionId};
use crate::domain::shares::UserShares;
use crate::domain::swap::{MemberId, Outcome, SwapRecord};
use crate::ports::store::{CommitOutcome, MarketStore, Page, PageRequest, SortOrder};

type SharesKey = (MemberId, QuestionId, Outcome);

#[derive(Default)]
struct Tables {
    pools: HashMap<QuestionId, MarketPool>,
    shares: HashMap<SharesKey, UserShares>,
    swaps: Vec<SwapRecord>,
}

/// Process-local [`MarketStore`] implementation.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the store contents wholesale (startup recovery).
    pub async fn restore(
        &self,
        pools: Vec<MarketPool>,
        shares: Vec<UserShares>,
        mut swaps: Vec<SwapRecord>,
    ) {
        swaps.sort_by_key(|s| s.created_at);
        let mut tables = self.tables.write().await;
        tables.pools = pools.into_iter().map(|p| (p.question_id, p)).collect();
        tables.shares = shares
            .into_iter()
            .map(|s| ((s.member_id, s.question_id, s.outcome), s))
            .collect();
        tables.swaps = swaps;
    }

    /// Snapshot the recoverable state: all pools and ledger rows.
    /// Swap records are recovered from the journal instead.
    pub async fn export_state(&self) -> (Vec<MarketPool>, Vec<UserShares>) {
        let tables = self.tables.read().await;
        let mut pools: Vec<MarketPool> = tables.pools.values().cloned().collect();
        pools.sort_by_key(|p| p.question_id);
        let mut shares: Vec<UserShares> = tables.shares.values().cloned().collect();
        shares.sort_by_key(|s| (s.member_id, s.question_id));
        (pools, shares)
    }

    fn paginate(mut matched: Vec<SwapRecord>, page: PageRequest) -> Page<SwapRecord> {
        matched.sort_by_key(|s| s.created_at);
        if page.order == SortOrder::Descending {
            matched.reverse();
        }
        let total = matched.len();
        let items = matched
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .collect();
        Page { items, total }
    }
}

#[async_trait]
impl MarketStore for InMemoryStore {
    async fn insert_pool(&self, pool: &MarketPool) -> Result<(), AmmError> {
        let mut tables = self.tables.write().await;
        if tables.pools.contains_key(&pool.question_id) {
            return Err(AmmError::AlreadySeeded {
                question_id: pool.question_id,
            });
        }
        tables.pools.insert(pool.question_id, pool.clone());
        Ok(())
    }

    async fn load_pool(&self, question_id: QuestionId) -> Result<Option<MarketPool>, AmmError> {
        let tables = self.tables.read().await;
        Ok(tables.pools.get(&question_id).cloned())
    }

    async fn update_pool(
        &self,
        expected_version: u64,
        pool: &MarketPool,
    ) -> Result<CommitOutcome, AmmError> {
        let mut tables = self.tables.write().await;
        let current_version = tables.pools.get(&pool.question_id).map(|p| p.version);
        match current_version {
            None => Err(AmmError::PoolNotFound {
                question_id: pool.question_id,
            }),
            Some(version) if version != expected_version => {
                Ok(CommitOutcome::VersionConflict)
            }
            Some(_) => {
                tables.pools.insert(pool.question_id, pool.clone());
                Ok(CommitOutcome::Committed)
            }
        }
    }

    async fn commit_swap(
        &self,
        expected_version: u64,
        pool: &MarketPool,
        record: &SwapRecord,
        shares: &UserShares,
    ) -> Result<CommitOutcome, AmmError> {
        let mut tables = self.tables.write().await;
        let current_version = tables.pools.get(&pool.question_id).map(|p| p.version);
        match current_version {
            None => Err(AmmError::PoolNotFound {
                question_id: pool.question_id,
            }),
            Some(version) if version != expected_version => {
                Ok(CommitOutcome::VersionConflict)
            }
            Some(_) => {
                tables.pools.insert(pool.question_id, pool.clone());
                tables.swaps.push(record.clone());
                tables.shares.insert(
                    (shares.member_id, shares.question_id, shares.outcome),
                    shares.clone(),
                );
                Ok(CommitOutcome::Committed)
            }
        }
    }

    async fn load_shares(
        &self,
        member_id: MemberId,
        question_id: QuestionId,
        outcome: Outcome,
    ) -> Result<Option<UserShares>, AmmError> {
        let tables = self.tables.read().await;
        Ok(tables
            .shares
            .get(&(member_id, question_id, outcome))
            .cloned())
    }

    async fn shares_for_question(
        &self,
        member_id: MemberId,
        question_id: QuestionId,
    ) -> Result<Vec<UserShares>, AmmError> {
        let tables = self.tables.read().await;
        Ok(tables
            .shares
            .values()
            .filter(|s| s.member_id == member_id && s.question_id == question_id)
            .cloned()
            .collect())
    }

    async fn swaps_by_question(
        &self,
        question_id: QuestionId,
        page: PageRequest,
    ) -> Result<Page<SwapRecord>, AmmError> {
        let tables = self.tables.read().await;
        let matched = tables
            .swaps
            .iter()
            .filter(|s| s.question_id == question_id)
            .cloned()
            .collect();
        Ok(Self::paginate(matched, page))
    }

    async fn swaps_by_member(
        &self,
        member_id: MemberId,
        page: PageRequest,
    ) -> Result<Page<SwapRecord>, AmmError> {
        let tables = self.tables.read().await;
        let matched = tables
            .swaps
            .iter()
            .filter(|s| s.member_id == member_id)
            .cloned()
            .collect();
        Ok(Self::paginate(matched, page))
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}
