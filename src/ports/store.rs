//! Market Store Port - Durable Pool / History / Ledger Interface
//!
//! The single persistence boundary the engine needs: a keyed pool record
//! with conditional (version-checked) updates, append-only swap history
//! insertion, and keyed upsert of user share rows. One swap's three
//! writes are a single atomic unit — either the pool version advances
//! together with its history row and ledger upsert, or nothing persists.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::error::AmmError;
use crate::domain::pool::{MarketPool, QuestionId};
use crate::domain::shares::UserShares;
use crate::domain::swap::{MemberId, Outcome, SwapRecord};

/// Sort direction for history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
  Ascending,
  Descending,
}

/// Offset/limit page request for swap history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageRequest {
  pub offset: usize,
  pub limit: usize,
  pub order: SortOrder,
}

impl PageRequest {
  pub fn new(offset: usize, limit: usize, order: SortOrder) -> Self {
    Self { offset, limit, order }
  }
}

impl Default for PageRequest {
  fn default() -> Self {
    Self {
      offset: 0,
      limit: 50,
      order: SortOrder::Descending,
    }
  }
}

/// One page of results plus the total row count for the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub total: usize,
}

/// Outcome of a conditional write against the pool's version stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
  /// The stored version matched and all writes applied.
  Committed,
  /// Another writer advanced the version first; nothing was written.
  VersionConflict,
}

/// Trait for the engine's persistence provider.
///
/// Implementations must make `commit_swap` atomic across its three
/// records and must reject it (without side effects) when the stored
/// pool version differs from `expected_version` — the optimistic-lock
/// primitive everything else is built on.
#[async_trait]
pub trait MarketStore: Send + Sync + 'static {
  /// Create the pool row. Fails with `AlreadySeeded` if one exists.
  async fn insert_pool(&self, pool: &MarketPool) -> Result<(), AmmError>;

  /// Load the current pool state, if seeded.
  async fn load_pool(&self, question_id: QuestionId) -> Result<Option<MarketPool>, AmmError>;

  /// Conditionally replace the pool row (status transitions).
  async fn update_pool(
    &self,
    expected_version: u64,
    pool: &MarketPool,
  ) -> Result<CommitOutcome, AmmError>;

  /// Atomically apply one swap: replace the pool row (conditional on
  /// `expected_version`), append the history record, and upsert the
  /// caller's share row. All-or-nothing.
  async fn commit_swap(
    &self,
    expected_version: u64,
    pool: &MarketPool,
    record: &SwapRecord,
    shares: &UserShares,
  ) -> Result<CommitOutcome, AmmError>;

  /// Load one ledger row, if present.
  async fn load_shares(
    &self,
    member_id: MemberId,
    question_id: QuestionId,
    outcome: Outcome,
  ) -> Result<Option<UserShares>, AmmError>;

  /// Load all of a member's ledger rows for one market.
  async fn shares_for_question(
    &self,
    member_id: MemberId,
    question_id: QuestionId,
  ) -> Result<Vec<UserShares>, AmmError>;

  /// Page through a market's swap history ordered by creation time.
  async fn swaps_by_question(
    &self,
    question_id: QuestionId,
    page: PageRequest,
  ) -> Result<Page<SwapRecord>, AmmError>;

  /// Page through a member's swap history ordered by creation time.
  async fn swaps_by_member(
    &self,
    member_id: MemberId,
    page: PageRequest,
  ) -> Result<Page<SwapRecord>, AmmError>;

  /// Check if the store is able to accept writes.
  async fn is_healthy(&self) -> bool;
}
