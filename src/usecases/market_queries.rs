//! Market Queries - Read-only Views over Pool, History, and Ledger
//!
//! Everything here is derived from store reads; nothing mutates. Price
//! history is a replay of the post-swap YES prices from the append-only
//! swap records, prefixed with the 50/50 point at seeding time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::decimal::rescale;
use crate::domain::error::AmmError;
use crate::domain::fpmm::PricePair;
use crate::domain::pool::{PoolStatus, QuestionId};
use crate::domain::shares::SharesSnapshot;
use crate::domain::swap::{MemberId, SwapRecord};
use crate::ports::store::{MarketStore, Page, PageRequest, SortOrder};

/// Snapshot of one pool for callers: reserves, price, accumulators,
/// and the current optimistic-lock version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStateView {
  pub question_id: QuestionId,
  pub status: PoolStatus,
  pub yes_shares: Decimal,
  pub no_shares: Decimal,
  pub k: Decimal,
  pub fee_rate: Decimal,
  pub collateral_locked: Decimal,
  pub total_volume_usdc: Decimal,
  pub total_fees_usdc: Decimal,
  pub current_price: PricePair,
  pub version: u64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// One point on a market's price chart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
  pub timestamp: DateTime<Utc>,
  pub yes_price: Decimal,
  pub no_price: Decimal,
}

/// Read-side companion to the swap executor.
pub struct MarketQueries<S: MarketStore> {
  store: Arc<S>,
}

impl<S: MarketStore> MarketQueries<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store }
  }

  /// Current pool state with the spot price derived from live reserves.
  pub async fn pool_state(&self, question_id: QuestionId) -> Result<PoolStateView, AmmError> {
    let pool = self
      .store
      .load_pool(question_id)
      .await?
      .ok_or(AmmError::PoolNotFound { question_id })?;
    let current_price = pool.spot_price()?;

    Ok(PoolStateView {
      question_id: pool.question_id,
      status: pool.status,
      yes_shares: pool.yes_shares,
      no_shares: pool.no_shares,
      k: pool.k,
      fee_rate: pool.fee_rate,
      collateral_locked: pool.collateral_locked,
      total_volume_usdc: pool.total_volume_usdc,
      total_fees_usdc: pool.total_fees_usdc,
      current_price,
      version: pool.version,
      created_at: pool.created_at,
      updated_at: pool.updated_at,
    })
  }

  /// Price chart data: the seed-time 50/50 point followed by each swap's
  /// post-trade YES price in ascending time order. An unseeded question
  /// yields an empty chart rather than an error.
  pub async fn price_history(
    &self,
    question_id: QuestionId,
    limit: usize,
  ) -> Result<Vec<PricePoint>, AmmError> {
    let Some(pool) = self.store.load_pool(question_id).await? else {
      return Ok(Vec::new());
    };

    let page = self
      .store
      .swaps_by_question(question_id, PageRequest::new(0, limit, SortOrder::Ascending))
      .await?;

    let mut points = Vec::with_capacity(page.items.len() + 1);
    points.push(PricePoint {
      timestamp: pool.created_at,
      yes_price: dec!(0.50),
      no_price: dec!(0.50),
    });
    for swap in &page.items {
      points.push(PricePoint {
        timestamp: swap.created_at,
        yes_price: swap.price_after_yes,
        no_price: rescale(Decimal::ONE - swap.price_after_yes),
      });
    }

    Ok(points)
  }

  /// Page through a market's swap history.
  pub async fn swap_history_by_question(
    &self,
    question_id: QuestionId,
    page: PageRequest,
  ) -> Result<Page<SwapRecord>, AmmError> {
    self.store.swaps_by_question(question_id, page).await
  }

  /// Page through a member's swap history across markets.
  pub async fn swap_history_by_member(
    &self,
    member_id: MemberId,
    page: PageRequest,
  ) -> Result<Page<SwapRecord>, AmmError> {
    self.store.swaps_by_member(member_id, page).await
  }

  /// A member's holdings and cost bases for both outcomes of a market.
  pub async fn user_shares(
    &self,
    member_id: MemberId,
    question_id: QuestionId,
  ) -> Result<SharesSnapshot, AmmError> {
    let rows = self
      .store
      .shares_for_question(member_id, question_id)
      .await?;
    Ok(SharesSnapshot::from_rows(&rows))
  }
}
