//! Swap Executor - Atomic Swap Orchestration
//!
//! Drives one swap attempt through LOADING -> PRICED -> VALIDATED ->
//! COMMITTED. Steps before the commit are read-only and can be re-run
//! freely; the commit is a single conditional write keyed on the pool
//! version read at load time. A version conflict restarts the cycle with
//! exponential backoff up to a bounded attempt budget.
//!
//! Also owns the one-time pool seeding and the pause/resume/close
//! lifecycle transitions, which ride the same versioned commit.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::domain::decimal::{rescale, to_price};
use crate::domain::error::AmmError;
use crate::domain::fpmm;
use crate::domain::pool::{MarketPool, PoolStatus, QuestionId};
use crate::domain::shares::{SharesSnapshot, UserShares};
use crate::domain::swap::{
  MemberId, Outcome, SwapAction, SwapRecord, SwapRequest, SwapResult, SwapSimulation,
};
use crate::ports::store::{CommitOutcome, MarketStore};

/// Executes swaps against pools held in a [`MarketStore`].
///
/// Stateless apart from configuration; any number of executors may run
/// against the same store concurrently.
pub struct SwapExecutor<S: MarketStore> {
  /// Persistence port.
  store: Arc<S>,
  /// Smallest accepted trade (USDC for BUY, shares for SELL).
  min_trade_amount: Decimal,
  /// Attempt budget per swap under optimistic-lock contention.
  max_attempts: u32,
  /// First backoff delay; doubles per conflicted attempt.
  retry_base_delay: Duration,
}

impl<S: MarketStore> SwapExecutor<S> {
  /// Create a new executor over the given store.
  pub fn new(store: Arc<S>, config: &EngineConfig) -> Self {
    Self {
      store,
      min_trade_amount: config.min_trade_amount,
      max_attempts: config.max_swap_attempts,
      retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
    }
  }

  /// Seed a fresh pool for a question.
  ///
  /// One-time per market: equal reserves, 50/50 price, collateral locked,
  /// `k` fixed. Fails with `AlreadySeeded` if the question has a pool.
  #[instrument(skip(self), fields(question_id, seed = %seed_usdc, fee = %fee_rate))]
  pub async fn seed_pool(
    &self,
    question_id: QuestionId,
    seed_usdc: Decimal,
    fee_rate: Decimal,
  ) -> Result<MarketPool, AmmError> {
    let pool = MarketPool::seed(question_id, seed_usdc, fee_rate, Utc::now())?;
    self.store.insert_pool(&pool).await?;
    info!(
      question_id,
      seed = %seed_usdc,
      fee_rate = %fee_rate,
      k = %pool.k,
      "Pool seeded"
    );
    Ok(pool)
  }

  /// Execute a swap, retrying on optimistic-lock conflicts.
  #[instrument(
    skip(self, request),
    fields(
      question_id = request.question_id,
      member_id,
      action = %request.action,
      outcome = %request.outcome
    )
  )]
  pub async fn swap(
    &self,
    member_id: MemberId,
    request: &SwapRequest,
  ) -> Result<SwapResult, AmmError> {
    let amount = self.request_amount(request)?;

    let mut delay = self.retry_base_delay;
    for attempt in 1..=self.max_attempts {
      let committed = match request.action {
        SwapAction::Buy => self.try_buy(member_id, request, amount).await?,
        SwapAction::Sell => self.try_sell(member_id, request, amount).await?,
      };

      match committed {
        Some(result) => {
          if attempt > 1 {
            debug!(attempt, "Swap committed after retry");
          }
          return Ok(result);
        }
        None => {
          debug!(attempt, delay_ms = delay.as_millis() as u64, "Version conflict, retrying");
          if attempt < self.max_attempts {
            tokio::time::sleep(delay).await;
            delay *= 2;
          }
        }
      }
    }

    warn!(
      attempts = self.max_attempts,
      "Swap abandoned after exhausting optimistic-lock retries"
    );
    Err(AmmError::ConcurrentModification {
      question_id: request.question_id,
      attempts: self.max_attempts,
    })
  }

  /// Price a swap without persisting anything.
  ///
  /// Runs the same pricing path as [`swap`](Self::swap), so on an
  /// unmodified pool the preview and the execution are identical.
  pub async fn simulate(
    &self,
    question_id: QuestionId,
    action: SwapAction,
    outcome: Outcome,
    amount: Decimal,
  ) -> Result<SwapSimulation, AmmError> {
    self.ensure_amount(amount, action)?;
    let pool = self.load_active_pool(question_id).await?;
    let price_before = pool.spot_price()?;

    match action {
      SwapAction::Buy => {
        let quote = fpmm::quote_buy(
          pool.yes_shares,
          pool.no_shares,
          pool.k,
          amount,
          pool.fee_rate,
          outcome,
        )?;
        Ok(SwapSimulation {
          shares_out: Some(quote.shares_out),
          usdc_out: None,
          effective_price: fpmm::effective_price(amount, quote.shares_out)?,
          slippage: fpmm::slippage(&price_before, &quote.price_after, outcome),
          fee_usdc: quote.fee_usdc,
          min_received: quote.shares_out,
          price_before,
          price_after: quote.price_after,
        })
      }
      SwapAction::Sell => {
        let quote = fpmm::quote_sell(
          pool.yes_shares,
          pool.no_shares,
          pool.k,
          amount,
          pool.fee_rate,
          outcome,
        )?;
        Ok(SwapSimulation {
          shares_out: None,
          usdc_out: Some(quote.usdc_out),
          effective_price: fpmm::effective_price(quote.usdc_out, amount)?,
          slippage: fpmm::slippage(&price_before, &quote.price_after, outcome),
          fee_usdc: quote.fee_usdc,
          min_received: quote.usdc_out,
          price_before,
          price_after: quote.price_after,
        })
      }
    }
  }

  /// Halt trading on a pool. Only an active pool can be paused.
  pub async fn pause_pool(&self, question_id: QuestionId) -> Result<MarketPool, AmmError> {
    self.transition(question_id, PoolStatus::Paused).await
  }

  /// Reopen a paused (or provisioned-but-unopened) pool.
  pub async fn resume_pool(&self, question_id: QuestionId) -> Result<MarketPool, AmmError> {
    self.transition(question_id, PoolStatus::Active).await
  }

  /// Close a pool at market settlement. Terminal.
  pub async fn close_pool(&self, question_id: QuestionId) -> Result<MarketPool, AmmError> {
    self.transition(question_id, PoolStatus::Closed).await
  }

  // ── Internal steps ──────────────────────────────────────────

  /// One BUY attempt. `Ok(None)` means a version conflict to retry.
  async fn try_buy(
    &self,
    member_id: MemberId,
    request: &SwapRequest,
    usdc_in: Decimal,
  ) -> Result<Option<SwapResult>, AmmError> {
    let pool = self.load_active_pool(request.question_id).await?;
    let price_before = pool.spot_price()?;

    let quote = fpmm::quote_buy(
      pool.yes_shares,
      pool.no_shares,
      pool.k,
      usdc_in,
      pool.fee_rate,
      request.outcome,
    )?;

    if let Some(minimum) = request.min_shares_out {
      if quote.shares_out < minimum {
        return Err(AmmError::SlippageExceeded {
          minimum,
          computed: quote.shares_out,
        });
      }
    }

    let now = Utc::now();
    let mut updated = pool.clone();
    updated.yes_shares = quote.yes_after;
    updated.no_shares = quote.no_after;
    updated.k = fpmm::reserve_product(quote.yes_after, quote.no_after)?;
    updated.collateral_locked = rescale(pool.collateral_locked + quote.usdc_net);
    updated.total_volume_usdc = rescale(pool.total_volume_usdc + usdc_in);
    updated.total_fees_usdc = rescale(pool.total_fees_usdc + quote.fee_usdc);
    updated.version = pool.version + 1;
    updated.updated_at = now;

    let mut shares = self
      .store
      .load_shares(member_id, request.question_id, request.outcome)
      .await?
      .unwrap_or_else(|| {
        UserShares::empty(member_id, request.question_id, request.outcome, now)
      });
    shares.record_buy(quote.shares_out, usdc_in, now);

    let record = SwapRecord {
      swap_id: Uuid::new_v4(),
      question_id: request.question_id,
      member_id,
      action: SwapAction::Buy,
      outcome: request.outcome,
      usdc_in,
      usdc_out: Decimal::ZERO,
      shares_in: Decimal::ZERO,
      shares_out: quote.shares_out,
      fee_usdc: quote.fee_usdc,
      price_before_yes: to_price(price_before.yes),
      price_after_yes: to_price(quote.price_after.yes),
      yes_before: pool.yes_shares,
      no_before: pool.no_shares,
      yes_after: quote.yes_after,
      no_after: quote.no_after,
      created_at: now,
    };

    match self
      .store
      .commit_swap(pool.version, &updated, &record, &shares)
      .await?
    {
      CommitOutcome::VersionConflict => Ok(None),
      CommitOutcome::Committed => {
        info!(
          member_id,
          question_id = request.question_id,
          outcome = %request.outcome,
          usdc_in = %usdc_in,
          shares_out = %quote.shares_out,
          fee = %quote.fee_usdc,
          version = updated.version,
          "BUY executed"
        );
        self
          .build_result(
            member_id,
            request.question_id,
            quote.shares_out,
            usdc_in,
            fpmm::effective_price(usdc_in, quote.shares_out)?,
            quote.fee_usdc,
            price_before,
            quote.price_after,
            updated,
          )
          .await
          .map(Some)
      }
    }
  }

  /// One SELL attempt. `Ok(None)` means a version conflict to retry.
  async fn try_sell(
    &self,
    member_id: MemberId,
    request: &SwapRequest,
    shares_in: Decimal,
  ) -> Result<Option<SwapResult>, AmmError> {
    let pool = self.load_active_pool(request.question_id).await?;

    // The held balance gates the sell before any pricing happens.
    let mut shares = self
      .store
      .load_shares(member_id, request.question_id, request.outcome)
      .await?
      .ok_or(AmmError::InsufficientShares {
        held: Decimal::ZERO,
        requested: shares_in,
      })?;
    if shares.shares < shares_in {
      return Err(AmmError::InsufficientShares {
        held: shares.shares,
        requested: shares_in,
      });
    }

    let price_before = pool.spot_price()?;
    let quote = fpmm::quote_sell(
      pool.yes_shares,
      pool.no_shares,
      pool.k,
      shares_in,
      pool.fee_rate,
      request.outcome,
    )?;

    if let Some(minimum) = request.min_usdc_out {
      if quote.usdc_out < minimum {
        return Err(AmmError::SlippageExceeded {
          minimum,
          computed: quote.usdc_out,
        });
      }
    }

    let now = Utc::now();
    let mut updated = pool.clone();
    updated.yes_shares = quote.yes_after;
    updated.no_shares = quote.no_after;
    updated.k = fpmm::reserve_product(quote.yes_after, quote.no_after)?;
    updated.collateral_locked = rescale(pool.collateral_locked - quote.usdc_gross);
    updated.total_volume_usdc = rescale(pool.total_volume_usdc + quote.usdc_gross);
    updated.total_fees_usdc = rescale(pool.total_fees_usdc + quote.fee_usdc);
    updated.version = pool.version + 1;
    updated.updated_at = now;
    if updated.collateral_locked < Decimal::ZERO {
      return Err(AmmError::InvariantViolated {
        detail: format!(
          "sell would overdraw pool collateral: {}",
          updated.collateral_locked
        ),
      });
    }

    shares.record_sell(shares_in, now)?;

    let record = SwapRecord {
      swap_id: Uuid::new_v4(),
      question_id: request.question_id,
      member_id,
      action: SwapAction::Sell,
      outcome: request.outcome,
      usdc_in: Decimal::ZERO,
      usdc_out: quote.usdc_out,
      shares_in,
      shares_out: Decimal::ZERO,
      fee_usdc: quote.fee_usdc,
      price_before_yes: to_price(price_before.yes),
      price_after_yes: to_price(quote.price_after.yes),
      yes_before: pool.yes_shares,
      no_before: pool.no_shares,
      yes_after: quote.yes_after,
      no_after: quote.no_after,
      created_at: now,
    };

    match self
      .store
      .commit_swap(pool.version, &updated, &record, &shares)
      .await?
    {
      CommitOutcome::VersionConflict => Ok(None),
      CommitOutcome::Committed => {
        info!(
          member_id,
          question_id = request.question_id,
          outcome = %request.outcome,
          shares_in = %shares_in,
          usdc_out = %quote.usdc_out,
          fee = %quote.fee_usdc,
          version = updated.version,
          "SELL executed"
        );
        self
          .build_result(
            member_id,
            request.question_id,
            shares_in,
            quote.usdc_out,
            fpmm::effective_price(quote.usdc_out, shares_in)?,
            quote.fee_usdc,
            price_before,
            quote.price_after,
            updated,
          )
          .await
          .map(Some)
      }
    }
  }

  #[allow(clippy::too_many_arguments)]
  async fn build_result(
    &self,
    member_id: MemberId,
    question_id: QuestionId,
    shares_amount: Decimal,
    usdc_amount: Decimal,
    effective_price: Decimal,
    fee_usdc: Decimal,
    price_before: crate::domain::fpmm::PricePair,
    price_after: crate::domain::fpmm::PricePair,
    pool: MarketPool,
  ) -> Result<SwapResult, AmmError> {
    let rows = self
      .store
      .shares_for_question(member_id, question_id)
      .await?;
    Ok(SwapResult {
      shares_amount,
      usdc_amount,
      effective_price,
      fee_usdc,
      price_before,
      price_after,
      pool,
      caller_shares: SharesSnapshot::from_rows(&rows),
    })
  }

  async fn load_active_pool(&self, question_id: QuestionId) -> Result<MarketPool, AmmError> {
    let pool = self
      .store
      .load_pool(question_id)
      .await?
      .ok_or(AmmError::PoolNotFound { question_id })?;
    if !pool.status.accepts_swaps() {
      return Err(AmmError::PoolNotActive {
        question_id,
        status: pool.status,
      });
    }
    Ok(pool)
  }

  /// Lifecycle transition through the same versioned commit as swaps.
  async fn transition(
    &self,
    question_id: QuestionId,
    target: PoolStatus,
  ) -> Result<MarketPool, AmmError> {
    let mut delay = self.retry_base_delay;
    for attempt in 1..=self.max_attempts {
      let pool = self
        .store
        .load_pool(question_id)
        .await?
        .ok_or(AmmError::PoolNotFound { question_id })?;

      if pool.status == target {
        return Ok(pool);
      }

      let allowed = match (pool.status, target) {
        (PoolStatus::Closed, _) => false,
        (_, PoolStatus::Closed) => true,
        (PoolStatus::Active, PoolStatus::Paused) => true,
        (PoolStatus::Paused | PoolStatus::Seeded, PoolStatus::Active) => true,
        _ => false,
      };
      if !allowed {
        return Err(AmmError::PoolNotActive {
          question_id,
          status: pool.status,
        });
      }

      let mut updated = pool.clone();
      updated.status = target;
      updated.version = pool.version + 1;
      updated.updated_at = Utc::now();

      match self.store.update_pool(pool.version, &updated).await? {
        CommitOutcome::Committed => {
          info!(question_id, from = %pool.status, to = %target, "Pool status changed");
          return Ok(updated);
        }
        CommitOutcome::VersionConflict => {
          debug!(question_id, attempt, "Status transition conflicted, retrying");
          if attempt < self.max_attempts {
            tokio::time::sleep(delay).await;
            delay *= 2;
          }
        }
      }
    }

    Err(AmmError::ConcurrentModification {
      question_id,
      attempts: self.max_attempts,
    })
  }

  /// Pull and validate the action's amount field before any pricing.
  fn request_amount(&self, request: &SwapRequest) -> Result<Decimal, AmmError> {
    let (amount, field) = match request.action {
      SwapAction::Buy => (request.usdc_in, "usdc_in"),
      SwapAction::Sell => (request.shares_in, "shares_in"),
    };
    let amount = amount.ok_or_else(|| AmmError::InvalidAmount {
      detail: format!("{field} is required for {}", request.action),
    })?;
    self.ensure_amount(amount, request.action)?;
    Ok(amount)
  }

  fn ensure_amount(&self, amount: Decimal, action: SwapAction) -> Result<(), AmmError> {
    if amount <= Decimal::ZERO {
      return Err(AmmError::InvalidAmount {
        detail: format!("{action} amount must be positive, got {amount}"),
      });
    }
    if amount < self.min_trade_amount {
      return Err(AmmError::InvalidAmount {
        detail: format!(
          "{action} amount {amount} is below the minimum {}",
          self.min_trade_amount
        ),
      });
    }
    Ok(())
  }
}
