//! Market pool state.
//!
//! One `MarketPool` exists per question and is the single source of truth
//! for the current price. It is mutated only through the swap executor's
//! versioned commit; the version stamp is the optimistic-lock token.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::decimal::rescale;
use crate::domain::error::AmmError;
use crate::domain::fpmm::{self, PricePair};

/// Identity of a market question, 1:1 with its pool.
pub type QuestionId = u64;

/// Lifecycle gate for swaps. Only `Active` pools price and execute trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolStatus {
    /// Provisioned but not yet open for trading.
    Seeded,
    /// Accepting swaps.
    Active,
    /// Temporarily halted; can be resumed.
    Paused,
    /// Market settled. Terminal — swaps are rejected forever.
    Closed,
}

impl PoolStatus {
    /// Whether the pool accepts swaps in this state.
    pub fn accepts_swaps(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Seeded => write!(f, "SEEDED"),
            Self::Active => write!(f, "ACTIVE"),
            Self::Paused => write!(f, "PAUSED"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Constant-product pool backing one binary market.
///
/// `yes_shares * no_shares` equals `k` at every commit; fees are charged
/// out-of-curve, and conservative rounding means the stored `k` only ever
/// ratchets upward. `total_volume_usdc` and `total_fees_usdc` are
/// monotonically non-decreasing accumulators updated in the same commit
/// as the reserves, so they stay consistent with the version history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketPool {
    pub question_id: QuestionId,
    pub status: PoolStatus,
    /// YES share reserve; strictly positive while the pool trades.
    pub yes_shares: Decimal,
    /// NO share reserve; strictly positive while the pool trades.
    pub no_shares: Decimal,
    /// Reserve-product invariant, refreshed on every commit.
    pub k: Decimal,
    /// Fee rate in [0, 1), fixed at seeding.
    pub fee_rate: Decimal,
    /// Collateral backing the pool: up on BUY (net of fee), down on SELL
    /// (gross).
    pub collateral_locked: Decimal,
    pub total_volume_usdc: Decimal,
    pub total_fees_usdc: Decimal,
    /// Optimistic-lock token, incremented on every successful mutation.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MarketPool {
    /// Seed a fresh pool: equal reserves give a 50/50 starting price, the
    /// deposit backs the pool as locked collateral, and `k` is fixed from
    /// the initial reserve product.
    pub fn seed(
        question_id: QuestionId,
        seed_usdc: Decimal,
        fee_rate: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Self, AmmError> {
        if seed_usdc <= Decimal::ZERO {
            return Err(AmmError::InvalidAmount {
                detail: format!("seed amount must be positive, got {seed_usdc}"),
            });
        }
        if fee_rate < Decimal::ZERO || fee_rate >= Decimal::ONE {
            return Err(AmmError::InvalidAmount {
                detail: format!("fee rate must be in [0, 1), got {fee_rate}"),
            });
        }

        let reserves = rescale(seed_usdc);
        let k = fpmm::reserve_product(reserves, reserves)?;

        Ok(Self {
            question_id,
            status: PoolStatus::Active,
            yes_shares: reserves,
            no_shares: reserves,
            k,
            fee_rate,
            collateral_locked: reserves,
            total_volume_usdc: Decimal::ZERO,
            total_fees_usdc: Decimal::ZERO,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Current spot price from the live reserves.
    pub fn spot_price(&self) -> Result<PricePair, AmmError> {
        fpmm::spot_price(self.yes_shares, self.no_shares)
    }
}
