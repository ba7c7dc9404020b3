//! Swap intents, executed-swap records, and caller-facing results.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::fpmm::PricePair;
use crate::domain::pool::{MarketPool, QuestionId};
use crate::domain::shares::SharesSnapshot;

/// Identity of a trading member. Accounts themselves live outside the
/// engine; only the id flows through here.
pub type MemberId = u64;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapAction {
    Buy,
    Sell,
}

impl std::fmt::Display for SwapAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Binary outcome token of a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Yes,
    No,
}

impl Outcome {
    /// The complementary outcome.
    pub fn opposite(self) -> Self {
        match self {
            Self::Yes => Self::No,
            Self::No => Self::Yes,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yes => write!(f, "YES"),
            Self::No => write!(f, "NO"),
        }
    }
}

/// A swap intent as submitted by a caller.
///
/// BUY carries `usdc_in` (and optionally `min_shares_out`); SELL carries
/// `shares_in` (and optionally `min_usdc_out`). The minimum-received
/// bounds are the caller's slippage protection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRequest {
    pub question_id: QuestionId,
    pub action: SwapAction,
    pub outcome: Outcome,
    pub usdc_in: Option<Decimal>,
    pub shares_in: Option<Decimal>,
    pub min_shares_out: Option<Decimal>,
    pub min_usdc_out: Option<Decimal>,
}

impl SwapRequest {
    /// A BUY intent without a slippage bound.
    pub fn buy(question_id: QuestionId, outcome: Outcome, usdc_in: Decimal) -> Self {
        Self {
            question_id,
            action: SwapAction::Buy,
            outcome,
            usdc_in: Some(usdc_in),
            shares_in: None,
            min_shares_out: None,
            min_usdc_out: None,
        }
    }

    /// A SELL intent without a slippage bound.
    pub fn sell(question_id: QuestionId, outcome: Outcome, shares_in: Decimal) -> Self {
        Self {
            question_id,
            action: SwapAction::Sell,
            outcome,
            usdc_in: None,
            shares_in: Some(shares_in),
            min_shares_out: None,
            min_usdc_out: None,
        }
    }

    /// Attach a minimum-shares-received bound (BUY).
    pub fn with_min_shares_out(mut self, min: Decimal) -> Self {
        self.min_shares_out = Some(min);
        self
    }

    /// Attach a minimum-USDC-received bound (SELL).
    pub fn with_min_usdc_out(mut self, min: Decimal) -> Self {
        self.min_usdc_out = Some(min);
        self
    }
}

/// One executed swap, immutable once written.
///
/// The append-only sequence of these rows is the audit trail and the
/// source for price-history charts. The inapplicable in/out fields are
/// zero (a BUY has no `shares_in`/`usdc_out`), and the prices are carried
/// at the 4-digit display scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRecord {
    pub swap_id: Uuid,
    pub question_id: QuestionId,
    pub member_id: MemberId,
    pub action: SwapAction,
    pub outcome: Outcome,
    pub usdc_in: Decimal,
    pub usdc_out: Decimal,
    pub shares_in: Decimal,
    pub shares_out: Decimal,
    pub fee_usdc: Decimal,
    pub price_before_yes: Decimal,
    pub price_after_yes: Decimal,
    pub yes_before: Decimal,
    pub no_before: Decimal,
    pub yes_after: Decimal,
    pub no_after: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Everything a caller gets back from an executed swap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapResult {
    /// Shares received (BUY) or surrendered (SELL).
    pub shares_amount: Decimal,
    /// USDC paid (BUY) or received net of fee (SELL).
    pub usdc_amount: Decimal,
    pub effective_price: Decimal,
    pub fee_usdc: Decimal,
    pub price_before: PricePair,
    pub price_after: PricePair,
    /// Pool state as committed by this swap.
    pub pool: MarketPool,
    /// The caller's holdings across both outcomes after the swap.
    pub caller_shares: SharesSnapshot,
}

/// Priced-but-not-executed preview of a swap, for client display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapSimulation {
    pub shares_out: Option<Decimal>,
    pub usdc_out: Option<Decimal>,
    pub effective_price: Decimal,
    pub slippage: Decimal,
    pub fee_usdc: Decimal,
    /// What the caller would receive; the natural value for a
    /// minimum-received bound on the real swap.
    pub min_received: Decimal,
    pub price_before: PricePair,
    pub price_after: PricePair,
}
