//! Error taxonomy for the swap engine.
//!
//! Every failure a caller can see is one of these kinds. A failed attempt
//! persists nothing, and none of these are fatal to the process; the
//! caller recovers by resubmitting or adjusting the request.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::pool::{PoolStatus, QuestionId};

/// Failure modes of seeding, swapping, and querying a market pool.
#[derive(Debug, Error)]
pub enum AmmError {
    /// Non-positive, missing, or below-minimum trade amount. Rejected
    /// before any pricing happens.
    #[error("invalid trade amount: {detail}")]
    InvalidAmount { detail: String },

    /// No pool has been seeded for this question.
    #[error("no market pool exists for question {question_id}")]
    PoolNotFound { question_id: QuestionId },

    /// The pool exists but is not accepting swaps.
    #[error("market pool for question {question_id} is not active (status: {status})")]
    PoolNotActive {
        question_id: QuestionId,
        status: PoolStatus,
    },

    /// The requested trade would deplete a reserve. The trade is rejected
    /// whole — never clamped to the remaining balance.
    #[error("insufficient pool liquidity: {detail}")]
    InsufficientLiquidity { detail: String },

    /// SELL exceeds the caller's held balance.
    #[error("insufficient shares: held {held}, requested {requested}")]
    InsufficientShares { held: Decimal, requested: Decimal },

    /// Computed output fell below the caller's minimum-received bound.
    #[error("slippage exceeded: minimum {minimum}, computed {computed}")]
    SlippageExceeded { minimum: Decimal, computed: Decimal },

    /// Optimistic-lock retries exhausted under contention. The caller may
    /// simply resubmit.
    #[error(
        "swap on question {question_id} abandoned after {attempts} optimistic-lock attempts"
    )]
    ConcurrentModification {
        question_id: QuestionId,
        attempts: u32,
    },

    /// A pool already exists for this question.
    #[error("market pool for question {question_id} is already seeded")]
    AlreadySeeded { question_id: QuestionId },

    /// Reserve-product or non-negativity invariant failed. Not reachable
    /// through the public API on well-formed state.
    #[error("pool invariant violated: {detail}")]
    InvariantViolated { detail: String },

    /// Persistence-layer failure surfaced from an adapter.
    #[error("storage failure")]
    Storage(#[from] anyhow::Error),
}

impl AmmError {
    /// Short stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::PoolNotFound { .. } => "pool_not_found",
            Self::PoolNotActive { .. } => "pool_not_active",
            Self::InsufficientLiquidity { .. } => "insufficient_liquidity",
            Self::InsufficientShares { .. } => "insufficient_shares",
            Self::SlippageExceeded { .. } => "slippage_exceeded",
            Self::ConcurrentModification { .. } => "concurrent_modification",
            Self::AlreadySeeded { .. } => "already_seeded",
            Self::InvariantViolated { .. } => "invariant_violated",
            Self::Storage(_) => "storage",
        }
    }
}
