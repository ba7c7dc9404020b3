//! Per-user share ledger with running cost basis.
//!
//! One row per (member, question, outcome), mutated only inside the swap
//! executor's commit. A BUY accumulates gross USDC paid into the cost
//! basis; a SELL releases basis proportionally to the fraction of the
//! holding sold, so what remains always reflects the average acquisition
//! cost of the remaining shares.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::decimal::{div_half_up, rescale};
use crate::domain::error::AmmError;
use crate::domain::pool::QuestionId;
use crate::domain::swap::{MemberId, Outcome};

/// Holdings of one member in one outcome of one market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserShares {
    pub member_id: MemberId,
    pub question_id: QuestionId,
    pub outcome: Outcome,
    /// Never negative; a SELL that would overdraw fails instead.
    pub shares: Decimal,
    /// Gross USDC paid for the currently held shares.
    pub cost_basis_usdc: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl UserShares {
    /// Fresh empty row, created on a member's first BUY.
    pub fn empty(
        member_id: MemberId,
        question_id: QuestionId,
        outcome: Outcome,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            member_id,
            question_id,
            outcome,
            shares: Decimal::ZERO,
            cost_basis_usdc: Decimal::ZERO,
            updated_at: now,
        }
    }

    /// Apply a BUY: shares grow, basis grows by the gross USDC paid.
    pub fn record_buy(&mut self, shares_out: Decimal, usdc_in: Decimal, now: DateTime<Utc>) {
        self.shares = rescale(self.shares + shares_out);
        self.cost_basis_usdc = rescale(self.cost_basis_usdc + usdc_in);
        self.updated_at = now;
    }

    /// Apply a SELL: shares shrink, basis shrinks by the sold fraction.
    ///
    /// The realized difference between the released basis and the sale
    /// proceeds is the caller's gain or loss to report; it is not kept
    /// here.
    pub fn record_sell(&mut self, shares_in: Decimal, now: DateTime<Utc>) -> Result<(), AmmError> {
        if shares_in <= Decimal::ZERO {
            return Err(AmmError::InvalidAmount {
                detail: format!("shares_in must be positive, got {shares_in}"),
            });
        }
        if self.shares < shares_in {
            return Err(AmmError::InsufficientShares {
                held: self.shares,
                requested: shares_in,
            });
        }

        let held_before = self.shares;
        self.shares = rescale(self.shares - shares_in);

        let ratio = div_half_up(shares_in, held_before).unwrap_or(Decimal::ONE);
        let released = rescale(self.cost_basis_usdc * ratio);
        self.cost_basis_usdc = rescale(self.cost_basis_usdc - released);
        // Rounding of the released slice must not leave a negative basis.
        if self.cost_basis_usdc < Decimal::ZERO {
            self.cost_basis_usdc = Decimal::ZERO;
        }
        self.updated_at = now;
        Ok(())
    }
}

/// A member's position across both outcomes of one market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharesSnapshot {
    pub yes_shares: Decimal,
    pub no_shares: Decimal,
    pub yes_cost_basis: Decimal,
    pub no_cost_basis: Decimal,
}

impl SharesSnapshot {
    /// Fold ledger rows (at most one per outcome) into a snapshot.
    pub fn from_rows(rows: &[UserShares]) -> Self {
        let mut snapshot = Self {
            yes_shares: Decimal::ZERO,
            no_shares: Decimal::ZERO,
            yes_cost_basis: Decimal::ZERO,
            no_cost_basis: Decimal::ZERO,
        };
        for row in rows {
            match row.outcome {
                Outcome::Yes => {
                    snapshot.yes_shares = row.shares;
                    snapshot.yes_cost_basis = row.cost_basis_usdc;
                }
                Outcome::No => {
                    snapshot.no_shares = row.shares;
                    snapshot.no_cost_basis = row.cost_basis_usdc;
                }
            }
        }
        snapshot
    }
}
