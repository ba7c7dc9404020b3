//! Constant-product pricing for binary outcome pools.
//!
//! Pure functions over `(yes_shares, no_shares, fee_rate)` and a trade
//! intent — no I/O, no shared state, safely callable from any number of
//! threads. The swap form is the complete-set variant of the constant
//! product: a BUY mints a YES/NO pair per unit of net collateral into both
//! reserves, then rebalances the bought side back onto `k`; a SELL solves
//! the inverse quadratic for the collateral that leaves the pool.
//!
//! Fees are charged out-of-curve (off the top on BUY, off the gross payout
//! on SELL), so fee extraction is the only deviation from the literal
//! constant product. Rounding always lands in the pool's favour, which
//! makes the reserve product non-decreasing across swaps.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::decimal::{div_ceil, div_half_up, rescale, round_down, round_up, sqrt_ceil};
use crate::domain::error::AmmError;
use crate::domain::swap::Outcome;

/// Relative tolerance when validating a stored `k` against the live
/// reserve product.
fn k_tolerance() -> Decimal {
    Decimal::new(1, 10) // 1e-10
}

/// Reserves may not fall below one whole share after a swap.
fn reserve_floor() -> Decimal {
    Decimal::ONE
}

/// Spot prices of both outcomes. Always in (0, 1) and summing to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePair {
    pub yes: Decimal,
    pub no: Decimal,
}

impl PricePair {
    /// Price of the requested outcome.
    pub fn of(&self, outcome: Outcome) -> Decimal {
        match outcome {
            Outcome::Yes => self.yes,
            Outcome::No => self.no,
        }
    }
}

/// Result of pricing a BUY against the curve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BuyQuote {
    /// Shares credited to the buyer.
    pub shares_out: Decimal,
    /// Fee taken off the top of the paid collateral.
    pub fee_usdc: Decimal,
    /// Collateral entering the curve, net of fee.
    pub usdc_net: Decimal,
    pub price_after: PricePair,
    pub yes_after: Decimal,
    pub no_after: Decimal,
}

/// Result of pricing a SELL against the curve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SellQuote {
    /// Collateral paid to the seller, net of fee.
    pub usdc_out: Decimal,
    /// Collateral leaving the curve (net payout + fee).
    pub usdc_gross: Decimal,
    pub fee_usdc: Decimal,
    pub price_after: PricePair,
    pub yes_after: Decimal,
    pub no_after: Decimal,
}

/// Spot price: `p_yes = no / (yes + no)`, `p_no = 1 - p_yes`.
///
/// The complement is derived by subtraction rather than a second division
/// so the pair always sums to exactly 1.
pub fn spot_price(yes_shares: Decimal, no_shares: Decimal) -> Result<PricePair, AmmError> {
    ensure_positive_reserves(yes_shares, no_shares)?;

    let sum = yes_shares + no_shares;
    let yes = div_half_up(no_shares, sum).ok_or_else(|| AmmError::InvariantViolated {
        detail: format!("spot price undefined for reserves {yes_shares}/{no_shares}"),
    })?;
    let no = rescale(Decimal::ONE - yes);

    Ok(PricePair { yes, no })
}

/// Exact reserve product, used as the pool's `k`.
pub fn reserve_product(yes_shares: Decimal, no_shares: Decimal) -> Result<Decimal, AmmError> {
    yes_shares
        .checked_mul(no_shares)
        .ok_or_else(|| AmmError::InvariantViolated {
            detail: format!("reserve product overflow: {yes_shares} * {no_shares}"),
        })
}

/// Price a BUY of `outcome` with `usdc_in` collateral.
///
/// For YES: `fee = up(usdc_in * f)`, `c = usdc_in - fee`,
/// `y1 = yes + c`, `n1 = no + c`, `y2 = ceil(k / n1)`,
/// `shares_out = down(y1 - y2)`; the pool ends at `(y2, n1)`.
/// NO is symmetric. A trade that would push the shrinking reserve below
/// one share is rejected, never clamped.
pub fn quote_buy(
    yes_shares: Decimal,
    no_shares: Decimal,
    k: Decimal,
    usdc_in: Decimal,
    fee_rate: Decimal,
    outcome: Outcome,
) -> Result<BuyQuote, AmmError> {
    ensure_positive_reserves(yes_shares, no_shares)?;
    ensure_fee_rate(fee_rate)?;
    ensure_k_matches(yes_shares, no_shares, k)?;
    if usdc_in <= Decimal::ZERO {
        return Err(AmmError::InvalidAmount {
            detail: format!("usdc_in must be positive, got {usdc_in}"),
        });
    }

    let fee_usdc = round_up(usdc_in * fee_rate);
    let usdc_net = rescale(usdc_in - fee_usdc);
    if usdc_net <= Decimal::ZERO {
        return Err(AmmError::InvalidAmount {
            detail: format!("usdc_in {usdc_in} is consumed entirely by the fee"),
        });
    }

    // Complete-set mint: the net collateral lands in both reserves, then
    // the bought side is rebalanced onto k.
    let y1 = yes_shares + usdc_net;
    let n1 = no_shares + usdc_net;

    let (shares_out, yes_after, no_after) = match outcome {
        Outcome::Yes => {
            let y2 = div_ceil(k, n1).ok_or_else(|| AmmError::InvariantViolated {
                detail: format!("curve division failed: k={k}, n1={n1}"),
            })?;
            (round_down(y1 - y2), y2, n1)
        }
        Outcome::No => {
            let n2 = div_ceil(k, y1).ok_or_else(|| AmmError::InvariantViolated {
                detail: format!("curve division failed: k={k}, y1={y1}"),
            })?;
            (round_down(n1 - n2), y1, n2)
        }
    };

    if shares_out <= Decimal::ZERO {
        return Err(AmmError::InsufficientLiquidity {
            detail: format!("buy of {usdc_in} USDC yields no shares"),
        });
    }
    let shrinking = match outcome {
        Outcome::Yes => yes_after,
        Outcome::No => no_after,
    };
    if shrinking < reserve_floor() {
        return Err(AmmError::InsufficientLiquidity {
            detail: format!("buy would deplete the {outcome} reserve to {shrinking}"),
        });
    }

    ensure_k_not_decreased(yes_after, no_after, k)?;

    Ok(BuyQuote {
        shares_out,
        fee_usdc,
        usdc_net,
        price_after: spot_price(yes_after, no_after)?,
        yes_after,
        no_after,
    })
}

/// Price a SELL of `shares_in` shares of `outcome`.
///
/// For YES: `y1 = yes + shares_in`, `sum = y1 + no`,
/// `disc = sum^2 - 4 * no * shares_in`,
/// `c_gross = down((sum - ceil_sqrt(disc)) / 2)`; the fee comes off the
/// gross payout and `(y1 - c_gross, no - c_gross)` is the post-trade pool.
/// NO is symmetric.
pub fn quote_sell(
    yes_shares: Decimal,
    no_shares: Decimal,
    k: Decimal,
    shares_in: Decimal,
    fee_rate: Decimal,
    outcome: Outcome,
) -> Result<SellQuote, AmmError> {
    ensure_positive_reserves(yes_shares, no_shares)?;
    ensure_fee_rate(fee_rate)?;
    ensure_k_matches(yes_shares, no_shares, k)?;
    if shares_in <= Decimal::ZERO {
        return Err(AmmError::InvalidAmount {
            detail: format!("shares_in must be positive, got {shares_in}"),
        });
    }

    let (grown, opposite) = match outcome {
        Outcome::Yes => (yes_shares + shares_in, no_shares),
        Outcome::No => (no_shares + shares_in, yes_shares),
    };
    let sum = grown + opposite;

    let four = Decimal::from(4u8);
    let discriminant = sum
        .checked_mul(sum)
        .and_then(|s| s.checked_sub(four * opposite * shares_in))
        .ok_or_else(|| AmmError::InvariantViolated {
            detail: "sell discriminant overflow".to_string(),
        })?;
    if discriminant < Decimal::ZERO {
        return Err(AmmError::InsufficientLiquidity {
            detail: format!("sell of {shares_in} shares is unpriceable"),
        });
    }

    let root = sqrt_ceil(discriminant).ok_or_else(|| AmmError::InvariantViolated {
        detail: "sell discriminant root failed".to_string(),
    })?;
    let usdc_gross = round_down((sum - root) / Decimal::TWO);
    let fee_usdc = round_up(usdc_gross * fee_rate);
    let usdc_out = round_down(usdc_gross - fee_usdc);
    if usdc_out <= Decimal::ZERO {
        return Err(AmmError::InsufficientLiquidity {
            detail: format!("sell of {shares_in} shares yields no collateral"),
        });
    }

    let (yes_after, no_after) = match outcome {
        Outcome::Yes => (grown - usdc_gross, opposite - usdc_gross),
        Outcome::No => (opposite - usdc_gross, grown - usdc_gross),
    };
    if yes_after < reserve_floor() || no_after < reserve_floor() {
        return Err(AmmError::InsufficientLiquidity {
            detail: format!(
                "sell would deplete reserves to {yes_after}/{no_after}"
            ),
        });
    }

    ensure_k_not_decreased(yes_after, no_after, k)?;

    Ok(SellQuote {
        usdc_out,
        usdc_gross,
        fee_usdc,
        price_after: spot_price(yes_after, no_after)?,
        yes_after,
        no_after,
    })
}

/// Relative price movement of the traded outcome across the swap.
pub fn slippage(before: &PricePair, after: &PricePair, outcome: Outcome) -> Decimal {
    let b = before.of(outcome);
    let a = after.of(outcome);
    if b > Decimal::ZERO {
        div_half_up((a - b).abs(), b).unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    }
}

/// Average price actually paid or received, `usdc / shares`, half-up.
pub fn effective_price(usdc: Decimal, shares: Decimal) -> Result<Decimal, AmmError> {
    div_half_up(usdc, shares).ok_or_else(|| AmmError::InvariantViolated {
        detail: format!("effective price undefined: {usdc} / {shares}"),
    })
}

fn ensure_positive_reserves(yes_shares: Decimal, no_shares: Decimal) -> Result<(), AmmError> {
    if yes_shares <= Decimal::ZERO || no_shares <= Decimal::ZERO {
        return Err(AmmError::InvariantViolated {
            detail: format!("reserves must be positive, got {yes_shares}/{no_shares}"),
        });
    }
    Ok(())
}

fn ensure_fee_rate(fee_rate: Decimal) -> Result<(), AmmError> {
    if fee_rate < Decimal::ZERO || fee_rate >= Decimal::ONE {
        return Err(AmmError::InvalidAmount {
            detail: format!("fee rate must be in [0, 1), got {fee_rate}"),
        });
    }
    Ok(())
}

fn ensure_k_matches(
    yes_shares: Decimal,
    no_shares: Decimal,
    k: Decimal,
) -> Result<(), AmmError> {
    if k <= Decimal::ZERO {
        return Err(AmmError::InvariantViolated {
            detail: format!("k must be positive, got {k}"),
        });
    }
    let actual = reserve_product(yes_shares, no_shares)?;
    if (actual - k).abs() >= k * k_tolerance() {
        return Err(AmmError::InvariantViolated {
            detail: format!("k mismatch: reserves give {actual}, pool carries {k}"),
        });
    }
    Ok(())
}

fn ensure_k_not_decreased(
    yes_after: Decimal,
    no_after: Decimal,
    k: Decimal,
) -> Result<(), AmmError> {
    let after = reserve_product(yes_after, no_after)?;
    if after < k {
        return Err(AmmError::InvariantViolated {
            detail: format!("reserve product decreased: {k} -> {after}"),
        });
    }
    Ok(())
}
