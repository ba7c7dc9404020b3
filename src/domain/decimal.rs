//! Fixed-point decimal rules for reserve and fee arithmetic.
//!
//! Every monetary and share quantity in the engine is a `rust_decimal`
//! value carried at scale 18. Rounding is directional and always favours
//! the pool: fees round up, curve divisions round toward the pool, payouts
//! round down. Addition, subtraction, and multiplication stay exact within
//! the working precision; division and square root round here, once, at
//! the boundary.

use rust_decimal::{Decimal, RoundingStrategy};

/// Working scale for all reserve, collateral, and fee values.
pub const SCALE: u32 = 18;

/// Scale at which prices are persisted in swap history rows.
pub const PRICE_SCALE: u32 = 4;

/// Round half-up to the working scale.
pub fn rescale(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Round up (away from zero) to the working scale.
pub fn round_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(SCALE, RoundingStrategy::AwayFromZero)
}

/// Round down (toward zero) to the working scale.
pub fn round_down(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(SCALE, RoundingStrategy::ToZero)
}

/// Round half-up to the price persistence scale.
pub fn to_price(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Divide with a half-up rounding at the working scale.
///
/// Returns `None` for a zero divisor or on overflow.
pub fn div_half_up(num: Decimal, den: Decimal) -> Option<Decimal> {
    num.checked_div(den).map(rescale)
}

/// Divide with a ceiling rounding at the working scale.
///
/// Used for the `k / reserve` curve division, where rounding toward
/// positive infinity keeps the remainder inside the pool.
pub fn div_ceil(num: Decimal, den: Decimal) -> Option<Decimal> {
    num.checked_div(den)
        .map(|q| q.round_dp_with_strategy(SCALE, RoundingStrategy::ToPositiveInfinity))
}

/// Decimal square root by Newton's method, rounded up at the working scale.
///
/// The iteration starts from `max(value, 1)`, an upper bound of the root on
/// both sides of 1, so the sequence decreases monotonically until rounding
/// noise flips the direction — that flip is the termination signal. Perfect
/// squares at the working scale are returned exactly; everything else is
/// finished with a ceiling so sell payouts stay conservative.
///
/// Returns `None` for negative input.
pub fn sqrt_ceil(value: Decimal) -> Option<Decimal> {
    if value < Decimal::ZERO {
        return None;
    }
    if value.is_zero() {
        return Some(Decimal::ZERO);
    }

    let mut x = if value > Decimal::ONE {
        value
    } else {
        Decimal::ONE
    };

    // Quadratic convergence; 128 iterations is far beyond any reachable
    // magnitude and only guards against a pathological non-termination.
    for _ in 0..128 {
        let next = (x + value.checked_div(x)?) / Decimal::TWO;
        if next >= x {
            break;
        }
        x = next;
    }

    let floor = x.round_dp_with_strategy(SCALE, RoundingStrategy::ToZero);
    match floor.checked_mul(floor) {
        Some(square) if square == value => Some(floor),
        _ => Some(x.round_dp_with_strategy(SCALE, RoundingStrategy::ToPositiveInfinity)),
    }
}
