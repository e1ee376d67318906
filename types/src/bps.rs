//! Basis-point arithmetic.
//!
//! All ratios in the oracle (accuracy, multipliers, slash rates, thresholds)
//! are integers in basis points so every node computes identical results.

/// 100% expressed in basis points.
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Compute `a * b / c` without intermediate overflow for realistic amounts.
///
/// Falls back to dividing first when `a * b` would overflow `u128`, which
/// loses at most `b` units of precision. Returns 0 when `c == 0`.
pub fn mul_div(a: u128, b: u128, c: u128) -> u128 {
    if c == 0 {
        return 0;
    }
    match a.checked_mul(b) {
        Some(product) => product / c,
        None => (a / c).saturating_mul(b),
    }
}

/// Apply a basis-point rate to an amount (floor).
pub fn apply_bps(amount: u128, bps: u32) -> u128 {
    mul_div(amount, bps as u128, BPS_DENOMINATOR)
}
