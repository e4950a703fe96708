//! American / decimal odds conversions.
//!
//! American convention: negative = favorite (stake to win 100), positive =
//! underdog (100 to win amount). The open interval (-100, +100) is not a
//! valid quote.

/// Decimal odds (total return per unit staked) for an American quote.
pub fn american_to_decimal(odds: i32) -> f64 {
    if odds > 0 {
        1.0 + odds as f64 / 100.0
    } else {
        1.0 + 100.0 / (-odds) as f64
    }
}

/// Implied win probability of an American quote assuming a fair book.
pub fn american_to_implied(odds: i32) -> f64 {
    let o = odds as f64;
    if odds < 0 {
        -o / (-o + 100.0)
    } else {
        100.0 / (o + 100.0)
    }
}

/// Exact (unrounded) American equivalent of decimal odds.
/// Decimal odds at exactly 2.0 map to +100 by convention.
pub fn decimal_to_american_exact(decimal: f64) -> f64 {
    if decimal >= 2.0 {
        (decimal - 1.0) * 100.0
    } else {
        -100.0 / (decimal - 1.0)
    }
}

/// Rounded American odds for the wire.
pub fn decimal_to_american(decimal: f64) -> i64 {
    decimal_to_american_exact(decimal).round() as i64
}

pub fn american_to_decimal_exact(american: f64) -> f64 {
    if american > 0.0 {
        1.0 + american / 100.0
    } else {
        1.0 + 100.0 / -american
    }
}

/// Fair American odds for a win probability. Probabilities at or below zero
/// saturate at the longest representable quote.
pub fn prob_to_american(prob: f64) -> i64 {
    if prob <= 1e-9 {
        return 100_000;
    }
    decimal_to_american(1.0 / prob.min(1.0 - 1e-12))
}
