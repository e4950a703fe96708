//! Pricing a simulated parlay: EV, confidence interval, Kelly staking,
//! fair odds, and the recommendation predicate.

use crate::odds::{american_to_decimal, american_to_implied, prob_to_american};
use crate::sampler::SampleCounts;
use crate::types::{Leg, SimulationResult};

const WILSON_Z: f64 = 1.96;
const PROB_FLOOR: f64 = 0.01;
const PROB_CEIL: f64 = 0.99;
const RECOMMEND_TOLERANCE: f64 = 0.02;

/// Reduce raw hit counts to the simulation summary.
pub fn summarize(counts: &SampleCounts, nu: f64) -> SimulationResult {
    let true_prob = counts.true_prob();
    let per_leg_hit_rate = counts.per_leg_hit_rate();
    let independence: f64 = per_leg_hit_rate.iter().product();
    let corr_multiplier = if independence > 0.0 {
        true_prob / independence
    } else {
        0.0
    };
    let (ci_low, ci_high) = wilson_ci(counts.joint_hits, counts.n_samples, WILSON_Z);
    SimulationResult {
        true_prob,
        ci_low,
        ci_high,
        corr_multiplier,
        tail_risk: 1.0 / nu,
        per_leg_hit_rate,
    }
}

#[derive(Debug, Clone)]
pub struct Pricing {
    /// Sentiment-shifted posterior used for EV, Kelly, and fair odds.
    pub shifted_prob: f64,
    pub independence_baseline: f64,
    pub implied_prob: f64,
    pub payout_multiple: f64,
    pub ev_pct: f64,
    pub fair_odds_american: i64,
    pub book_odds_american: i64,
    pub kelly_fraction: f64,
    pub recommended: bool,
}

pub fn price(
    sim: &SimulationResult,
    legs: &[Leg],
    sentiment_shift: f64,
    kelly_cap: f64,
) -> Pricing {
    let independence_baseline: f64 = sim.per_leg_hit_rate.iter().product();
    let shifted_prob = (sim.true_prob + sentiment_shift).clamp(PROB_FLOOR, PROB_CEIL);

    // The book prices the parlay as if legs were independent.
    let implied_prob: f64 = legs
        .iter()
        .map(|l| american_to_implied(l.odds_american))
        .product();
    let payout_multiple: f64 = legs
        .iter()
        .map(|l| american_to_decimal(l.odds_american))
        .product();

    let ev_pct = (shifted_prob * payout_multiple - 1.0) * 100.0;
    let fair_odds_american = prob_to_american(shifted_prob);
    let book_odds_american = prob_to_american(implied_prob);
    let kelly_fraction = kelly(shifted_prob, payout_multiple, kelly_cap);

    // Positive EV alone is not enough: the CI lower bound has to carry the
    // payout within tolerance.
    let recommended =
        ev_pct > 0.0 && sim.ci_low * payout_multiple > 1.0 - RECOMMEND_TOLERANCE;

    Pricing {
        shifted_prob,
        independence_baseline,
        implied_prob,
        payout_multiple,
        ev_pct,
        fair_odds_american,
        book_odds_american,
        kelly_fraction,
        recommended,
    }
}

/// Wilson 95% interval on the Bernoulli joint indicator.
pub fn wilson_ci(successes: u64, n: u64, z: f64) -> (f64, f64) {
    if n == 0 {
        return (0.0, 1.0);
    }
    let n = n as f64;
    let p = successes as f64 / n;
    let z2 = z * z;
    let denom = 1.0 + z2 / n;
    let center = (p + z2 / (2.0 * n)) / denom;
    let half = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt() / denom;
    ((center - half).max(0.0), (center + half).min(1.0))
}

/// Kelly fraction with the quarter-Kelly cap: f* = (p b - q) / b for net
/// payout b, floored at zero.
pub fn kelly(p: f64, payout_multiple: f64, cap: f64) -> f64 {
    let b = payout_multiple - 1.0;
    if b <= 0.0 {
        return 0.0;
    }
    let raw = (p * b - (1.0 - p)) / b;
    raw.clamp(0.0, cap)
}
