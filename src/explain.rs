//! Factor attribution for the evaluation result.
//!
//! Each named effect is priced as the change in joint probability if it were
//! removed, using a linearized one-at-a-time counterfactual: the effect's
//! mean delta moves the leg threshold, the Student-t density at the threshold
//! converts that into a leg hit-rate delta, and the joint/leg ratio lifts it
//! to the parlay level. No re-simulation.

use crate::features::{ContextEffect, EffectKind};
use crate::types::{
    Explanation, Factor, FactorDirection, GameContext, Leg, Marginal, Regime, SteamDirection,
};

const MAX_FACTORS: usize = 8;

const STEAM_BASE_IMPACT: f64 = 0.08;
const MATCHUP_IMPACT_SCALE: f64 = 0.6;
const MATCHUP_IMPACT_CAP: f64 = 0.12;
const IMPUTED_IMPACT_PER_PAIR: f64 = -0.005;
const MIN_REPORTABLE_IMPACT: f64 = 1e-4;

// Plausible maxima per factor family, the denominators for confidence.
const MAX_WEATHER: f64 = 0.25;
const MAX_TEMPERATURE: f64 = 0.05;
const MAX_PRECIPITATION: f64 = 0.05;
const MAX_INJURY: f64 = 0.30;
const MAX_REGIME: f64 = 0.25;
const MAX_IMPUTED: f64 = 0.05;

pub struct AttributionInputs<'a> {
    pub context: &'a GameContext,
    pub legs: &'a [Leg],
    pub marginals: &'a [Marginal],
    pub thresholds: &'a [f64],
    pub effects: &'a [ContextEffect],
    pub per_leg_hit_rate: &'a [f64],
    pub true_prob: f64,
    pub independence_baseline: f64,
    pub nu: f64,
    pub regime: &'a Regime,
    pub imputed_pairs: Vec<[String; 4]>,
}

pub fn attribute(inputs: AttributionInputs<'_>) -> Explanation {
    let mut factors: Vec<Factor> = Vec::new();

    for effect in inputs.effects {
        let impact = effect_impact(&inputs, effect);
        if impact.abs() < MIN_REPORTABLE_IMPACT {
            continue;
        }
        let (name, max) = match effect.kind {
            EffectKind::Wind => ("Weather: wind".to_string(), MAX_WEATHER),
            EffectKind::Temperature => ("Weather: cold".to_string(), MAX_TEMPERATURE),
            EffectKind::Precipitation => {
                ("Weather: precipitation".to_string(), MAX_PRECIPITATION)
            }
            EffectKind::Injury => (
                format!("Injury: {}", effect.name.trim_start_matches("injury:")),
                MAX_INJURY,
            ),
        };
        factors.push(make_factor(name, impact, effect.detail.clone(), max));
    }

    if let Some(steam) = &inputs.context.steam {
        // Steam in the direction most legs are bet is a supporting signal.
        let over_legs = inputs
            .legs
            .iter()
            .filter(|l| l.direction == crate::types::Direction::Over)
            .count();
        let steam_over = steam.direction == SteamDirection::Over;
        let aligned = if steam_over {
            over_legs * 2 >= inputs.legs.len()
        } else {
            over_legs * 2 < inputs.legs.len()
        };
        let impact = if aligned {
            STEAM_BASE_IMPACT * steam.confidence
        } else {
            -STEAM_BASE_IMPACT * steam.confidence
        };
        factors.push(make_factor(
            "Sharp money".to_string(),
            impact,
            format!(
                "{} books moved {:.0} cents toward the {:?} within the window",
                steam.book_count,
                steam.magnitude_cents,
                steam.direction
            ),
            STEAM_BASE_IMPACT,
        ));
    }

    if let Some(impact) = matchup_impact(inputs.context) {
        factors.push(make_factor(
            "Matchup: efficiency edge".to_string(),
            impact,
            "offense/defense efficiency differential shapes the expected script".to_string(),
            MATCHUP_IMPACT_CAP,
        ));
    }

    // The regime boost's contribution to the correlation lift. With no boost
    // the lift is attributed entirely to the stored correlations.
    if inputs.regime.corr_boost != 1.0 {
        let lift = inputs.true_prob - inputs.independence_baseline;
        let impact = lift * (1.0 - 1.0 / inputs.regime.corr_boost);
        if impact.abs() >= MIN_REPORTABLE_IMPACT {
            factors.push(make_factor(
                format!("Regime boost: {}", inputs.regime.kind.label()),
                impact,
                inputs.regime.reasoning.clone(),
                MAX_REGIME,
            ));
        }
    }

    if !inputs.imputed_pairs.is_empty() {
        let impact = IMPUTED_IMPACT_PER_PAIR * inputs.imputed_pairs.len() as f64;
        factors.push(make_factor(
            "Imputed correlations".to_string(),
            impact,
            format!(
                "{} leg pair(s) had no stored correlation and were treated as independent",
                inputs.imputed_pairs.len()
            ),
            MAX_IMPUTED,
        ));
    }

    factors.sort_by(|a, b| {
        b.impact
            .abs()
            .partial_cmp(&a.impact.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    factors.truncate(MAX_FACTORS);

    Explanation {
        regime: inputs.regime.kind,
        regime_reasoning: inputs.regime.reasoning.clone(),
        factors,
        imputed_pairs: inputs.imputed_pairs,
    }
}

/// Joint-probability impact of one mean-moving effect.
fn effect_impact(inputs: &AttributionInputs<'_>, effect: &ContextEffect) -> f64 {
    let mut impact = 0.0;
    for (i, delta_mu) in effect.mean_delta.iter().enumerate() {
        if *delta_mu == 0.0 {
            continue;
        }
        let sigma = inputs.marginals[i].stddev;
        let sign = inputs.legs[i].direction.sign();
        let leg_rate = inputs.per_leg_hit_rate[i].max(1e-6);
        let density = student_t_pdf(inputs.thresholds[i], inputs.nu);
        // dP/dmu_i = (P / p_i) * f(z_i) * sign / sigma.
        impact += (inputs.true_prob / leg_rate) * density * sign * delta_mu / sigma;
    }
    impact
}

fn matchup_impact(context: &GameContext) -> Option<f64> {
    let off = mean_of(&[context.home_off_eff, context.away_off_eff])?;
    let def = mean_of(&[context.home_def_eff, context.away_def_eff])?;
    let delta = off - def;
    let impact = (delta * MATCHUP_IMPACT_SCALE).clamp(-MATCHUP_IMPACT_CAP, MATCHUP_IMPACT_CAP);
    (impact.abs() >= 0.01).then_some(impact)
}

fn mean_of(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

fn make_factor(name: String, impact: f64, detail: String, plausible_max: f64) -> Factor {
    Factor {
        name,
        direction: if impact >= 0.0 {
            FactorDirection::Positive
        } else {
            FactorDirection::Negative
        },
        confidence: (impact.abs() / plausible_max).clamp(0.0, 1.0),
        impact,
        detail,
    }
}

fn student_t_pdf(z: f64, nu: f64) -> f64 {
    let half_nu = nu / 2.0;
    let coeff = (ln_gamma(half_nu + 0.5) - ln_gamma(half_nu)).exp()
        / (nu * std::f64::consts::PI).sqrt();
    coeff * (1.0 + z * z / nu).powf(-(nu + 1.0) / 2.0)
}

fn ln_gamma(x: f64) -> f64 {
    // Lanczos approximation, g = 7.
    const COEFFS: [f64; 8] = [
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let mut acc = 0.999_999_999_999_809_9;
    for (i, c) in COEFFS.iter().enumerate() {
        acc += c / (x + (i + 1) as f64);
    }
    let t = x + 7.5;
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + acc.ln()
}
