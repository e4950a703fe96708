use tracing::debug;

use crate::snapshot::CorrelationTable;
use crate::types::{GameContext, Leg, LegKind, Marginal, SteamDirection, SteamSignal};

const WIND_FREE_MPH: f64 = 12.0;
const WIND_STEEP_MPH: f64 = 18.0;
const WIND_LINEAR_PCT_PER_MPH: f64 = 0.02;
const WIND_STEEP_PCT_PER_MPH: f64 = 0.03;
const WIND_STEEP_BASE: f64 = 0.12;
const PASS_PENALTY_CAP: f64 = 0.40;
const COLD_THRESHOLD_F: f64 = 25.0;
const COLD_RELATIVE_BUMP: f64 = 0.03;
const PRECIP_PENALTY_SCALE: f64 = 0.05;
const RUN_BOOST_RATIO: f64 = 0.5;
const FG_PENALTY_RATIO: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    Wind,
    Temperature,
    Precipitation,
    Injury,
}

/// One named context effect and the per-leg mean changes it caused.
/// The attributor turns these into counterfactual probability impacts.
#[derive(Debug, Clone)]
pub struct ContextEffect {
    pub kind: EffectKind,
    pub name: String,
    pub detail: String,
    /// Signed change applied to each leg's marginal mean (post - pre).
    pub mean_delta: Vec<f64>,
}

/// Quantizer output: adjusted marginals plus the ledger of what moved them.
#[derive(Debug, Clone)]
pub struct QuantizedFeatures {
    pub marginals: Vec<Marginal>,
    pub effects: Vec<ContextEffect>,
    /// Post-hoc probability shift from sentiment, applied in the estimator.
    pub sentiment_shift: f64,
    pub passing_penalty: f64,
    pub fg_accuracy_penalty: f64,
}

pub fn is_passing_family(stat: &str) -> bool {
    stat.starts_with("pass")
        || stat.starts_with("receiv")
        || stat == "receptions"
        || stat == "completions"
}

pub fn is_rushing_family(stat: &str) -> bool {
    stat.contains("rush")
}

pub fn is_kicking_family(stat: &str) -> bool {
    stat.contains("field_goal") || stat.starts_with("fg_")
}

/// Wind penalty on passing means: free below 12 mph, 2%/mph to 18 mph,
/// then 12% + 3%/mph, capped at 40%.
pub fn wind_penalty(wind_mph: f64) -> f64 {
    let penalty = if wind_mph < WIND_FREE_MPH {
        0.0
    } else if wind_mph <= WIND_STEEP_MPH {
        (wind_mph - WIND_FREE_MPH) * WIND_LINEAR_PCT_PER_MPH
    } else {
        WIND_STEEP_BASE + (wind_mph - WIND_STEEP_MPH) * WIND_STEEP_PCT_PER_MPH
    };
    penalty.min(PASS_PENALTY_CAP)
}

/// Adjust the per-leg marginals for weather and injuries, and quantize
/// sentiment into the posterior shift. Stddevs are never modified; tail
/// behavior belongs to the copula layer.
pub fn quantize(
    context: &GameContext,
    legs: &[Leg],
    mut marginals: Vec<Marginal>,
    correlations: &CorrelationTable,
    max_sentiment_shift: f64,
) -> QuantizedFeatures {
    debug_assert_eq!(legs.len(), marginals.len());
    let n = legs.len();
    let mut effects: Vec<ContextEffect> = Vec::new();

    let wind = context.wind_mph.unwrap_or(0.0).max(0.0);
    let wind_term = wind_penalty(wind);
    let cold_term = match context.temp_f {
        Some(t) if t < COLD_THRESHOLD_F => wind_term * COLD_RELATIVE_BUMP,
        _ => 0.0,
    };
    let precip_term = context.precip_prob.unwrap_or(0.0).clamp(0.0, 1.0) * PRECIP_PENALTY_SCALE;
    let raw_sum = wind_term + cold_term + precip_term;
    let passing_penalty = raw_sum.min(PASS_PENALTY_CAP);
    let fg_accuracy_penalty = passing_penalty * FG_PENALTY_RATIO;

    // The combined penalty is capped, and it is applied ONCE per leg as a
    // single multiplier. When the cap bites, the terms are scaled down
    // proportionally so the per-term attribution still sums to the change
    // actually applied.
    let term_scale = if raw_sum > PASS_PENALTY_CAP {
        PASS_PENALTY_CAP / raw_sum
    } else {
        1.0
    };
    let weather_terms = [
        (
            EffectKind::Wind,
            "wind",
            wind_term * term_scale,
            format!("{wind:.0} mph wind reduces passing efficiency"),
        ),
        (
            EffectKind::Temperature,
            "temperature",
            cold_term * term_scale,
            format!(
                "temperature {:.0}F compounds the wind penalty",
                context.temp_f.unwrap_or(0.0)
            ),
        ),
        (
            EffectKind::Precipitation,
            "precipitation",
            precip_term * term_scale,
            format!(
                "{:.0}% precipitation chance affects ball handling",
                context.precip_prob.unwrap_or(0.0) * 100.0
            ),
        ),
    ];

    let mut weather_deltas = [vec![0.0; n], vec![0.0; n], vec![0.0; n]];
    for (i, leg) in legs.iter().enumerate() {
        if leg.kind != LegKind::PlayerProp {
            continue;
        }
        let stat = leg.stat();
        let m = &mut marginals[i];
        // Per-unit-of-penalty change in the mean for this stat family.
        let per_penalty = if is_passing_family(stat) {
            -m.mean
        } else if is_rushing_family(stat) {
            m.mean * RUN_BOOST_RATIO
        } else if is_kicking_family(stat) {
            -m.mean * FG_PENALTY_RATIO
        } else {
            continue;
        };
        for (slot, (_, _, term, _)) in weather_terms.iter().enumerate() {
            weather_deltas[slot][i] = per_penalty * term;
        }
        m.mean += per_penalty * passing_penalty;
    }
    for (slot, (kind, name, term, detail)) in weather_terms.into_iter().enumerate() {
        if term <= 0.0 {
            continue;
        }
        let mean_delta = std::mem::take(&mut weather_deltas[slot]);
        if mean_delta.iter().any(|d| *d != 0.0) {
            effects.push(ContextEffect {
                kind,
                name: name.to_string(),
                detail,
                mean_delta,
            });
        }
    }

    // Injury propagation through stored correlations. A negative correlation
    // boosts the mean (next man up), a positive one drags it down.
    for injury in &context.injuries {
        let severity = injury.status.severity();
        let impact = injury.impact.clamp(0.0, 1.0);
        if severity * impact <= 0.0 {
            continue;
        }
        let mut mean_delta = vec![0.0; n];
        for (i, leg) in legs.iter().enumerate() {
            if leg.kind != LegKind::PlayerProp {
                continue;
            }
            let stat = leg.stat();
            let rho = if leg.subject_id == injury.player_id {
                1.0
            } else {
                correlations
                    .get(&injury.player_id, stat, &leg.subject_id, stat)
                    .unwrap_or(0.0)
            };
            if rho == 0.0 {
                continue;
            }
            let m = &mut marginals[i];
            let delta = -m.mean * severity * impact * rho;
            m.mean += delta;
            mean_delta[i] = delta;
        }
        if mean_delta.iter().any(|d| *d != 0.0) {
            debug!(
                player = %injury.player_id,
                status = ?injury.status,
                "injury adjustment applied"
            );
            effects.push(ContextEffect {
                kind: EffectKind::Injury,
                name: format!("injury:{}", injury.player_id),
                detail: format!(
                    "{} ({:?}, impact {:.2}) affects correlated legs",
                    injury.player_id, injury.status, injury.impact
                ),
                mean_delta,
            });
        }
    }

    let sentiment_shift = sentiment_shift(context.sentiment, max_sentiment_shift);

    QuantizedFeatures {
        marginals,
        effects,
        sentiment_shift,
        passing_penalty,
        fg_accuracy_penalty,
    }
}

/// Sentiment 0.5 is neutral; the shift is bounded to +-max_shift probability
/// points and only ever touches the final posterior, never the marginals.
pub fn sentiment_shift(sentiment: Option<f64>, max_shift: f64) -> f64 {
    match sentiment {
        Some(s) => (s.clamp(0.0, 1.0) - 0.5) * 2.0 * max_shift,
        None => 0.0,
    }
}

const STEAM_WINDOW_SECS: f64 = 60.0;
const STEAM_MIN_BOOKS: usize = 3;
const STEAM_MIN_CENTS: f64 = 5.0;
const STEAM_FULL_CONFIDENCE_BOOKS: f64 = 5.0;

/// One observed line move at one book.
#[derive(Debug, Clone)]
pub struct OddsMove {
    pub book: String,
    pub old_odds: i32,
    pub new_odds: i32,
    /// Seconds since the move was observed.
    pub age_secs: f64,
}

/// Steam: three or more books moving the same way by more than five cents
/// inside the window. Confidence saturates at five books.
pub fn detect_steam(moves: &[OddsMove]) -> Option<SteamSignal> {
    let recent: Vec<&OddsMove> = moves
        .iter()
        .filter(|m| m.age_secs <= STEAM_WINDOW_SECS)
        .collect();
    if recent.len() < STEAM_MIN_BOOKS {
        return None;
    }

    let avg_move = recent
        .iter()
        .map(|m| (m.new_odds - m.old_odds) as f64)
        .sum::<f64>()
        / recent.len() as f64;
    let books: std::collections::HashSet<&str> =
        recent.iter().map(|m| m.book.as_str()).collect();

    if avg_move.abs() <= STEAM_MIN_CENTS || books.len() < STEAM_MIN_BOOKS {
        return None;
    }

    Some(SteamSignal {
        direction: if avg_move > 0.0 {
            SteamDirection::Over
        } else {
            SteamDirection::Under
        },
        magnitude_cents: avg_move.abs(),
        book_count: books.len() as u32,
        confidence: (books.len() as f64 / STEAM_FULL_CONFIDENCE_BOOKS).min(1.0),
    })
}
