//! Per-leg marginal resolution and standardized thresholds.
//!
//! Every leg is reduced to a unit-variance threshold `z` so the copula layer
//! can operate in standardized space: the sampler's win test is `T > z`.
//! For an over leg `z = (line - mean) / stddev`; an under leg negates the
//! threshold (the assembler flips its correlations to match).

use crate::snapshot::MarginalTable;
use crate::types::{DistFamily, EvalError, GameContext, Leg, LegKind, Marginal};

/// Canonical NFL spread sigma.
pub const MARGIN_SIGMA: f64 = 13.86;
/// Canonical NFL total sigma.
pub const TOTAL_SIGMA: f64 = 10.66;

pub const MARGIN_STAT: &str = "margin";
pub const TOTAL_STAT: &str = "total";

/// Resolve each leg to its marginal: player props from the snapshot,
/// game-level legs synthesized from the context projections.
pub fn resolve(
    legs: &[Leg],
    context: &GameContext,
    table: &MarginalTable,
) -> Result<Vec<Marginal>, EvalError> {
    let mut out = Vec::with_capacity(legs.len());
    for leg in legs {
        let marginal = match leg.kind {
            LegKind::PlayerProp => {
                let stat = leg.stat();
                table
                    .get(&leg.subject_id, stat)
                    .cloned()
                    .ok_or_else(|| EvalError::MarginalMissing {
                        subject_id: leg.subject_id.clone(),
                        stat_kind: stat.to_string(),
                    })?
            }
            LegKind::Spread | LegKind::Moneyline => {
                let margin = context.spread.ok_or_else(|| EvalError::MarginalMissing {
                    subject_id: leg.subject_id.clone(),
                    stat_kind: MARGIN_STAT.to_string(),
                })?;
                synthetic(&leg.subject_id, MARGIN_STAT, margin, MARGIN_SIGMA)
            }
            LegKind::Total => {
                let total = context.total.ok_or_else(|| EvalError::MarginalMissing {
                    subject_id: leg.subject_id.clone(),
                    stat_kind: TOTAL_STAT.to_string(),
                })?;
                synthetic(&leg.subject_id, TOTAL_STAT, total, TOTAL_SIGMA)
            }
        };
        if marginal.stddev <= 0.0 || !marginal.stddev.is_finite() {
            return Err(EvalError::InvalidLeg(format!(
                "marginal for {} {} has non-positive stddev",
                marginal.subject_id, marginal.stat_kind
            )));
        }
        out.push(marginal);
    }
    Ok(out)
}

fn synthetic(subject_id: &str, stat: &str, mean: f64, stddev: f64) -> Marginal {
    Marginal {
        subject_id: subject_id.to_string(),
        stat_kind: stat.to_string(),
        dist_family: DistFamily::Normal,
        params: vec![],
        mean,
        stddev,
        sample_size: 0,
    }
}

/// Standardized threshold for one leg. Moneyline legs are a margin bet at
/// line zero ("over" = home side).
pub fn threshold(leg: &Leg, marginal: &Marginal) -> f64 {
    let line = if leg.kind == LegKind::Moneyline {
        0.0
    } else {
        leg.line
    };
    let z = (line - marginal.mean) / marginal.stddev;
    z * leg.direction.sign()
}

pub fn thresholds(legs: &[Leg], marginals: &[Marginal]) -> Vec<f64> {
    legs.iter()
        .zip(marginals.iter())
        .map(|(leg, m)| threshold(leg, m))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;

    fn leg(kind: LegKind, subject: &str, line: f64, direction: Direction) -> Leg {
        Leg {
            kind,
            subject_id: subject.to_string(),
            stat_kind: (kind == LegKind::PlayerProp).then(|| "passing_yards".to_string()),
            line,
            direction,
            odds_american: -110,
        }
    }

    fn prop_marginal(mean: f64, stddev: f64) -> Marginal {
        Marginal {
            subject_id: "qb1".to_string(),
            stat_kind: "passing_yards".to_string(),
            dist_family: DistFamily::Normal,
            params: vec![],
            mean,
            stddev,
            sample_size: 120,
        }
    }

    #[test]
    fn over_threshold_matches_standardized_line() {
        // mean 265, line 265.5 over: z just above the mean.
        let l = leg(LegKind::PlayerProp, "qb1", 265.5, Direction::Over);
        let z = threshold(&l, &prop_marginal(265.0, 45.0));
        assert!((z - 0.0111).abs() < 1e-3);

        // mean 75, line 70.5 over: comfortably below the mean.
        let l2 = leg(LegKind::PlayerProp, "rb1", 70.5, Direction::Over);
        let z2 = threshold(&l2, &prop_marginal(75.0, 22.0));
        assert!((z2 + 0.2045).abs() < 1e-3);
    }

    #[test]
    fn under_negates_the_threshold() {
        let over = leg(LegKind::PlayerProp, "rb1", 70.5, Direction::Over);
        let under = leg(LegKind::PlayerProp, "rb1", 70.5, Direction::Under);
        let m = prop_marginal(75.0, 22.0);
        assert!((threshold(&over, &m) + threshold(&under, &m)).abs() < 1e-12);
    }

    #[test]
    fn moneyline_uses_line_zero() {
        let ctx = GameContext {
            spread: Some(6.5),
            ..Default::default()
        };
        let ml = leg(LegKind::Moneyline, "home", 999.0, Direction::Over);
        let resolved = resolve(&[ml.clone()], &ctx, &MarginalTable::default()).unwrap();
        assert_eq!(resolved[0].stat_kind, MARGIN_STAT);
        assert!((resolved[0].mean - 6.5).abs() < 1e-12);
        assert!((resolved[0].stddev - MARGIN_SIGMA).abs() < 1e-12);
        // Line on the leg is ignored for moneyline.
        let z = threshold(&ml, &resolved[0]);
        assert!((z - (0.0 - 6.5) / MARGIN_SIGMA).abs() < 1e-12);
    }

    #[test]
    fn total_leg_synthesizes_from_context() {
        let ctx = GameContext {
            total: Some(47.5),
            ..Default::default()
        };
        let t = leg(LegKind::Total, "game", 44.5, Direction::Under);
        let resolved = resolve(&[t], &ctx, &MarginalTable::default()).unwrap();
        assert!((resolved[0].mean - 47.5).abs() < 1e-12);
        assert!((resolved[0].stddev - TOTAL_SIGMA).abs() < 1e-12);
    }

    #[test]
    fn missing_projection_is_marginal_missing() {
        let spread = leg(LegKind::Spread, "home", -3.5, Direction::Over);
        let err = resolve(&[spread], &GameContext::default(), &MarginalTable::default())
            .unwrap_err();
        assert_eq!(err.wire_code(), "MARGINAL_MISSING");
    }

    #[test]
    fn missing_player_marginal_is_rejected() {
        let l = leg(LegKind::PlayerProp, "qb1", 265.5, Direction::Over);
        let err = resolve(&[l], &GameContext::default(), &MarginalTable::default()).unwrap_err();
        assert_eq!(err.wire_code(), "MARGINAL_MISSING");
    }
}
