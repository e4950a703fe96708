//! Game-script classification. The detected regime drives the Student-t
//! degrees of freedom (tail heaviness) and a multiplicative correlation
//! boost applied by the assembler.

use crate::types::{GameContext, Regime, RegimeKind};

const BLOWOUT_SPREAD: f64 = 10.0;
const SHOOTOUT_TOTAL: f64 = 52.0;
const SHOOTOUT_OFF_EFF: f64 = 0.10;
const DEFENSIVE_TOTAL: f64 = 40.0;
const DEFENSIVE_DEF_EFF: f64 = -0.10;
const OVERTIME_SPREAD: f64 = 3.0;
const OVERTIME_TOTAL_LOW: f64 = 44.0;
const OVERTIME_TOTAL_HIGH: f64 = 49.0;

/// First matching rule wins; NORMAL is the fallback.
pub fn classify(context: &GameContext) -> Regime {
    let spread = context.spread;
    let total = context.total;
    let avg_off_eff = avg(context.home_off_eff, context.away_off_eff);
    let avg_def_eff = avg(context.home_def_eff, context.away_def_eff);

    if let Some(s) = spread {
        if s.abs() >= BLOWOUT_SPREAD {
            return Regime {
                kind: RegimeKind::Blowout,
                nu: 3.0,
                corr_boost: 1.25,
                confidence: rule_confidence(s.abs() / BLOWOUT_SPREAD),
                reasoning: format!("Large spread ({s:+.1}) points to a one-sided game script"),
            };
        }
    }

    if let (Some(t), Some(off)) = (total, avg_off_eff) {
        if t >= SHOOTOUT_TOTAL && off >= SHOOTOUT_OFF_EFF {
            return Regime {
                kind: RegimeKind::Shootout,
                nu: 4.0,
                corr_boost: 1.15,
                confidence: rule_confidence(t / SHOOTOUT_TOTAL),
                reasoning: format!(
                    "High total ({t:.0}) with strong offenses (avg eff {off:+.2})"
                ),
            };
        }
    }

    if let (Some(t), Some(def)) = (total, avg_def_eff) {
        if t <= DEFENSIVE_TOTAL && def <= DEFENSIVE_DEF_EFF {
            return Regime {
                kind: RegimeKind::Defensive,
                nu: 6.0,
                corr_boost: 1.05,
                confidence: rule_confidence(DEFENSIVE_TOTAL / t.max(1.0)),
                reasoning: format!(
                    "Low total ({t:.0}) with strong defenses (avg eff {def:+.2})"
                ),
            };
        }
    }

    if let (Some(s), Some(t)) = (spread, total) {
        if s.abs() <= OVERTIME_SPREAD && (OVERTIME_TOTAL_LOW..=OVERTIME_TOTAL_HIGH).contains(&t) {
            return Regime {
                kind: RegimeKind::OvertimeRisk,
                nu: 3.5,
                corr_boost: 1.20,
                confidence: rule_confidence(OVERTIME_SPREAD / s.abs().max(1.0)),
                reasoning: format!(
                    "Close spread ({s:+.1}) and mid-range total ({t:.0}) raise overtime odds"
                ),
            };
        }
    }

    Regime {
        kind: RegimeKind::Normal,
        nu: 5.0,
        corr_boost: 1.00,
        confidence: 0.6,
        reasoning: match (spread, total) {
            (Some(s), Some(t)) => {
                format!("Standard conditions (spread {s:+.1}, total {t:.0})")
            }
            _ => "Standard conditions (incomplete game context)".to_string(),
        },
    }
}

/// Signal strength normalized against the rule threshold, clipped to the
/// confidence band the ladder promises.
fn rule_confidence(strength_ratio: f64) -> f64 {
    (0.5 * strength_ratio).clamp(0.5, 0.95)
}

fn avg(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some((a + b) / 2.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(spread: f64, total: f64) -> GameContext {
        GameContext {
            spread: Some(spread),
            total: Some(total),
            ..Default::default()
        }
    }

    #[test]
    fn blowout_wins_the_ladder() {
        let mut c = ctx(14.5, 55.0);
        c.home_off_eff = Some(0.2);
        c.away_off_eff = Some(0.2);
        let r = classify(&c);
        assert_eq!(r.kind, RegimeKind::Blowout);
        assert_eq!(r.nu, 3.0);
        assert_eq!(r.corr_boost, 1.25);
        assert!(r.confidence >= 0.5 && r.confidence <= 0.95);
    }

    #[test]
    fn shootout_requires_offense_signal() {
        let mut c = ctx(-3.5, 54.0);
        c.home_off_eff = Some(0.15);
        c.away_off_eff = Some(0.12);
        let r = classify(&c);
        assert_eq!(r.kind, RegimeKind::Shootout);
        assert_eq!(r.nu, 4.0);

        // Same total without efficiency data falls through.
        let r2 = classify(&ctx(-3.5, 54.0));
        assert_ne!(r2.kind, RegimeKind::Shootout);
    }

    #[test]
    fn defensive_struggle() {
        let mut c = ctx(2.5, 38.0);
        c.home_def_eff = Some(-0.18);
        c.away_def_eff = Some(-0.12);
        let r = classify(&c);
        assert_eq!(r.kind, RegimeKind::Defensive);
        assert_eq!(r.nu, 6.0);
        assert_eq!(r.corr_boost, 1.05);
    }

    #[test]
    fn overtime_window() {
        let r = classify(&ctx(-2.5, 47.0));
        assert_eq!(r.kind, RegimeKind::OvertimeRisk);
        assert_eq!(r.nu, 3.5);
        // Total outside [44, 49] is not an overtime signal.
        let r2 = classify(&ctx(-2.5, 50.0));
        assert_eq!(r2.kind, RegimeKind::Normal);
    }

    #[test]
    fn normal_fallback_has_fixed_confidence() {
        let r = classify(&ctx(-6.5, 45.0));
        assert_eq!(r.kind, RegimeKind::Normal);
        assert_eq!(r.nu, 5.0);
        assert_eq!(r.corr_boost, 1.0);
        assert!((r.confidence - 0.6).abs() < 1e-12);
    }

    #[test]
    fn empty_context_is_normal() {
        let r = classify(&GameContext::default());
        assert_eq!(r.kind, RegimeKind::Normal);
    }

    #[test]
    fn confidence_scales_with_signal_strength() {
        let weak = classify(&ctx(10.0, 45.0));
        let strong = classify(&ctx(19.5, 45.0));
        assert_eq!(weak.kind, RegimeKind::Blowout);
        assert_eq!(strong.kind, RegimeKind::Blowout);
        assert!(strong.confidence > weak.confidence);
        assert!(strong.confidence <= 0.95);
    }
}
