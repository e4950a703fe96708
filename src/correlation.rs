//! Correlation matrix assembly across parlay legs.

use tracing::debug;

use crate::snapshot::CorrelationTable;
use crate::types::{Direction, EvalError, Leg, LegKind, Marginal, MAX_LEGS};

/// Post-boost clip bound keeping the matrix numerically safe.
pub const CORR_CLIP: f64 = 0.98;

#[derive(Debug, Clone)]
pub struct AssembledCorrelation {
    /// Row-major n x n symmetric matrix, unit diagonal.
    pub matrix: Vec<f64>,
    pub n: usize,
    /// Player-prop pairs with no stored correlation, imputed to zero.
    pub imputed_pairs: Vec<[String; 4]>,
}

impl AssembledCorrelation {
    pub fn at(&self, i: usize, j: usize) -> f64 {
        self.matrix[i * self.n + j]
    }
}

/// Build the leg-by-leg correlation matrix: stored pair correlations, a -1
/// sign flip per under leg, the regime boost, then the safety clip.
pub fn assemble(
    legs: &[Leg],
    marginals: &[Marginal],
    correlations: &CorrelationTable,
    corr_boost: f64,
) -> Result<AssembledCorrelation, EvalError> {
    let n = legs.len();
    if n > MAX_LEGS {
        return Err(EvalError::TooManyLegs {
            count: n,
            max: MAX_LEGS,
        });
    }
    debug_assert_eq!(n, marginals.len());

    let mut matrix = vec![0.0; n * n];
    let mut imputed_pairs = Vec::new();
    for i in 0..n {
        matrix[i * n + i] = 1.0;
    }

    for i in 0..n {
        for j in (i + 1)..n {
            let (mi, mj) = (&marginals[i], &marginals[j]);
            let stored = correlations.get(&mi.subject_id, &mi.stat_kind, &mj.subject_id, &mj.stat_kind);

            let mut rho = match stored {
                Some(rho) => rho,
                None => {
                    // Synthetic game-level legs default to zero by contract;
                    // only player-prop pairs count as imputed.
                    if legs[i].kind == LegKind::PlayerProp && legs[j].kind == LegKind::PlayerProp {
                        imputed_pairs.push([
                            mi.subject_id.clone(),
                            mi.stat_kind.clone(),
                            mj.subject_id.clone(),
                            mj.stat_kind.clone(),
                        ]);
                    }
                    0.0
                }
            };

            // Under legs are simulated as the negated variable: flip once per
            // under leg. Under-under flips twice and preserves the sign.
            if legs[i].direction == Direction::Under {
                rho = -rho;
            }
            if legs[j].direction == Direction::Under {
                rho = -rho;
            }

            rho = (rho * corr_boost).clamp(-CORR_CLIP, CORR_CLIP);
            matrix[i * n + j] = rho;
            matrix[j * n + i] = rho;
        }
    }

    if !imputed_pairs.is_empty() {
        debug!(count = imputed_pairs.len(), "pair correlations imputed to zero");
    }

    Ok(AssembledCorrelation {
        matrix,
        n,
        imputed_pairs,
    })
}
