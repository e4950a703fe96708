//! Pipeline orchestration: validation, stage composition, the evaluation
//! deadline, and the startup warmup pass.

use std::time::Instant;

use tracing::{debug, info};

use crate::cholesky;
use crate::config::EngineConfig;
use crate::correlation;
use crate::estimator;
use crate::explain::{self, AttributionInputs};
use crate::features;
use crate::marginals;
use crate::regime;
use crate::sampler;
use crate::snapshot::{CorrelationTable, MarginalTable};
use crate::types::{
    EvalError, EvaluateRequest, Explanation, ParlayEvaluation, Regime, SimulationMeta,
};

const DEFAULT_SEED: u64 = 0;

/// Orchestrates one evaluation per call. Construction runs the warmup
/// simulation so first-request latency stays inside the budget.
pub struct Evaluator {
    config: EngineConfig,
    warmed_up: bool,
}

impl Evaluator {
    pub fn new(config: EngineConfig) -> Self {
        let started = Instant::now();
        let warmed_up = warmup(config.warmup_samples);
        info!(
            elapsed_ms = started.elapsed().as_secs_f64() * 1e3,
            "simulation kernel warmed up"
        );
        Self { config, warmed_up }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate a parlay against the snapshot tables. Deadline overruns
    /// degrade the response instead of failing it; every other error maps to
    /// a wire code.
    pub fn evaluate(
        &self,
        request: &EvaluateRequest,
        marginal_table: &MarginalTable,
        correlation_table: &CorrelationTable,
    ) -> Result<ParlayEvaluation, EvalError> {
        let started = Instant::now();
        let seed = request.seed.unwrap_or(DEFAULT_SEED);
        let n_samples = request
            .sample_count
            .unwrap_or(self.config.sample_count)
            .max(100);

        let legs = &request.legs;
        if legs.is_empty() {
            return Err(EvalError::InvalidLeg("parlay has no legs".to_string()));
        }
        if legs.len() > self.config.max_legs {
            return Err(EvalError::TooManyLegs {
                count: legs.len(),
                max: self.config.max_legs,
            });
        }
        for leg in legs {
            leg.validate()?;
        }

        let resolved = marginals::resolve(legs, &request.game_context, marginal_table)?;
        let quantized = features::quantize(
            &request.game_context,
            legs,
            resolved,
            correlation_table,
            self.config.sentiment_max_shift,
        );
        let regime = regime::classify(&request.game_context);
        let nu = regime.nu.clamp(self.config.min_nu, self.config.max_nu);
        debug!(regime = regime.kind.label(), nu, "regime classified");

        if self.deadline_exceeded(started) {
            return Ok(self.degraded(&regime, seed, started));
        }

        let assembled = correlation::assemble(
            legs,
            &quantized.marginals,
            correlation_table,
            regime.corr_boost,
        )?;

        if self.deadline_exceeded(started) {
            return Ok(self.degraded(&regime, seed, started));
        }

        let factor = cholesky::factor(&assembled)?;

        if self.deadline_exceeded(started) {
            return Ok(self.degraded(&regime, seed, started));
        }

        let thresholds = marginals::thresholds(legs, &quantized.marginals);
        let sim_started = Instant::now();
        let counts = sampler::simulate(&factor, &thresholds, nu, n_samples, seed)?;
        let sim_ms = sim_started.elapsed().as_secs_f64() * 1e3;

        if self.deadline_exceeded(started) {
            return Ok(self.degraded(&regime, seed, started));
        }

        let sim = estimator::summarize(&counts, nu);
        let pricing = estimator::price(
            &sim,
            legs,
            quantized.sentiment_shift,
            self.config.kelly_cap,
        );

        let explanation = explain::attribute(AttributionInputs {
            context: &request.game_context,
            legs,
            marginals: &quantized.marginals,
            thresholds: &thresholds,
            effects: &quantized.effects,
            per_leg_hit_rate: &sim.per_leg_hit_rate,
            true_prob: sim.true_prob,
            independence_baseline: pricing.independence_baseline,
            nu,
            regime: &regime,
            imputed_pairs: assembled.imputed_pairs.clone(),
        });

        Ok(ParlayEvaluation {
            recommended: pricing.recommended,
            true_probability: pricing.shifted_prob,
            implied_probability: pricing.implied_prob,
            confidence_interval: [sim.ci_low, sim.ci_high],
            fair_odds_american: pricing.fair_odds_american,
            sportsbook_odds_american: pricing.book_odds_american,
            ev_pct: pricing.ev_pct,
            correlation_multiplier: sim.corr_multiplier,
            tail_risk_factor: sim.tail_risk,
            kelly_fraction: pricing.kelly_fraction,
            explanation,
            simulation_meta: SimulationMeta {
                ms: sim_ms,
                n_samples,
                nu,
                warmed_up: self.warmed_up,
                seed,
            },
            error_code: None,
        })
    }

    fn deadline_exceeded(&self, started: Instant) -> bool {
        started.elapsed() >= self.config.deadline
    }

    /// Deadline overrun: keep the schema, zero the numbers, say why.
    fn degraded(&self, regime: &Regime, seed: u64, started: Instant) -> ParlayEvaluation {
        ParlayEvaluation {
            recommended: false,
            true_probability: 0.0,
            implied_probability: 0.0,
            confidence_interval: [0.0, 0.0],
            fair_odds_american: 0,
            sportsbook_odds_american: 0,
            ev_pct: 0.0,
            correlation_multiplier: 0.0,
            tail_risk_factor: 0.0,
            kelly_fraction: 0.0,
            explanation: Explanation {
                regime: regime.kind,
                regime_reasoning: "timeout".to_string(),
                factors: vec![],
                imputed_pairs: vec![],
            },
            simulation_meta: SimulationMeta {
                ms: started.elapsed().as_secs_f64() * 1e3,
                n_samples: 0,
                nu: 0.0,
                warmed_up: self.warmed_up,
                seed,
            },
            error_code: Some(EvalError::DeadlineExceeded.wire_code().to_string()),
        }
    }
}

/// Prime the kernel (thread pool, code paths) with a dummy two-leg run.
fn warmup(n_samples: u64) -> bool {
    let assembled = correlation::AssembledCorrelation {
        matrix: vec![1.0, 0.3, 0.3, 1.0],
        n: 2,
        imputed_pairs: vec![],
    };
    let Ok(factor) = cholesky::factor(&assembled) else {
        return false;
    };
    sampler::simulate(&factor, &[0.0, 0.0], 5.0, n_samples.max(100), DEFAULT_SEED).is_ok()
}
