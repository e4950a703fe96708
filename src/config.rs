use std::env;
use std::time::Duration;

const DEFAULT_SAMPLE_COUNT: u64 = 10_000;
const DEFAULT_DEADLINE_MS: u64 = 500;
const DEFAULT_KELLY_CAP: f64 = 0.25;
const DEFAULT_SENTIMENT_MAX_SHIFT: f64 = 0.10;

/// Process-wide simulation constants. Built once at evaluator construction
/// and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub sample_count: u64,
    pub max_legs: usize,
    pub min_nu: f64,
    pub max_nu: f64,
    pub kelly_cap: f64,
    pub sentiment_max_shift: f64,
    pub deadline: Duration,
    /// Sample count for the startup warmup pass.
    pub warmup_samples: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_count: DEFAULT_SAMPLE_COUNT,
            max_legs: crate::types::MAX_LEGS,
            min_nu: 2.5,
            max_nu: 30.0,
            kelly_cap: DEFAULT_KELLY_CAP,
            sentiment_max_shift: DEFAULT_SENTIMENT_MAX_SHIFT,
            deadline: Duration::from_millis(DEFAULT_DEADLINE_MS),
            warmup_samples: 2_000,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let sample_count = env::var("PARLAY_SAMPLE_COUNT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.sample_count)
            .clamp(1_000, 1_000_000);
        let deadline_ms = env::var("PARLAY_DEADLINE_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_DEADLINE_MS)
            .clamp(10, 60_000);
        // The wire contract fixes kelly_fraction to [0, 0.25]; the env var can
        // only tighten the cap, never widen it.
        let kelly_cap = env::var("PARLAY_KELLY_CAP")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(defaults.kelly_cap)
            .clamp(0.0, DEFAULT_KELLY_CAP);

        Self {
            sample_count,
            deadline: Duration::from_millis(deadline_ms),
            kelly_cap,
            ..defaults
        }
    }
}
