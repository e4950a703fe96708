use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_LEGS: usize = 6;

pub const MIN_AMERICAN_ODDS: i32 = 100;
pub const MAX_AMERICAN_ODDS: i32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegKind {
    Spread,
    Total,
    Moneyline,
    PlayerProp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Over,
    Under,
}

impl Direction {
    /// +1 for over, -1 for under. Used for threshold and correlation sign flips.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Over => 1.0,
            Direction::Under => -1.0,
        }
    }
}

/// One wager condition of a parlay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leg {
    pub kind: LegKind,
    pub subject_id: String,
    #[serde(default)]
    pub stat_kind: Option<String>,
    pub line: f64,
    pub direction: Direction,
    pub odds_american: i32,
}

impl Leg {
    pub fn validate(&self) -> Result<(), EvalError> {
        if self.subject_id.trim().is_empty() {
            return Err(EvalError::InvalidLeg("empty subject_id".to_string()));
        }
        if !self.line.is_finite() {
            return Err(EvalError::InvalidLeg(format!(
                "non-finite line for {}",
                self.subject_id
            )));
        }
        if self.kind == LegKind::PlayerProp && self.stat_kind.is_none() {
            return Err(EvalError::InvalidLeg(format!(
                "player_prop leg {} missing stat_kind",
                self.subject_id
            )));
        }
        let abs = self.odds_american.abs();
        if !(MIN_AMERICAN_ODDS..=MAX_AMERICAN_ODDS).contains(&abs) {
            return Err(EvalError::InvalidLeg(format!(
                "odds {} outside American domain",
                self.odds_american
            )));
        }
        Ok(())
    }

    pub fn stat(&self) -> &str {
        self.stat_kind.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistFamily {
    Normal,
    Gamma,
    Beta,
    Weibull,
}

/// Precomputed per-player distribution snapshot. Read-only for a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Marginal {
    pub subject_id: String,
    pub stat_kind: String,
    #[serde(default = "default_dist_family")]
    pub dist_family: DistFamily,
    #[serde(default)]
    pub params: Vec<f64>,
    pub mean: f64,
    pub stddev: f64,
    #[serde(default)]
    pub sample_size: u32,
}

fn default_dist_family() -> DistFamily {
    DistFamily::Normal
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjuryStatus {
    Out,
    Doubtful,
    Questionable,
    Probable,
}

impl InjuryStatus {
    pub fn severity(self) -> f64 {
        match self {
            InjuryStatus::Out => 1.0,
            InjuryStatus::Doubtful => 0.75,
            InjuryStatus::Questionable => 0.4,
            InjuryStatus::Probable => 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjuryReport {
    pub player_id: String,
    pub status: InjuryStatus,
    /// Caller-estimated performance impact in [0,1].
    pub impact: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SteamDirection {
    Over,
    Under,
}

/// Synchronized odds movement across books (sharp money signal).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SteamSignal {
    pub direction: SteamDirection,
    pub magnitude_cents: f64,
    pub book_count: u32,
    pub confidence: f64,
}

/// Game-level context consumed by the quantizer and the regime classifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameContext {
    /// Projected home margin in points (positive = home favored).
    #[serde(default)]
    pub spread: Option<f64>,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub home_off_eff: Option<f64>,
    #[serde(default)]
    pub away_off_eff: Option<f64>,
    #[serde(default)]
    pub home_def_eff: Option<f64>,
    #[serde(default)]
    pub away_def_eff: Option<f64>,
    #[serde(default)]
    pub wind_mph: Option<f64>,
    #[serde(default)]
    pub temp_f: Option<f64>,
    #[serde(default)]
    pub precip_prob: Option<f64>,
    #[serde(default)]
    pub injuries: Vec<InjuryReport>,
    #[serde(default)]
    pub sentiment: Option<f64>,
    #[serde(default)]
    pub steam: Option<SteamSignal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegimeKind {
    Blowout,
    Shootout,
    Defensive,
    OvertimeRisk,
    Normal,
}

impl RegimeKind {
    pub fn label(self) -> &'static str {
        match self {
            RegimeKind::Blowout => "BLOWOUT",
            RegimeKind::Shootout => "SHOOTOUT",
            RegimeKind::Defensive => "DEFENSIVE",
            RegimeKind::OvertimeRisk => "OVERTIME_RISK",
            RegimeKind::Normal => "NORMAL",
        }
    }
}

/// Classifier output: game-script label plus the copula parameters it implies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Regime {
    pub kind: RegimeKind,
    pub nu: f64,
    pub corr_boost: f64,
    pub reasoning: String,
    pub confidence: f64,
}

/// Raw Monte Carlo output before pricing.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub true_prob: f64,
    pub ci_low: f64,
    pub ci_high: f64,
    pub corr_multiplier: f64,
    pub tail_risk: f64,
    pub per_leg_hit_rate: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorDirection {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Factor {
    pub name: String,
    pub impact: f64,
    pub direction: FactorDirection,
    pub detail: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    pub regime: RegimeKind,
    pub regime_reasoning: String,
    pub factors: Vec<Factor>,
    pub imputed_pairs: Vec<[String; 4]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationMeta {
    pub ms: f64,
    pub n_samples: u64,
    pub nu: f64,
    pub warmed_up: bool,
    pub seed: u64,
}

/// Wire-stable evaluation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParlayEvaluation {
    pub recommended: bool,
    pub true_probability: f64,
    pub implied_probability: f64,
    pub confidence_interval: [f64; 2],
    pub fair_odds_american: i64,
    pub sportsbook_odds_american: i64,
    pub ev_pct: f64,
    pub correlation_multiplier: f64,
    pub tail_risk_factor: f64,
    pub kelly_fraction: f64,
    pub explanation: Explanation,
    pub simulation_meta: SimulationMeta,
    /// Present only on degraded responses (deadline).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

/// Synchronous evaluation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateRequest {
    #[serde(default)]
    pub game_context: GameContext,
    pub legs: Vec<Leg>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub sample_count: Option<u64>,
}

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("invalid leg: {0}")]
    InvalidLeg(String),
    #[error("too many legs: {count} (max {max})")]
    TooManyLegs { count: usize, max: usize },
    #[error("marginal missing for {subject_id} {stat_kind}")]
    MarginalMissing {
        subject_id: String,
        stat_kind: String,
    },
    #[error("correlation matrix not repairable")]
    NonRepairableCorrelation,
    #[error("degrees of freedom too low: nu={nu}")]
    DegreesOfFreedomTooLow { nu: f64 },
    #[error("evaluation deadline exceeded")]
    DeadlineExceeded,
}

impl EvalError {
    /// Stable wire code for the external surface.
    pub fn wire_code(&self) -> &'static str {
        match self {
            EvalError::InvalidLeg(_) => "INVALID_LEG",
            EvalError::TooManyLegs { .. } => "TOO_MANY_LEGS",
            EvalError::MarginalMissing { .. } => "MARGINAL_MISSING",
            EvalError::NonRepairableCorrelation => "NON_REPAIRABLE_CORRELATION",
            EvalError::DegreesOfFreedomTooLow { .. } => "DEGREES_OF_FREEDOM_TOO_LOW",
            EvalError::DeadlineExceeded => "DEADLINE_EXCEEDED",
        }
    }
}
