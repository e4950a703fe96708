//! Correlated Monte Carlo parlay evaluator.
//!
//! Estimates the joint win probability of a multi-leg wager with a Student-t
//! copula simulation, prices it against the book's implied probability, and
//! attributes the result to named factors.

pub mod cholesky;
pub mod config;
pub mod correlation;
pub mod engine;
pub mod estimator;
pub mod explain;
pub mod features;
pub mod marginals;
pub mod odds;
pub mod regime;
pub mod sampler;
pub mod snapshot;
pub mod types;

pub use config::EngineConfig;
pub use engine::Evaluator;
pub use snapshot::{CorrelationTable, MarginalTable, SnapshotProvider};
pub use types::{EvalError, EvaluateRequest, GameContext, Leg, ParlayEvaluation};
