use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;

use parlay_engine::snapshot::{self, CorrelationTable, MarginalTable};
use parlay_engine::{EngineConfig, EvaluateRequest, Evaluator};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let request_path = args
        .next()
        .map(PathBuf::from)
        .context("usage: evaluate <request.json> [marginals.json] [correlations.json]")?;
    let marginals_path = args.next().map(PathBuf::from);
    let correlations_path = args.next().map(PathBuf::from);

    let raw = std::fs::read_to_string(&request_path)
        .with_context(|| format!("reading request {}", request_path.display()))?;
    let request: EvaluateRequest = serde_json::from_str(&raw)
        .with_context(|| format!("parsing request {}", request_path.display()))?;

    let marginals = match &marginals_path {
        Some(p) => snapshot::load_marginals(p)?,
        None => MarginalTable::default(),
    };
    let correlations = match &correlations_path {
        Some(p) => snapshot::load_correlations(p)?,
        None => CorrelationTable::default(),
    };

    // This binary is intentionally simple: one request in, one evaluation out.
    // It stands in for whatever service fronts the engine.
    let evaluator = Evaluator::new(EngineConfig::from_env());
    let evaluation = match evaluator.evaluate(&request, &marginals, &correlations) {
        Ok(evaluation) => evaluation,
        Err(err) => {
            eprintln!("error [{}]: {err}", err.wire_code());
            std::process::exit(1);
        }
    };

    let output = serde_json::json!({
        "evaluated_at": Utc::now().to_rfc3339(),
        "evaluation": evaluation,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
