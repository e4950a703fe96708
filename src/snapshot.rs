use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::Marginal;

/// External snapshot source. The engine itself only ever sees the immutable
/// tables below; this trait is the seam for whatever store backs them.
pub trait SnapshotProvider {
    fn get_marginals(&self, game_id: &str) -> Vec<Marginal>;
    fn get_pair_correlation(
        &self,
        subject_a: &str,
        stat_a: &str,
        subject_b: &str,
        stat_b: &str,
    ) -> Option<f64>;
}

/// Stored pairwise correlation entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairCorrelation {
    pub subject_a: String,
    pub stat_a: String,
    pub subject_b: String,
    pub stat_b: String,
    pub rho: f64,
}

/// Read-only marginal lookup keyed by (subject, stat).
#[derive(Debug, Clone, Default)]
pub struct MarginalTable {
    by_key: HashMap<(String, String), Marginal>,
}

impl MarginalTable {
    /// Pull one game's marginals out of a provider into a request-scoped
    /// snapshot.
    pub fn from_provider(provider: &dyn SnapshotProvider, game_id: &str) -> Self {
        Self::from_marginals(provider.get_marginals(game_id))
    }

    pub fn from_marginals(marginals: Vec<Marginal>) -> Self {
        let mut by_key = HashMap::with_capacity(marginals.len());
        for m in marginals {
            by_key.insert((m.subject_id.clone(), m.stat_kind.clone()), m);
        }
        Self { by_key }
    }

    pub fn get(&self, subject_id: &str, stat_kind: &str) -> Option<&Marginal> {
        self.by_key
            .get(&(subject_id.to_string(), stat_kind.to_string()))
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// Read-only pair-correlation lookup, insensitive to argument order.
#[derive(Debug, Clone, Default)]
pub struct CorrelationTable {
    pairs: HashMap<(String, String, String, String), f64>,
}

impl CorrelationTable {
    pub fn from_entries(entries: Vec<PairCorrelation>) -> Self {
        let mut table = Self::default();
        for e in entries {
            table.insert(&e.subject_a, &e.stat_a, &e.subject_b, &e.stat_b, e.rho);
        }
        table
    }

    pub fn insert(&mut self, subject_a: &str, stat_a: &str, subject_b: &str, stat_b: &str, rho: f64) {
        // Stored correlations live strictly inside (-0.999, 0.999).
        let rho = rho.clamp(-0.999 + f64::EPSILON, 0.999 - f64::EPSILON);
        self.pairs.insert(canonical_key(subject_a, stat_a, subject_b, stat_b), rho);
    }

    pub fn get(
        &self,
        subject_a: &str,
        stat_a: &str,
        subject_b: &str,
        stat_b: &str,
    ) -> Option<f64> {
        self.pairs
            .get(&canonical_key(subject_a, stat_a, subject_b, stat_b))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

fn canonical_key(
    subject_a: &str,
    stat_a: &str,
    subject_b: &str,
    stat_b: &str,
) -> (String, String, String, String) {
    let a = (subject_a.to_string(), stat_a.to_string());
    let b = (subject_b.to_string(), stat_b.to_string());
    if a <= b {
        (a.0, a.1, b.0, b.1)
    } else {
        (b.0, b.1, a.0, a.1)
    }
}

pub fn load_marginals(path: &Path) -> Result<MarginalTable> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading marginals snapshot {}", path.display()))?;
    let marginals: Vec<Marginal> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing marginals snapshot {}", path.display()))?;
    Ok(MarginalTable::from_marginals(marginals))
}

pub fn load_correlations(path: &Path) -> Result<CorrelationTable> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading correlation snapshot {}", path.display()))?;
    let entries: Vec<PairCorrelation> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing correlation snapshot {}", path.display()))?;
    Ok(CorrelationTable::from_entries(entries))
}
