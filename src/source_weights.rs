//! # Source Weights
//!
//! Per-deployment reliability weights for each rating source
//! (e.g. Yahoo 0.5, TradingView 0.3, TipRanks 0.2).
//!
//! - Loads from JSON or TOML (`{ "yahoo": 0.5, "trading view": 0.3 }`).
//! - Keys are matched loosely: case, spaces, dashes and underscores are ignored.
//! - Weights need not sum to 1; the aggregator normalizes over the sources
//!   that actually contributed.
//! - Negative or non-finite weights are rejected by [`SourceWeights::validate`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{fs, path::Path};

use crate::aggregator::ConfigError;
use crate::ratings::SourceId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct SourceWeights {
    weights: BTreeMap<SourceId, f64>,
}

impl SourceWeights {
    pub fn new() -> Self {
        Self {
            weights: BTreeMap::new(),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, source: SourceId, weight: f64) -> Self {
        self.weights.insert(source, weight);
        self
    }

    pub fn weight_for(&self, source: SourceId) -> Option<f64> {
        self.weights.get(&source).copied()
    }

    pub fn sources(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.weights.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Every weight must be finite and non-negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (&source_id, &weight) in &self.weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::InvalidWeight { source_id, weight });
            }
        }
        Ok(())
    }

    /// Load from a JSON or TOML file (chosen by extension, JSON otherwise).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading source weights from {}", path.display()))?;
        let is_toml = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
        let weights: Self = if is_toml {
            toml::from_str(&content).context("parsing source weights toml")?
        } else {
            serde_json::from_str(&content).context("parsing source weights json")?
        };
        Ok(weights)
    }

    /// Like [`load_from_file`](Self::load_from_file) but falls back to
    /// [`default_seed`](Self::default_seed) on any error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load_from_file(path.as_ref()) {
            Ok(w) => w,
            Err(e) => {
                tracing::warn!(error = ?e, path = %path.as_ref().display(), "using default source weights");
                Self::default_seed()
            }
        }
    }

    /// Built-in three-source split.
    pub fn default_seed() -> Self {
        Self::new()
            .with(SourceId::Yahoo, 0.5)
            .with(SourceId::TradingView, 0.3)
            .with(SourceId::TipRanks, 0.2)
    }
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl TryFrom<BTreeMap<String, f64>> for SourceWeights {
    type Error = String;

    fn try_from(raw: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        let mut weights = BTreeMap::new();
        for (name, w) in raw {
            let source: SourceId = name.parse()?;
            if weights.insert(source, w).is_some() {
                return Err(format!("weight for {source} given twice"));
            }
        }
        Ok(Self { weights })
    }
}

impl From<SourceWeights> for BTreeMap<String, f64> {
    fn from(w: SourceWeights) -> Self {
        w.weights
            .into_iter()
            .map(|(s, v)| (s.as_str().to_string(), v))
            .collect()
    }
}
