use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::ModelId;

/// Probabilities are clipped to `[BCE_EPSILON, 1 - BCE_EPSILON]` before taking logs.
pub const BCE_EPSILON: f64 = 1e-7;
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Fraction of predictions that land on the right side of the threshold.
/// `predictions` and `labels` must have the same, non-zero length.
pub fn binary_accuracy(predictions: &[f64], labels: &[u8]) -> f64 {
    debug_assert_eq!(predictions.len(), labels.len());
    let correct = predictions
        .iter()
        .zip(labels)
        .filter(|(p, y)| u8::from(**p > DECISION_THRESHOLD) == **y)
        .count();
    correct as f64 / predictions.len() as f64
}

pub fn binary_cross_entropy(predictions: &[f64], labels: &[u8]) -> f64 {
    debug_assert_eq!(predictions.len(), labels.len());
    let total: f64 = predictions
        .iter()
        .zip(labels)
        .map(|(p, y)| {
            let p = p.clamp(BCE_EPSILON, 1.0 - BCE_EPSILON);
            let y = f64::from(*y);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum();
    total / predictions.len() as f64
}

/// A named prediction series in an evaluation: one per model plus the ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Series {
    Model(ModelId),
    Ensemble,
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Series::Model(id) => write!(f, "{}", id),
            Series::Ensemble => f.write_str("ensemble"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesMetrics {
    pub accuracy: f64,
    pub loss: f64,
}

impl SeriesMetrics {
    pub fn compute(predictions: &[f64], labels: &[u8]) -> Self {
        Self {
            accuracy: binary_accuracy(predictions, labels),
            loss: binary_cross_entropy(predictions, labels),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub samples: usize,
    pub use_weights: bool,
    metrics: BTreeMap<Series, SeriesMetrics>,
}

impl EvaluationReport {
    pub fn new(samples: usize, use_weights: bool, metrics: BTreeMap<Series, SeriesMetrics>) -> Self {
        Self {
            samples,
            use_weights,
            metrics,
        }
    }

    pub fn get(&self, series: Series) -> Option<SeriesMetrics> {
        self.metrics.get(&series).copied()
    }

    pub fn ensemble(&self) -> Option<SeriesMetrics> {
        self.get(Series::Ensemble)
    }

    pub fn models(&self) -> impl Iterator<Item = (ModelId, SeriesMetrics)> + '_ {
        self.metrics.iter().filter_map(|(series, m)| match series {
            Series::Model(id) => Some((*id, *m)),
            Series::Ensemble => None,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (Series, SeriesMetrics)> + '_ {
        self.metrics.iter().map(|(series, m)| (*series, *m))
    }

    /// Most accurate single model; ties go to the first in `ModelId` order.
    pub fn best_individual(&self) -> Option<(ModelId, SeriesMetrics)> {
        self.models().fold(None, |best, candidate| match best {
            Some((_, b)) if b.accuracy >= candidate.1.accuracy => best,
            _ => Some(candidate),
        })
    }

    /// Ensemble accuracy minus the best single model's accuracy.
    pub fn improvement(&self) -> Option<f64> {
        let ensemble = self.ensemble()?;
        let (_, best) = self.best_individual()?;
        Some(ensemble.accuracy - best.accuracy)
    }

    pub fn to_json(&self) -> serde_json::Value {
        let metrics: BTreeMap<String, SeriesMetrics> = self
            .metrics
            .iter()
            .map(|(series, m)| (series.to_string(), *m))
            .collect();
        serde_json::json!({
            "samples": self.samples,
            "use_weights": self.use_weights,
            "metrics": metrics,
            "best_individual": self.best_individual().map(|(id, _)| id),
            "improvement": self.improvement(),
        })
    }
}
