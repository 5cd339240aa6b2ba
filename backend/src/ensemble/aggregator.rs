use ndarray::{ArrayView4, Axis};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use super::dataset::{DatasetError, ImageFolder, LabeledBatch};
use super::metrics::{EvaluationReport, Series, SeriesMetrics};
use super::{EnsembleError, EnsembleWeights, ModelId};
use crate::config::EnsembleConfig;
use crate::inference::model::{score_checked, ModelLoader, ScoringModel};

/// Scores for one batch: the combined series plus each member's own output.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsemblePrediction {
    pub ensemble: Vec<f64>,
    pub per_model: BTreeMap<ModelId, Vec<f64>>,
}

/// Combines the outputs of several binary classifiers into one probability per input.
pub struct EnsembleAggregator {
    members: BTreeMap<ModelId, Arc<dyn ScoringModel>>,
    weights: EnsembleWeights,
}

impl fmt::Debug for EnsembleAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnsembleAggregator")
            .field("members", &self.model_ids())
            .field("weights", &self.weights)
            .finish()
    }
}

impl EnsembleAggregator {
    /// Loads every configured model. All paths are checked before anything is loaded,
    /// so a missing-files error names every absent model at once.
    pub fn load(
        paths: &BTreeMap<ModelId, PathBuf>,
        weights: Option<&BTreeMap<ModelId, f64>>,
        loader: &dyn ModelLoader,
    ) -> Result<Self, EnsembleError> {
        if paths.is_empty() {
            return Err(EnsembleError::NoModels);
        }

        let missing: Vec<(ModelId, PathBuf)> = paths
            .iter()
            .filter(|(_, path)| !path.is_file())
            .map(|(id, path)| (*id, path.clone()))
            .collect();
        if !missing.is_empty() {
            return Err(EnsembleError::MissingModels { missing });
        }

        log::info!("Loading models for ensemble...");
        let mut members = BTreeMap::new();
        for (id, path) in paths {
            let model = loader
                .load(path)
                .map_err(|source| EnsembleError::Load { id: *id, source })?;
            log::info!("Loaded {} model from {}", id, path.display());
            members.insert(*id, model);
        }

        let aggregator = Self::from_models(members, weights)?;
        log::info!("Ensemble weights: {:?}", aggregator.weights.as_map());
        Ok(aggregator)
    }

    /// Loads the configured members, then opens the evaluation split. Model files are
    /// checked first so missing checkpoints are reported without touching the dataset.
    pub fn prepare(
        config: &EnsembleConfig,
        loader: &dyn ModelLoader,
    ) -> Result<(Self, ImageFolder), EnsembleError> {
        let aggregator = Self::load(&config.models, config.weights.as_ref(), loader)?;
        let dataset = ImageFolder::open(&config.dataset_dir, &config.split)?;
        Ok((aggregator, dataset))
    }

    pub fn from_models(
        members: BTreeMap<ModelId, Arc<dyn ScoringModel>>,
        weights: Option<&BTreeMap<ModelId, f64>>,
    ) -> Result<Self, EnsembleError> {
        let ids = members.keys().copied();
        let weights = match weights {
            Some(raw) => EnsembleWeights::normalized(ids, raw)?,
            None => EnsembleWeights::equal(ids)?,
        };
        Ok(Self { members, weights })
    }

    pub fn model_ids(&self) -> Vec<ModelId> {
        self.members.keys().copied().collect()
    }

    pub fn weights(&self) -> &EnsembleWeights {
        &self.weights
    }

    /// Replaces the weights. On error the previous weights stay in place.
    pub fn set_weights(&mut self, raw: &BTreeMap<ModelId, f64>) -> Result<(), EnsembleError> {
        self.weights = EnsembleWeights::normalized(self.members.keys().copied(), raw)?;
        Ok(())
    }

    /// Runs every member on `batch`. With `use_weights` the combined score is the
    /// weighted sum, otherwise the plain mean of the members.
    pub fn predict(
        &self,
        batch: ArrayView4<'_, f32>,
        use_weights: bool,
    ) -> Result<EnsemblePrediction, EnsembleError> {
        let items = batch.len_of(Axis(0));
        let equal_share = 1.0 / self.members.len() as f64;
        let mut ensemble = vec![0.0; items];
        let mut per_model = BTreeMap::new();

        for (id, model) in &self.members {
            let scores: Vec<f64> = score_checked(model.as_ref(), batch.view())
                .map_err(|source| EnsembleError::Scoring { id: *id, source })?
                .into_iter()
                .map(f64::from)
                .collect();

            let weight = if use_weights {
                self.weights.get(*id)
            } else {
                equal_share
            };
            for (combined, score) in ensemble.iter_mut().zip(&scores) {
                *combined += weight * score;
            }
            per_model.insert(*id, scores);
        }

        Ok(EnsemblePrediction {
            ensemble,
            per_model,
        })
    }

    /// Scores every batch and reports accuracy and loss per model and for the ensemble.
    pub fn evaluate<I>(&self, batches: I, use_weights: bool) -> Result<EvaluationReport, EnsembleError>
    where
        I: IntoIterator<Item = Result<LabeledBatch, DatasetError>>,
    {
        let mut labels: Vec<u8> = Vec::new();
        let mut series: BTreeMap<Series, Vec<f64>> = BTreeMap::new();

        for batch in batches {
            let batch = batch?;
            if batch.labels.len() != batch.len() {
                return Err(EnsembleError::LabelCount {
                    inputs: batch.len(),
                    labels: batch.labels.len(),
                });
            }
            if let Some(bad) = batch.labels.iter().copied().find(|label| *label > 1) {
                return Err(EnsembleError::InvalidLabel(bad));
            }

            let prediction = self.predict(batch.inputs.view(), use_weights)?;
            for (id, scores) in prediction.per_model {
                series.entry(Series::Model(id)).or_default().extend(scores);
            }
            series
                .entry(Series::Ensemble)
                .or_default()
                .extend(prediction.ensemble);
            labels.extend(batch.labels);
        }

        if labels.is_empty() {
            return Err(EnsembleError::EmptyDataset);
        }

        let metrics = series
            .iter()
            .map(|(name, predictions)| (*name, SeriesMetrics::compute(predictions, &labels)))
            .collect();
        Ok(EvaluationReport::new(labels.len(), use_weights, metrics))
    }
}
