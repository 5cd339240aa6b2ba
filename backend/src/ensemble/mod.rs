pub mod aggregator;
pub mod dataset;
pub mod metrics;
pub mod weights;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::inference::model::ModelError;
use dataset::DatasetError;

pub use aggregator::{EnsembleAggregator, EnsemblePrediction};
pub use metrics::{EvaluationReport, Series, SeriesMetrics};
pub use weights::EnsembleWeights;

/// The architectures that can take part in an ensemble.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ModelId {
    Cnn,
    Resnext,
    Lstm,
}

#[derive(Debug, thiserror::Error)]
pub enum EnsembleError {
    #[error("The following model files are missing: {}", describe_missing(.missing))]
    MissingModels { missing: Vec<(ModelId, PathBuf)> },
    #[error("Failed to load {id} model: {source}")]
    Load {
        id: ModelId,
        #[source]
        source: ModelError,
    },
    #[error("An ensemble needs at least one model")]
    NoModels,
    #[error("Weight given for {0}, which is not part of the ensemble")]
    UnknownModel(ModelId),
    #[error("Invalid weight {value} for {id}: weights must be finite and non-negative")]
    InvalidWeight { id: ModelId, value: f64 },
    #[error("Ensemble weights sum to zero")]
    ZeroWeights,
    #[error("{id} model failed: {source}")]
    Scoring {
        id: ModelId,
        #[source]
        source: ModelError,
    },
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),
    #[error("Batch has {inputs} inputs but {labels} labels")]
    LabelCount { inputs: usize, labels: usize },
    #[error("Invalid label {0}: expected 0 or 1")]
    InvalidLabel(u8),
    #[error("Dataset contained no samples")]
    EmptyDataset,
}

fn describe_missing(missing: &[(ModelId, PathBuf)]) -> String {
    missing
        .iter()
        .map(|(id, path)| format!("{}: {}", id, path.display()))
        .collect::<Vec<_>>()
        .join(", ")
}
