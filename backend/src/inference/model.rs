use ndarray::{ArrayView4, Axis};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Failed to load model from {path}: {reason}")]
    Load { path: PathBuf, reason: String },
    #[error("Model inference error: {0}")]
    Inference(String),
    #[error("Input batch is {actual_height}x{actual_width}x{actual_channels}, model expects {expected_height}x{expected_width}x3")]
    InputShape {
        expected_height: usize,
        expected_width: usize,
        actual_height: usize,
        actual_width: usize,
        actual_channels: usize,
    },
    #[error("Model returned {actual} scores for a batch of {expected}")]
    OutputLength { expected: usize, actual: usize },
    #[error("Model returned {0}, expected a probability in [0, 1]")]
    InvalidScore(f32),
    #[error("No model backend is compiled in (rebuild with the `torch` feature)")]
    NoBackend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSize {
    pub width: u32,
    pub height: u32,
}

impl InputSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A trained binary classifier. Takes a `(batch, height, width, 3)` tensor of RGB
/// values in [0, 1] and returns one probability per item, where 1 means Real.
///
/// Implementations are loaded once and then shared read-only between requests.
pub trait ScoringModel: Send + Sync {
    fn input_size(&self) -> InputSize;

    fn score_batch(&self, batch: ArrayView4<'_, f32>) -> Result<Vec<f32>, ModelError>;
}

/// Deserializes a [`ScoringModel`] from storage.
pub trait ModelLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Arc<dyn ScoringModel>, ModelError>;
}

/// Stand-in loader for builds without an inference backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBackendLoader;

impl ModelLoader for NoBackendLoader {
    fn load(&self, _path: &Path) -> Result<Arc<dyn ScoringModel>, ModelError> {
        Err(ModelError::NoBackend)
    }
}

/// Runs `model` on `batch`, checking the input shape against the model's declared
/// size and the output against the probability contract.
pub fn score_checked(
    model: &dyn ScoringModel,
    batch: ArrayView4<'_, f32>,
) -> Result<Vec<f32>, ModelError> {
    let expected = model.input_size();
    let (items, height, width, channels) = batch.dim();
    if height != expected.height as usize || width != expected.width as usize || channels != 3 {
        return Err(ModelError::InputShape {
            expected_height: expected.height as usize,
            expected_width: expected.width as usize,
            actual_height: height,
            actual_width: width,
            actual_channels: channels,
        });
    }

    let scores = model.score_batch(batch)?;
    if scores.len() != batch.len_of(Axis(0)) {
        return Err(ModelError::OutputLength {
            expected: items,
            actual: scores.len(),
        });
    }
    if let Some(bad) = scores
        .iter()
        .copied()
        .find(|s| !s.is_finite() || !(0.0..=1.0).contains(s))
    {
        return Err(ModelError::InvalidScore(bad));
    }
    Ok(scores)
}
