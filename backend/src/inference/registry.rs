use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::model::{ModelLoader, ScoringModel};

/// A model resolved from storage, together with where it came from.
#[derive(Clone)]
pub struct LoadedModel {
    pub path: PathBuf,
    pub model: Arc<dyn ScoringModel>,
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("path", &self.path)
            .field("input_size", &self.model.input_size())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFailure {
    pub path: PathBuf,
    pub reason: String,
}

impl CandidateFailure {
    fn new(path: &Path, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path.display(), self.reason)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("No trained model found. Tried: {}", describe_attempts(.attempts))]
    ModelUnavailable { attempts: Vec<CandidateFailure> },
}

fn describe_attempts(attempts: &[CandidateFailure]) -> String {
    if attempts.is_empty() {
        return "no candidate paths configured".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Returns the first candidate that exists and deserializes. Failures on individual
/// candidates are logged and skipped.
pub fn load_first_available(
    candidates: &[PathBuf],
    loader: &dyn ModelLoader,
) -> Result<LoadedModel, RegistryError> {
    let mut attempts = Vec::with_capacity(candidates.len());

    for path in candidates {
        if !path.is_file() {
            log::debug!("Model candidate {} does not exist", path.display());
            attempts.push(CandidateFailure::new(path, "file not found"));
            continue;
        }

        log::info!("Loading model from: {}", path.display());
        match loader.load(path) {
            Ok(model) => {
                log::info!("Model loaded successfully from {}", path.display());
                return Ok(LoadedModel {
                    path: path.clone(),
                    model,
                });
            }
            Err(e) => {
                log::warn!("Error loading model from {}: {}", path.display(), e);
                attempts.push(CandidateFailure::new(path, e.to_string()));
            }
        }
    }

    Err(RegistryError::ModelUnavailable { attempts })
}
