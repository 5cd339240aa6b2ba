use image::imageops::FilterType;
use std::path::PathBuf;

use super::model::{score_checked, ModelLoader};
use super::normalizer::{normalize, RawImage};
use super::registry::{load_first_available, LoadedModel, RegistryError};
use super::verdict::{self, PredictionResult};
use crate::config::{ModelConfig, ResizeMethod};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Model not loaded")]
    ServiceUnavailable,
    #[error("{0}")]
    InvalidInput(String),
    #[error("Error processing image: {0}")]
    Processing(String),
}

impl ServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::ServiceUnavailable => "service_unavailable",
            ServiceError::InvalidInput(_) => "invalid_input",
            ServiceError::Processing(_) => "processing_error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Health {
    pub ready: bool,
}

#[derive(Debug)]
enum State {
    Unready,
    Ready(LoadedModel),
}

/// Serving context: owns the loaded model and answers prediction requests.
///
/// Built once at startup and shared with every request handler. The only state
/// change is `Unready -> Ready` through [`InferenceService::initialize`], which needs
/// `&mut self` and therefore happens before the service is shared.
#[derive(Debug)]
pub struct InferenceService {
    state: State,
    filter: FilterType,
}

impl InferenceService {
    pub fn new(resize: ResizeMethod) -> Self {
        Self {
            state: State::Unready,
            filter: resize.filter(),
        }
    }

    pub fn with_model(model: LoadedModel, resize: ResizeMethod) -> Self {
        Self {
            state: State::Ready(model),
            filter: resize.filter(),
        }
    }

    /// Builds the service and tries to load a model. A failed load is logged and the
    /// service stays unready for the life of the process.
    pub fn start(config: &ModelConfig, loader: &dyn ModelLoader) -> Self {
        let mut service = Self::new(config.resize_method);
        if let Err(e) = service.initialize(&config.candidates, loader) {
            log::error!("Failed to load model at startup: {}", e);
        }
        service
    }

    pub fn initialize(
        &mut self,
        candidates: &[PathBuf],
        loader: &dyn ModelLoader,
    ) -> Result<(), RegistryError> {
        if let State::Ready(loaded) = &self.state {
            log::warn!(
                "Model already loaded from {}, ignoring reinitialization",
                loaded.path.display()
            );
            return Ok(());
        }

        let loaded = load_first_available(candidates, loader)?;
        self.state = State::Ready(loaded);
        Ok(())
    }

    pub fn health(&self) -> Health {
        Health {
            ready: self.is_ready(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    pub fn loaded_model(&self) -> Option<&LoadedModel> {
        match &self.state {
            State::Ready(loaded) => Some(loaded),
            State::Unready => None,
        }
    }

    pub fn ensure_ready(&self) -> Result<&LoadedModel, ServiceError> {
        self.loaded_model().ok_or(ServiceError::ServiceUnavailable)
    }

    pub fn predict(&self, image: &RawImage) -> Result<PredictionResult, ServiceError> {
        let loaded = self.ensure_ready()?;

        if !image.declares_image() {
            return Err(ServiceError::InvalidInput(
                "Invalid file type. Please upload an image file.".to_string(),
            ));
        }

        let tensor = normalize(image, loaded.model.input_size(), self.filter)
            .map_err(|e| ServiceError::Processing(e.to_string()))?;
        let scores = score_checked(loaded.model.as_ref(), tensor.view())
            .map_err(|e| ServiceError::Processing(e.to_string()))?;
        let raw_score = scores
            .first()
            .copied()
            .ok_or_else(|| ServiceError::Processing("model returned no score".to_string()))?;

        let result = verdict::derive(raw_score);
        log::debug!(
            "Scored {} bytes: raw={} label={}",
            image.bytes.len(),
            raw_score,
            result.label
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::model::{InputSize, ModelError, ScoringModel};
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use ndarray::ArrayView4;
    use shared::Label;
    use std::io::Cursor;
    use std::path::Path;
    use std::sync::Arc;

    struct Fixed(f32);

    impl ScoringModel for Fixed {
        fn input_size(&self) -> InputSize {
            InputSize::new(8, 8)
        }

        fn score_batch(&self, batch: ArrayView4<'_, f32>) -> Result<Vec<f32>, ModelError> {
            Ok(vec![self.0; batch.shape()[0]])
        }
    }

    struct Failing;

    impl ScoringModel for Failing {
        fn input_size(&self) -> InputSize {
            InputSize::new(8, 8)
        }

        fn score_batch(&self, _batch: ArrayView4<'_, f32>) -> Result<Vec<f32>, ModelError> {
            Err(ModelError::Inference("device lost".into()))
        }
    }

    struct FixedLoader(f32);

    impl ModelLoader for FixedLoader {
        fn load(&self, _path: &Path) -> Result<Arc<dyn ScoringModel>, ModelError> {
            Ok(Arc::new(Fixed(self.0)))
        }
    }

    fn ready(model: impl ScoringModel + 'static) -> InferenceService {
        let loaded = LoadedModel {
            path: PathBuf::from("test.pt"),
            model: Arc::new(model),
        };
        InferenceService::with_model(loaded, ResizeMethod::Bilinear)
    }

    fn png_upload() -> RawImage {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 12, Rgb([90, 60, 30])));
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        RawImage::new(bytes.into_inner(), Some("image/png".to_string()))
    }

    #[test]
    fn predict_before_load_is_unavailable_then_succeeds_after_load() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.pt");
        std::fs::write(&model_path, b"weights").unwrap();

        let mut service = InferenceService::new(ResizeMethod::Bilinear);
        assert!(!service.health().ready);
        let upload = png_upload();
        assert!(matches!(
            service.predict(&upload),
            Err(ServiceError::ServiceUnavailable)
        ));

        service.initialize(&[model_path], &FixedLoader(0.95)).unwrap();
        assert!(service.health().ready);
        let result = service.predict(&upload).unwrap();
        assert_eq!(result.label, Label::Real);
        assert!((result.confidence - 95.0).abs() < 1e-9);
    }

    #[test]
    fn failed_start_stays_unready() {
        let config = ModelConfig {
            candidates: vec![PathBuf::from("/nonexistent/model.pt")],
            ..ModelConfig::default()
        };
        let service = InferenceService::start(&config, &FixedLoader(0.5));
        assert!(!service.is_ready());
        assert!(service.loaded_model().is_none());
        assert!(matches!(
            service.predict(&png_upload()),
            Err(ServiceError::ServiceUnavailable)
        ));
    }

    #[test]
    fn second_initialize_keeps_first_model() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.pt");
        std::fs::write(&first, b"weights").unwrap();

        let mut service = InferenceService::new(ResizeMethod::Bilinear);
        service.initialize(&[first.clone()], &FixedLoader(0.2)).unwrap();
        service.initialize(&[], &FixedLoader(0.9)).unwrap();

        assert_eq!(service.loaded_model().unwrap().path, first);
        assert_eq!(service.predict(&png_upload()).unwrap().label, Label::Fake);
    }

    #[test]
    fn non_image_content_type_is_invalid_input() {
        let service = ready(Fixed(0.9));
        let mut upload = png_upload();
        upload.content_type = Some("text/plain".to_string());
        assert!(matches!(
            service.predict(&upload),
            Err(ServiceError::InvalidInput(_))
        ));

        upload.content_type = None;
        assert!(matches!(
            service.predict(&upload),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn undecodable_image_is_processing_error() {
        let service = ready(Fixed(0.9));
        let upload = RawImage::new(b"\x89PNG but not really".to_vec(), Some("image/png".into()));
        let err = service.predict(&upload).unwrap_err();
        assert!(matches!(err, ServiceError::Processing(_)));
        assert!(err.to_string().starts_with("Error processing image"));
    }

    #[test]
    fn model_failure_is_processing_error() {
        let service = ready(Failing);
        let err = service.predict(&png_upload()).unwrap_err();
        assert!(err.to_string().contains("device lost"));
        // the service is still usable afterwards
        assert!(service.is_ready());
    }

    #[test]
    fn out_of_range_score_is_processing_error() {
        let service = ready(Fixed(f32::NAN));
        assert!(matches!(
            service.predict(&png_upload()),
            Err(ServiceError::Processing(_))
        ));
    }

    #[test]
    fn error_kinds() {
        assert_eq!(ServiceError::ServiceUnavailable.kind(), "service_unavailable");
        assert_eq!(ServiceError::InvalidInput(String::new()).kind(), "invalid_input");
        assert_eq!(ServiceError::Processing(String::new()).kind(), "processing_error");
    }
}
