pub mod model;
pub mod normalizer;
pub mod registry;
pub mod service;
#[cfg(feature = "torch")]
pub mod torch;
pub mod verdict;

use std::sync::Arc;

use crate::config::DevicePreference;
use model::{InputSize, ModelLoader};

/// Loader for the backend compiled into this build.
pub fn backend_loader(
    device: DevicePreference,
    input_size: InputSize,
    channels_first: bool,
) -> Arc<dyn ModelLoader> {
    #[cfg(feature = "torch")]
    {
        Arc::new(torch::TorchScriptLoader::new(
            device,
            input_size,
            channels_first,
        ))
    }
    #[cfg(not(feature = "torch"))]
    {
        log::warn!(
            "Built without the `torch` feature; no {}x{} model can be loaded on {:?} (channels_first={})",
            input_size.width,
            input_size.height,
            device,
            channels_first
        );
        Arc::new(model::NoBackendLoader)
    }
}
