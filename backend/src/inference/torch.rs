//! TorchScript backend. Models are exported with `torch.jit.save` and take a float
//! batch in NHWC layout unless `channels_first` is set, returning one sigmoid
//! probability per item.

use ndarray::ArrayView4;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tch::{CModule, Device, Kind, Tensor};

use super::model::{InputSize, ModelError, ModelLoader, ScoringModel};
use crate::config::DevicePreference;

fn resolve_device(preference: DevicePreference) -> Device {
    match preference {
        DevicePreference::Auto => Device::cuda_if_available(),
        DevicePreference::Cpu => Device::Cpu,
        DevicePreference::Cuda => Device::Cuda(0),
    }
}

#[derive(Debug, Clone)]
pub struct TorchScriptLoader {
    device: Device,
    input_size: InputSize,
    channels_first: bool,
}

impl TorchScriptLoader {
    pub fn new(device: DevicePreference, input_size: InputSize, channels_first: bool) -> Self {
        let device = resolve_device(device);
        log::info!("TorchScript models will run on {:?}", device);
        Self {
            device,
            input_size,
            channels_first,
        }
    }
}

impl ModelLoader for TorchScriptLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn ScoringModel>, ModelError> {
        let module = CModule::load_on_device(path, self.device).map_err(|e| ModelError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Arc::new(TorchScriptModel {
            module: Mutex::new(module),
            device: self.device,
            input_size: self.input_size,
            channels_first: self.channels_first,
        }))
    }
}

pub struct TorchScriptModel {
    // CModule is not Sync; calls into it are serialized
    module: Mutex<CModule>,
    device: Device,
    input_size: InputSize,
    channels_first: bool,
}

impl ScoringModel for TorchScriptModel {
    fn input_size(&self) -> InputSize {
        self.input_size
    }

    fn score_batch(&self, batch: ArrayView4<'_, f32>) -> Result<Vec<f32>, ModelError> {
        let (items, height, width, channels) = batch.dim();
        let contiguous = batch.as_standard_layout();
        let data = contiguous
            .as_slice()
            .ok_or_else(|| ModelError::Inference("input batch is not contiguous".to_string()))?;

        let mut input = Tensor::from_slice(data).view([
            items as i64,
            height as i64,
            width as i64,
            channels as i64,
        ]);
        if self.channels_first {
            input = input.permute([0, 3, 1, 2]);
        }
        let input = input.to_device(self.device);

        let output = {
            let module = self
                .module
                .lock()
                .map_err(|_| ModelError::Inference("model lock poisoned".to_string()))?;
            tch::no_grad(|| module.forward_ts(&[input]))
        }
        .map_err(|e| ModelError::Inference(e.to_string()))?;

        let flat = output
            .to_kind(Kind::Float)
            .to_device(Device::Cpu)
            .view([-1]);
        Vec::<f32>::try_from(flat).map_err(|e| ModelError::Inference(e.to_string()))
    }
}
