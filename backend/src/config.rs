use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::ensemble::ModelId;
use crate::inference::model::InputSize;

pub const CONFIG_PATH_ENV: &str = "DFDETECT_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/service.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Invalid value for {key}: {value:?}")]
    InvalidOverride { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMethod {
    Nearest,
    Bilinear,
    Bicubic,
    Lanczos,
}

impl ResizeMethod {
    pub fn filter(self) -> FilterType {
        match self {
            ResizeMethod::Nearest => FilterType::Nearest,
            ResizeMethod::Bilinear => FilterType::Triangle,
            ResizeMethod::Bicubic => FilterType::CatmullRom,
            ResizeMethod::Lanczos => FilterType::Lanczos3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    Auto,
    Cpu,
    Cuda,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub frontend_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            frontend_dir: None,
            max_upload_bytes: shared::MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Single-model serving. `candidates` are tried in order at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub candidates: Vec<PathBuf>,
    /// `[width, height]` the model expects.
    pub input_size: [u32; 2],
    pub resize_method: ResizeMethod,
    pub device: DevicePreference,
    pub channels_first: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            candidates: vec![
                PathBuf::from("deepfake_cnn_gpu.pt"),
                PathBuf::from("models/basic_cnn_best.pt"),
                PathBuf::from("models/basic_cnn_final.pt"),
            ],
            input_size: [224, 224],
            resize_method: ResizeMethod::Bicubic,
            device: DevicePreference::Auto,
            channels_first: false,
        }
    }
}

impl ModelConfig {
    pub fn input_size(&self) -> InputSize {
        InputSize::new(self.input_size[0], self.input_size[1])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    pub models: BTreeMap<ModelId, PathBuf>,
    pub weights: Option<BTreeMap<ModelId, f64>>,
    pub use_weights: bool,
    pub dataset_dir: PathBuf,
    pub split: String,
    pub batch_size: usize,
    pub input_size: [u32; 2],
    pub resize_method: ResizeMethod,
    pub report_path: Option<PathBuf>,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        let models = BTreeMap::from([
            (ModelId::Cnn, PathBuf::from("models/basic_cnn_best.pt")),
            (ModelId::Resnext, PathBuf::from("models/resnext_best.pt")),
            (ModelId::Lstm, PathBuf::from("models/lstm_best.pt")),
        ]);
        Self {
            models,
            weights: None,
            use_weights: true,
            dataset_dir: PathBuf::from("data/Dataset"),
            split: "Test".to_string(),
            batch_size: 8,
            input_size: [160, 160],
            resize_method: ResizeMethod::Bilinear,
            report_path: None,
        }
    }
}

impl EnsembleConfig {
    pub fn input_size(&self) -> InputSize {
        InputSize::new(self.input_size[0], self.input_size[1])
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub ensemble: EnsembleConfig,
}

impl AppConfig {
    /// Reads the YAML file named by `DFDETECT_CONFIG` (or the default path), falling
    /// back to built-in defaults when it does not exist, then applies env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut config = if path.exists() {
            log::info!("Loading configuration from {}", path.display());
            Self::from_file(&path)?
        } else {
            log::warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = match port.trim().parse::<u16>() {
                Ok(port) => port,
                Err(_) => return Err(ConfigError::InvalidOverride { key: "PORT", value: port }),
            };
        }
        if let Some(dir) = lookup("FRONTEND_DIR") {
            self.server.frontend_dir = Some(PathBuf::from(dir));
        }
        if let Some(paths) = lookup("MODEL_PATHS") {
            let candidates: Vec<PathBuf> = paths
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .collect();
            if candidates.is_empty() {
                return Err(ConfigError::InvalidOverride {
                    key: "MODEL_PATHS",
                    value: paths,
                });
            }
            self.model.candidates = candidates;
        }
        if let Some(dir) = lookup("DATASET_DIR") {
            self.ensemble.dataset_dir = PathBuf::from(dir);
        }
        Ok(())
    }
}
