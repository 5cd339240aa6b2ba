use image::imageops::FilterType;
use ndarray::{Array4, Axis};
use std::fs;
use std::path::{Path, PathBuf};

use crate::inference::model::InputSize;
use crate::inference::normalizer::normalize_image;

pub const IMAGE_EXTENSIONS: [&str; 5] = ["bmp", "gif", "jpeg", "jpg", "png"];

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Dataset directory not found: {0}")]
    MissingDirectory(PathBuf),
    #[error("Expected two class directories in {dir}, found {found:?}")]
    ClassCount { dir: PathBuf, found: Vec<String> },
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to load image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Batch size must be at least 1")]
    ZeroBatchSize,
}

/// Inputs of shape `(n, height, width, 3)` and the matching 0/1 labels.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledBatch {
    pub inputs: Array4<f32>,
    pub labels: Vec<u8>,
}

impl LabeledBatch {
    pub fn new(inputs: Array4<f32>, labels: Vec<u8>) -> Self {
        Self { inputs, labels }
    }

    pub fn len(&self) -> usize {
        self.inputs.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Binary classification dataset laid out as `<root>/<split>/<class>/<image>`.
///
/// Class directories are sorted by name and numbered from 0, so `Fake` is 0 and
/// `Real` is 1. Images are visited in path order, without shuffling.
#[derive(Debug, Clone)]
pub struct ImageFolder {
    root: PathBuf,
    class_names: Vec<String>,
    samples: Vec<(PathBuf, u8)>,
}

impl ImageFolder {
    pub fn open(dataset_dir: &Path, split: &str) -> Result<Self, DatasetError> {
        let root = dataset_dir.join(split);
        if !root.is_dir() {
            return Err(DatasetError::MissingDirectory(root));
        }

        let mut classes = Vec::new();
        for entry in read_dir(&root)? {
            if entry.is_dir() {
                if let Some(name) = entry.file_name().and_then(|n| n.to_str()) {
                    classes.push((name.to_string(), entry));
                }
            }
        }
        classes.sort();

        if classes.len() != 2 {
            return Err(DatasetError::ClassCount {
                dir: root,
                found: classes.into_iter().map(|(name, _)| name).collect(),
            });
        }

        let mut samples = Vec::new();
        for (label, (_, dir)) in classes.iter().enumerate() {
            let mut files = Vec::new();
            collect_images(dir, &mut files)?;
            files.sort();
            samples.extend(files.into_iter().map(|path| (path, label as u8)));
        }

        let class_names: Vec<String> = classes.into_iter().map(|(name, _)| name).collect();
        log::info!(
            "Found {} files belonging to {} classes ({}) in {}",
            samples.len(),
            class_names.len(),
            class_names.join(", "),
            root.display()
        );

        Ok(Self {
            root,
            class_names,
            samples,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Lazily decodes and normalizes images `batch_size` at a time.
    pub fn batches(
        &self,
        batch_size: usize,
        size: InputSize,
        filter: FilterType,
    ) -> Result<Batches<'_>, DatasetError> {
        if batch_size == 0 {
            return Err(DatasetError::ZeroBatchSize);
        }
        Ok(Batches {
            chunks: self.samples.chunks(batch_size),
            size,
            filter,
        })
    }
}

pub struct Batches<'a> {
    chunks: std::slice::Chunks<'a, (PathBuf, u8)>,
    size: InputSize,
    filter: FilterType,
}

impl Iterator for Batches<'_> {
    type Item = Result<LabeledBatch, DatasetError>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self.chunks.next()?;
        Some(load_batch(chunk, self.size, self.filter))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

fn load_batch(
    chunk: &[(PathBuf, u8)],
    size: InputSize,
    filter: FilterType,
) -> Result<LabeledBatch, DatasetError> {
    let mut inputs = Array4::zeros((chunk.len(), size.height as usize, size.width as usize, 3));
    let mut labels = Vec::with_capacity(chunk.len());

    for (row, (path, label)) in chunk.iter().enumerate() {
        let image = image::open(path).map_err(|source| DatasetError::Image {
            path: path.clone(),
            source,
        })?;
        inputs
            .index_axis_mut(Axis(0), row)
            .assign(&normalize_image(&image, size, filter));
        labels.push(*label);
    }

    Ok(LabeledBatch::new(inputs, labels))
}

fn read_dir(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    let io_err = |source| DatasetError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        paths.push(entry.map_err(io_err)?.path());
    }
    Ok(paths)
}

fn collect_images(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), DatasetError> {
    for path in read_dir(dir)? {
        if path.is_dir() {
            collect_images(&path, out)?;
        } else if has_image_extension(&path) {
            out.push(path);
        }
    }
    Ok(())
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
