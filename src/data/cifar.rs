//! CIFAR-style in-memory dataset loader with single-file persistence.
//!
//! The loader holds raw `[0, 1]` pixels flattened row-major as
//! `[N, 3, 32, 32]` and integer labels. Batches come out normalized and
//! flattened to `[batch, 3072]`, ready for a fully connected classifier.
//!
//! Persistence uses the `SafeTensors` layout:
//! ```text
//! [8-byte header: u64 metadata length (little-endian)]
//! [JSON metadata: tensor names, dtypes, shapes, data_offsets]
//! [Raw tensor data: F32 values in little-endian]
//! ```
//! with two tensors, `images` of shape `[N, 3, 32, 32]` and `labels` of
//! shape `[N]` (class indices stored as F32).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{CHANNEL_NUMEL, CIFAR_MEAN, CIFAR_STD, IMAGE_NUMEL, NUM_CLASSES};
use crate::autograd::Tensor;
use crate::error::{AdversarioError, Result};

/// Normalize raw `[0, 1]` pixels with the fixed per-channel statistics.
///
/// Operates on any whole number of flattened images.
#[must_use]
pub fn normalize(pixels: &[f32]) -> Vec<f32> {
    pixels
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let channel = (i % IMAGE_NUMEL) / CHANNEL_NUMEL;
            (p - CIFAR_MEAN[channel]) / CIFAR_STD[channel]
        })
        .collect()
}

/// Invert [`normalize`]: map normalized values back to pixel space.
#[must_use]
pub fn denormalize(values: &[f32]) -> Vec<f32> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let channel = (i % IMAGE_NUMEL) / CHANNEL_NUMEL;
            v * CIFAR_STD[channel] + CIFAR_MEAN[channel]
        })
        .collect()
}

/// In-memory dataset with seeded batch iteration.
///
/// # Example
///
/// ```
/// use adversario::data::CifarLoader;
///
/// let loader = CifarLoader::synthetic(16, 42)
///     .with_batch_size(4)
///     .with_shuffle(false);
///
/// let batches = loader.batches();
/// assert_eq!(batches.len(), 4);
/// assert_eq!(batches[0].0.shape(), &[4, 3072]);
/// assert_eq!(batches[0].1.shape(), &[4]);
/// ```
#[derive(Debug, Clone)]
pub struct CifarLoader {
    /// Raw pixels in [0, 1], flattened [N * 3072]
    images: Vec<f32>,
    /// Class indices, one per image
    labels: Vec<usize>,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    seed: Option<u64>,
}

impl CifarLoader {
    /// Create a loader from raw pixels and labels.
    ///
    /// # Errors
    ///
    /// Returns an error if the pixel buffer is not a whole number of
    /// images, if the label count disagrees with the image count, or if
    /// any pixel falls outside `[0, 1]` or any label outside the class
    /// range.
    pub fn from_raw(images: Vec<f32>, labels: Vec<usize>) -> Result<Self> {
        if images.len() % IMAGE_NUMEL != 0 {
            return Err(AdversarioError::DimensionMismatch {
                expected: format!("pixel count divisible by {IMAGE_NUMEL}"),
                actual: format!("{} pixels", images.len()),
            });
        }
        let num_images = images.len() / IMAGE_NUMEL;
        if labels.len() != num_images {
            return Err(AdversarioError::DimensionMismatch {
                expected: format!("{num_images} labels"),
                actual: format!("{} labels", labels.len()),
            });
        }
        if let Some(p) = images.iter().find(|&&p| !(0.0..=1.0).contains(&p)) {
            return Err(AdversarioError::FormatError {
                message: format!("pixel value {p} outside [0, 1]"),
            });
        }
        if let Some(l) = labels.iter().find(|&&l| l >= NUM_CLASSES) {
            return Err(AdversarioError::FormatError {
                message: format!("label {l} outside class range 0..{NUM_CLASSES}"),
            });
        }

        Ok(Self {
            images,
            labels,
            batch_size: 128,
            shuffle: true,
            drop_last: false,
            seed: None,
        })
    }

    /// Create a loader of `num_images` random images with random labels.
    ///
    /// Pixels are uniform in [0, 1]; labels uniform over the class range.
    /// Fully determined by `seed`.
    #[must_use]
    pub fn synthetic(num_images: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let images: Vec<f32> = (0..num_images * IMAGE_NUMEL)
            .map(|_| rng.gen_range(0.0..=1.0))
            .collect();
        let labels: Vec<usize> = (0..num_images)
            .map(|_| rng.gen_range(0..NUM_CLASSES))
            .collect();

        Self {
            images,
            labels,
            batch_size: 128,
            shuffle: true,
            drop_last: false,
            seed: Some(seed),
        }
    }

    /// Set the batch size, returning self for chaining.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        assert!(batch_size > 0, "Batch size must be positive");
        self.batch_size = batch_size;
        self
    }

    /// Enable or disable shuffling.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Enable or disable dropping a trailing partial batch.
    #[must_use]
    pub fn with_drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    /// Set the shuffle seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Number of images in the dataset.
    #[must_use]
    pub fn num_images(&self) -> usize {
        self.labels.len()
    }

    /// Raw `[0, 1]` pixels, flattened.
    #[must_use]
    pub fn images(&self) -> &[f32] {
        &self.images
    }

    /// Class labels, one per image.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Replace all labels.
    ///
    /// # Errors
    ///
    /// Returns an error if the count or the class range disagrees with
    /// the stored images.
    pub fn set_labels(&mut self, labels: Vec<usize>) -> Result<()> {
        if labels.len() != self.num_images() {
            return Err(AdversarioError::DimensionMismatch {
                expected: format!("{} labels", self.num_images()),
                actual: format!("{} labels", labels.len()),
            });
        }
        if let Some(l) = labels.iter().find(|&&l| l >= NUM_CLASSES) {
            return Err(AdversarioError::FormatError {
                message: format!("label {l} outside class range 0..{NUM_CLASSES}"),
            });
        }
        self.labels = labels;
        Ok(())
    }

    /// Produce normalized batches.
    ///
    /// Each batch is an image tensor of shape `[batch, 3072]` (normalized)
    /// and a label tensor of shape `[batch]` (class indices as f32). With
    /// `shuffle` disabled, batches follow storage order, so batch `k`
    /// covers images `k * batch_size ..`.
    #[must_use]
    pub fn batches(&self) -> Vec<(Tensor, Tensor)> {
        let mut indices: Vec<usize> = (0..self.num_images()).collect();
        if self.shuffle {
            let mut rng = match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            indices.shuffle(&mut rng);
        }

        let mut batches = Vec::new();
        for chunk in indices.chunks(self.batch_size) {
            if self.drop_last && chunk.len() < self.batch_size {
                break;
            }

            let mut pixels = Vec::with_capacity(chunk.len() * IMAGE_NUMEL);
            let mut labels = Vec::with_capacity(chunk.len());
            for &i in chunk {
                pixels.extend_from_slice(&self.images[i * IMAGE_NUMEL..(i + 1) * IMAGE_NUMEL]);
                labels.push(self.labels[i] as f32);
            }

            let images = Tensor::new(&normalize(&pixels), &[chunk.len(), IMAGE_NUMEL]);
            let targets = Tensor::new(&labels, &[chunk.len()]);
            batches.push((images, targets));
        }
        batches
    }

    /// Save the dataset to a single `SafeTensors` file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let n = self.num_images();
        let labels_f32: Vec<f32> = self.labels.iter().map(|&l| l as f32).collect();

        let mut tensors = BTreeMap::new();
        tensors.insert(
            "images".to_string(),
            (self.images.clone(), vec![n, 3, 32, 32]),
        );
        tensors.insert("labels".to_string(), (labels_f32, vec![n]));

        save_safetensors(path, &tensors)
    }

    /// Load a dataset previously written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or a malformed file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut tensors = load_safetensors(path)?;

        let (images, image_shape) = tensors.remove("images").ok_or_else(|| {
            AdversarioError::FormatError {
                message: "missing 'images' tensor".to_string(),
            }
        })?;
        let (label_values, label_shape) = tensors.remove("labels").ok_or_else(|| {
            AdversarioError::FormatError {
                message: "missing 'labels' tensor".to_string(),
            }
        })?;

        if image_shape.len() != 4 || &image_shape[1..] != [3, 32, 32] {
            return Err(AdversarioError::FormatError {
                message: format!("unexpected image shape {image_shape:?}"),
            });
        }
        if label_shape.len() != 1 || label_shape[0] != image_shape[0] {
            return Err(AdversarioError::FormatError {
                message: format!(
                    "label shape {label_shape:?} disagrees with image count {}",
                    image_shape[0]
                ),
            });
        }

        let labels: Vec<usize> = label_values
            .iter()
            .map(|&v| {
                if v.fract() != 0.0 || v < 0.0 {
                    Err(AdversarioError::FormatError {
                        message: format!("non-integer label value {v}"),
                    })
                } else {
                    Ok(v as usize)
                }
            })
            .collect::<Result<_>>()?;

        Self::from_raw(images, labels)
    }
}

/// Metadata for a single tensor in the `SafeTensors` header.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TensorMetadata {
    dtype: String,
    shape: Vec<usize>,
    data_offsets: [usize; 2],
}

fn save_safetensors<P: AsRef<Path>>(
    path: P,
    tensors: &BTreeMap<String, (Vec<f32>, Vec<usize>)>,
) -> Result<()> {
    let mut metadata = BTreeMap::new();
    let mut raw_data = Vec::new();
    let mut current_offset = 0;

    // BTreeMap iteration is sorted, so offsets are deterministic.
    for (name, (data, shape)) in tensors {
        let start_offset = current_offset;
        let end_offset = current_offset + data.len() * 4;

        metadata.insert(
            name.clone(),
            TensorMetadata {
                dtype: "F32".to_string(),
                shape: shape.clone(),
                data_offsets: [start_offset, end_offset],
            },
        );

        for &value in data {
            raw_data.extend_from_slice(&value.to_le_bytes());
        }
        current_offset = end_offset;
    }

    let metadata_json =
        serde_json::to_string(&metadata).map_err(|e| AdversarioError::FormatError {
            message: format!("JSON serialization failed: {e}"),
        })?;
    let metadata_bytes = metadata_json.as_bytes();

    let mut output = Vec::with_capacity(8 + metadata_bytes.len() + raw_data.len());
    output.extend_from_slice(&(metadata_bytes.len() as u64).to_le_bytes());
    output.extend_from_slice(metadata_bytes);
    output.extend_from_slice(&raw_data);

    fs::write(path, output)?;
    Ok(())
}

fn load_safetensors<P: AsRef<Path>>(
    path: P,
) -> Result<BTreeMap<String, (Vec<f32>, Vec<usize>)>> {
    let bytes = fs::read(path)?;

    if bytes.len() < 8 {
        return Err(AdversarioError::FormatError {
            message: "file too short for header".to_string(),
        });
    }
    let header_len = u64::from_le_bytes(bytes[0..8].try_into().expect("8-byte slice")) as usize;
    if bytes.len() < 8 + header_len {
        return Err(AdversarioError::FormatError {
            message: "metadata truncated".to_string(),
        });
    }

    let metadata: BTreeMap<String, TensorMetadata> =
        serde_json::from_slice(&bytes[8..8 + header_len]).map_err(|e| {
            AdversarioError::FormatError {
                message: format!("invalid JSON metadata: {e}"),
            }
        })?;
    let data_section = &bytes[8 + header_len..];

    let mut tensors = BTreeMap::new();
    for (name, meta) in metadata {
        if meta.dtype != "F32" {
            return Err(AdversarioError::FormatError {
                message: format!("tensor '{name}' has unsupported dtype {}", meta.dtype),
            });
        }

        let [start, end] = meta.data_offsets;
        if start > end || end > data_section.len() || (end - start) % 4 != 0 {
            return Err(AdversarioError::FormatError {
                message: format!("tensor '{name}' has invalid data offsets [{start}, {end}]"),
            });
        }

        let expected: usize = meta.shape.iter().product();
        let values: Vec<f32> = data_section[start..end]
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes(c.try_into().expect("4-byte chunk")))
            .collect();
        if values.len() != expected {
            return Err(AdversarioError::FormatError {
                message: format!(
                    "tensor '{name}' has {} values but shape {:?}",
                    values.len(),
                    meta.shape
                ),
            });
        }

        tensors.insert(name, (values, meta.shape));
    }
    Ok(tensors)
}
