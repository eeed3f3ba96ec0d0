//! In-memory image dataset handling.
//!
//! Images are stored as raw `[0, 1]` pixel values and normalized with
//! fixed per-channel statistics on the way into the model. Keeping the
//! raw pixels around makes the attack layer's box projection exact: the
//! perturbed images are clipped in pixel space, not in normalized space.

pub mod cifar;

pub use cifar::{denormalize, normalize, CifarLoader};

/// Per-channel mean used for input normalization (CIFAR-10 statistics).
pub const CIFAR_MEAN: [f32; 3] = [0.4914, 0.4822, 0.4465];

/// Per-channel standard deviation used for input normalization.
pub const CIFAR_STD: [f32; 3] = [0.2470, 0.2435, 0.2616];

/// Conversion factor between pixel-space and normalized-space distances.
///
/// Approximates `1 / std` for all channels; perturbation radii and step
/// sizes given in pixel units are multiplied by this before operating on
/// normalized inputs.
pub const PIXEL_TO_NORM_SCALE: f32 = 4.0;

/// Number of classes in the dataset.
pub const NUM_CLASSES: usize = 10;

/// Elements per image: 3 channels of 32x32 pixels.
pub const IMAGE_NUMEL: usize = 3 * 32 * 32;

/// Elements per channel within a flattened image.
pub const CHANNEL_NUMEL: usize = 32 * 32;
