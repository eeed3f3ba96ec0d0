//! Convenience re-exports for the common workflow.
//!
//! ```
//! use adversario::prelude::*;
//!
//! let loader = CifarLoader::synthetic(8, 0).with_batch_size(4);
//! let model = make_classifier(0);
//! let acc = evaluate(&model, &loader);
//! assert!((0.0..=1.0).contains(&acc));
//! ```

pub use crate::attack::{generate_adversarial_dataset, perturbation_search, PgdConfig, TargetPolicy};
pub use crate::autograd::{clear_graph, get_grad, no_grad, Tensor};
pub use crate::data::{CifarLoader, NUM_CLASSES, PIXEL_TO_NORM_SCALE};
pub use crate::error::{AdversarioError, Result};
pub use crate::metrics::{accuracy, argmax_rows};
pub use crate::nn::{CrossEntropyLoss, Linear, Module, ReLU, Reduction, Sequential, SGD};
pub use crate::train::{evaluate, fit, make_classifier, TrainConfig};
