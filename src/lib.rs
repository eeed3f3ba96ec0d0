//! # adversario
//!
//! Reproduction of the adversarial data-generation experiment from
//! *Adversarial Examples Are Not Bugs, They Are Features* (Ilyas et al.,
//! 2019): train a classifier, perturb its training set toward remapped
//! target labels with a projected-gradient search, measure how often the
//! fixed classifier is fooled, and retrain on the relabeled perturbed set.
//!
//! The crate is self-contained: a tape-based autograd engine
//! ([`autograd`]), a small neural-network layer ([`nn`]), an in-memory
//! dataset loader with single-file persistence ([`data`]), the attack
//! itself ([`attack`]), and training/evaluation loops ([`train`]).
//!
//! # Quick start
//!
//! ```
//! use adversario::prelude::*;
//!
//! // Train a classifier on (synthetic) data.
//! let loader = CifarLoader::synthetic(16, 0).with_batch_size(8);
//! let mut model = make_classifier(0);
//! fit(&mut model, &loader, &TrainConfig { epochs: 2, ..TrainConfig::default() });
//!
//! // Generate the perturbed, relabeled variant.
//! let config = PgdConfig { steps: 2, ..PgdConfig::default() };
//! let (adversarial, fooling_rate) =
//!     generate_adversarial_dataset(&model, &loader, TargetPolicy::NextClass, &config, 0)
//!         .expect("generation");
//!
//! assert_eq!(adversarial.num_images(), loader.num_images());
//! assert!((0.0..=1.0).contains(&fooling_rate));
//! ```

#![warn(missing_docs)]

pub mod attack;
pub mod autograd;
pub mod data;
pub mod error;
pub mod metrics;
pub mod nn;
pub mod prelude;
pub mod train;

pub use error::{AdversarioError, Result};
