//! Adversarial perturbation search and dataset generation.
//!
//! The attack is targeted: labels are remapped by a [`TargetPolicy`] and
//! the projected-gradient search in [`pgd`] pushes each image toward its
//! target. [`generate_adversarial_dataset`] ties the pieces together and
//! reports how often the fixed model is fooled.

pub mod dataset;
pub mod pgd;
pub mod relabel;

pub use dataset::generate_adversarial_dataset;
pub use pgd::{perturbation_search, PgdConfig};
pub use relabel::TargetPolicy;
