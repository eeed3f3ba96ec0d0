//! Neural network building blocks.
//!
//! Layers implement the [`Module`] trait and compose through
//! [`Sequential`]. The classifier used throughout this crate is a small
//! fully connected network built from [`Linear`] and [`ReLU`], trained
//! with [`CrossEntropyLoss`] and [`SGD`].

pub mod activation;
pub mod container;
pub mod init;
pub mod linear;
pub mod loss;
pub mod module;
pub mod optim;

pub use activation::ReLU;
pub use container::Sequential;
pub use init::kaiming_uniform;
pub use linear::Linear;
pub use loss::{CrossEntropyLoss, Reduction};
pub use module::Module;
pub use optim::SGD;
