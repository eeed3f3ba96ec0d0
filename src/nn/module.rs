//! The `Module` trait: interface for all neural network layers.

use crate::autograd::Tensor;

/// Common interface for neural network layers and containers.
///
/// A module maps an input tensor to an output tensor and exposes its
/// trainable parameters for the optimizer. The perturbation search treats
/// any `Module` as a fixed differentiable classifier: it only calls
/// `forward` and relies on the tape for gradients.
pub trait Module {
    /// Forward pass.
    fn forward(&self, input: &Tensor) -> Tensor;

    /// References to all trainable parameters.
    fn parameters(&self) -> Vec<&Tensor> {
        Vec::new()
    }

    /// Mutable references to all trainable parameters.
    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        Vec::new()
    }

    /// Total number of scalar parameters.
    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|p| p.numel()).sum()
    }
}
