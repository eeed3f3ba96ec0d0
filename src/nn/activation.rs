//! Activation function modules for use in `Sequential` containers.

use super::module::Module;
use crate::autograd::Tensor;

/// Rectified Linear Unit activation: ReLU(x) = max(0, x)
#[derive(Debug, Clone, Copy, Default)]
pub struct ReLU;

impl ReLU {
    /// Create a new ReLU activation.
    pub fn new() -> Self {
        Self
    }
}

impl Module for ReLU {
    fn forward(&self, input: &Tensor) -> Tensor {
        input.relu()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relu_forward() {
        let relu = ReLU::new();
        let x = Tensor::from_slice(&[-1.0, 0.0, 1.0, 2.0]);
        let y = relu.forward(&x);
        assert_eq!(y.data(), &[0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_relu_has_no_parameters() {
        let relu = ReLU::new();
        assert!(relu.parameters().is_empty());
    }
}
