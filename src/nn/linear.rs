//! Fully connected (linear) layer: y = xW^T + b.

use super::init::{kaiming_uniform, zeros};
use super::module::Module;
use crate::autograd::Tensor;

/// Fully connected layer with Kaiming initialization.
///
/// # Shape
///
/// - Input: `[batch, in_features]`
/// - Output: `[batch, out_features]`
///
/// The transpose of the weight is taken on the tape each forward pass, so
/// gradient descent on `weight` stays correct without a cache to refresh.
pub struct Linear {
    /// Weight matrix, shape: [out_features, in_features]
    weight: Tensor,

    /// Bias vector, shape: [out_features], or None if bias is disabled
    bias: Option<Tensor>,

    in_features: usize,
    out_features: usize,
}

impl Linear {
    /// Create a new Linear layer with Kaiming-uniform weights and zero bias.
    pub fn new(in_features: usize, out_features: usize) -> Self {
        Self::with_seed(in_features, out_features, None)
    }

    /// Create a Linear layer with a specific random seed.
    pub fn with_seed(in_features: usize, out_features: usize, seed: Option<u64>) -> Self {
        let weight =
            kaiming_uniform(&[out_features, in_features], in_features, seed).requires_grad();
        let bias = zeros(&[out_features]).requires_grad();

        Self {
            weight,
            bias: Some(bias),
            in_features,
            out_features,
        }
    }

    /// Get the input feature dimension.
    pub fn in_features(&self) -> usize {
        self.in_features
    }

    /// Get the output feature dimension.
    pub fn out_features(&self) -> usize {
        self.out_features
    }

    /// Get a reference to the weight tensor.
    pub fn weight(&self) -> &Tensor {
        &self.weight
    }

    /// Replace the weight tensor (for loading known weights in tests).
    pub fn set_weight(&mut self, weight: Tensor) {
        self.weight = weight;
    }

    /// Replace the bias tensor.
    pub fn set_bias(&mut self, bias: Tensor) {
        self.bias = Some(bias);
    }
}

impl Module for Linear {
    fn forward(&self, input: &Tensor) -> Tensor {
        assert_eq!(
            input.ndim(),
            2,
            "Linear expects [batch, in_features], got {:?}",
            input.shape()
        );

        // y = x @ W^T + b; the transpose is recorded so dL/dW accumulates
        // on the weight leaf.
        let output = input.matmul(&self.weight.transpose());

        match &self.bias {
            Some(b) => output.broadcast_add(b),
            None => output,
        }
    }

    fn parameters(&self) -> Vec<&Tensor> {
        match &self.bias {
            Some(b) => vec![&self.weight, b],
            None => vec![&self.weight],
        }
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        match &mut self.bias {
            Some(b) => vec![&mut self.weight, b],
            None => vec![&mut self.weight],
        }
    }
}

impl std::fmt::Debug for Linear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Linear")
            .field("in_features", &self.in_features)
            .field("out_features", &self.out_features)
            .field("bias", &self.bias.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_forward_shape() {
        let layer = Linear::new(10, 5);
        let x = Tensor::ones(&[32, 10]);
        let output = layer.forward(&x);

        assert_eq!(output.shape(), &[32, 5]);
    }

    #[test]
    fn test_linear_parameters() {
        let layer = Linear::new(10, 5);
        let params = layer.parameters();

        assert_eq!(params.len(), 2);
        assert_eq!(params[0].shape(), &[5, 10]);
        assert_eq!(params[1].shape(), &[5]);
        assert_eq!(layer.num_parameters(), 55);
    }

    #[test]
    fn test_linear_reproducible() {
        let layer1 = Linear::with_seed(10, 5, Some(42));
        let layer2 = Linear::with_seed(10, 5, Some(42));

        assert_eq!(layer1.weight().data(), layer2.weight().data());
    }

    #[test]
    fn test_linear_identity_with_bias() {
        let mut layer = Linear::with_seed(2, 2, Some(42));
        layer.set_weight(Tensor::new(&[1.0, 0.0, 0.0, 1.0], &[2, 2]).requires_grad());
        layer.set_bias(Tensor::new(&[10.0, 20.0], &[2]).requires_grad());

        let x = Tensor::new(&[1.0, 2.0], &[1, 2]);
        let output = layer.forward(&x);

        // [1, 2] @ I + [10, 20] = [11, 22]
        let out = output.data();
        assert!((out[0] - 11.0).abs() < 1e-5);
        assert!((out[1] - 22.0).abs() < 1e-5);
    }

    #[test]
    fn test_weight_receives_gradient() {
        use crate::autograd::{clear_graph, get_grad};

        clear_graph();
        let layer = Linear::with_seed(3, 2, Some(1));
        let w_id = layer.weight().id();

        let x = Tensor::ones(&[4, 3]);
        let loss = layer.forward(&x).sum();
        loss.backward();

        let grad = get_grad(w_id).expect("weight gradient");
        assert_eq!(grad.shape(), &[2, 3]);
        // d sum(xW^T + b)/dW_ij = sum over batch of x_j = 4.0
        assert!(grad.data().iter().all(|&g| (g - 4.0).abs() < 1e-4));
    }
}
