//! Gradient descent optimizers.

use crate::autograd::{get_grad, Tensor, TensorId};
use std::collections::HashMap;

/// Stochastic gradient descent with optional momentum.
///
/// Gradients are read from the computation graph after `backward()`; the
/// caller passes the parameter tensors mutably so updates land on the
/// live leaves.
///
/// # Example
///
/// ```
/// use adversario::autograd::{clear_graph, Tensor};
/// use adversario::nn::optim::SGD;
///
/// clear_graph();
/// let mut w = Tensor::from_slice(&[1.0, 2.0]).requires_grad();
/// let loss = w.mul_scalar(3.0).sum();
/// loss.backward();
///
/// let mut opt = SGD::new(0.1);
/// opt.step_with_params(&mut [&mut w]);
/// assert!((w.data()[0] - 0.7).abs() < 1e-6);
/// ```
#[derive(Debug)]
pub struct SGD {
    lr: f32,
    momentum: f32,
    velocities: HashMap<TensorId, Vec<f32>>,
}

impl SGD {
    /// Create an SGD optimizer with the given learning rate and no momentum.
    pub fn new(lr: f32) -> Self {
        Self::with_momentum(lr, 0.0)
    }

    /// Create an SGD optimizer with momentum.
    pub fn with_momentum(lr: f32, momentum: f32) -> Self {
        assert!(lr > 0.0, "Learning rate must be positive, got {lr}");
        assert!(
            (0.0..1.0).contains(&momentum),
            "Momentum must be in [0, 1), got {momentum}"
        );

        Self {
            lr,
            momentum,
            velocities: HashMap::new(),
        }
    }

    /// Get the learning rate.
    pub fn lr(&self) -> f32 {
        self.lr
    }

    /// Apply one update step using gradients from the computation graph.
    ///
    /// Parameters with no recorded gradient are skipped, so a layer that
    /// did not participate in the forward pass is left untouched.
    pub fn step_with_params(&mut self, params: &mut [&mut Tensor]) {
        for param in params.iter_mut() {
            let Some(grad) = get_grad(param.id()) else {
                continue;
            };
            debug_assert_eq!(grad.shape(), param.shape());

            if self.momentum > 0.0 {
                let velocity = self
                    .velocities
                    .entry(param.id())
                    .or_insert_with(|| vec![0.0; param.numel()]);

                for ((p, v), &g) in param
                    .data_mut()
                    .iter_mut()
                    .zip(velocity.iter_mut())
                    .zip(grad.data().iter())
                {
                    *v = self.momentum * *v + g;
                    *p -= self.lr * *v;
                }
            } else {
                for (p, &g) in param.data_mut().iter_mut().zip(grad.data().iter()) {
                    *p -= self.lr * g;
                }
            }
        }
    }
}
