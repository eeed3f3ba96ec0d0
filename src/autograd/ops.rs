//! Differentiable operations for tensors.
//!
//! Each operation computes its forward result and hands it to
//! `record_operation`, which does the tape bookkeeping when gradient
//! tracking applies. Matmul dispatches to trueno for SIMD-accelerated
//! computation. The op set is exactly what the classifier and the
//! perturbation search consume.

use std::sync::Arc;

use super::grad_fn::{
    matmul_raw, transpose_raw, AddBackward, BroadcastAddBackward, MatmulBackward,
    MulScalarBackward, ReluBackward, SumBackward, TransposeBackward,
};
use super::record_operation;
use super::tensor::Tensor;

impl Tensor {
    /// Element-wise addition: z = self + other
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    #[must_use]
    pub fn add(&self, other: &Tensor) -> Tensor {
        assert_eq!(
            self.shape(),
            other.shape(),
            "add requires congruent shapes"
        );
        let data: Vec<f32> = self
            .data()
            .iter()
            .zip(other.data().iter())
            .map(|(&a, &b)| a + b)
            .collect();

        let mut result = Tensor::new(&data, self.shape());
        record_operation(&mut result, &[self, other], Arc::new(AddBackward));
        result
    }

    /// Scalar multiplication: z = self * scalar
    #[must_use]
    pub fn mul_scalar(&self, scalar: f32) -> Tensor {
        let data: Vec<f32> = self.data().iter().map(|&a| a * scalar).collect();

        let mut result = Tensor::new(&data, self.shape());
        record_operation(&mut result, &[self], Arc::new(MulScalarBackward { scalar }));
        result
    }

    /// `ReLU` activation: z = max(0, self)
    #[must_use]
    pub fn relu(&self) -> Tensor {
        let data: Vec<f32> = self.data().iter().map(|&a| a.max(0.0)).collect();

        let mut result = Tensor::new(&data, self.shape());
        record_operation(
            &mut result,
            &[self],
            Arc::new(ReluBackward { x: self.clone() }),
        );
        result
    }

    /// Sum all elements: z = sum(self)
    #[must_use]
    pub fn sum(&self) -> Tensor {
        let sum: f32 = self.data().iter().sum();

        let mut result = Tensor::new(&[sum], &[1]);
        record_operation(
            &mut result,
            &[self],
            Arc::new(SumBackward {
                input_shape: self.shape().to_vec(),
            }),
        );
        result
    }

    /// Transpose a 2D tensor.
    #[must_use]
    pub fn transpose(&self) -> Tensor {
        assert_eq!(self.ndim(), 2, "transpose requires 2D tensor");

        let (rows, cols) = (self.shape()[0], self.shape()[1]);
        let data = transpose_raw(self.data(), rows, cols);

        let mut result = Tensor::new(&data, &[cols, rows]);
        record_operation(&mut result, &[self], Arc::new(TransposeBackward));
        result
    }

    /// Broadcast addition: z = matrix + vector, broadcast over rows.
    ///
    /// Used for bias addition: self is `[batch, features]`, other is
    /// `[features]`.
    ///
    /// # Panics
    ///
    /// Panics if self is not 2D, other is not 1D, or the feature
    /// dimensions differ.
    #[must_use]
    pub fn broadcast_add(&self, other: &Tensor) -> Tensor {
        assert_eq!(self.ndim(), 2, "broadcast_add requires 2D matrix");
        assert_eq!(other.ndim(), 1, "broadcast_add requires 1D vector");
        assert_eq!(
            self.shape()[1],
            other.shape()[0],
            "Matrix columns {} must match vector length {}",
            self.shape()[1],
            other.shape()[0]
        );

        let (rows, cols) = (self.shape()[0], self.shape()[1]);
        let mut data = vec![0.0; rows * cols];

        for i in 0..rows {
            for j in 0..cols {
                data[i * cols + j] = self.data()[i * cols + j] + other.data()[j];
            }
        }

        let mut result = Tensor::new(&data, self.shape());
        record_operation(
            &mut result,
            &[self, other],
            Arc::new(BroadcastAddBackward { rows, cols }),
        );
        result
    }

    /// Matrix multiplication: z = self @ other (2D tensors).
    ///
    /// # Panics
    ///
    /// Panics if either operand is not 2D or the inner dimensions differ.
    #[must_use]
    pub fn matmul(&self, other: &Tensor) -> Tensor {
        assert_eq!(self.ndim(), 2, "matmul requires 2D tensors");
        assert_eq!(other.ndim(), 2, "matmul requires 2D tensors");

        let (m, k1) = (self.shape()[0], self.shape()[1]);
        let (k2, n) = (other.shape()[0], other.shape()[1]);
        assert_eq!(k1, k2, "matmul dimension mismatch: {k1} vs {k2}");

        let data = matmul_raw(self.data(), m, k1, other.data(), n);

        let mut result = Tensor::new(&data, &[m, n]);
        record_operation(
            &mut result,
            &[self, other],
            Arc::new(MatmulBackward {
                x: self.clone(),
                y: other.clone(),
            }),
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::{clear_graph, get_grad, no_grad};

    #[test]
    fn test_sum_gradient() {
        // d/dx sum(x) = [1, 1, 1]
        clear_graph();
        let x = Tensor::from_slice(&[1.0, 2.0, 3.0]).requires_grad();
        let x_id = x.id();

        let y = x.sum();
        y.backward();

        let grad = get_grad(x_id).expect("gradient should exist");
        assert_eq!(grad.data(), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_add_gradient() {
        clear_graph();
        let x = Tensor::from_slice(&[1.0, 2.0, 3.0]).requires_grad();
        let y = Tensor::from_slice(&[4.0, 5.0, 6.0]);
        let x_id = x.id();

        let z = x.add(&y).sum();
        z.backward();

        let grad = get_grad(x_id).expect("grad");
        assert_eq!(grad.data(), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_untracked_operand_gets_no_gradient() {
        clear_graph();
        let x = Tensor::from_slice(&[1.0, 2.0]).requires_grad();
        let y = Tensor::from_slice(&[3.0, 4.0]);
        let y_id = y.id();

        let z = x.add(&y).sum();
        z.backward();

        assert!(get_grad(y_id).is_none());
    }

    #[test]
    fn test_mul_scalar_gradient() {
        // d/dx sum(3x) = 3
        clear_graph();
        let x = Tensor::from_slice(&[1.0, 2.0]).requires_grad();
        let x_id = x.id();

        let z = x.mul_scalar(3.0).sum();
        z.backward();

        let grad = get_grad(x_id).expect("grad");
        assert_eq!(grad.data(), &[3.0, 3.0]);
    }

    #[test]
    fn test_relu_gradient() {
        clear_graph();
        let x = Tensor::from_slice(&[-1.0, 0.5, 2.0]).requires_grad();
        let x_id = x.id();

        let z = x.relu().sum();
        z.backward();

        let grad = get_grad(x_id).expect("grad");
        assert_eq!(grad.data(), &[0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_matmul_forward() {
        let a = Tensor::new(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
        let b = Tensor::new(&[5.0, 6.0, 7.0, 8.0], &[2, 2]);

        let c = a.matmul(&b);

        assert_eq!(c.shape(), &[2, 2]);
        assert_eq!(c.data(), &[19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_matmul_backward() {
        // For z = sum(A @ B): dL/dA = ones @ B^T, dL/dB = A^T @ ones
        clear_graph();
        let a = Tensor::new(&[1.0, 2.0, 3.0, 4.0], &[2, 2]).requires_grad();
        let b = Tensor::new(&[1.0, 0.0, 0.0, 1.0], &[2, 2]).requires_grad();
        let a_id = a.id();
        let b_id = b.id();

        let loss = a.matmul(&b).sum();
        loss.backward();

        let grad_a = get_grad(a_id).expect("grad_a");
        let grad_b = get_grad(b_id).expect("grad_b");

        assert_eq!(grad_a.data(), &[1.0, 1.0, 1.0, 1.0]);
        assert_eq!(grad_b.data(), &[4.0, 4.0, 6.0, 6.0]);
    }

    #[test]
    fn test_transpose_chains_gradient() {
        // z = sum(x^T @ y): gradient flows through the transpose to x
        clear_graph();
        let x = Tensor::new(&[1.0, 2.0, 3.0, 4.0], &[2, 2]).requires_grad();
        let y = Tensor::new(&[1.0, 0.0, 0.0, 1.0], &[2, 2]);
        let x_id = x.id();

        let z = x.transpose().matmul(&y).sum();
        z.backward();

        let grad = get_grad(x_id).expect("grad");
        assert_eq!(grad.data(), &[1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_no_grad_suppresses_recording() {
        clear_graph();
        let x = Tensor::from_slice(&[1.0, 2.0]).requires_grad();
        let x_id = x.id();

        let _ = no_grad(|| x.mul_scalar(2.0).sum());

        assert!(get_grad(x_id).is_none());
    }

    #[test]
    #[should_panic(expected = "congruent shapes")]
    fn test_add_shape_mismatch_panics() {
        let x = Tensor::from_slice(&[1.0, 2.0]);
        let y = Tensor::from_slice(&[1.0, 2.0, 3.0]);
        let _ = x.add(&y);
    }
}
