//! Gradient function trait and implementations.
//!
//! One implementation per differentiable operation the experiment uses.
//! Matmul backward goes through trueno, matching the forward path.

use super::tensor::Tensor;

/// Trait for functions that compute gradients during the backward pass.
///
/// Each differentiable operation creates a `GradFn` implementation that
/// captures the context needed for its gradient computation.
pub trait GradFn: Send + Sync {
    /// Compute gradients with respect to inputs.
    ///
    /// Returns one gradient per input tensor, in forward-pass input order.
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor>;

    /// Human-readable name for debugging.
    fn name(&self) -> &'static str;
}

/// Raw 2D matmul on flat slices via trueno.
pub(crate) fn matmul_raw(a: &[f32], m: usize, k: usize, b: &[f32], n: usize) -> Vec<f32> {
    let a_matrix = trueno::Matrix::from_vec(m, k, a.to_vec()).expect("valid matrix dimensions");
    let b_matrix = trueno::Matrix::from_vec(k, n, b.to_vec()).expect("valid matrix dimensions");
    let result = a_matrix.matmul(&b_matrix).expect("matmul should succeed");
    result.as_slice().to_vec()
}

/// Raw 2D transpose on a flat slice.
pub(crate) fn transpose_raw(a: &[f32], rows: usize, cols: usize) -> Vec<f32> {
    let mut out = vec![0.0; rows * cols];
    for i in 0..rows {
        for j in 0..cols {
            out[j * rows + i] = a[i * cols + j];
        }
    }
    out
}

/// Gradient function for addition: z = x + y (congruent shapes)
pub(crate) struct AddBackward;

impl GradFn for AddBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        // d(x+y)/dx = 1, d(x+y)/dy = 1
        vec![grad_output.detach(), grad_output.detach()]
    }

    fn name(&self) -> &'static str {
        "AddBackward"
    }
}

/// Gradient function for scalar multiplication: z = x * c
pub(crate) struct MulScalarBackward {
    pub(crate) scalar: f32,
}

impl GradFn for MulScalarBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        let grad: Vec<f32> = grad_output.data().iter().map(|&g| g * self.scalar).collect();
        vec![Tensor::new(&grad, grad_output.shape())]
    }

    fn name(&self) -> &'static str {
        "MulScalarBackward"
    }
}

/// Gradient function for `ReLU`: z = max(0, x)
pub(crate) struct ReluBackward {
    pub(crate) x: Tensor,
}

impl GradFn for ReluBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        // d relu(x)/dx = 1 if x > 0, else 0
        let grad: Vec<f32> = grad_output
            .data()
            .iter()
            .zip(self.x.data().iter())
            .map(|(&g, &x)| if x > 0.0 { g } else { 0.0 })
            .collect();
        vec![Tensor::new(&grad, grad_output.shape())]
    }

    fn name(&self) -> &'static str {
        "ReluBackward"
    }
}

/// Gradient function for sum: z = sum(x)
pub(crate) struct SumBackward {
    pub(crate) input_shape: Vec<usize>,
}

impl GradFn for SumBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        // d sum(x)/dx_i = 1 for all i
        let g = grad_output.item();
        let numel: usize = self.input_shape.iter().product();
        vec![Tensor::new(&vec![g; numel], &self.input_shape)]
    }

    fn name(&self) -> &'static str {
        "SumBackward"
    }
}

/// Gradient function for 2D transpose.
pub(crate) struct TransposeBackward;

impl GradFn for TransposeBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        let (rows, cols) = (grad_output.shape()[0], grad_output.shape()[1]);
        let grad = transpose_raw(grad_output.data(), rows, cols);
        vec![Tensor::new(&grad, &[cols, rows])]
    }

    fn name(&self) -> &'static str {
        "TransposeBackward"
    }
}

/// Gradient function for matmul: z = x @ y
pub(crate) struct MatmulBackward {
    pub(crate) x: Tensor,
    pub(crate) y: Tensor,
}

impl GradFn for MatmulBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        // dL/dx = g @ y^T, dL/dy = x^T @ g
        let (m, k) = (self.x.shape()[0], self.x.shape()[1]);
        let n = self.y.shape()[1];

        let y_t = transpose_raw(self.y.data(), k, n);
        let grad_x = matmul_raw(grad_output.data(), m, n, &y_t, k);

        let x_t = transpose_raw(self.x.data(), m, k);
        let grad_y = matmul_raw(&x_t, k, m, grad_output.data(), n);

        vec![Tensor::new(&grad_x, &[m, k]), Tensor::new(&grad_y, &[k, n])]
    }

    fn name(&self) -> &'static str {
        "MatmulBackward"
    }
}

/// Gradient function for bias broadcast add: z = matrix + row_vector
pub(crate) struct BroadcastAddBackward {
    pub(crate) rows: usize,
    pub(crate) cols: usize,
}

impl GradFn for BroadcastAddBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        // Matrix gradient passes through; vector gradient sums over rows.
        let mut grad_vec = vec![0.0; self.cols];
        let g = grad_output.data();
        for i in 0..self.rows {
            for j in 0..self.cols {
                grad_vec[j] += g[i * self.cols + j];
            }
        }
        vec![grad_output.detach(), Tensor::new(&grad_vec, &[self.cols])]
    }

    fn name(&self) -> &'static str {
        "BroadcastAddBackward"
    }
}

/// Gradient function for cross-entropy loss (fused softmax + NLL).
///
/// For per-sample L = -log(softmax(x)[target]) the logit gradient is
/// `softmax(x) - one_hot(target)`. `scale` carries the reduction factor
/// (1 for sum, 1/batch for mean) so both reductions backpropagate
/// correctly.
pub(crate) struct CrossEntropyBackward {
    pub(crate) softmax_output: Tensor,
    pub(crate) targets: Vec<usize>,
    pub(crate) scale: f32,
}

impl GradFn for CrossEntropyBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        let g = grad_output.item();
        let (batch, classes) = (
            self.softmax_output.shape()[0],
            self.softmax_output.shape()[1],
        );

        let mut grad = self.softmax_output.data().to_vec();
        for (b, &target) in self.targets.iter().enumerate() {
            grad[b * classes + target] -= 1.0;
        }
        for v in &mut grad {
            *v *= g * self.scale;
        }

        vec![Tensor::new(&grad, &[batch, classes])]
    }

    fn name(&self) -> &'static str {
        "CrossEntropyBackward"
    }
}
