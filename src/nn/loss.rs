//! Differentiable loss functions.
//!
//! Cross-entropy is the only loss this experiment needs: mean reduction
//! for classifier training, sum reduction for the perturbation search
//! (summed per-example loss against the target labels).

use crate::autograd::grad_fn::CrossEntropyBackward;
use crate::autograd::{record_operation, Tensor};
use std::sync::Arc;

/// Reduction mode for loss functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reduction {
    /// Return loss per example (no reduction)
    None,
    /// Return mean of losses (default)
    #[default]
    Mean,
    /// Return sum of losses
    Sum,
}

/// Cross-entropy loss for classification.
///
/// Combines log-softmax and negative log likelihood for numerical
/// stability:
///
/// ```text
/// loss = -log(softmax(logits)[target_class])
/// ```
///
/// # Example
///
/// ```
/// use adversario::nn::loss::{CrossEntropyLoss, Reduction};
/// use adversario::autograd::Tensor;
///
/// let criterion = CrossEntropyLoss::with_reduction(Reduction::Sum);
/// let logits = Tensor::new(&[2.0, 0.0, 0.0, 2.0], &[2, 2]);
/// let targets = Tensor::from_slice(&[0.0, 1.0]);
/// let loss = criterion.forward(&logits, &targets);
/// assert!(loss.item() > 0.0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropyLoss {
    reduction: Reduction,
}

impl CrossEntropyLoss {
    /// Create a cross-entropy loss with mean reduction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cross-entropy loss with the given reduction.
    pub fn with_reduction(reduction: Reduction) -> Self {
        Self { reduction }
    }

    /// Compute cross-entropy loss.
    ///
    /// # Arguments
    ///
    /// * `logits` - Shape `[batch, num_classes]`
    /// * `targets` - Shape `[batch]`, integer class indices stored as f32
    ///
    /// # Panics
    ///
    /// Panics on shape mismatch or out-of-range target indices.
    pub fn forward(&self, logits: &Tensor, targets: &Tensor) -> Tensor {
        assert_eq!(logits.ndim(), 2, "Logits must be 2D [batch, classes]");
        assert_eq!(targets.ndim(), 1, "Targets must be 1D [batch]");
        assert_eq!(
            logits.shape()[0],
            targets.shape()[0],
            "Batch sizes must match"
        );

        let batch_size = logits.shape()[0];
        let num_classes = logits.shape()[1];

        let target_indices: Vec<usize> = targets
            .data()
            .iter()
            .map(|&t| {
                let idx = t as usize;
                assert!(
                    idx < num_classes,
                    "Target class {idx} out of bounds for {num_classes} classes"
                );
                idx
            })
            .collect();

        // Stable softmax and per-example -log p[target] in one pass.
        let mut softmax = vec![0.0; batch_size * num_classes];
        let mut losses = Vec::with_capacity(batch_size);

        for (b, &target) in target_indices.iter().enumerate() {
            let row = &logits.data()[b * num_classes..(b + 1) * num_classes];
            let max_val = row.iter().fold(f32::NEG_INFINITY, |a, &v| a.max(v));

            let mut sum = 0.0;
            for (j, &v) in row.iter().enumerate() {
                let e = (v - max_val).exp();
                softmax[b * num_classes + j] = e;
                sum += e;
            }
            for j in 0..num_classes {
                softmax[b * num_classes + j] /= sum;
            }

            // -log softmax[target] = log(sum) + max - logit[target]
            losses.push(sum.ln() + max_val - row[target]);
        }

        let softmax_output = Tensor::new(&softmax, logits.shape());

        let (mut loss, scale) = match self.reduction {
            Reduction::None => (Tensor::new(&losses, &[batch_size]), 1.0),
            Reduction::Mean => {
                let mean = losses.iter().sum::<f32>() / batch_size as f32;
                (Tensor::from_slice(&[mean]), 1.0 / batch_size as f32)
            }
            Reduction::Sum => {
                let sum = losses.iter().sum::<f32>();
                (Tensor::from_slice(&[sum]), 1.0)
            }
        };

        // Per-example reduction has no scalar output to seed backward from;
        // only the scalar reductions record to the tape.
        if self.reduction != Reduction::None {
            record_operation(
                &mut loss,
                &[logits],
                Arc::new(CrossEntropyBackward {
                    softmax_output,
                    targets: target_indices,
                    scale,
                }),
            );
        }

        loss
    }
}
