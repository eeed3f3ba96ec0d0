//! Classification metrics.

use crate::autograd::Tensor;

/// Row-wise argmax over a `[batch, classes]` logit tensor.
///
/// Ties resolve to the lowest index.
#[must_use]
pub fn argmax_rows(logits: &Tensor) -> Vec<usize> {
    assert_eq!(logits.ndim(), 2, "Expected 2D logits [batch, classes]");
    let classes = logits.shape()[1];

    logits
        .data()
        .chunks_exact(classes)
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |(bi, bv), (i, &v)| {
                    if v > bv {
                        (i, v)
                    } else {
                        (bi, bv)
                    }
                })
                .0
        })
        .collect()
}

/// Fraction of predictions equal to the true labels.
///
/// # Panics
///
/// Panics if the slices have different lengths or are empty.
#[must_use]
pub fn accuracy(y_pred: &[usize], y_true: &[usize]) -> f32 {
    assert_eq!(
        y_pred.len(),
        y_true.len(),
        "Prediction and label counts must match"
    );
    assert!(!y_pred.is_empty(), "Cannot compute accuracy of empty slices");

    let correct = y_pred
        .iter()
        .zip(y_true.iter())
        .filter(|(p, t)| p == t)
        .count();
    correct as f32 / y_pred.len() as f32
}
