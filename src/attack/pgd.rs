//! Projected-gradient perturbation search.
//!
//! Targeted attack: the search minimizes cross-entropy against the
//! *target* labels, so each step descends along the loss gradient. Two
//! projections keep the perturbation feasible, applied every iteration:
//! a per-image Euclidean norm ball and the valid pixel box (perturbed
//! pixels must stay in `[0, 1]` after de-normalization).

use crate::autograd::{clear_graph, get_grad, no_grad, Tensor};
use crate::data::cifar::{denormalize, normalize};
use crate::data::PIXEL_TO_NORM_SCALE;
use crate::error::{AdversarioError, Result};
use crate::nn::loss::{CrossEntropyLoss, Reduction};
use crate::nn::Module;

/// Hyperparameters for the perturbation search.
///
/// `radius` and `step_size` are given in pixel units; internally both are
/// scaled by [`PIXEL_TO_NORM_SCALE`] to operate on normalized inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PgdConfig {
    /// Norm-ball radius in pixel units
    pub radius: f32,
    /// Step size in pixel units
    pub step_size: f32,
    /// Number of iterations (fixed, no early stopping)
    pub steps: usize,
    /// Guard added to gradient norms before division
    pub eps: f32,
}

impl Default for PgdConfig {
    fn default() -> Self {
        Self {
            radius: 0.5,
            step_size: 0.1,
            steps: 100,
            eps: 1e-5,
        }
    }
}

impl PgdConfig {
    /// Check hyperparameter constraints.
    ///
    /// # Errors
    ///
    /// Returns an error if `radius`, `step_size` or `eps` is not strictly
    /// positive, or if `steps` is zero.
    pub fn validate(&self) -> Result<()> {
        if !(self.radius > 0.0) {
            return Err(invalid("radius", self.radius, "> 0"));
        }
        if !(self.step_size > 0.0) {
            return Err(invalid("step_size", self.step_size, "> 0"));
        }
        if !(self.eps > 0.0) {
            return Err(invalid("eps", self.eps, "> 0"));
        }
        if self.steps == 0 {
            return Err(AdversarioError::InvalidHyperparameter {
                param: "steps".to_string(),
                value: "0".to_string(),
                constraint: ">= 1".to_string(),
            });
        }
        Ok(())
    }
}

fn invalid(param: &str, value: f32, constraint: &str) -> AdversarioError {
    AdversarioError::InvalidHyperparameter {
        param: param.to_string(),
        value: value.to_string(),
        constraint: constraint.to_string(),
    }
}

/// Run the projected-gradient search for one batch.
///
/// `inputs` are normalized images of shape `[batch, dims]`; `targets` are
/// the remapped labels the attack steers toward, shape `[batch]`. The
/// returned perturbation is congruent with `inputs`; it is created here,
/// owned by this call, and returned by value.
///
/// Each iteration evaluates the model on `inputs + delta`, takes the
/// gradient of the summed cross-entropy with respect to `delta`, steps
/// along the per-image unit gradient, then applies both projections. All
/// updates to `delta` happen outside gradient tracking.
///
/// # Panics
///
/// Panics if `inputs` is not 2D or the batch sizes disagree.
#[must_use]
pub fn perturbation_search(
    inputs: &Tensor,
    targets: &Tensor,
    model: &dyn Module,
    config: &PgdConfig,
) -> Tensor {
    assert_eq!(inputs.ndim(), 2, "Inputs must be [batch, dims]");
    assert_eq!(
        inputs.shape()[0],
        targets.shape()[0],
        "Input and target batch sizes must match"
    );

    let radius = config.radius * PIXEL_TO_NORM_SCALE;
    let step = config.step_size * PIXEL_TO_NORM_SCALE;
    let criterion = CrossEntropyLoss::with_reduction(Reduction::Sum);

    let mut delta = Tensor::zeros_like(inputs).requires_grad();
    let delta_id = delta.id();

    for _ in 0..config.steps {
        clear_graph();

        let perturbed = inputs.add(&delta);
        let logits = model.forward(&perturbed);
        let loss = criterion.forward(&logits, targets);
        loss.backward();

        let grad = get_grad(delta_id).unwrap_or_else(|| Tensor::zeros_like(&delta));

        no_grad(|| {
            descend(&mut delta, &grad, step, config.eps);
            project_norm_ball(&mut delta, radius);
            project_pixel_box(&mut delta, inputs);
        });
    }

    clear_graph();
    delta
}

/// Step each per-image perturbation along its unit gradient.
fn descend(delta: &mut Tensor, grad: &Tensor, step: f32, eps: f32) {
    let dims = per_image_dims(delta);

    for (d_row, g_row) in delta
        .data_mut()
        .chunks_exact_mut(dims)
        .zip(grad.data().chunks_exact(dims))
    {
        let norm = l2_norm(g_row);
        let scale = step / (norm + eps);
        for (d, &g) in d_row.iter_mut().zip(g_row.iter()) {
            *d -= scale * g;
        }
    }
}

/// Project each per-image perturbation onto the Euclidean ball.
///
/// Rows already inside the ball are left untouched.
pub fn project_norm_ball(delta: &mut Tensor, radius: f32) {
    let dims = per_image_dims(delta);

    for row in delta.data_mut().chunks_exact_mut(dims) {
        let norm = l2_norm(row);
        if norm > radius {
            let scale = radius / norm;
            for d in row.iter_mut() {
                *d *= scale;
            }
        }
    }
}

/// Project the perturbation so the perturbed image stays a valid image.
///
/// De-normalizes `inputs + delta`, clips to `[0, 1]`, re-normalizes, and
/// subtracts `inputs`. Applying this twice equals applying it once.
pub fn project_pixel_box(delta: &mut Tensor, inputs: &Tensor) {
    assert_eq!(
        delta.shape(),
        inputs.shape(),
        "Perturbation and inputs must be congruent"
    );

    let perturbed: Vec<f32> = inputs
        .data()
        .iter()
        .zip(delta.data().iter())
        .map(|(x, d)| x + d)
        .collect();

    let mut pixels = denormalize(&perturbed);
    for p in &mut pixels {
        *p = p.clamp(0.0, 1.0);
    }
    let clipped = normalize(&pixels);

    for ((d, &c), &x) in delta
        .data_mut()
        .iter_mut()
        .zip(clipped.iter())
        .zip(inputs.data().iter())
    {
        *d = c - x;
    }
}

fn per_image_dims(t: &Tensor) -> usize {
    assert_eq!(t.ndim(), 2, "Expected [batch, dims]");
    t.shape()[1]
}

fn l2_norm(row: &[f32]) -> f32 {
    row.iter().map(|v| v * v).sum::<f32>().sqrt()
}
