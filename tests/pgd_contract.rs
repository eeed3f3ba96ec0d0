//! Feasibility and determinism contract of the perturbation search.

use adversario::attack::pgd::{project_norm_ball, project_pixel_box};
use adversario::data::cifar::{denormalize, normalize};
use adversario::data::{CifarLoader, IMAGE_NUMEL, PIXEL_TO_NORM_SCALE};
use adversario::prelude::*;

use proptest::prelude::*;

fn small_batch(num_images: usize, seed: u64) -> (Tensor, Tensor) {
    let loader = CifarLoader::synthetic(num_images, seed)
        .with_batch_size(num_images)
        .with_shuffle(false);
    loader.batches().remove(0)
}

fn row_norms(delta: &Tensor) -> Vec<f32> {
    delta
        .data()
        .chunks_exact(delta.shape()[1])
        .map(|row| row.iter().map(|v| v * v).sum::<f32>().sqrt())
        .collect()
}

#[test]
fn perturbation_norms_respect_scaled_radius() {
    let model = make_classifier(0);
    let (images, labels) = small_batch(4, 1);
    let config = PgdConfig {
        steps: 5,
        ..PgdConfig::default()
    };

    let delta = perturbation_search(&images, &labels, &model, &config);

    let bound = config.radius * PIXEL_TO_NORM_SCALE;
    for norm in row_norms(&delta) {
        assert!(
            norm <= bound + 1e-3,
            "perturbation norm {norm} exceeds bound {bound}"
        );
    }
}

#[test]
fn perturbed_pixels_stay_in_unit_interval() {
    let model = make_classifier(2);
    let (images, labels) = small_batch(3, 7);
    let config = PgdConfig {
        steps: 4,
        ..PgdConfig::default()
    };

    let delta = perturbation_search(&images, &labels, &model, &config);

    let perturbed: Vec<f32> = images
        .data()
        .iter()
        .zip(delta.data().iter())
        .map(|(x, d)| x + d)
        .collect();

    for p in denormalize(&perturbed) {
        assert!(
            (-1e-4..=1.0 + 1e-4).contains(&p),
            "pixel {p} escaped the unit interval"
        );
    }
}

#[test]
fn search_is_deterministic() {
    let model = make_classifier(1);
    let (images, labels) = small_batch(2, 3);
    let config = PgdConfig {
        steps: 3,
        ..PgdConfig::default()
    };

    let a = perturbation_search(&images, &labels, &model, &config);
    let b = perturbation_search(&images, &labels, &model, &config);

    assert_eq!(a.data(), b.data());
}

#[test]
fn search_output_congruent_with_inputs() {
    let model = make_classifier(0);
    let (images, labels) = small_batch(5, 9);
    let config = PgdConfig {
        steps: 1,
        ..PgdConfig::default()
    };

    let delta = perturbation_search(&images, &labels, &model, &config);
    assert_eq!(delta.shape(), images.shape());
}

#[test]
fn zero_gradient_never_produces_nan() {
    // A model with all-zero second-layer weights gives constant logits,
    // hence an exactly zero gradient at delta = 0.
    let mut layer = Linear::with_seed(IMAGE_NUMEL, NUM_CLASSES, Some(0));
    layer.set_weight(Tensor::zeros(&[NUM_CLASSES, IMAGE_NUMEL]).requires_grad());
    layer.set_bias(Tensor::zeros(&[NUM_CLASSES]).requires_grad());
    let model = Sequential::new().add(layer);

    let (images, labels) = small_batch(2, 4);
    let config = PgdConfig {
        steps: 3,
        ..PgdConfig::default()
    };

    let delta = perturbation_search(&images, &labels, &model, &config);
    assert!(delta.data().iter().all(|d| d.is_finite()));
}

#[test]
fn pixel_box_projection_is_idempotent() {
    let (images, _) = small_batch(2, 6);

    let mut once = Tensor::new(&vec![0.9; images.numel()], images.shape());
    project_pixel_box(&mut once, &images);

    let mut twice = once.clone();
    project_pixel_box(&mut twice, &images);

    for (a, b) in once.data().iter().zip(twice.data().iter()) {
        assert!((a - b).abs() < 1e-5);
    }
}

#[test]
fn config_validation_catches_each_field() {
    let base = PgdConfig::default();
    assert!(base.validate().is_ok());

    assert!(PgdConfig { radius: -1.0, ..base }.validate().is_err());
    assert!(PgdConfig { step_size: 0.0, ..base }.validate().is_err());
    assert!(PgdConfig { steps: 0, ..base }.validate().is_err());
    assert!(PgdConfig { eps: 0.0, ..base }.validate().is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn norm_ball_projection_bounds_any_row(
        values in prop::collection::vec(-10.0f32..10.0, 8),
        radius in 0.1f32..5.0,
    ) {
        let mut delta = Tensor::new(&values, &[2, 4]);
        project_norm_ball(&mut delta, radius);

        for norm in row_norms(&delta) {
            prop_assert!(norm <= radius + 1e-4);
        }
    }

    #[test]
    fn norm_ball_projection_preserves_interior_rows(
        values in prop::collection::vec(-0.1f32..0.1, 4),
    ) {
        let mut delta = Tensor::new(&values, &[1, 4]);
        let before = delta.data().to_vec();
        project_norm_ball(&mut delta, 10.0);

        prop_assert_eq!(delta.data(), before.as_slice());
    }

    #[test]
    fn pixel_box_projection_idempotent_for_any_offset(
        offset in -3.0f32..3.0,
    ) {
        let loader = CifarLoader::synthetic(1, 0).with_shuffle(false);
        let (images, _) = loader.batches().remove(0);

        let mut once = Tensor::new(&vec![offset; images.numel()], images.shape());
        project_pixel_box(&mut once, &images);

        let mut twice = once.clone();
        project_pixel_box(&mut twice, &images);

        for (a, b) in once.data().iter().zip(twice.data().iter()) {
            prop_assert!((a - b).abs() < 1e-5);
        }
    }
}

#[test]
fn normalize_denormalize_are_inverse() {
    let pixels: Vec<f32> = (0..IMAGE_NUMEL).map(|i| (i % 100) as f32 / 99.0).collect();
    let back = denormalize(&normalize(&pixels));
    for (a, b) in pixels.iter().zip(back.iter()) {
        assert!((a - b).abs() < 1e-5);
    }
}
