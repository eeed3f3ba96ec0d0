//! Adversarial dataset generation.

use super::pgd::{perturbation_search, PgdConfig};
use super::relabel::TargetPolicy;
use crate::data::cifar::denormalize;
use crate::data::{CifarLoader, IMAGE_NUMEL, NUM_CLASSES};
use crate::error::Result;
use crate::nn::Module;
use crate::train::evaluate;

/// Generate a perturbed, relabeled copy of a dataset.
///
/// Labels are remapped with `policy`, then every image is pushed toward
/// its target label by the projected-gradient search against the fixed
/// `model`. The returned loader holds the de-normalized perturbed pixels
/// with the *target* labels; alongside it comes the fooling rate, the
/// fixed model's accuracy against those targets (1.0 means every attack
/// landed).
///
/// Images are processed in storage order so image `i` of the result
/// corresponds to image `i` of the input.
///
/// # Errors
///
/// Returns an error if `config` fails validation or the perturbed
/// dataset cannot be assembled.
pub fn generate_adversarial_dataset(
    model: &dyn Module,
    loader: &CifarLoader,
    policy: TargetPolicy,
    config: &PgdConfig,
    seed: u64,
) -> Result<(CifarLoader, f32)> {
    config.validate()?;

    let targets = policy.target_labels(loader.labels(), NUM_CLASSES, seed);

    // Every image must be perturbed, so a trailing partial batch is kept
    // and storage order is preserved.
    let mut source = loader.clone().with_shuffle(false).with_drop_last(false);
    source.set_labels(targets.clone())?;

    let mut pixels = Vec::with_capacity(loader.num_images() * IMAGE_NUMEL);
    for (images, batch_targets) in source.batches() {
        let delta = perturbation_search(&images, &batch_targets, model, config);

        let perturbed: Vec<f32> = images
            .data()
            .iter()
            .zip(delta.data().iter())
            .map(|(x, d)| x + d)
            .collect();

        // The box projection already confines these; the clamp only
        // absorbs rounding from the normalize round-trip.
        let raw = denormalize(&perturbed);
        pixels.extend(raw.iter().map(|p| p.clamp(0.0, 1.0)));
    }

    let adversarial = CifarLoader::from_raw(pixels, targets)?;
    let fooling_rate = evaluate(model, &adversarial);

    Ok((adversarial, fooling_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::train::make_classifier;

    fn quick_config() -> PgdConfig {
        PgdConfig {
            steps: 3,
            ..PgdConfig::default()
        }
    }

    #[test]
    fn test_generated_dataset_matches_source_size() {
        let model = make_classifier(0);
        let loader = CifarLoader::synthetic(6, 1).with_batch_size(4);

        let (adv, rate) =
            generate_adversarial_dataset(&model, &loader, TargetPolicy::NextClass, &quick_config(), 0)
                .expect("generation");

        assert_eq!(adv.num_images(), 6);
        assert!((0.0..=1.0).contains(&rate));
    }

    #[test]
    fn test_next_class_labels_are_exact() {
        let model = make_classifier(0);
        let loader = CifarLoader::synthetic(4, 2);

        let (adv, _) =
            generate_adversarial_dataset(&model, &loader, TargetPolicy::NextClass, &quick_config(), 0)
                .expect("generation");

        let expected: Vec<usize> = loader.labels().iter().map(|&l| (l + 1) % NUM_CLASSES).collect();
        assert_eq!(adv.labels(), expected.as_slice());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let model = make_classifier(0);
        let loader = CifarLoader::synthetic(2, 0);
        let bad = PgdConfig {
            steps: 0,
            ..PgdConfig::default()
        };

        assert!(generate_adversarial_dataset(
            &model,
            &loader,
            TargetPolicy::UniformRandom,
            &bad,
            0
        )
        .is_err());
    }

    #[test]
    fn test_drop_last_source_still_covers_all_images() {
        let model = make_classifier(0);
        // 5 images at batch size 2 leave a trailing partial batch
        let loader = CifarLoader::synthetic(5, 1)
            .with_batch_size(2)
            .with_drop_last(true);

        let (adv, _) =
            generate_adversarial_dataset(&model, &loader, TargetPolicy::NextClass, &quick_config(), 0)
                .expect("generation");

        assert_eq!(adv.num_images(), 5);
    }

    #[test]
    fn test_generated_pixels_stay_in_range() {
        let model = make_classifier(3);
        let loader = CifarLoader::synthetic(3, 5);

        let (adv, _) =
            generate_adversarial_dataset(&model, &loader, TargetPolicy::UniformRandom, &quick_config(), 9)
                .expect("generation");

        assert!(adv.images().iter().all(|&p| (0.0..=1.0).contains(&p)));
    }
}
