//! Full experiment at synthetic scale: train a classifier, generate
//! perturbed relabeled variants of its training set, persist them, and
//! retrain on each.
//!
//! Run with `cargo run --example replicate`.

use adversario::prelude::*;

fn main() -> Result<()> {
    let train_config = TrainConfig {
        epochs: 5,
        lr: 0.05,
        momentum: 0.9,
        seed: 0,
    };
    let pgd_config = PgdConfig {
        steps: 20,
        ..PgdConfig::default()
    };

    println!("Building synthetic dataset (128 images)...");
    let loader = CifarLoader::synthetic(128, 0).with_batch_size(32);

    println!("Training clean classifier...");
    let mut model = make_classifier(0);
    let losses = fit(&mut model, &loader, &train_config);
    println!(
        "  loss {:.4} -> {:.4}, train accuracy {:.3}",
        losses.first().copied().unwrap_or(f32::NAN),
        losses.last().copied().unwrap_or(f32::NAN),
        evaluate(&model, &loader)
    );

    let dir = std::env::temp_dir();
    for policy in [TargetPolicy::UniformRandom, TargetPolicy::NextClass] {
        println!("Generating '{policy}' variant...");
        let (adversarial, fooling_rate) =
            generate_adversarial_dataset(&model, &loader, policy, &pgd_config, 1)?;
        println!("  fooling rate {fooling_rate:.3}");

        let path = dir.join(format!("adversario_{policy}.safetensors"));
        adversarial.save(&path)?;
        let restored = CifarLoader::load(&path)?;
        println!("  saved and reloaded {} images from {}", restored.num_images(), path.display());

        println!("Retraining on '{policy}' variant...");
        let mut retrained = make_classifier(1);
        let losses = fit(&mut retrained, &restored, &train_config);
        println!(
            "  loss {:.4} -> {:.4}, accuracy on variant {:.3}",
            losses.first().copied().unwrap_or(f32::NAN),
            losses.last().copied().unwrap_or(f32::NAN),
            evaluate(&retrained, &restored)
        );
    }

    Ok(())
}
