//! Classifier construction, training, and evaluation.
//!
//! The classifier is a small fully connected network; its architecture
//! is incidental to the experiment, which only needs a model whose
//! gradients the attack can follow.

use crate::autograd::{clear_graph, no_grad};
use crate::data::{CifarLoader, IMAGE_NUMEL, NUM_CLASSES};
use crate::metrics::{accuracy, argmax_rows};
use crate::nn::{CrossEntropyLoss, Linear, Module, ReLU, Sequential, SGD};

/// Training hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainConfig {
    /// Number of passes over the dataset
    pub epochs: usize,
    /// Learning rate
    pub lr: f32,
    /// SGD momentum
    pub momentum: f32,
    /// Seed for batch shuffling
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            lr: 0.01,
            momentum: 0.9,
            seed: 0,
        }
    }
}

/// Build the experiment's classifier: a two-layer MLP over flattened
/// images.
#[must_use]
pub fn make_classifier(seed: u64) -> Sequential {
    Sequential::new()
        .add(Linear::with_seed(IMAGE_NUMEL, 128, Some(seed)))
        .add(ReLU::new())
        .add(Linear::with_seed(128, NUM_CLASSES, Some(seed.wrapping_add(1))))
}

/// Train the model in place, returning the mean loss per epoch.
pub fn fit(model: &mut Sequential, loader: &CifarLoader, config: &TrainConfig) -> Vec<f32> {
    let criterion = CrossEntropyLoss::new();
    let mut optimizer = SGD::with_momentum(config.lr, config.momentum);
    let mut epoch_losses = Vec::with_capacity(config.epochs);
    for epoch in 0..config.epochs {
        // Fresh shuffle order each epoch, still fully seeded.
        let loader = loader.clone().with_seed(config.seed.wrapping_add(epoch as u64));
        let mut total_loss = 0.0;
        let mut num_batches = 0;

        for (images, labels) in loader.batches() {
            // Dropping the graph also drops last batch's accumulated grads.
            clear_graph();

            let logits = model.forward(&images);
            let loss = criterion.forward(&logits, &labels);
            loss.backward();
            total_loss += loss.item();
            num_batches += 1;

            let mut params = model.parameters_mut();
            optimizer.step_with_params(&mut params);
        }

        epoch_losses.push(total_loss / num_batches.max(1) as f32);
    }

    clear_graph();
    epoch_losses
}

/// Accuracy of the model over the whole dataset, without recording to
/// the tape.
#[must_use]
pub fn evaluate(model: &dyn Module, loader: &CifarLoader) -> f32 {
    no_grad(|| {
        let mut predictions = Vec::with_capacity(loader.num_images());
        let mut labels = Vec::with_capacity(loader.num_images());

        for (images, batch_labels) in loader.clone().with_shuffle(false).batches() {
            predictions.extend(argmax_rows(&model.forward(&images)));
            labels.extend(batch_labels.data().iter().map(|&l| l as usize));
        }

        accuracy(&predictions, &labels)
    })
}
