//! Training Loop
//!
//! Alternating discriminator/generator updates and the epoch loop that
//! drives them.

use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::ElementConversion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{AppConfig, TrainingConfig};
use crate::error::{GanError, Result};
use crate::gan::data::BatchLoader;
use crate::gan::networks::{Discriminator, DiscriminatorConfig, Generator, GeneratorConfig};

use super::callbacks::{EpochCallback, EpochContext};
use super::loss::{binary_cross_entropy, fake_labels, real_labels, LossMean};

/// Adam epsilon, matching the common Keras default
pub const ADAM_EPSILON: f32 = 1e-7;

/// Losses reported after one training step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepOutput {
    /// Discriminator loss on this batch (real + fake terms)
    pub d_loss: f32,
    /// Generator loss on this batch
    pub g_loss: f32,
    /// Running mean of `d_loss` over the current epoch
    pub d_loss_mean: f32,
    /// Running mean of `g_loss` over the current epoch
    pub g_loss_mean: f32,
}

/// Metrics recorded at the end of an epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochLogs {
    /// 0-based epoch index
    pub epoch: usize,
    pub d_loss: f32,
    pub g_loss: f32,
    /// Training steps run this epoch
    pub batches: usize,
    pub finished_at: DateTime<Utc>,
}

/// Per-epoch record of a `fit` run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct History {
    pub started_at: DateTime<Utc>,
    pub epochs: Vec<EpochLogs>,
}

impl History {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            epochs: Vec::new(),
        }
    }

    pub fn last(&self) -> Option<&EpochLogs> {
        self.epochs.last()
    }

    pub fn d_losses(&self) -> Vec<f32> {
        self.epochs.iter().map(|e| e.d_loss).collect()
    }

    pub fn g_losses(&self) -> Vec<f32> {
        self.epochs.iter().map(|e| e.g_loss).collect()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

/// Generator/discriminator pair with one optimizer each
pub struct GanTrainer<B: AutodiffBackend, OG, OD> {
    generator: Generator<B>,
    discriminator: Discriminator<B>,
    g_optim: OG,
    d_optim: OD,
    config: TrainingConfig,
    device: B::Device,
    d_loss: LossMean,
    g_loss: LossMean,
    steps: usize,
}

impl<B, OG, OD> GanTrainer<B, OG, OD>
where
    B: AutodiffBackend,
    OG: Optimizer<Generator<B>, B>,
    OD: Optimizer<Discriminator<B>, B>,
{
    pub fn new(
        generator: Generator<B>,
        discriminator: Discriminator<B>,
        g_optim: OG,
        d_optim: OD,
        config: TrainingConfig,
        device: B::Device,
    ) -> Self {
        Self {
            generator,
            discriminator,
            g_optim,
            d_optim,
            config,
            device,
            d_loss: LossMean::new(),
            g_loss: LossMean::new(),
            steps: 0,
        }
    }

    /// One adversarial update on a batch of real images
    ///
    /// The discriminator is updated first against detached fakes and noisy
    /// labels, then the generator is updated through the refreshed
    /// discriminator with fresh noise and all-real targets.
    pub fn train_step(&mut self, real: Tensor<B, 4>) -> StepOutput {
        let [batch, _, _, _] = real.dims();
        let lr = self.config.learning_rate;

        // Discriminator
        let noise = self.generator.noise(batch, &self.device);
        let fake = self.generator.forward(noise).detach();
        let real_targets = real_labels::<B>(batch, self.config.real_label_noise, &self.device);
        let fake_targets = fake_labels::<B>(batch, self.config.fake_label_noise, &self.device);

        let d_loss_real = binary_cross_entropy(self.discriminator.forward(real), real_targets);
        let d_loss_fake = binary_cross_entropy(self.discriminator.forward(fake), fake_targets);
        let d_loss = d_loss_real + d_loss_fake;

        let grads = d_loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.discriminator);
        self.discriminator = self.d_optim.step(lr, self.discriminator.clone(), grads);

        // Generator
        let noise = self.generator.noise(batch, &self.device);
        let fake_pred = self.discriminator.forward(self.generator.forward(noise));
        let g_loss = binary_cross_entropy(fake_pred, Tensor::ones([batch, 1], &self.device));

        let grads = g_loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.generator);
        self.generator = self.g_optim.step(lr, self.generator.clone(), grads);

        let d_loss = d_loss.into_scalar().elem::<f32>();
        let g_loss = g_loss.into_scalar().elem::<f32>();
        self.d_loss.update(d_loss);
        self.g_loss.update(g_loss);
        self.steps += 1;

        StepOutput {
            d_loss,
            g_loss,
            d_loss_mean: self.d_loss.result(),
            g_loss_mean: self.g_loss.result(),
        }
    }

    /// Run `epochs` passes over `loader`, invoking callbacks after each one
    pub fn fit(
        &mut self,
        loader: &mut BatchLoader,
        epochs: usize,
        callbacks: &mut [Box<dyn EpochCallback<B>>],
    ) -> Result<History> {
        let mut history = History::new();
        let planned = loader.batches_per_epoch();

        info!(
            "Training for {} epochs, {} batches of {} per epoch",
            epochs,
            planned,
            loader.batch_size()
        );

        for epoch in 0..epochs {
            self.reset_metrics();

            let mut batches = 0;
            for batch in loader.epoch() {
                let real = batch?.to_tensor::<B>(&self.device);
                let output = self.train_step(real);
                batches += 1;

                debug!(
                    "Epoch {} batch {}/{}: d_loss={:.4}, g_loss={:.4}",
                    epoch + 1,
                    batches,
                    planned,
                    output.d_loss,
                    output.g_loss
                );
            }

            if batches == 0 {
                return Err(GanError::EmptyDataset(
                    loader.folder().root().display().to_string(),
                ));
            }

            let logs = EpochLogs {
                epoch,
                d_loss: self.d_loss.result(),
                g_loss: self.g_loss.result(),
                batches,
                finished_at: Utc::now(),
            };

            info!(
                "Epoch {}/{}: d_loss={:.4}, g_loss={:.4} ({} batches)",
                epoch + 1,
                epochs,
                logs.d_loss,
                logs.g_loss,
                logs.batches
            );

            history.epochs.push(logs);

            let ctx = EpochContext {
                epoch,
                logs: &history.epochs[epoch],
                history: &history,
                generator: &self.generator,
                discriminator: &self.discriminator,
                device: &self.device,
            };
            for callback in callbacks.iter_mut() {
                callback.on_epoch_end(&ctx)?;
            }
        }

        Ok(history)
    }

    /// Clear the running loss means
    pub fn reset_metrics(&mut self) {
        self.d_loss.reset();
        self.g_loss.reset();
    }

    /// Running means `(d_loss, g_loss)` for the current epoch
    pub fn metrics(&self) -> (f32, f32) {
        (self.d_loss.result(), self.g_loss.result())
    }

    /// Total training steps taken
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn generator(&self) -> &Generator<B> {
        &self.generator
    }

    pub fn discriminator(&self) -> &Discriminator<B> {
        &self.discriminator
    }

    /// Generator without autodiff, for sampling and export
    pub fn inference_generator(&self) -> Generator<B::InnerBackend> {
        self.generator.valid()
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Consume the trainer, returning both networks
    pub fn into_networks(self) -> (Generator<B>, Discriminator<B>) {
        (self.generator, self.discriminator)
    }
}

/// Build both networks from `config` and pair them with Adam optimizers
pub fn adam_trainer<B: AutodiffBackend>(
    config: &AppConfig,
    device: &B::Device,
) -> GanTrainer<B, impl Optimizer<Generator<B>, B>, impl Optimizer<Discriminator<B>, B>> {
    let generator = GeneratorConfig::from(config).init::<B>(device);
    let discriminator = DiscriminatorConfig::from(config).init::<B>(device);

    let adam = AdamConfig::new()
        .with_beta_1(config.training.beta_1)
        .with_epsilon(ADAM_EPSILON);
    let g_optim = adam.init::<B, Generator<B>>();
    let d_optim = adam.init::<B, Discriminator<B>>();

    info!(
        "Initialized generator ({} params) and discriminator ({} params)",
        generator.num_params(),
        discriminator.num_params()
    );

    GanTrainer::new(
        generator,
        discriminator,
        g_optim,
        d_optim,
        config.training.clone(),
        device.clone(),
    )
}
