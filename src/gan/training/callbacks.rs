//! Epoch Callbacks
//!
//! Hooks run after every epoch: sample grids, checkpoints, history export.

use std::fs;
use std::path::PathBuf;

use burn::module::AutodiffModule;
use burn::tensor::backend::AutodiffBackend;
use tracing::info;

use crate::error::Result;
use crate::gan::networks::{Discriminator, Generator};
use crate::gan::sampling::{epoch_image_name, save_grid, tensor_grid};

use super::checkpointing::{epoch_name, Checkpointer};
use super::trainer::{EpochLogs, History};

/// Checkpoint prefix for generator records
pub const GENERATOR_PREFIX: &str = "generator";

/// Checkpoint prefix for discriminator records
pub const DISCRIMINATOR_PREFIX: &str = "discriminator";

/// State handed to callbacks at the end of an epoch
pub struct EpochContext<'a, B: AutodiffBackend> {
    pub epoch: usize,
    pub logs: &'a EpochLogs,
    /// History including the epoch that just finished
    pub history: &'a History,
    pub generator: &'a Generator<B>,
    pub discriminator: &'a Discriminator<B>,
    pub device: &'a B::Device,
}

/// Hook invoked by `GanTrainer::fit` after each epoch
pub trait EpochCallback<B: AutodiffBackend> {
    fn on_epoch_end(&mut self, ctx: &EpochContext<'_, B>) -> Result<()>;
}

/// Writes `gen_images_epoch_{epoch}.png` from fresh generator samples
pub struct SampleGrid {
    dir: PathBuf,
    grid_size: usize,
    num_samples: usize,
}

impl SampleGrid {
    pub fn new(dir: impl Into<PathBuf>, grid_size: usize, num_samples: usize) -> Self {
        Self {
            dir: dir.into(),
            grid_size,
            num_samples: num_samples.max(grid_size * grid_size),
        }
    }

    pub fn path_for(&self, epoch: usize) -> PathBuf {
        self.dir.join(epoch_image_name(epoch))
    }
}

impl<B: AutodiffBackend> EpochCallback<B> for SampleGrid {
    fn on_epoch_end(&mut self, ctx: &EpochContext<'_, B>) -> Result<()> {
        // Inference mode: batch norm uses running statistics, no graph is recorded
        let generator = ctx.generator.valid();
        let images = generator.sample(self.num_samples, ctx.device);
        let grid = tensor_grid(images, self.grid_size)?;

        let path = self.path_for(ctx.epoch);
        save_grid(&path, &grid)?;
        info!("Saved sample grid to {:?}", path);

        Ok(())
    }
}

/// Saves both networks after every epoch
pub struct CheckpointCallback {
    checkpointer: Checkpointer,
}

impl CheckpointCallback {
    pub fn new(checkpointer: Checkpointer) -> Self {
        Self { checkpointer }
    }
}

impl<B: AutodiffBackend> EpochCallback<B> for CheckpointCallback {
    fn on_epoch_end(&mut self, ctx: &EpochContext<'_, B>) -> Result<()> {
        self.checkpointer
            .save::<B, _>(ctx.generator, &epoch_name(GENERATOR_PREFIX, ctx.epoch))?;
        self.checkpointer
            .save::<B, _>(ctx.discriminator, &epoch_name(DISCRIMINATOR_PREFIX, ctx.epoch))?;
        Ok(())
    }
}

/// Rewrites the history JSON after every epoch
pub struct HistoryWriter {
    path: PathBuf,
}

impl HistoryWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl<B: AutodiffBackend> EpochCallback<B> for HistoryWriter {
    fn on_epoch_end(&mut self, ctx: &EpochContext<'_, B>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(ctx.history)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}
