use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "facegan")]
#[command(author = "Facegan Team")]
#[command(version = "0.1.0")]
#[command(about = "DCGAN trainer for CelebA face synthesis", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config directory (default.toml plus FACEGAN_ENV overlay)
    #[arg(short, long, global = true, default_value = "config")]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the GAN and write a sample grid after every epoch
    Train(TrainArgs),
    /// Write a sample grid from a saved generator checkpoint
    Sample {
        /// Generator record (.mpk) written during training
        #[arg(long)]
        checkpoint: PathBuf,
        /// Output PNG path
        #[arg(short, long, default_value = "samples.png")]
        output: PathBuf,
        /// Tiles per side (defaults to output.grid_size)
        #[arg(long)]
        grid: Option<usize>,
    },
    /// Show resolved configuration, network sizes and dataset size
    Inspect,
}

/// Overrides applied on top of the loaded configuration
#[derive(Args, Debug, Default, Clone)]
pub struct TrainArgs {
    /// Image directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Directory for sample grids, checkpoints and history
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    #[arg(short, long)]
    pub epochs: Option<usize>,
    #[arg(long)]
    pub batch_size: Option<usize>,
    #[arg(long)]
    pub learning_rate: Option<f64>,
    /// Stop each epoch after this many batches
    #[arg(long, conflicts_with = "full_epochs")]
    pub max_batches: Option<usize>,
    /// Iterate over the whole dataset every epoch
    #[arg(long)]
    pub full_epochs: bool,
    /// Seed for data shuffling
    #[arg(long)]
    pub seed: Option<u64>,
    /// Skip writing model checkpoints
    #[arg(long)]
    pub no_checkpoints: bool,
}

impl TrainArgs {
    /// Apply command-line overrides to `config`
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(dir) = &self.data_dir {
            config.data.dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        if let Some(epochs) = self.epochs {
            config.training.epochs = epochs;
        }
        if let Some(batch_size) = self.batch_size {
            config.data.batch_size = batch_size;
        }
        if let Some(lr) = self.learning_rate {
            config.training.learning_rate = lr;
        }
        if self.full_epochs {
            config.data.max_batches_per_epoch = None;
        } else if let Some(max) = self.max_batches {
            config.data.max_batches_per_epoch = Some(max);
        }
        if let Some(seed) = self.seed {
            config.data.seed = Some(seed);
        }
        if self.no_checkpoints {
            config.output.checkpoints = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_train_overrides() {
        let cli = Cli::parse_from([
            "facegan",
            "train",
            "--data-dir",
            "/data/celeba",
            "--epochs",
            "2",
            "--full-epochs",
            "--no-checkpoints",
        ]);

        let Commands::Train(args) = cli.command else {
            panic!("expected train command");
        };

        let mut config = AppConfig::default();
        args.apply(&mut config);
        assert_eq!(config.data.dir, PathBuf::from("/data/celeba"));
        assert_eq!(config.training.epochs, 2);
        assert_eq!(config.data.max_batches_per_epoch, None);
        assert!(!config.output.checkpoints);
        assert_eq!(config.data.batch_size, 128);
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let mut config = AppConfig::default();
        TrainArgs::default().apply(&mut config);
        assert_eq!(config.data.max_batches_per_epoch, Some(10));
        assert_eq!(config.training.epochs, 30);
    }

    #[test]
    fn test_max_batches_conflicts_with_full_epochs() {
        let result = Cli::try_parse_from(["facegan", "train", "--max-batches", "3", "--full-epochs"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_sample() {
        let cli = Cli::parse_from([
            "facegan",
            "--config",
            "conf",
            "sample",
            "--checkpoint",
            "out/checkpoints/generator_epoch_0029.mpk",
        ]);
        assert_eq!(cli.config, PathBuf::from("conf"));
        assert!(matches!(cli.command, Commands::Sample { grid: None, .. }));
    }
}
