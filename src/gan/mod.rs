//! Generative Adversarial Network Module
//!
//! DCGAN face synthesis using the Burn framework.
//!
//! # Features
//!
//! - **Data**: Image folders decoded, resized and normalized to `[-1, 1]`
//! - **Networks**: Transposed-convolution generator, convolutional discriminator
//! - **Training**: Alternating Adam updates with noisy labels
//! - **Artifacts**: Per-epoch sample grids, checkpoints and loss history

pub mod data;
pub mod networks;
pub mod sampling;
pub mod training;

// Data exports
pub use data::{BatchLoader, ImageBatch, ImageFolder};

// Network exports
pub use networks::{Discriminator, DiscriminatorConfig, Generator, GeneratorConfig};

// Training exports
pub use training::{
    adam_trainer, Checkpointer, EpochCallback, EpochLogs, GanTrainer, History, StepOutput,
};
