pub mod cli;
pub mod config;
pub mod error;
pub mod gan;

pub use config::AppConfig;
pub use error::{GanError, Result};
pub use gan::{
    adam_trainer, BatchLoader, Discriminator, DiscriminatorConfig, GanTrainer, Generator,
    GeneratorConfig, History, ImageFolder,
};
