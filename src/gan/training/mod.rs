//! Training Infrastructure
//!
//! Adversarial loss, the training step and epoch loop, callbacks, and
//! checkpointing.

pub mod callbacks;
pub mod checkpointing;
pub mod loss;
pub mod trainer;

pub use callbacks::{
    CheckpointCallback, EpochCallback, EpochContext, HistoryWriter, SampleGrid,
    DISCRIMINATOR_PREFIX, GENERATOR_PREFIX,
};
pub use checkpointing::{epoch_name, load_record, Checkpointer};
pub use loss::{binary_cross_entropy, fake_labels, real_labels, LossMean};
pub use trainer::{adam_trainer, EpochLogs, GanTrainer, History, StepOutput};
