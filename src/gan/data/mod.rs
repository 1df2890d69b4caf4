//! Training Data
//!
//! Image folder discovery, decoding, and per-epoch batching.

pub mod batches;
pub mod folder;

pub use batches::{BatchLoader, EpochBatches, ImageBatch};
pub use folder::{load_image, ImageFolder};
