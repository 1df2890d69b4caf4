//! Model Checkpointing
//!
//! Save and load network weights for persistence.

use std::fs;
use std::path::{Path, PathBuf};

use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use tracing::{info, warn};

use crate::error::{GanError, Result};

/// File extension written by the named MessagePack recorder
pub const CHECKPOINT_EXTENSION: &str = "mpk";

/// Checkpointer for saving and loading models
pub struct Checkpointer {
    /// Directory for checkpoints
    checkpoint_dir: PathBuf,
    /// Maximum checkpoints to keep per prefix
    max_checkpoints: usize,
}

impl Checkpointer {
    /// Create a new checkpointer, creating the directory if needed
    pub fn new<P: AsRef<Path>>(checkpoint_dir: P, max_checkpoints: usize) -> Result<Self> {
        let checkpoint_dir = checkpoint_dir.as_ref().to_path_buf();
        fs::create_dir_all(&checkpoint_dir)?;

        Ok(Self {
            checkpoint_dir,
            max_checkpoints,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.checkpoint_dir
    }

    /// Get checkpoint path for a given name
    pub fn checkpoint_path(&self, name: &str) -> PathBuf {
        self.checkpoint_dir
            .join(format!("{}.{}", name, CHECKPOINT_EXTENSION))
    }

    /// Save a model, then drop the oldest checkpoints sharing its prefix
    pub fn save<B, M>(&self, model: &M, name: &str) -> Result<PathBuf>
    where
        B: Backend,
        M: Module<B>,
    {
        let path = self.checkpoint_path(name);

        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        model.clone().save_file(&path, &recorder)?;

        info!("Saved checkpoint to {:?}", path);

        if let Some(prefix) = checkpoint_prefix(name) {
            self.cleanup_old_checkpoints(prefix);
        }

        Ok(path)
    }

    /// Load weights saved under `name` into a freshly initialized `model`
    pub fn load<B, M>(&self, name: &str, model: M, device: &B::Device) -> Result<M>
    where
        B: Backend,
        M: Module<B>,
    {
        load_record(&self.checkpoint_path(name), model, device)
    }

    /// List available checkpoints whose name starts with `prefix`, oldest first
    pub fn list_checkpoints(&self, prefix: &str) -> Vec<String> {
        let mut checkpoints = Vec::new();
        let suffix = format!(".{}", CHECKPOINT_EXTENSION);

        if let Ok(entries) = fs::read_dir(&self.checkpoint_dir) {
            for entry in entries.flatten() {
                if let Some(name) = entry.file_name().to_str() {
                    if name.starts_with(prefix) && name.ends_with(&suffix) {
                        checkpoints.push(name.trim_end_matches(&suffix).to_string());
                    }
                }
            }
        }

        checkpoints.sort();
        checkpoints
    }

    /// Get latest checkpoint name for `prefix`
    pub fn latest_checkpoint(&self, prefix: &str) -> Option<String> {
        self.list_checkpoints(prefix).into_iter().last()
    }

    /// Cleanup old checkpoints keeping only max_checkpoints
    fn cleanup_old_checkpoints(&self, prefix: &str) {
        let checkpoints = self.list_checkpoints(prefix);

        if checkpoints.len() <= self.max_checkpoints {
            return;
        }

        let to_remove = checkpoints.len() - self.max_checkpoints;
        for name in checkpoints.into_iter().take(to_remove) {
            let path = self.checkpoint_path(&name);
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to remove old checkpoint {:?}: {}", path, e);
            } else {
                info!("Removed old checkpoint: {}", name);
            }
        }
    }

    /// Check if a checkpoint exists
    pub fn exists(&self, name: &str) -> bool {
        self.checkpoint_path(name).exists()
    }
}

/// Load a record file written by [`Checkpointer::save`] into `model`
pub fn load_record<B, M>(path: &Path, model: M, device: &B::Device) -> Result<M>
where
    B: Backend,
    M: Module<B>,
{
    if !path.exists() {
        return Err(GanError::CheckpointNotFound(path.display().to_string()));
    }

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    let model = model.load_file(path.to_path_buf(), &recorder, device)?;
    info!("Loaded checkpoint from {:?}", path);

    Ok(model)
}

/// Generate a checkpoint name with epoch number
pub fn epoch_name(prefix: &str, epoch: usize) -> String {
    format!("{}_epoch_{:04}", prefix, epoch)
}

/// Prefix of a name produced by [`epoch_name`]
fn checkpoint_prefix(name: &str) -> Option<&str> {
    name.rsplit_once("_epoch_").map(|(prefix, _)| prefix)
}
