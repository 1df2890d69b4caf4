use thiserror::Error;

/// Main error type for the GAN trainer
#[derive(Error, Debug)]
pub enum GanError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),

    // Dataset errors
    #[error("No images found in {0}")]
    EmptyDataset(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    // Model persistence errors
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] burn::record::RecorderError),

    #[error("Checkpoint not found: {0}")]
    CheckpointNotFound(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for GanError
pub type Result<T> = std::result::Result<T, GanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_lists_every_problem() {
        let err = GanError::InvalidConfig(vec![
            "epochs must be positive".to_string(),
            "batch_size must be positive".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Invalid configuration: epochs must be positive; batch_size must be positive"
        );
    }

    #[test]
    fn test_malformed_config_file_surfaces_as_config_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("default.toml"), "[training\nepochs = ").unwrap();

        let err: GanError = crate::config::AppConfig::load_from(dir.path())
            .unwrap_err()
            .into();
        assert!(matches!(err, GanError::Config(_)));
        assert!(err.to_string().starts_with("Configuration error:"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: GanError = io.into();
        assert!(matches!(err, GanError::Io(_)));
    }
}
