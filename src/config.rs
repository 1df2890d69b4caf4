use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory scanned recursively for training images
    pub dir: PathBuf,
    /// Side length images are resized to
    pub image_size: usize,
    /// Color channels (RGB)
    pub channels: usize,
    /// Images per training step
    pub batch_size: usize,
    /// Stop each epoch after this many batches (None = full pass)
    pub max_batches_per_epoch: Option<usize>,
    /// Seed for file shuffling (None = entropy)
    pub seed: Option<u64>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/img_align_celeba"),
            image_size: 64,
            channels: 3,
            batch_size: 128,
            max_batches_per_epoch: Some(10),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Length of the latent noise vector
    pub latent_dim: usize,
    /// Output channels of each upsampling block, before the final RGB layer
    pub generator_filters: Vec<usize>,
    /// Output channels of each downsampling block, before the final 1-channel layer
    pub discriminator_filters: Vec<usize>,
    pub kernel_size: usize,
    /// Negative slope of every LeakyReLU
    pub leaky_slope: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            latent_dim: 100,
            generator_filters: vec![512, 256, 128],
            discriminator_filters: vec![64, 128, 256],
            kernel_size: 4,
            leaky_slope: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    /// Adam learning rate, shared by both networks
    pub learning_rate: f64,
    /// Adam first-moment decay
    pub beta_1: f32,
    /// Real labels are drawn from 1 + noise * U(-1, 1)
    pub real_label_noise: f64,
    /// Fake labels are drawn from 0 + noise * U(0, 1)
    pub fake_label_noise: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 30,
            learning_rate: 5e-4,
            beta_1: 0.5,
            real_label_noise: 0.25,
            fake_label_noise: 0.25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving sample grids, checkpoints and history
    pub dir: PathBuf,
    /// Tiles per side of the sample grid
    pub grid_size: usize,
    /// Latent vectors drawn per snapshot
    pub num_samples: usize,
    /// Save model records at the end of each epoch
    pub checkpoints: bool,
    /// Checkpoint pairs retained on disk
    pub keep_checkpoints: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            grid_size: 6,
            num_samples: 64,
            checkpoints: true,
            keep_checkpoints: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Also write daily-rotated log files here
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("FACEGAN_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (FACEGAN_TRAINING__EPOCHS, etc.)
            .add_source(
                Environment::with_prefix("FACEGAN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Image tensor shape without the batch dimension: [channels, height, width]
    pub fn image_shape(&self) -> [usize; 3] {
        [self.data.channels, self.data.image_size, self.data.image_size]
    }

    /// Side length the generator produces: 4 doubled once per transposed convolution
    pub fn generated_size(&self) -> usize {
        4 << (self.model.generator_filters.len() + 1)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        // Data
        if self.data.batch_size == 0 {
            errors.push("batch_size must be positive".to_string());
        }
        if self.data.channels != 1 && self.data.channels != 3 {
            errors.push(format!("channels must be 1 or 3, got {}", self.data.channels));
        }
        if self.data.max_batches_per_epoch == Some(0) {
            errors.push("max_batches_per_epoch must be positive when set".to_string());
        }

        // Model
        if self.model.latent_dim == 0 {
            errors.push("latent_dim must be positive".to_string());
        }
        if self.model.kernel_size < 2 || self.model.kernel_size % 2 != 0 {
            errors.push(format!(
                "kernel_size must be even and at least 2, got {}",
                self.model.kernel_size
            ));
        }
        if self.model.generator_filters.iter().any(|&f| f == 0)
            || self.model.discriminator_filters.iter().any(|&f| f == 0)
        {
            errors.push("filter counts must be positive".to_string());
        }
        if self.model.discriminator_filters.is_empty() {
            errors.push("discriminator_filters must not be empty".to_string());
        }
        let generated = self.generated_size();
        if generated != self.data.image_size {
            errors.push(format!(
                "image_size {} does not match generator output {} ({} upsampling blocks)",
                self.data.image_size,
                generated,
                self.model.generator_filters.len() + 1
            ));
        }
        let halvings = self.model.discriminator_filters.len() + 1;
        if self.data.image_size >> halvings == 0 {
            errors.push(format!(
                "image_size {} is too small for {} discriminator downsampling blocks",
                self.data.image_size, halvings
            ));
        }
        if self.model.leaky_slope < 0.0 {
            errors.push("leaky_slope must be non-negative".to_string());
        }

        // Training
        if self.training.epochs == 0 {
            errors.push("epochs must be positive".to_string());
        }
        if self.training.learning_rate <= 0.0 {
            errors.push("learning_rate must be positive".to_string());
        }
        if self.training.beta_1 <= 0.0 || self.training.beta_1 >= 1.0 {
            errors.push("beta_1 must be between 0 and 1".to_string());
        }
        for (name, value) in [
            ("real_label_noise", self.training.real_label_noise),
            ("fake_label_noise", self.training.fake_label_noise),
        ] {
            if !(0.0..1.0).contains(&value) {
                errors.push(format!("{name} must be in [0, 1), got {value}"));
            }
        }

        // Output
        if self.output.grid_size == 0 {
            errors.push("grid_size must be positive".to_string());
        }
        if self.output.grid_size * self.output.grid_size > self.output.num_samples {
            errors.push(format!(
                "num_samples {} cannot fill a {}x{} grid",
                self.output.num_samples, self.output.grid_size, self.output.grid_size
            ));
        }
        if self.output.checkpoints && self.output.keep_checkpoints == 0 {
            errors.push("keep_checkpoints must be positive when checkpoints are enabled".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
