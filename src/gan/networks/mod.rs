//! Neural Network Architectures
//!
//! Generator and discriminator for the DCGAN.

pub mod discriminator;
pub mod generator;

pub use discriminator::{Discriminator, DiscriminatorConfig};
pub use generator::{Generator, GeneratorConfig};

use crate::config::AppConfig;

impl From<&AppConfig> for GeneratorConfig {
    fn from(config: &AppConfig) -> Self {
        GeneratorConfig::new(config.model.generator_filters.clone())
            .with_latent_dim(config.model.latent_dim)
            .with_channels(config.data.channels)
            .with_kernel_size(config.model.kernel_size)
            .with_leaky_slope(config.model.leaky_slope)
    }
}

impl From<&AppConfig> for DiscriminatorConfig {
    fn from(config: &AppConfig) -> Self {
        DiscriminatorConfig::new(config.model.discriminator_filters.clone())
            .with_image_size(config.data.image_size)
            .with_channels(config.data.channels)
            .with_kernel_size(config.model.kernel_size)
            .with_leaky_slope(config.model.leaky_slope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::module::Module;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_configs_follow_app_config() {
        let app = AppConfig::default();
        let generator = GeneratorConfig::from(&app);
        let discriminator = DiscriminatorConfig::from(&app);

        assert_eq!(generator.output_size(), app.data.image_size);
        assert_eq!(generator.latent_dim, 100);
        assert_eq!(discriminator.head_size(), 4);
    }

    #[test]
    fn test_small_networks_compose() {
        let device = Default::default();
        let mut app = AppConfig::default();
        app.model.latent_dim = 4;
        app.model.generator_filters = vec![4];
        app.model.discriminator_filters = vec![4];
        app.data.image_size = 16;

        let generator = GeneratorConfig::from(&app).init::<TestBackend>(&device);
        let discriminator = DiscriminatorConfig::from(&app).init::<TestBackend>(&device);
        assert!(generator.num_params() > 0);
        assert!(discriminator.num_params() > 0);

        let probs = discriminator.forward(generator.sample(2, &device));
        assert_eq!(probs.dims(), [2, 1]);
    }
}
