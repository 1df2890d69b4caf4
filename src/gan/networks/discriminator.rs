//! Discriminator Network
//!
//! Strided convolutions that halve the image down to a small map, followed
//! by a dense layer producing the probability that the input is real.

use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{
    BatchNorm, BatchNormConfig, LeakyRelu, LeakyReluConfig, Linear, LinearConfig, PaddingConfig2d,
};
use burn::prelude::*;
use burn::tensor::activation::sigmoid;

use super::generator::{BATCH_NORM_EPSILON, BATCH_NORM_MOMENTUM};

/// Discriminator network configuration
#[derive(Config, Debug)]
pub struct DiscriminatorConfig {
    /// Output channels of each downsampling block
    pub filters: Vec<usize>,
    /// Side length of the input images
    #[config(default = "64")]
    pub image_size: usize,
    #[config(default = "3")]
    pub channels: usize,
    #[config(default = "4")]
    pub kernel_size: usize,
    #[config(default = "0.3")]
    pub leaky_slope: f64,
}

/// Strided convolution, batch norm and LeakyReLU; halves the spatial size
#[derive(Module, Debug)]
pub struct DownBlock<B: Backend> {
    conv: Conv2d<B>,
    norm: BatchNorm<B, 2>,
    activation: LeakyRelu,
}

impl<B: Backend> DownBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.norm.forward(x);
        self.activation.forward(x)
    }
}

/// Real/fake image classifier
///
/// The first convolution has no batch norm; the last one maps to a single
/// channel which is flattened into the sigmoid classifier.
#[derive(Module, Debug)]
pub struct Discriminator<B: Backend> {
    stem: Conv2d<B>,
    blocks: Vec<DownBlock<B>>,
    head: Conv2d<B>,
    classifier: Linear<B>,
    activation: LeakyRelu,
}

fn downsample<B: Backend>(
    channels: [usize; 2],
    kernel_size: usize,
    device: &B::Device,
) -> Conv2d<B> {
    let padding = kernel_size.saturating_sub(2) / 2;
    Conv2dConfig::new(channels, [kernel_size, kernel_size])
        .with_stride([2, 2])
        .with_padding(PaddingConfig2d::Explicit(padding, padding))
        .init(device)
}

impl DiscriminatorConfig {
    /// Initialize the discriminator network
    ///
    /// `filters` must not be empty: its first entry sizes the stem convolution.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Discriminator<B> {
        let leaky = || {
            LeakyReluConfig::new()
                .with_negative_slope(self.leaky_slope)
                .init()
        };

        let stem_channels = self.filters.first().copied().unwrap_or(1);
        let stem = downsample([self.channels, stem_channels], self.kernel_size, device);

        let mut in_channels = stem_channels;
        let mut blocks = Vec::with_capacity(self.filters.len().saturating_sub(1));
        for &out_channels in self.filters.iter().skip(1) {
            blocks.push(DownBlock {
                conv: downsample([in_channels, out_channels], self.kernel_size, device),
                norm: BatchNormConfig::new(out_channels)
                    .with_epsilon(BATCH_NORM_EPSILON)
                    .with_momentum(BATCH_NORM_MOMENTUM)
                    .init(device),
                activation: leaky(),
            });
            in_channels = out_channels;
        }

        let head = downsample([in_channels, 1], self.kernel_size, device);
        let spatial = self.head_size().max(1);
        let classifier = LinearConfig::new(spatial * spatial, 1).init(device);

        Discriminator {
            stem,
            blocks,
            head,
            classifier,
            activation: leaky(),
        }
    }

    /// Side length of the single-channel map fed to the classifier
    pub fn head_size(&self) -> usize {
        self.image_size >> (self.filters.len().max(1) + 1)
    }
}

impl<B: Backend> Discriminator<B> {
    /// Forward pass returning the probability that each image is real, `[batch, 1]`
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.stem.forward(images);
        let mut x = self.activation.forward(x);
        for block in &self.blocks {
            x = block.forward(x);
        }

        let x = self.head.forward(x);
        let x: Tensor<B, 2> = x.flatten(1, 3);
        sigmoid(self.classifier.forward(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_head_size() {
        let config = DiscriminatorConfig::new(vec![64, 128, 256]);
        assert_eq!(config.head_size(), 4);

        let config = DiscriminatorConfig::new(vec![4]).with_image_size(16);
        assert_eq!(config.head_size(), 4);
    }

    #[test]
    fn test_discriminator_outputs_probabilities() {
        let device = Default::default();
        let config = DiscriminatorConfig::new(vec![4, 8]).with_image_size(32);
        let discriminator = config.init::<TestBackend>(&device);

        let images = Tensor::<TestBackend, 4>::random(
            [2, 3, 32, 32],
            burn::tensor::Distribution::Uniform(-1.0, 1.0),
            &device,
        );
        let probs = discriminator.forward(images);
        assert_eq!(probs.dims(), [2, 1]);

        let values = probs.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|p| *p > 0.0 && *p < 1.0));
    }
}
