//! Generator Network
//!
//! Maps latent noise vectors to images through a stack of strided
//! transposed convolutions (DCGAN layout).

use burn::nn::conv::{ConvTranspose2d, ConvTranspose2dConfig};
use burn::nn::{BatchNorm, BatchNormConfig, LeakyRelu, LeakyReluConfig, Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::Distribution;

/// Spatial side length the latent projection is reshaped to
pub const SEED_SIZE: usize = 4;

/// Batch norm epsilon, matching the common Keras default
pub const BATCH_NORM_EPSILON: f64 = 1e-3;

/// Batch norm running-statistics momentum (weight of the newest batch)
pub const BATCH_NORM_MOMENTUM: f64 = 0.01;

/// Generator network configuration
#[derive(Config, Debug)]
pub struct GeneratorConfig {
    /// Output channels of each upsampling block
    pub filters: Vec<usize>,
    /// Length of the latent noise vector
    #[config(default = "100")]
    pub latent_dim: usize,
    /// Channels of the generated image
    #[config(default = "3")]
    pub channels: usize,
    #[config(default = "4")]
    pub kernel_size: usize,
    #[config(default = "0.3")]
    pub leaky_slope: f64,
}

/// Transposed convolution, batch norm and LeakyReLU; doubles the spatial size
#[derive(Module, Debug)]
pub struct UpBlock<B: Backend> {
    conv: ConvTranspose2d<B>,
    norm: BatchNorm<B, 2>,
    activation: LeakyRelu,
}

impl<B: Backend> UpBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.norm.forward(x);
        self.activation.forward(x)
    }
}

/// Image generator
///
/// `[batch, latent_dim]` noise in, `[batch, channels, S, S]` images in
/// `[-1, 1]` out, where `S = 4 * 2^(filters + 1)`.
#[derive(Module, Debug)]
pub struct Generator<B: Backend> {
    project: Linear<B>,
    blocks: Vec<UpBlock<B>>,
    output: ConvTranspose2d<B>,
}

/// Padding that makes a stride-2 transposed convolution exactly double its input
fn same_padding(kernel_size: usize) -> usize {
    kernel_size.saturating_sub(2) / 2
}

fn upsample<B: Backend>(
    channels: [usize; 2],
    kernel_size: usize,
    device: &B::Device,
) -> ConvTranspose2d<B> {
    let padding = same_padding(kernel_size);
    ConvTranspose2dConfig::new(channels, [kernel_size, kernel_size])
        .with_stride([2, 2])
        .with_padding([padding, padding])
        .init(device)
}

impl GeneratorConfig {
    /// Initialize the generator network
    pub fn init<B: Backend>(&self, device: &B::Device) -> Generator<B> {
        let project =
            LinearConfig::new(self.latent_dim, SEED_SIZE * SEED_SIZE * self.latent_dim).init(device);

        let mut in_channels = self.latent_dim;
        let mut blocks = Vec::with_capacity(self.filters.len());
        for &out_channels in &self.filters {
            blocks.push(UpBlock {
                conv: upsample([in_channels, out_channels], self.kernel_size, device),
                norm: BatchNormConfig::new(out_channels)
                    .with_epsilon(BATCH_NORM_EPSILON)
                    .with_momentum(BATCH_NORM_MOMENTUM)
                    .init(device),
                activation: LeakyReluConfig::new()
                    .with_negative_slope(self.leaky_slope)
                    .init(),
            });
            in_channels = out_channels;
        }

        let output = upsample([in_channels, self.channels], self.kernel_size, device);

        Generator {
            project,
            blocks,
            output,
        }
    }

    /// Side length of the generated images
    pub fn output_size(&self) -> usize {
        SEED_SIZE << (self.filters.len() + 1)
    }
}

impl<B: Backend> Generator<B> {
    /// Forward pass from latent vectors to images
    pub fn forward(&self, latent: Tensor<B, 2>) -> Tensor<B, 4> {
        let [batch, latent_dim] = latent.dims();

        let x = self.project.forward(latent);
        let mut x = x.reshape([batch, latent_dim, SEED_SIZE, SEED_SIZE]);
        for block in &self.blocks {
            x = block.forward(x);
        }

        self.output.forward(x).tanh()
    }

    /// Length of the latent vectors this generator consumes
    pub fn latent_dim(&self) -> usize {
        self.project.weight.val().dims()[0]
    }

    /// Draw standard-normal latent vectors
    pub fn noise(&self, count: usize, device: &B::Device) -> Tensor<B, 2> {
        Tensor::random(
            [count, self.latent_dim()],
            Distribution::Normal(0.0, 1.0),
            device,
        )
    }

    /// Generate `count` images from fresh noise
    pub fn sample(&self, count: usize, device: &B::Device) -> Tensor<B, 4> {
        self.forward(self.noise(count, device))
    }
}
