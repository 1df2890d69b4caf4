//! Epoch Batching
//!
//! Shuffles the image folder every epoch and yields full batches of decoded
//! images. Incomplete trailing batches are dropped.

use burn::prelude::*;
use burn::tensor::TensorData;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, warn};

use crate::config::DataConfig;
use crate::error::{GanError, Result};

use super::folder::ImageFolder;

/// A batch of decoded images in CHW layout, still on the host
#[derive(Debug, Clone)]
pub struct ImageBatch {
    /// Concatenated CHW buffers, `len * C * H * W` values
    pub values: Vec<f32>,
    /// Number of images in the batch
    pub len: usize,
    /// Per-image shape `[channels, height, width]`
    pub shape: [usize; 3],
}

impl ImageBatch {
    /// Stack a list of CHW buffers sharing one shape
    pub fn stack(images: Vec<Vec<f32>>, shape: [usize; 3]) -> Result<Self> {
        let per_image = shape.iter().product::<usize>();
        let len = images.len();
        let mut values = Vec::with_capacity(len * per_image);
        for image in images {
            if image.len() != per_image {
                return Err(GanError::ShapeMismatch {
                    expected: vec![per_image],
                    actual: vec![image.len()],
                });
            }
            values.extend(image);
        }
        Ok(Self { values, len, shape })
    }

    /// Upload to `device` as `[batch, channels, height, width]`
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 4> {
        let [c, h, w] = self.shape;
        let data = TensorData::new(self.values.clone(), [self.len, c, h, w]);
        Tensor::from_data(data, device)
    }
}

/// Shuffling batch source over an [`ImageFolder`]
pub struct BatchLoader {
    folder: ImageFolder,
    batch_size: usize,
    image_size: usize,
    channels: usize,
    max_batches: Option<usize>,
    rng: StdRng,
}

impl BatchLoader {
    pub fn new(folder: ImageFolder, config: &DataConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            folder,
            batch_size: config.batch_size,
            image_size: config.image_size,
            channels: config.channels,
            max_batches: config.max_batches_per_epoch,
            rng,
        }
    }

    pub fn folder(&self) -> &ImageFolder {
        &self.folder
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Full batches one pass over the folder can yield, after the cap
    pub fn batches_per_epoch(&self) -> usize {
        let full = self.folder.len() / self.batch_size.max(1);
        match self.max_batches {
            Some(cap) => full.min(cap),
            None => full,
        }
    }

    /// Start a new epoch with a fresh file order
    pub fn epoch(&mut self) -> EpochBatches<'_> {
        let mut order: Vec<usize> = (0..self.folder.len()).collect();
        order.shuffle(&mut self.rng);

        EpochBatches {
            loader: self,
            order,
            cursor: 0,
            yielded: 0,
            skipped: 0,
        }
    }
}

/// Iterator over one epoch's batches
pub struct EpochBatches<'a> {
    loader: &'a BatchLoader,
    order: Vec<usize>,
    cursor: usize,
    yielded: usize,
    skipped: usize,
}

impl EpochBatches<'_> {
    /// Files that failed to decode so far this epoch
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for EpochBatches<'_> {
    type Item = Result<ImageBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        let loader = self.loader;
        if loader.batch_size == 0 {
            return None;
        }
        if let Some(cap) = loader.max_batches {
            if self.yielded >= cap {
                return None;
            }
        }

        let mut images = Vec::with_capacity(loader.batch_size);
        while images.len() < loader.batch_size {
            let index = *self.order.get(self.cursor)?;
            self.cursor += 1;

            match loader
                .folder
                .load(index, loader.image_size, loader.channels)
            {
                Ok(image) => images.push(image),
                Err(e) => {
                    self.skipped += 1;
                    warn!(
                        "Skipping undecodable image {:?}: {}",
                        loader.folder.paths()[index],
                        e
                    );
                }
            }
        }

        self.yielded += 1;
        debug!("Loaded batch {} ({} images)", self.yielded, images.len());

        let shape = [loader.channels, loader.image_size, loader.image_size];
        Some(ImageBatch::stack(images, shape))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use image::{Rgb, RgbImage};
    use std::fs;
    use std::path::Path;

    type TestBackend = NdArray<f32>;

    fn write_images(dir: &Path, count: usize) {
        for i in 0..count {
            let shade = (i * 20) as u8;
            RgbImage::from_pixel(6, 6, Rgb([shade, shade, shade]))
                .save(dir.join(format!("{i:03}.png")))
                .unwrap();
        }
    }

    fn data_config(batch_size: usize, max_batches: Option<usize>) -> DataConfig {
        DataConfig {
            dir: Default::default(),
            image_size: 4,
            channels: 3,
            batch_size,
            max_batches_per_epoch: max_batches,
            seed: Some(7),
        }
    }

    #[test]
    fn test_drops_remainder() {
        let dir = tempfile::tempdir().unwrap();
        write_images(dir.path(), 7);
        let folder = ImageFolder::open(dir.path()).unwrap();
        let mut loader = BatchLoader::new(folder, &data_config(3, None));

        assert_eq!(loader.batches_per_epoch(), 2);
        let batches: Vec<_> = loader.epoch().map(|b| b.unwrap()).collect();
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.len == 3));
        assert_eq!(batches[0].values.len(), 3 * 3 * 4 * 4);
    }

    #[test]
    fn test_honours_batch_cap() {
        let dir = tempfile::tempdir().unwrap();
        write_images(dir.path(), 8);
        let folder = ImageFolder::open(dir.path()).unwrap();
        let mut loader = BatchLoader::new(folder, &data_config(2, Some(1)));

        assert_eq!(loader.batches_per_epoch(), 1);
        assert_eq!(loader.epoch().count(), 1);
    }

    #[test]
    fn test_skips_undecodable_files() {
        let dir = tempfile::tempdir().unwrap();
        write_images(dir.path(), 4);
        fs::write(dir.path().join("broken.jpg"), b"definitely not a jpeg").unwrap();
        let folder = ImageFolder::open(dir.path()).unwrap();
        assert_eq!(folder.len(), 5);

        let mut loader = BatchLoader::new(folder, &data_config(2, None));
        let mut epoch = loader.epoch();
        let mut full = 0;
        for batch in epoch.by_ref() {
            assert_eq!(batch.unwrap().len, 2);
            full += 1;
        }
        assert_eq!(full, 2);
        assert_eq!(epoch.skipped(), 1);
    }

    #[test]
    fn test_epochs_reshuffle() {
        let dir = tempfile::tempdir().unwrap();
        write_images(dir.path(), 12);
        let folder = ImageFolder::open(dir.path()).unwrap();
        let mut loader = BatchLoader::new(folder, &data_config(12, None));

        let first = loader.epoch().next().unwrap().unwrap().values;
        let orders: Vec<Vec<f32>> = (0..4)
            .map(|_| loader.epoch().next().unwrap().unwrap().values)
            .collect();
        assert!(orders.iter().any(|values| *values != first));
    }

    #[test]
    fn test_batch_to_tensor_shape() {
        let device = Default::default();
        let batch = ImageBatch::stack(vec![vec![0.5; 12], vec![-0.5; 12]], [3, 2, 2]).unwrap();
        let tensor = batch.to_tensor::<TestBackend>(&device);
        assert_eq!(tensor.dims(), [2, 3, 2, 2]);
    }

    #[test]
    fn test_stack_rejects_wrong_size() {
        let err = ImageBatch::stack(vec![vec![0.0; 5]], [3, 2, 2]).unwrap_err();
        assert!(matches!(err, GanError::ShapeMismatch { .. }));
    }
}
