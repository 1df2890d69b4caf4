//! Sample Grids
//!
//! Tile generated images into a single PNG for visual inspection.

use std::path::Path;

use burn::prelude::*;
use image::{Rgb, RgbImage};

use crate::error::{GanError, Result};

/// File name of the snapshot written at the end of `epoch` (0-based)
pub fn epoch_image_name(epoch: usize) -> String {
    format!("gen_images_epoch_{}.png", epoch)
}

/// Map a `[-1, 1]` value to a byte via `(x + 1) / 2`
pub fn to_byte(value: f32) -> u8 {
    (((value + 1.0) / 2.0).clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Tile the first `grid * grid` images of a flat `[n, C, H, W]` buffer row-major
///
/// Single-channel images are rendered as gray.
pub fn render_grid(values: &[f32], count: usize, shape: [usize; 3], grid: usize) -> Result<RgbImage> {
    let [channels, height, width] = shape;
    let per_image = channels * height * width;

    if values.len() != count * per_image {
        return Err(GanError::ShapeMismatch {
            expected: vec![count, channels, height, width],
            actual: vec![values.len()],
        });
    }
    if count < grid * grid {
        return Err(GanError::InvalidConfig(vec![format!(
            "{count} images cannot fill a {grid}x{grid} grid"
        )]));
    }
    if channels != 1 && channels != 3 {
        return Err(GanError::InvalidConfig(vec![format!(
            "cannot render {channels}-channel images, expected 1 or 3"
        )]));
    }

    let plane = height * width;
    let mut canvas = RgbImage::new((grid * width) as u32, (grid * height) as u32);

    for tile in 0..grid * grid {
        let image = &values[tile * per_image..(tile + 1) * per_image];
        let origin_x = (tile % grid) * width;
        let origin_y = (tile / grid) * height;

        for y in 0..height {
            for x in 0..width {
                let pixel = y * width + x;
                let channel = |c: usize| to_byte(image[(c % channels) * plane + pixel]);
                canvas.put_pixel(
                    (origin_x + x) as u32,
                    (origin_y + y) as u32,
                    Rgb([channel(0), channel(1), channel(2)]),
                );
            }
        }
    }

    Ok(canvas)
}

/// Read a generated batch back from the device and tile it
pub fn tensor_grid<B: Backend>(images: Tensor<B, 4>, grid: usize) -> Result<RgbImage> {
    let [count, channels, height, width] = images.dims();
    let values = images
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| GanError::Internal(format!("failed to read generated images: {e:?}")))?;

    render_grid(&values, count, [channels, height, width], grid)
}

/// Encode a grid as PNG at `path`, creating parent directories
pub fn save_grid(path: &Path, grid: &RgbImage) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    grid.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_epoch_image_name() {
        assert_eq!(epoch_image_name(0), "gen_images_epoch_0.png");
        assert_eq!(epoch_image_name(29), "gen_images_epoch_29.png");
    }

    #[test]
    fn test_to_byte_bounds() {
        assert_eq!(to_byte(-1.0), 0);
        assert_eq!(to_byte(1.0), 255);
        assert_eq!(to_byte(0.0), 128);
        assert_eq!(to_byte(-3.0), 0);
        assert_eq!(to_byte(3.0), 255);
    }

    #[test]
    fn test_tiles_are_row_major() {
        // Four 1x1 RGB images: black, white, red, green
        let values = vec![
            -1.0, -1.0, -1.0, //
            1.0, 1.0, 1.0, //
            1.0, -1.0, -1.0, //
            -1.0, 1.0, -1.0,
        ];
        let grid = render_grid(&values, 4, [3, 1, 1], 2).unwrap();

        assert_eq!(grid.dimensions(), (2, 2));
        assert_eq!(grid.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(grid.get_pixel(1, 0), &Rgb([255, 255, 255]));
        assert_eq!(grid.get_pixel(0, 1), &Rgb([255, 0, 0]));
        assert_eq!(grid.get_pixel(1, 1), &Rgb([0, 255, 0]));
    }

    #[test]
    fn test_extra_images_are_ignored() {
        let values = vec![0.0; 5 * 2 * 2];
        let grid = render_grid(&values, 5, [1, 2, 2], 2).unwrap();
        assert_eq!(grid.dimensions(), (4, 4));
        assert_eq!(grid.get_pixel(3, 3), &Rgb([128, 128, 128]));
    }

    #[test]
    fn test_too_few_images() {
        let values = vec![0.0; 3 * 3];
        let err = render_grid(&values, 3, [3, 1, 1], 2).unwrap_err();
        assert!(matches!(err, GanError::InvalidConfig(_)));
        assert!(err.to_string().contains("cannot fill a 2x2 grid"));
    }

    #[test]
    fn test_unsupported_channel_count() {
        let values = vec![0.0; 4 * 2];
        let err = render_grid(&values, 4, [2, 1, 1], 2).unwrap_err();
        assert!(matches!(err, GanError::InvalidConfig(_)));
    }

    #[test]
    fn test_buffer_length_mismatch() {
        let values = vec![0.0; 7];
        let err = render_grid(&values, 4, [3, 1, 1], 2).unwrap_err();
        assert!(matches!(err, GanError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_tensor_grid_and_save() {
        let device = Default::default();
        let images = Tensor::<TestBackend, 4>::zeros([9, 3, 4, 4], &device);
        let grid = tensor_grid(images, 3).unwrap();
        assert_eq!(grid.dimensions(), (12, 12));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(epoch_image_name(0));
        save_grid(&path, &grid).unwrap();
        assert!(path.exists());
    }
}
