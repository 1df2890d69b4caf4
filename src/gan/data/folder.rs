//! Image Folder Dataset
//!
//! Unlabelled images discovered recursively under a directory.

use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::DynamicImage;

use crate::error::{GanError, Result};

/// File extensions treated as images
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif"];

/// Directory of training images
#[derive(Debug, Clone)]
pub struct ImageFolder {
    root: PathBuf,
    paths: Vec<PathBuf>,
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

fn collect_images(root: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_images(&path, out)?;
        } else if is_image(&path) {
            out.push(path);
        }
    }
    Ok(())
}

impl ImageFolder {
    /// Scan `root` recursively; sorted so that a seeded shuffle is reproducible
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let mut paths = Vec::new();
        collect_images(&root, &mut paths)?;

        if paths.is_empty() {
            return Err(GanError::EmptyDataset(root.display().to_string()));
        }
        paths.sort();

        Ok(Self { root, paths })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Decode the image at `index` as a normalized CHW buffer
    pub fn load(&self, index: usize, size: usize, channels: usize) -> Result<Vec<f32>> {
        let path = self
            .paths
            .get(index)
            .ok_or_else(|| GanError::Internal(format!("image index {index} out of range")))?;
        load_image(path, size, channels)
    }
}

/// Decode, resize to `size x size` (bilinear, aspect ratio not kept) and
/// normalize pixels to `[-1, 1]` in CHW order.
pub fn load_image(path: &Path, size: usize, channels: usize) -> Result<Vec<f32>> {
    let decoded = image::open(path)?;
    image_to_chw(&decoded, size, channels)
}

pub fn image_to_chw(image: &DynamicImage, size: usize, channels: usize) -> Result<Vec<f32>> {
    let side = size as u32;
    let resized = if image.width() == side && image.height() == side {
        image.clone()
    } else {
        image.resize_exact(side, side, FilterType::Triangle)
    };

    let raw = match channels {
        1 => resized.to_luma8().into_raw(),
        3 => resized.to_rgb8().into_raw(),
        other => {
            return Err(GanError::InvalidConfig(vec![format!(
                "unsupported channel count {other}, expected 1 or 3"
            )]))
        }
    };

    // Interleaved HWC bytes to planar CHW floats
    let plane = size * size;
    let mut chw = vec![0.0f32; channels * plane];
    for (i, &byte) in raw.iter().enumerate() {
        let pixel = i / channels;
        let channel = i % channels;
        chw[channel * plane + pixel] = normalize(byte);
    }

    Ok(chw)
}

/// Map a byte to `[-1, 1]`
pub fn normalize(byte: u8) -> f32 {
    byte as f32 / 127.5 - 1.0
}
