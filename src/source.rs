//! Load and prepare the source image.
//!
//! The image is decoded once, normalized to 8 bits per channel (the channel
//! count is preserved), and optionally resized to an ideal size before the
//! sweep starts. From then on it is only ever read.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Input file not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("Source image has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },
}

/// An ideal output size, only when both sides are given.
pub fn ideal_size(width: Option<u32>, height: Option<u32>) -> Option<(u32, u32)> {
    match (width, height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
        _ => None,
    }
}

/// Decode `path` and prepare it for the sweep.
pub fn load_source(path: &Path, ideal: Option<(u32, u32)>) -> Result<DynamicImage, SourceError> {
    if !path.is_file() {
        return Err(SourceError::NotFound(path.to_path_buf()));
    }
    let image = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|source| SourceError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
    prepare_source(image, ideal)
}

/// Normalize bit depth and apply the optional resize.
pub fn prepare_source(
    image: DynamicImage,
    ideal: Option<(u32, u32)>,
) -> Result<DynamicImage, SourceError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(SourceError::Empty { width, height });
    }
    let image = normalize_depth(image);
    Ok(match ideal {
        Some((w, h)) if (w, h) != (width, height) => {
            image.resize_exact(w, h, FilterType::Lanczos3)
        }
        _ => image,
    })
}

/// Convert to the 8-bit variant with the same channel count.
fn normalize_depth(image: DynamicImage) -> DynamicImage {
    if is_eight_bit(&image) {
        image
    } else {
        to_eight_bit(&image)
    }
}

/// Borrow `image` when it is already 8-bit, otherwise convert it once.
pub(crate) fn eight_bit_view(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    if is_eight_bit(image) {
        Cow::Borrowed(image)
    } else {
        Cow::Owned(to_eight_bit(image))
    }
}

fn is_eight_bit(image: &DynamicImage) -> bool {
    matches!(
        image,
        DynamicImage::ImageLuma8(_)
            | DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageRgb8(_)
            | DynamicImage::ImageRgba8(_)
    )
}

/// 8-bit copy keyed on channel count. Always one of the four 8-bit variants.
pub(crate) fn to_eight_bit(image: &DynamicImage) -> DynamicImage {
    match image.color().channel_count() {
        1 => DynamicImage::ImageLuma8(image.to_luma8()),
        2 => DynamicImage::ImageLumaA8(image.to_luma_alpha8()),
        3 => DynamicImage::ImageRgb8(image.to_rgb8()),
        _ => DynamicImage::ImageRgba8(image.to_rgba8()),
    }
}
