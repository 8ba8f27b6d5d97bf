//! Shared test utilities for the gif-rotate test suite.
//!
//! Builds synthetic images and frames so tests never depend on fixture
//! files, and decodes encoded GIFs back into frames for assertions.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let source = DynamicImage::ImageRgb8(gradient_rgb(32, 24));
//! let frames = frames_with_indices([3, 7, 11]);
//! let decoded = decode_gif_frames(artifact.bytes());
//! ```

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, RgbImage, RgbaImage};
use std::io::Cursor;

use crate::projection::build_projection_matrix;
use crate::types::{Frame, RotationAngles, Translation};

// =========================================================================
// Synthetic images
// =========================================================================

/// An RGB image where neighbouring pixels differ in every channel.
pub fn gradient_rgb(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            ((x * 25) % 256) as u8,
            ((y * 40) % 256) as u8,
            (((x + y) * 7) % 256) as u8,
        ])
    })
}

/// Like [`gradient_rgb`] with an alpha ramp along y.
pub fn gradient_rgba(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([
            ((x * 25) % 256) as u8,
            ((y * 40) % 256) as u8,
            (((x + y) * 7) % 256) as u8,
            (255 - (y * 30) % 256) as u8,
        ])
    })
}

// =========================================================================
// Frames
// =========================================================================

/// 1x1 frames carrying the given angle-indices, in the given order.
pub fn frames_with_indices(indices: impl IntoIterator<Item = u32>) -> Vec<Frame> {
    frames_with_size(indices, 1, 1)
}

/// Gradient frames of one size carrying the given angle-indices.
pub fn frames_with_size(
    indices: impl IntoIterator<Item = u32>,
    width: u32,
    height: u32,
) -> Vec<Frame> {
    let matrix = build_projection_matrix(
        RotationAngles::default(),
        Translation::default(),
        width,
        height,
    );
    let image = DynamicImage::ImageRgb8(gradient_rgb(width, height));
    indices
        .into_iter()
        .map(|angle_index| Frame {
            angle_index,
            matrix,
            image: image.clone(),
        })
        .collect()
}

// =========================================================================
// GIF inspection
// =========================================================================

/// Decode every frame of an encoded GIF. Panics if the bytes are not a GIF.
pub fn decode_gif_frames(bytes: &[u8]) -> Vec<image::Frame> {
    let decoder = GifDecoder::new(Cursor::new(bytes)).expect("valid GIF header");
    decoder
        .into_frames()
        .collect_frames()
        .expect("decodable GIF frames")
}
