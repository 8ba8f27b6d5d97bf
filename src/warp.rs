//! Resample an image through a projection matrix.
//!
//! Every output pixel is pulled back through the inverse matrix and sampled
//! from the source. Pull-back leaves no holes in the output, unlike pushing
//! source pixels forward. Output coordinates that land outside the source
//! stay at zero (black, and transparent when the image has alpha).
//!
//! The output always has the source's width, height and channel count.

use crate::projection::ProjectionMatrix;
use crate::source::to_eight_bit;
use image::{DynamicImage, GenericImageView, ImageBuffer, Pixel};
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Slack allowed past the last pixel before a sample counts as outside.
const EDGE_EPSILON: f64 = 1e-6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WarpError {
    #[error("projection matrix is singular (normalized determinant {determinant:e})")]
    Singular { determinant: f64 },
}

/// Sampling method used when pulling pixels back from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    #[default]
    Bilinear,
    Nearest,
}

/// Warp `source` through `matrix`.
///
/// Fails only when the matrix cannot be inverted; the caller decides what to
/// do with that frame. Sources deeper than 8 bits are warped through their
/// 8-bit equivalent with the same channel count.
pub fn warp_image(
    source: &DynamicImage,
    matrix: &ProjectionMatrix,
    interpolation: Interpolation,
) -> Result<DynamicImage, WarpError> {
    let inverse = invert(matrix)?;
    Ok(warp_dynamic(source, &inverse, interpolation))
}

/// Inverse of `matrix`, or the reason it has none.
pub fn invert(matrix: &ProjectionMatrix) -> Result<Matrix3<f64>, WarpError> {
    matrix.inverse().ok_or_else(|| WarpError::Singular {
        determinant: matrix.normalized_determinant(),
    })
}

fn warp_dynamic(
    source: &DynamicImage,
    inverse: &Matrix3<f64>,
    interpolation: Interpolation,
) -> DynamicImage {
    match source {
        DynamicImage::ImageLuma8(buf) => {
            DynamicImage::ImageLuma8(warp_buffer(buf, inverse, interpolation))
        }
        DynamicImage::ImageLumaA8(buf) => {
            DynamicImage::ImageLumaA8(warp_buffer(buf, inverse, interpolation))
        }
        DynamicImage::ImageRgb8(buf) => {
            DynamicImage::ImageRgb8(warp_buffer(buf, inverse, interpolation))
        }
        DynamicImage::ImageRgba8(buf) => {
            DynamicImage::ImageRgba8(warp_buffer(buf, inverse, interpolation))
        }
        // to_eight_bit only yields the variants above, so this recurses once
        other => warp_dynamic(&to_eight_bit(other), inverse, interpolation),
    }
}

fn warp_buffer<P>(
    source: &ImageBuffer<P, Vec<u8>>,
    inverse: &Matrix3<f64>,
    interpolation: Interpolation,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = source.dimensions();
    let mut out = ImageBuffer::<P, Vec<u8>>::new(width, height);
    let channels = usize::from(P::CHANNEL_COUNT);
    let mut sample = vec![0u8; channels];

    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let Some((sx, sy)) = map_point(inverse, f64::from(x), f64::from(y)) else {
            continue;
        };
        let found = match interpolation {
            Interpolation::Bilinear => sample_bilinear(source, sx, sy, &mut sample),
            Interpolation::Nearest => sample_nearest(source, sx, sy, &mut sample),
        };
        if found {
            pixel.channels_mut().copy_from_slice(&sample);
        }
    }
    out
}

/// Apply a homography to one point, `None` at infinity or NaN.
fn map_point(m: &Matrix3<f64>, x: f64, y: f64) -> Option<(f64, f64)> {
    let w = m[(2, 0)] * x + m[(2, 1)] * y + m[(2, 2)];
    if w.abs() < f64::EPSILON {
        return None;
    }
    let sx = (m[(0, 0)] * x + m[(0, 1)] * y + m[(0, 2)]) / w;
    let sy = (m[(1, 0)] * x + m[(1, 1)] * y + m[(1, 2)]) / w;
    (sx.is_finite() && sy.is_finite()).then_some((sx, sy))
}

fn in_bounds(sx: f64, sy: f64, width: u32, height: u32) -> bool {
    let max_x = f64::from(width) - 1.0;
    let max_y = f64::from(height) - 1.0;
    sx >= -EDGE_EPSILON
        && sy >= -EDGE_EPSILON
        && sx <= max_x + EDGE_EPSILON
        && sy <= max_y + EDGE_EPSILON
}

fn sample_nearest<P>(source: &ImageBuffer<P, Vec<u8>>, sx: f64, sy: f64, out: &mut [u8]) -> bool
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = source.dimensions();
    if !in_bounds(sx, sy, width, height) {
        return false;
    }
    let x = (sx.round().max(0.0) as u32).min(width - 1);
    let y = (sy.round().max(0.0) as u32).min(height - 1);
    out.copy_from_slice(source.get_pixel(x, y).channels());
    true
}

fn sample_bilinear<P>(source: &ImageBuffer<P, Vec<u8>>, sx: f64, sy: f64, out: &mut [u8]) -> bool
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = source.dimensions();
    if !in_bounds(sx, sy, width, height) {
        return false;
    }
    let sx = sx.clamp(0.0, f64::from(width - 1));
    let sy = sy.clamp(0.0, f64::from(height - 1));
    let x0 = sx.floor() as u32;
    let y0 = sy.floor() as u32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let fx = sx - f64::from(x0);
    let fy = sy - f64::from(y0);

    let a = source.get_pixel(x0, y0).channels();
    let b = source.get_pixel(x1, y0).channels();
    let c = source.get_pixel(x0, y1).channels();
    let d = source.get_pixel(x1, y1).channels();

    let w00 = (1.0 - fx) * (1.0 - fy);
    let w10 = fx * (1.0 - fy);
    let w01 = (1.0 - fx) * fy;
    let w11 = fx * fy;

    for (i, value) in out.iter_mut().enumerate() {
        let v = f64::from(a[i]) * w00
            + f64::from(b[i]) * w10
            + f64::from(c[i]) * w01
            + f64::from(d[i]) * w11;
        *value = v.round().clamp(0.0, 255.0) as u8;
    }
    true
}

/// Width, height and channel count, the shape every frame must share.
pub fn shape(image: &DynamicImage) -> (u32, u32, u8) {
    let (w, h) = image.dimensions();
    (w, h, image.color().channel_count())
}
