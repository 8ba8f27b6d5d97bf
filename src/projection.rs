//! Perspective matrix for an image plane rotated in 3D.
//!
//! The source image is treated as the plane `z = 0` with its centre at the
//! origin. For one set of angles the plane is rotated, pushed away from the
//! camera by the focal length, and projected back onto pixel coordinates:
//!
//! ```text
//! M = Projection · Translation · (RX · RY · RZ) · Decenter
//!      3×4          4×4           4×4             4×3      → 3×3
//! ```
//!
//! `M` maps homogeneous source pixel coordinates `(x, y, 1)` to homogeneous
//! output coordinates, so it is applied as a homography. The rotation order
//! is fixed (X, then Y, then Z); rotations do not commute.
//!
//! Angles are reduced exactly at multiples of 90°, so `sin(180°)` is `0.0`
//! rather than `1.2e-16`. This matters for the focal length fallback and for
//! detecting edge-on (singular) frames.

use crate::types::{RotationAngles, Translation};
use nalgebra::{Matrix3, Matrix3x4, Matrix4, Matrix4x3, Vector3};

/// Normalized determinant below which a matrix is treated as singular.
pub const SINGULAR_TOLERANCE: f64 = 1e-9;

/// A composed rotation + translation + projection transform for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionMatrix {
    matrix: Matrix3<f64>,
    focal_length: f64,
}

impl ProjectionMatrix {
    pub fn as_matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Focal length the matrix was built with (also the camera distance).
    pub fn focal_length(&self) -> f64 {
        self.focal_length
    }

    /// Row-major copy of the matrix entries.
    pub fn to_rows(&self) -> [[f64; 3]; 3] {
        let m = &self.matrix;
        [
            [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
            [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
            [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
        ]
    }

    /// Determinant divided by the product of the column norms.
    ///
    /// By Hadamard's inequality this lies in `[-1, 1]` whatever the scale of
    /// the focal length, so one tolerance works for every image size.
    pub fn normalized_determinant(&self) -> f64 {
        let scale: f64 = (0..3).map(|c| self.matrix.column(c).norm()).product();
        if scale == 0.0 {
            return 0.0;
        }
        self.matrix.determinant() / scale
    }

    /// True when the plane is seen edge-on and the warp is undefined.
    pub fn is_singular(&self) -> bool {
        // Written as a negation so NaN counts as singular.
        !(self.normalized_determinant().abs() >= SINGULAR_TOLERANCE)
    }

    /// Inverse mapping (output pixel → source pixel), `None` when singular.
    pub fn inverse(&self) -> Option<Matrix3<f64>> {
        if self.is_singular() {
            return None;
        }
        self.matrix.try_inverse()
    }

    /// Map a source pixel coordinate to an output pixel coordinate.
    ///
    /// Returns `None` for points that project to infinity.
    pub fn project(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let p = self.matrix * Vector3::new(x, y, 1.0);
        if p.z.abs() < f64::EPSILON {
            return None;
        }
        Some((p.x / p.z, p.y / p.z))
    }
}

/// `(sin, cos)` of an angle in degrees, exact at multiples of 90°.
pub fn sin_cos_deg(degrees: f64) -> (f64, f64) {
    let reduced = degrees.rem_euclid(360.0);
    if reduced == 0.0 {
        (0.0, 1.0)
    } else if reduced == 90.0 {
        (1.0, 0.0)
    } else if reduced == 180.0 {
        (0.0, -1.0)
    } else if reduced == 270.0 {
        (-1.0, 0.0)
    } else {
        degrees.to_radians().sin_cos()
    }
}

/// Focal length for an image of the given size rolled by `gamma` degrees.
///
/// `d / (2·|sin γ|)` with `d` the image diagonal, or `d / 2` when
/// `sin γ = 0`. The magnitude of the sine is used so the camera never ends
/// up behind the plane; the result is positive for any non-empty image.
pub fn focal_length(width: u32, height: u32, gamma: f64) -> f64 {
    let diagonal = f64::from(height).hypot(f64::from(width));
    let (sin_gamma, _) = sin_cos_deg(gamma);
    if sin_gamma == 0.0 {
        diagonal / 2.0
    } else {
        diagonal / (2.0 * sin_gamma.abs())
    }
}

/// Build the projection matrix for one frame.
///
/// Pure: identical inputs always give identical matrices.
pub fn build_projection_matrix(
    angles: RotationAngles,
    translation: Translation,
    width: u32,
    height: u32,
) -> ProjectionMatrix {
    let w = f64::from(width);
    let h = f64::from(height);
    let focal = focal_length(width, height, angles.gamma);

    let rotation = rotation(angles);
    let shift = translation_matrix(translation.dx, translation.dy, focal);
    let matrix = camera(focal, w, h) * shift * rotation * decenter(w, h);

    ProjectionMatrix {
        matrix,
        focal_length: focal,
    }
}

/// Lift pixel coordinates onto the plane `z = 0`, centred on the origin.
fn decenter(w: f64, h: f64) -> Matrix4x3<f64> {
    #[rustfmt::skip]
    let m = Matrix4x3::new(
        1.0, 0.0, -w / 2.0,
        0.0, 1.0, -h / 2.0,
        0.0, 0.0, 0.0,
        0.0, 0.0, 1.0,
    );
    m
}

fn rotation(angles: RotationAngles) -> Matrix4<f64> {
    rotation_x(angles.theta) * rotation_y(angles.phi) * rotation_z(angles.gamma)
}

fn rotation_x(theta: f64) -> Matrix4<f64> {
    let (s, c) = sin_cos_deg(theta);
    #[rustfmt::skip]
    let m = Matrix4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, c,   -s,  0.0,
        0.0, s,   c,   0.0,
        0.0, 0.0, 0.0, 1.0,
    );
    m
}

fn rotation_y(phi: f64) -> Matrix4<f64> {
    let (s, c) = sin_cos_deg(phi);
    #[rustfmt::skip]
    let m = Matrix4::new(
        c,   0.0, -s,  0.0,
        0.0, 1.0, 0.0, 0.0,
        s,   0.0, c,   0.0,
        0.0, 0.0, 0.0, 1.0,
    );
    m
}

fn rotation_z(gamma: f64) -> Matrix4<f64> {
    let (s, c) = sin_cos_deg(gamma);
    #[rustfmt::skip]
    let m = Matrix4::new(
        c,   -s,  0.0, 0.0,
        s,   c,   0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
    );
    m
}

fn translation_matrix(dx: f64, dy: f64, dz: f64) -> Matrix4<f64> {
    #[rustfmt::skip]
    let m = Matrix4::new(
        1.0, 0.0, 0.0, dx,
        0.0, 1.0, 0.0, dy,
        0.0, 0.0, 1.0, dz,
        0.0, 0.0, 0.0, 1.0,
    );
    m
}

/// Camera space back to pixels, re-centred on `(w/2, h/2)`.
fn camera(f: f64, w: f64, h: f64) -> Matrix3x4<f64> {
    #[rustfmt::skip]
    let m = Matrix3x4::new(
        f,   0.0, w / 2.0, 0.0,
        0.0, f,   h / 2.0, 0.0,
        0.0, 0.0, 1.0,     0.0,
    );
    m
}
