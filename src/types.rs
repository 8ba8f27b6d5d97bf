//! Value types shared by every stage of the sweep.
//!
//! Nothing here owns mutable state: angles and translations are plain
//! `Copy` values, and a [`Frame`] owns its image outright so frames can be
//! produced on any worker thread and merged afterwards.

use crate::projection::ProjectionMatrix;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which synthetic axes vary with the angle-index.
///
/// Parsing is lenient: anything other than `yz` selects [`AxisMode::Y`].
/// A misspelled mode still produces an animation, it just spins on the
/// default axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AxisMode {
    /// Yaw only, with a small fixed horizontal camera offset.
    #[default]
    Y,
    /// Yaw and roll together.
    Yz,
}

impl AxisMode {
    /// Parse a mode string, falling back to `y` for anything unrecognized.
    pub fn parse_lenient(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("yz") {
            Self::Yz
        } else {
            Self::Y
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Y => "y",
            Self::Yz => "yz",
        }
    }
}

impl From<String> for AxisMode {
    fn from(value: String) -> Self {
        Self::parse_lenient(&value)
    }
}

impl From<AxisMode> for String {
    fn from(mode: AxisMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for AxisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rotation about the X (`theta`), Y (`phi`) and Z (`gamma`) axes, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RotationAngles {
    pub theta: f64,
    pub phi: f64,
    pub gamma: f64,
}

/// User-controlled translation in the synthetic 3D space.
///
/// There is no `dz`: the camera distance always equals the focal length
/// computed by [`focal_length`](crate::projection::focal_length).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Translation {
    pub dx: f64,
    pub dy: f64,
}

/// One rendered step of the sweep.
///
/// `angle_index` is the canonical ordering key. It is carried explicitly so
/// ordering never depends on how frames were scheduled or stored.
#[derive(Debug, Clone)]
pub struct Frame {
    pub angle_index: u32,
    /// The matrix the image was warped through.
    pub matrix: ProjectionMatrix,
    pub image: DynamicImage,
}
