//! In-process size optimization: shrink every frame and re-encode.
//!
//! Used when `gifsicle` is unavailable. It starts from the sequence rather
//! than the encoded bytes, so each pass resamples the original frames.

use super::Scale;
use super::backend::{OptimizeError, Optimizer};
use crate::assemble::{AnimationSequence, EncodeSpeed, OutputArtifact, encode_gif_scaled};

#[derive(Debug, Clone, Copy, Default)]
pub struct Rescale {
    speed: EncodeSpeed,
}

impl Rescale {
    pub fn new(speed: EncodeSpeed) -> Self {
        Self { speed }
    }
}

impl Optimizer for Rescale {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn optimize(
        &self,
        sequence: &AnimationSequence,
        _artifact: &OutputArtifact,
        scale: Scale,
    ) -> Result<OutputArtifact, OptimizeError> {
        Ok(encode_gif_scaled(sequence, scale.value(), self.speed)?)
    }
}
