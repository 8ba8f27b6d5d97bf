//! Assemble sampled frames into a looping animation and encode it as GIF.
//!
//! An [`AnimationSequence`] can only be built from frames that are strictly
//! ascending by angle-index, and from at least one frame. Both are checked
//! on construction so a malformed sequence never reaches the encoder.

use crate::config::AnimationConfig;
use crate::types::Frame;
use image::codecs::gif::{GifEncoder, Repeat};
use image::imageops::FilterType;
use image::{Delay, GenericImageView, ImageError};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("no frames survived sampling")]
    NoFrames,
    #[error("frames out of order: angle-index {next} follows {previous}")]
    OutOfOrder { previous: u32, next: u32 },
    #[error("GIF encoding failed: {0}")]
    Encode(#[from] ImageError),
}

/// GIF quantizer speed (1 = best palette, 30 = fastest).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSpeed(u8);

impl EncodeSpeed {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 30) as u8)
    }

    pub fn value(self) -> i32 {
        i32::from(self.0)
    }
}

impl Default for EncodeSpeed {
    fn default() -> Self {
        Self(10)
    }
}

/// Ordered frames plus the timing shared by all of them.
#[derive(Debug, Clone)]
pub struct AnimationSequence {
    frames: Vec<Frame>,
    frame_duration: Duration,
    looping: bool,
}

/// One displayed frame of a sequence.
#[derive(Debug, Clone, Copy)]
pub struct SequenceEntry<'a> {
    pub frame: &'a Frame,
    pub duration: Duration,
    pub looping: bool,
}

impl AnimationSequence {
    pub fn new(frames: Vec<Frame>, settings: &AnimationConfig) -> Result<Self, AssembleError> {
        if frames.is_empty() {
            return Err(AssembleError::NoFrames);
        }
        if let Some(pair) = frames
            .windows(2)
            .find(|w| w[0].angle_index >= w[1].angle_index)
        {
            return Err(AssembleError::OutOfOrder {
                previous: pair[0].angle_index,
                next: pair[1].angle_index,
            });
        }
        Ok(Self {
            frames,
            frame_duration: Duration::from_millis(settings.frame_duration_ms),
            looping: settings.looping,
        })
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    pub fn angle_indices(&self) -> Vec<u32> {
        self.frames.iter().map(|f| f.angle_index).collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = SequenceEntry<'_>> {
        self.frames.iter().map(|frame| SequenceEntry {
            frame,
            duration: self.frame_duration,
            looping: self.looping,
        })
    }

    /// Pixel size shared by every frame.
    pub fn dimensions(&self) -> (u32, u32) {
        self.frames[0].image.dimensions()
    }
}

/// Encoded animation bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    bytes: Vec<u8>,
}

impl OutputArtifact {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Encode the sequence at its native size.
pub fn encode_gif(
    sequence: &AnimationSequence,
    speed: EncodeSpeed,
) -> Result<OutputArtifact, AssembleError> {
    encode_gif_scaled(sequence, 1.0, speed)
}

/// Encode the sequence with every frame resized by `scale` (Lanczos3).
///
/// Scaled dimensions never drop below one pixel.
pub fn encode_gif_scaled(
    sequence: &AnimationSequence,
    scale: f32,
    speed: EncodeSpeed,
) -> Result<OutputArtifact, AssembleError> {
    let (width, height) = sequence.dimensions();
    let target = scaled_dimensions((width, height), scale);

    let mut bytes = Vec::new();
    {
        let mut encoder = GifEncoder::new_with_speed(&mut bytes, speed.value());
        if sequence.looping() {
            encoder.set_repeat(Repeat::Infinite)?;
        }
        let delay = Delay::from_saturating_duration(sequence.frame_duration());
        for frame in sequence.frames() {
            let rgba = if target == (width, height) {
                frame.image.to_rgba8()
            } else {
                frame
                    .image
                    .resize_exact(target.0, target.1, FilterType::Lanczos3)
                    .to_rgba8()
            };
            encoder.encode_frame(image::Frame::from_parts(rgba, 0, 0, delay))?;
        }
    }
    Ok(OutputArtifact::new(bytes))
}

/// Scale a size, rounding and clamping each side to at least 1.
pub fn scaled_dimensions((width, height): (u32, u32), scale: f32) -> (u32, u32) {
    let scale = f64::from(scale);
    let side = |v: u32| ((f64::from(v) * scale).round() as u32).max(1);
    (side(width), side(height))
}
