//! Bring the encoded animation under a target size.
//!
//! Pass `k` (counting from 1) runs the optimizer at
//! `scale · scale_step^(k-1)`, always starting from the unoptimized
//! artifact. The loop stops as soon as a pass meets the target, after
//! `max_passes`, or at the first failed pass. Missing the target is not an
//! error: the caller always gets an artifact back, plus a record of what
//! happened.
//!
//! - **Backend**: [`Optimizer`] trait
//! - **[`Gifsicle`]**: the external compressor
//! - **[`Rescale`]**: pure-Rust fallback

pub mod backend;
pub mod gifsicle;
pub mod rescale;

pub use backend::{OptimizeError, Optimizer};
pub use gifsicle::{Gifsicle, is_gifsicle_on_path};
pub use rescale::Rescale;

use crate::assemble::{AnimationSequence, EncodeSpeed, OutputArtifact};
use crate::config::OptimizeConfig;
use serde::{Deserialize, Serialize};

/// Resize factor in `(0, 1]`. Clamped on construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale(f32);

impl Scale {
    const MIN: f32 = 0.01;

    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self(1.0);
        }
        Self(value.clamp(Self::MIN, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self(0.7)
    }
}

/// Which optimizer a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    /// `gifsicle` when it is on PATH, otherwise the built-in rescaler.
    #[default]
    Auto,
    Gifsicle,
    Builtin,
    /// Skip optimization entirely.
    None,
}

/// Resolve a configured kind into an optimizer, `None` for [`OptimizerKind::None`].
pub fn select_optimizer(kind: OptimizerKind, speed: EncodeSpeed) -> Option<Box<dyn Optimizer>> {
    match kind {
        OptimizerKind::None => None,
        OptimizerKind::Gifsicle => Some(Box::new(Gifsicle::new())),
        OptimizerKind::Builtin => Some(Box::new(Rescale::new(speed))),
        OptimizerKind::Auto if is_gifsicle_on_path() => Some(Box::new(Gifsicle::new())),
        OptimizerKind::Auto => Some(Box::new(Rescale::new(speed))),
    }
}

/// Retry policy for [`optimize_to_target`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizeSettings {
    pub target_bytes: usize,
    pub initial_scale: Scale,
    /// Multiplier applied to the scale before each retry.
    pub scale_step: f32,
    pub max_passes: u32,
}

impl OptimizeSettings {
    pub fn from_config(config: &OptimizeConfig) -> Self {
        Self {
            target_bytes: config.target_bytes,
            initial_scale: Scale::new(config.scale),
            scale_step: config.scale_step,
            max_passes: config.max_passes,
        }
    }

    /// Scale used by pass `pass` (0-based).
    pub fn scale_for_pass(&self, pass: u32) -> Scale {
        let exponent = i32::try_from(pass).unwrap_or(i32::MAX);
        Scale::new(self.initial_scale.value() * self.scale_step.powi(exponent))
    }
}

impl Default for OptimizeSettings {
    fn default() -> Self {
        Self::from_config(&OptimizeConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassReport {
    pub scale: f32,
    pub bytes: usize,
}

#[derive(Debug, Clone)]
pub struct OptimizeOutcome {
    pub artifact: OutputArtifact,
    pub passes: Vec<PassReport>,
    pub met_target: bool,
    /// Error from the pass that stopped the loop, if any.
    pub failure: Option<String>,
}

/// Run optimization passes until the artifact fits or the policy gives up.
///
/// Returns the smallest artifact seen across the successful passes and the
/// input itself. A pass that grows the file never replaces a smaller one.
pub fn optimize_to_target(
    optimizer: &dyn Optimizer,
    sequence: &AnimationSequence,
    artifact: OutputArtifact,
    settings: &OptimizeSettings,
) -> OptimizeOutcome {
    let mut passes = Vec::new();
    let mut best: Option<OutputArtifact> = None;
    let mut failure = None;

    for pass in 0..settings.max_passes.max(1) {
        let scale = settings.scale_for_pass(pass);
        match optimizer.optimize(sequence, &artifact, scale) {
            Ok(optimized) => {
                passes.push(PassReport {
                    scale: scale.value(),
                    bytes: optimized.len(),
                });
                let fits = optimized.len() <= settings.target_bytes;
                if best.as_ref().is_none_or(|b| optimized.len() < b.len()) {
                    best = Some(optimized);
                }
                if fits {
                    break;
                }
            }
            Err(e) => {
                failure = Some(e.to_string());
                break;
            }
        }
    }

    let artifact = match best {
        Some(best) if best.len() < artifact.len() => best,
        _ => artifact,
    };
    OptimizeOutcome {
        met_target: artifact.len() <= settings.target_bytes,
        artifact,
        passes,
        failure,
    }
}
