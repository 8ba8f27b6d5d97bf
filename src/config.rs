//! Run configuration.
//!
//! Handles loading, validating, and merging configuration. Values are
//! layered: stock defaults, then an optional TOML file, then command-line
//! overrides. Each layer is a sparse TOML table merged onto the one below
//! with [`merge_toml`], and the result is deserialized and validated once.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [sweep]
//! angles = 360              # Number of angle steps (degrees), at least 1
//! axis = "y"                # "y" (yaw) or "yz" (yaw + roll); anything else means "y"
//! interpolation = "bilinear" # or "nearest"
//!
//! [sampling]
//! stride = 4                # Keep one frame of every `stride`
//!
//! [animation]
//! frame_duration_ms = 50    # Display time per frame
//! looping = true            # Loop forever
//! encode_speed = 10         # GIF quantizer speed, 1 (best) to 30 (fastest)
//!
//! [optimize]
//! backend = "auto"          # auto | gifsicle | builtin | none
//! target_bytes = 131072     # Size to aim for
//! scale = 0.7               # Resize factor of the first pass
//! scale_step = 0.85         # Scale multiplier for each further pass
//! max_passes = 1            # Passes before accepting the result
//!
//! [frames]
//! keep = false              # Keep the numbered frame files after the run
//! format = "jpg"            # jpg | png
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::optimize::OptimizerKind;
use crate::store::FrameFormat;
use crate::types::AxisMode;
use crate::warp::Interpolation;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Everything that parameterizes one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RotateConfig {
    pub sweep: SweepConfig,
    pub sampling: SamplingConfig,
    pub animation: AnimationConfig,
    pub optimize: OptimizeConfig,
    pub frames: FramesConfig,
    pub processing: ProcessingConfig,
}

impl RotateConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep.angles == 0 {
            return Err(ConfigError::Validation(
                "sweep.angles must be at least 1".into(),
            ));
        }
        if self.sampling.stride == 0 {
            return Err(ConfigError::Validation(
                "sampling.stride must be at least 1".into(),
            ));
        }
        if self.animation.frame_duration_ms == 0 {
            return Err(ConfigError::Validation(
                "animation.frame_duration_ms must be non-zero".into(),
            ));
        }
        if !(self.optimize.scale > 0.0 && self.optimize.scale <= 1.0) {
            return Err(ConfigError::Validation(
                "optimize.scale must be in (0, 1]".into(),
            ));
        }
        if !(self.optimize.scale_step > 0.0 && self.optimize.scale_step < 1.0) {
            return Err(ConfigError::Validation(
                "optimize.scale_step must be in (0, 1)".into(),
            ));
        }
        if self.optimize.max_passes == 0 {
            return Err(ConfigError::Validation(
                "optimize.max_passes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Angle sweep settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    /// Number of steps; step `i` rotates by `i` degrees.
    pub angles: u32,
    /// Axis mode, parsed leniently.
    pub axis: AxisMode,
    pub interpolation: Interpolation,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            angles: 360,
            axis: AxisMode::Y,
            interpolation: Interpolation::Bilinear,
        }
    }
}

/// Frame subsampling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplingConfig {
    /// Keep one frame per `stride` consecutive angle-indices.
    pub stride: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            stride: crate::sample::DEFAULT_STRIDE,
        }
    }
}

/// Timing and encoding of the assembled animation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnimationConfig {
    pub frame_duration_ms: u64,
    pub looping: bool,
    /// GIF quantizer speed, clamped to 1..=30.
    pub encode_speed: u32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            frame_duration_ms: 50,
            looping: true,
            encode_speed: 10,
        }
    }
}

/// Size optimization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizeConfig {
    pub backend: OptimizerKind,
    pub target_bytes: usize,
    pub scale: f32,
    pub scale_step: f32,
    pub max_passes: u32,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            backend: OptimizerKind::Auto,
            target_bytes: 128 * 1024,
            scale: 0.7,
            scale_step: 0.85,
            max_passes: 1,
        }
    }
}

/// Persistence of the raw numbered frames.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FramesConfig {
    /// Leave the frame files in place after the run.
    pub keep: bool,
    pub format: FrameFormat,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(RotateConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge overlays onto the stock defaults in order, then deserialize and validate.
pub fn resolve_config(
    overlays: impl IntoIterator<Item = toml::Value>,
) -> Result<RotateConfig, ConfigError> {
    let merged = overlays
        .into_iter()
        .fold(stock_defaults_value()?, merge_toml);
    let config: RotateConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from an optional file, with stock defaults underneath.
pub fn load_config(path: Option<&Path>) -> Result<RotateConfig, ConfigError> {
    let overlay = path.map(load_raw_config).transpose()?;
    resolve_config(overlay)
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# gif-rotate configuration
# ========================
#
# Every key is optional. Values shown are the defaults.
# Command-line flags override anything set here.

[sweep]
# Number of rotation steps. Step i rotates the image by i degrees.
angles = 360
# "y" spins about the vertical axis with a small camera offset.
# "yz" spins about the vertical axis and rolls at the same time.
# Any other value falls back to "y".
axis = "y"
# Pixel sampling: "bilinear" or "nearest".
interpolation = "bilinear"

[sampling]
# Keep one frame per `stride` steps (the last of each group).
# 360 steps with stride 4 keep 90 frames.
stride = 4

[animation]
# How long each frame is shown, in milliseconds.
frame_duration_ms = 50
# Loop the animation forever.
looping = true
# GIF palette quantizer speed: 1 is slowest and best, 30 is fastest.
encode_speed = 10

[optimize]
# "auto" uses gifsicle when installed and the built-in rescaler otherwise.
# "none" writes the GIF exactly as encoded.
backend = "auto"
# Size to aim for, in bytes.
target_bytes = 131072
# Resize factor for the first pass.
scale = 0.7
# Each further pass multiplies the scale by this.
scale_step = 0.85
# Number of passes to try before accepting an oversized result.
max_passes = 1

[frames]
# Keep the numbered frame files written to the frames directory.
keep = false
# "jpg" or "png". JPEG drops the alpha channel.
format = "jpg"

[processing]
# Maximum parallel workers. Omit to use every CPU core.
# max_processes = 4
"##
}
