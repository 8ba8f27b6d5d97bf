//! One complete run: sweep and persist → sample → assemble → encode → optimize.
//!
//! ```text
//! source ──▶ sweep (parallel, merged by angle-index)
//!               │  each frame ──▶ frame store (optional, numbered files)
//!               │  keep i % stride == stride - 1
//!               ▼
//!            sampled frames ──▶ AnimationSequence ──▶ GIF ──▶ optimize_to_target
//! ```
//!
//! Sampling happens inside the sweep, so a run holds only the sampled frames
//! in memory, never the whole turn. The stages only ever pass ordered
//! in-memory frames to each other. The frame store is an output, not an
//! input, so the assembled order is the angle order regardless of how files
//! come back from a directory listing.
//!
//! Progress goes out as [`PipelineEvent`]s on an optional channel. The
//! returned [`RunReport`] is the machine-readable record of the run.

use crate::assemble::{AnimationSequence, AssembleError, EncodeSpeed, OutputArtifact, encode_gif};
use crate::config::RotateConfig;
use crate::optimize::{OptimizeSettings, Optimizer, PassReport, optimize_to_target};
use crate::sample::sample_frames;
use crate::store::{FrameStore, StoreError};
use crate::sweep::{CancelToken, SweepError, SweepEvent, SweepParams, sweep};
use crate::types::AxisMode;
use image::DynamicImage;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Sweep failed: {0}")]
    Sweep(#[from] SweepError),
    #[error("Frame store error: {0}")]
    Store(#[from] StoreError),
    #[error("Assembly failed: {0}")]
    Assemble(#[from] AssembleError),
}

/// Progress events emitted while a run executes.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Sweep(SweepEvent),
    FramesPersisted {
        count: usize,
        dir: PathBuf,
    },
    Sampled {
        kept: usize,
        total: usize,
        stride: u32,
    },
    Encoded {
        frames: usize,
        bytes: usize,
    },
    Optimized {
        optimizer: String,
        passes: Vec<PassReport>,
        met_target: bool,
        failure: Option<String>,
    },
}

impl From<SweepEvent> for PipelineEvent {
    fn from(event: SweepEvent) -> Self {
        Self::Sweep(event)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedReport {
    pub angle_index: u32,
    pub reason: String,
}

/// Everything worth knowing about a finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub angles: u32,
    pub axis: AxisMode,
    pub stride: u32,
    pub width: u32,
    pub height: u32,
    /// Steps that were warped. Every non-skipped step when frames are
    /// stored, otherwise only the sampled ones.
    pub rendered: usize,
    pub skipped: Vec<SkippedReport>,
    /// Angle-indices of the frames in the animation, in display order.
    pub sampled: Vec<u32>,
    pub frame_duration_ms: u64,
    pub looping: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames_dir: Option<PathBuf>,
    pub encoded_bytes: usize,
    pub final_bytes: usize,
    pub target_bytes: usize,
    pub met_target: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimizer: Option<String>,
    pub passes: Vec<PassReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimize_failure: Option<String>,
    /// SHA-256 over the assembled sequence. Equal inputs give equal values.
    pub fingerprint: String,
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub artifact: OutputArtifact,
    pub report: RunReport,
}

/// Execute one run against an already prepared source image.
///
/// `optimizer` of `None` writes the GIF exactly as encoded. Optimization
/// problems never fail the run; they end up in the report instead.
pub fn run(
    source: &DynamicImage,
    config: &RotateConfig,
    optimizer: Option<&dyn Optimizer>,
    store: Option<&FrameStore>,
    cancel: Option<&CancelToken>,
    events: Option<Sender<PipelineEvent>>,
) -> Result<RunOutput, PipelineError> {
    let stride = config.sampling.stride;
    let params = SweepParams {
        angles: config.sweep.angles,
        axis: config.sweep.axis,
        interpolation: config.sweep.interpolation,
        stride,
    };
    let swept = sweep(source, &params, store, cancel, events.clone()).map_err(|e| match e {
        SweepError::Store(e) => PipelineError::Store(e),
        other => PipelineError::Sweep(other),
    })?;

    if let Some(store) = store {
        emit(&events, PipelineEvent::FramesPersisted {
            count: swept.rendered,
            dir: store.dir().to_path_buf(),
        });
    }

    let eligible = usize::try_from(params.angles)
        .unwrap_or(usize::MAX)
        .saturating_sub(swept.skipped.len());
    // The sweep already applied the stride; this also pins order and uniqueness
    let sampled = sample_frames(swept.frames, stride);
    emit(&events, PipelineEvent::Sampled {
        kept: sampled.len(),
        total: eligible,
        stride,
    });

    let sequence = AnimationSequence::new(sampled, &config.animation)?;
    let speed = EncodeSpeed::new(config.animation.encode_speed);
    let encoded = encode_gif(&sequence, speed)?;
    let encoded_bytes = encoded.len();
    emit(&events, PipelineEvent::Encoded {
        frames: sequence.len(),
        bytes: encoded_bytes,
    });

    let settings = OptimizeSettings::from_config(&config.optimize);
    let (artifact, passes, failure) = match optimizer {
        Some(optimizer) => {
            let outcome = optimize_to_target(optimizer, &sequence, encoded, &settings);
            emit(&events, PipelineEvent::Optimized {
                optimizer: optimizer.name().to_string(),
                passes: outcome.passes.clone(),
                met_target: outcome.met_target,
                failure: outcome.failure.clone(),
            });
            (outcome.artifact, outcome.passes, outcome.failure)
        }
        None => (encoded, Vec::new(), None),
    };

    let (width, height) = sequence.dimensions();
    let report = RunReport {
        angles: params.angles,
        axis: params.axis,
        stride,
        width,
        height,
        rendered: swept.rendered,
        skipped: swept
            .skipped
            .iter()
            .map(|s| SkippedReport {
                angle_index: s.angle_index,
                reason: s.reason.to_string(),
            })
            .collect(),
        sampled: sequence.angle_indices(),
        frame_duration_ms: config.animation.frame_duration_ms,
        looping: sequence.looping(),
        frames_dir: store.map(|s| s.dir().to_path_buf()),
        encoded_bytes,
        final_bytes: artifact.len(),
        target_bytes: settings.target_bytes,
        met_target: artifact.len() <= settings.target_bytes,
        optimizer: optimizer.map(|o| o.name().to_string()),
        passes,
        optimize_failure: failure,
        fingerprint: fingerprint(&sequence),
    };

    Ok(RunOutput { artifact, report })
}

/// Hash of order, matrices, pixels and timing of a sequence, as lowercase hex.
///
/// Independent of the GIF encoder, so it stays stable across encoder
/// settings and optimizer passes.
pub fn fingerprint(sequence: &AnimationSequence) -> String {
    let mut hasher = Sha256::new();
    for frame in sequence.frames() {
        hasher.update(frame.angle_index.to_le_bytes());
        for value in frame.matrix.to_rows().iter().flatten() {
            hasher.update(value.to_bits().to_le_bytes());
        }
        hasher.update(frame.image.width().to_le_bytes());
        hasher.update(frame.image.height().to_le_bytes());
        hasher.update(frame.image.as_bytes());
    }
    let millis = u64::try_from(sequence.frame_duration().as_millis()).unwrap_or(u64::MAX);
    hasher.update(millis.to_le_bytes());
    hasher.update([u8::from(sequence.looping())]);
    format!("{:x}", hasher.finalize())
}

fn emit(events: &Option<Sender<PipelineEvent>>, event: PipelineEvent) {
    if let Some(tx) = events {
        tx.send(event).ok();
    }
}
