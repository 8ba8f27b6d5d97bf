//! The rotation sweep: one warped frame per angle-index.
//!
//! Each step is a pure function of the angle-index, the axis mode and the
//! shared read-only source, so steps run as independent tasks on the rayon
//! pool. Results are merged back by angle-index before anything downstream
//! sees them; scheduling order never leaks into the frame order.
//!
//! Only frames that survive sampling are held in memory. With a
//! [`FrameStore`] attached, every frame is written to disk as soon as it is
//! warped and the unsampled ones are dropped right after. Without one,
//! unsampled steps are never warped; their matrix is still built and checked
//! so that skips are reported for every angle-index.
//!
//! A frame whose matrix is singular is skipped and recorded, and the sweep
//! carries on. Cancelling a sweep discards everything produced so far.

use crate::projection::{ProjectionMatrix, build_projection_matrix};
use crate::sample::{DEFAULT_STRIDE, is_kept};
use crate::source::eight_bit_view;
use crate::store::{FrameStore, StoreError};
use crate::types::{AxisMode, Frame, RotationAngles, Translation};
use crate::warp::{Interpolation, WarpError, invert, warp_image};
use image::{DynamicImage, GenericImageView};
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use thiserror::Error;

/// Horizontal camera offset applied at every step of a `y` sweep.
pub const Y_AXIS_OFFSET: f64 = 5.0;

#[derive(Error, Debug)]
pub enum SweepError {
    #[error("angle count must be at least 1")]
    NoAngles,
    #[error("source image has no pixels")]
    EmptySource,
    #[error("sweep cancelled after {completed} of {total} frames")]
    Cancelled { completed: usize, total: u32 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Parameters that stay fixed for a whole sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepParams {
    /// Number of angle-indices, `0..angles`.
    pub angles: u32,
    pub axis: AxisMode,
    pub interpolation: Interpolation,
    /// Sampling stride; only frames kept by it are returned.
    pub stride: u32,
}

impl Default for SweepParams {
    fn default() -> Self {
        Self {
            angles: 360,
            axis: AxisMode::Y,
            interpolation: Interpolation::Bilinear,
            stride: DEFAULT_STRIDE,
        }
    }
}

/// Progress reported while a sweep runs.
///
/// `FrameRendered` and `FrameSkipped` arrive in completion order, which is
/// not angle order when the pool has more than one thread. `FrameRendered`
/// is only sent for steps that were actually warped.
#[derive(Debug, Clone, PartialEq)]
pub enum SweepEvent {
    Started { total: u32 },
    FrameRendered { angle_index: u32 },
    FrameSkipped { angle_index: u32, reason: String },
    Finished { rendered: usize, skipped: usize },
}

/// A step that produced no frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFrame {
    pub angle_index: u32,
    pub reason: WarpError,
}

/// Sampled frames in ascending angle-index order, plus the steps that were
/// skipped at any angle-index.
#[derive(Debug, Clone)]
pub struct SweepOutput {
    pub frames: Vec<Frame>,
    pub skipped: Vec<SkippedFrame>,
    /// Steps that were warped, sampled or not.
    pub rendered: usize,
}

/// Shared flag for stopping a sweep from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What one step left behind.
enum Step {
    /// Warped and kept for sampling.
    Kept(Frame),
    /// Warped and written to the store, then dropped.
    Stored,
    /// Matrix checked but not warped.
    Checked,
    Skipped(WarpError),
    Cancelled,
}

/// Angles and translation handed to the matrix builder at one step.
pub fn step_parameters(axis: AxisMode, angle_index: u32) -> (RotationAngles, Translation) {
    let degrees = f64::from(angle_index);
    match axis {
        AxisMode::Y => (
            RotationAngles {
                phi: degrees,
                ..Default::default()
            },
            Translation {
                dx: Y_AXIS_OFFSET,
                dy: 0.0,
            },
        ),
        AxisMode::Yz => (
            RotationAngles {
                phi: degrees,
                gamma: degrees,
                ..Default::default()
            },
            Translation::default(),
        ),
    }
}

fn step_matrix(source: &DynamicImage, axis: AxisMode, angle_index: u32) -> ProjectionMatrix {
    let (width, height) = source.dimensions();
    let (angles, translation) = step_parameters(axis, angle_index);
    build_projection_matrix(angles, translation, width, height)
}

/// Build the matrix for one step and warp the source through it.
pub fn render_frame(
    source: &DynamicImage,
    params: &SweepParams,
    angle_index: u32,
) -> Result<Frame, WarpError> {
    let matrix = step_matrix(source, params.axis, angle_index);
    let image = warp_image(source, &matrix, params.interpolation)?;
    Ok(Frame {
        angle_index,
        matrix,
        image,
    })
}

fn run_step(
    source: &DynamicImage,
    params: &SweepParams,
    store: Option<&FrameStore>,
    angle_index: u32,
) -> Result<Step, StoreError> {
    let kept = is_kept(angle_index, params.stride);
    if !kept && store.is_none() {
        let matrix = step_matrix(source, params.axis, angle_index);
        return Ok(match invert(&matrix) {
            Ok(_) => Step::Checked,
            Err(reason) => Step::Skipped(reason),
        });
    }
    let frame = match render_frame(source, params, angle_index) {
        Ok(frame) => frame,
        Err(reason) => return Ok(Step::Skipped(reason)),
    };
    if let Some(store) = store {
        store.persist_frame(&frame)?;
    }
    Ok(if kept { Step::Kept(frame) } else { Step::Stored })
}

/// Run the full sweep on the current rayon pool.
///
/// Every warped frame goes to `store` when one is given; only the frames
/// kept by `params.stride` come back. A store write failure stops the sweep.
///
/// Events are converted with `From<SweepEvent>` so callers can feed them into
/// a wider event stream.
pub fn sweep<E>(
    source: &DynamicImage,
    params: &SweepParams,
    store: Option<&FrameStore>,
    cancel: Option<&CancelToken>,
    events: Option<Sender<E>>,
) -> Result<SweepOutput, SweepError>
where
    E: From<SweepEvent> + Send,
{
    if params.angles == 0 {
        return Err(SweepError::NoAngles);
    }
    let (width, height) = source.dimensions();
    if width == 0 || height == 0 {
        return Err(SweepError::EmptySource);
    }
    let source = eight_bit_view(source);
    let cancelled = || cancel.is_some_and(CancelToken::is_cancelled);

    emit(&events, SweepEvent::Started {
        total: params.angles,
    });

    let mut steps: Vec<(u32, Step)> = (0..params.angles)
        .into_par_iter()
        .map_with(events.clone(), |events, angle_index| {
            if cancelled() {
                return Ok((angle_index, Step::Cancelled));
            }
            let step = run_step(&source, params, store, angle_index)?;
            match &step {
                Step::Kept(_) | Step::Stored => {
                    emit(events, SweepEvent::FrameRendered { angle_index })
                }
                Step::Skipped(e) => emit(events, SweepEvent::FrameSkipped {
                    angle_index,
                    reason: e.to_string(),
                }),
                Step::Checked | Step::Cancelled => {}
            }
            Ok::<_, StoreError>((angle_index, step))
        })
        .collect::<Result<_, _>>()?;

    let interrupted = steps
        .iter()
        .any(|(_, step)| matches!(step, Step::Cancelled));
    if cancelled() || interrupted {
        let completed = steps
            .iter()
            .filter(|(_, step)| !matches!(step, Step::Cancelled))
            .count();
        return Err(SweepError::Cancelled {
            completed,
            total: params.angles,
        });
    }

    // Merge barrier: downstream stages rely on ascending angle-index.
    steps.sort_unstable_by_key(|(angle_index, _)| *angle_index);

    let mut frames = Vec::new();
    let mut skipped = Vec::new();
    let mut rendered = 0;
    for (angle_index, step) in steps {
        match step {
            Step::Kept(frame) => {
                rendered += 1;
                frames.push(frame);
            }
            Step::Stored => rendered += 1,
            Step::Skipped(reason) => skipped.push(SkippedFrame {
                angle_index,
                reason,
            }),
            Step::Checked | Step::Cancelled => {}
        }
    }

    emit(&events, SweepEvent::Finished {
        rendered,
        skipped: skipped.len(),
    });

    Ok(SweepOutput {
        frames,
        skipped,
        rendered,
    })
}

fn emit<E: From<SweepEvent>>(events: &Option<Sender<E>>, event: SweepEvent) {
    if let Some(tx) = events {
        tx.send(event.into()).ok();
    }
}
