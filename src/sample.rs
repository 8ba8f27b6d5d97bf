//! Deterministic frame subsampling.
//!
//! Keeps one frame per `stride` consecutive angle-indices, the last of each
//! group: with the default stride of 4 that is indices 3, 7, 11, …. Selection
//! is by angle-index, never by position in the input, so a skipped frame
//! leaves a gap instead of shifting every later pick.

use crate::types::Frame;

/// Stride used when none is configured.
pub const DEFAULT_STRIDE: u32 = 4;

/// Whether a frame at `angle_index` survives sampling.
///
/// A stride of 0 is treated as 1 (keep everything).
pub fn is_kept(angle_index: u32, stride: u32) -> bool {
    let stride = stride.max(1);
    angle_index % stride == stride - 1
}

/// Angle-indices a full sweep of `total` steps would keep.
pub fn sampled_indices(total: u32, stride: u32) -> Vec<u32> {
    (0..total).filter(|&i| is_kept(i, stride)).collect()
}

/// Select the sampled subsequence, ascending by angle-index.
///
/// Input order does not matter. Duplicate angle-indices keep only their
/// first occurrence.
pub fn sample_frames(mut frames: Vec<Frame>, stride: u32) -> Vec<Frame> {
    frames.retain(|f| is_kept(f.angle_index, stride));
    frames.sort_by_key(|f| f.angle_index);
    frames.dedup_by_key(|f| f.angle_index);
    frames
}
