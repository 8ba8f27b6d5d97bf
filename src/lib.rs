//! # gif-rotate
//!
//! Turns a single still image into a looping animated GIF of the image
//! spinning in 3D. Every degree of the sweep is rendered by warping the image
//! through a perspective projection; a subset of those frames is assembled
//! into the animation, which is then squeezed toward a target file size.
//!
//! # Architecture: One Pass, Ordered Frames
//!
//! ```text
//! 1. Source    image file  →  8-bit DynamicImage     (decode, normalize, resize)
//! 2. Sweep     source      →  sampled Vec<Frame>     (one homography per angle-index)
//! 3. Sample    angle-index →  every stride-th frame  (by angle-index, not by file)
//! 4. Assemble  frames      →  GIF bytes              (fixed timing, infinite loop)
//! 5. Optimize  GIF bytes   →  smaller GIF bytes      (gifsicle or built-in rescale)
//! ```
//!
//! Every frame carries its angle-index from the moment it is rendered, and
//! each stage hands the next an ordered `Vec`. Rendering runs on the rayon
//! pool, but the sweep merges results by angle-index before returning, so
//! the thread count never changes the output. Sampling is applied inside the
//! sweep: only sampled frames stay in memory, while the optional frame store
//! receives every frame as soon as it is warped.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`projection`] | Builds the 3x3 homography for a set of rotation angles |
//! | [`warp`] | Inverse-maps a source image through a homography (bilinear or nearest) |
//! | [`sweep`] | Runs one warp per angle-index in parallel, skips singular frames |
//! | [`sample`] | Keeps the last angle-index of every `stride` consecutive ones |
//! | [`assemble`] | Validated animation sequences and GIF encoding |
//! | [`optimize`] | Size-targeted optimization via gifsicle or in-process rescaling |
//! | [`source`] | Decoding, bit-depth normalization and the optional ideal-size resize |
//! | [`store`] | Writes numbered frame files to a working directory |
//! | [`pipeline`] | Composes all stages into one run and produces the run report |
//! | [`config`] | Layered `TOML` configuration: defaults, file, command line |
//! | [`types`] | Shared value types (`AxisMode`, `RotationAngles`, `Frame`) |
//! | [`output`] | CLI output formatting for progress events and the run report |
//!
//! # Design Decisions
//!
//! ## The Image Sits on the Plane z = 0
//!
//! The decenter step lifts pixel coordinates into 3D with z = 0, and the
//! camera sits at distance `f` with focal length `f`. With all angles zero
//! and no translation the composed matrix is exactly the identity, so frame
//! 0 of a `yz` sweep is a pixel-exact copy of the source.
//!
//! ## Singular Frames Are Skipped, Not Fatal
//!
//! In a `yz` sweep at 90° and 270° the rotated image plane passes through
//! the camera, and the homography cannot be inverted. Those steps are
//! recorded in the run report and left out; the rest of the sweep is
//! unaffected. The horizontal offset of a `y` sweep keeps the plane clear of
//! the camera, so every step renders.
//!
//! ## Frames on Disk Are Write-Only
//!
//! The numbered frame files exist for inspection. Assembly never lists the
//! directory, so a file system that returns `10.jpg` before `2.jpg` cannot
//! reorder the animation.

pub mod assemble;
pub mod config;
pub mod optimize;
pub mod output;
pub mod pipeline;
pub mod projection;
pub mod sample;
pub mod source;
pub mod store;
pub mod sweep;
pub mod types;
pub mod warp;

#[cfg(test)]
pub(crate) mod test_helpers;
