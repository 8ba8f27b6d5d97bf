//! CLI output formatting for runs.
//!
//! # Information-First Display
//!
//! Progress lines name the stage and what it produced, with file-system
//! paths as secondary context on indented lines. Per-frame lines are only
//! printed for frames that were skipped; a normal sweep is summarized in one
//! line.
//!
//! # Output Format
//!
//! ## Progress
//!
//! ```text
//! Rendering 360 angles
//!     090 skipped: projection matrix is singular (normalized determinant 0e0)
//! Rendered 358 frames (2 skipped)
//! Saved 358 frames
//!     Directory: frames/
//! Sampled 90 of 358 frames (stride 4)
//! Encoded 90 frames: 1.2 MiB
//! Optimized with gifsicle
//!     pass 1 at scale 0.70: 412.3 KiB
//! ```
//!
//! ## Report
//!
//! ```text
//! Sweep
//!     360 angles, axis yz, 640x480
//!     358 rendered, 2 skipped (090, 270)
//! Animation
//!     90 frames, 50 ms each, looping
//! Output
//!     Encoded: 1.2 MiB
//!     Final: 412.3 KiB (target 128.0 KiB, missed)
//!     Fingerprint: 3f2a…
//! ```
//!
//! # Architecture
//!
//! Each format function returns `Vec<String>` for testability and has a
//! `print_*` wrapper that writes to stdout. Format functions are pure: no
//! I/O, no side effects.

use crate::pipeline::{PipelineEvent, RunReport};
use crate::sweep::SweepEvent;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format an angle-index as 3-digit zero-padded.
fn format_index(index: u32) -> String {
    format!("{:0>3}", index)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count using binary units.
fn format_bytes(bytes: usize) -> String {
    const UNITS: [&str; 3] = ["KiB", "MiB", "GiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

fn plural(count: usize, word: &str) -> String {
    match (count, word.ends_with('s')) {
        (1, _) => format!("{} {}", count, word),
        (_, true) => format!("{} {}es", count, word),
        _ => format!("{} {}s", count, word),
    }
}

// ============================================================================
// Progress events
// ============================================================================

/// Format one progress event. May return no lines.
pub fn format_event(event: &PipelineEvent) -> Vec<String> {
    match event {
        PipelineEvent::Sweep(SweepEvent::Started { total }) => {
            vec![format!("Rendering {} angles", total)]
        }
        PipelineEvent::Sweep(SweepEvent::FrameRendered { .. }) => Vec::new(),
        PipelineEvent::Sweep(SweepEvent::FrameSkipped {
            angle_index,
            reason,
        }) => vec![format!(
            "{}{} skipped: {}",
            indent(1),
            format_index(*angle_index),
            reason
        )],
        PipelineEvent::Sweep(SweepEvent::Finished { rendered, skipped }) => {
            vec![format!(
                "Rendered {} ({} skipped)",
                plural(*rendered, "frame"),
                skipped
            )]
        }
        PipelineEvent::FramesPersisted { count, dir } => vec![
            format!("Saved {}", plural(*count, "frame")),
            format!("{}Directory: {}", indent(1), dir.display()),
        ],
        PipelineEvent::Sampled {
            kept,
            total,
            stride,
        } => vec![format!(
            "Sampled {} of {} frames (stride {})",
            kept, total, stride
        )],
        PipelineEvent::Encoded { frames, bytes } => vec![format!(
            "Encoded {}: {}",
            plural(*frames, "frame"),
            format_bytes(*bytes)
        )],
        PipelineEvent::Optimized {
            optimizer,
            passes,
            failure,
            ..
        } => {
            let mut lines = vec![format!("Optimized with {}", optimizer)];
            for (i, pass) in passes.iter().enumerate() {
                lines.push(format!(
                    "{}pass {} at scale {:.2}: {}",
                    indent(1),
                    i + 1,
                    pass.scale,
                    format_bytes(pass.bytes)
                ));
            }
            if let Some(reason) = failure {
                lines.push(format!("{}failed: {}", indent(1), reason));
            }
            lines
        }
    }
}

// ============================================================================
// Run report
// ============================================================================

/// Format the end-of-run summary.
pub fn format_report(report: &RunReport) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push("Sweep".to_string());
    lines.push(format!(
        "{}{} angles, axis {}, {}x{}",
        indent(1),
        report.angles,
        report.axis,
        report.width,
        report.height
    ));
    let skipped = if report.skipped.is_empty() {
        "0 skipped".to_string()
    } else {
        let indices: Vec<String> = report
            .skipped
            .iter()
            .map(|s| format_index(s.angle_index))
            .collect();
        format!("{} skipped ({})", report.skipped.len(), indices.join(", "))
    };
    lines.push(format!("{}{} rendered, {}", indent(1), report.rendered, skipped));
    if let Some(dir) = &report.frames_dir {
        lines.push(format!("{}Frames: {}", indent(1), dir.display()));
    }

    lines.push("Animation".to_string());
    lines.push(format!(
        "{}{}, {} ms each, {}",
        indent(1),
        plural(report.sampled.len(), "frame"),
        report.frame_duration_ms,
        if report.looping { "looping" } else { "plays once" }
    ));

    lines.push("Output".to_string());
    lines.push(format!(
        "{}Encoded: {}",
        indent(1),
        format_bytes(report.encoded_bytes)
    ));
    if let Some(optimizer) = &report.optimizer {
        lines.push(format!(
            "{}Optimizer: {} ({})",
            indent(1),
            optimizer,
            plural(report.passes.len(), "pass")
        ));
    }
    if let Some(reason) = &report.optimize_failure {
        lines.push(format!("{}Optimizer failed: {}", indent(1), reason));
    }
    lines.push(format!(
        "{}Final: {} (target {}, {})",
        indent(1),
        format_bytes(report.final_bytes),
        format_bytes(report.target_bytes),
        if report.met_target { "met" } else { "missed" }
    ));
    lines.push(format!("{}Fingerprint: {}", indent(1), report.fingerprint));

    lines
}

/// Print the end-of-run summary to stdout.
pub fn print_report(report: &RunReport) {
    for line in format_report(report) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::PassReport;
    use crate::pipeline::SkippedReport;
    use crate::types::AxisMode;
    use crate::warp::WarpError;
    use std::path::PathBuf;

    fn report() -> RunReport {
        RunReport {
            angles: 360,
            axis: AxisMode::Yz,
            stride: 4,
            width: 640,
            height: 480,
            rendered: 358,
            skipped: vec![
                SkippedReport {
                    angle_index: 90,
                    reason: "singular".into(),
                },
                SkippedReport {
                    angle_index: 270,
                    reason: "singular".into(),
                },
            ],
            sampled: (0..90).map(|i| i * 4 + 3).collect(),
            frame_duration_ms: 50,
            looping: true,
            frames_dir: None,
            encoded_bytes: 1_258_291,
            final_bytes: 422_195,
            target_bytes: 131_072,
            met_target: false,
            optimizer: Some("gifsicle".into()),
            passes: vec![PassReport {
                scale: 0.7,
                bytes: 422_195,
            }],
            optimize_failure: None,
            fingerprint: "abc123".into(),
        }
    }

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_bytes_uses_binary_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.0 KiB");
        assert_eq!(format_bytes(131_072), "128.0 KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024 / 2), "1.5 MiB");
    }

    #[test]
    fn format_index_pads_to_three() {
        assert_eq!(format_index(7), "007");
        assert_eq!(format_index(1234), "1234");
    }

    #[test]
    fn plural_handles_one() {
        assert_eq!(plural(1, "frame"), "1 frame");
        assert_eq!(plural(2, "frame"), "2 frames");
        assert_eq!(plural(3, "pass"), "3 passes");
    }

    // =========================================================================
    // Event tests
    // =========================================================================

    #[test]
    fn rendered_frames_are_silent() {
        let event = PipelineEvent::Sweep(SweepEvent::FrameRendered { angle_index: 3 });
        assert!(format_event(&event).is_empty());
    }

    #[test]
    fn skipped_frame_is_indented() {
        let event = PipelineEvent::Sweep(SweepEvent::FrameSkipped {
            angle_index: 90,
            reason: "singular".into(),
        });
        assert_eq!(format_event(&event), vec!["    090 skipped: singular"]);
    }

    #[test]
    fn singular_skip_line_matches_warp_error() {
        let reason = WarpError::Singular { determinant: 0.0 }.to_string();
        let event = PipelineEvent::Sweep(SweepEvent::FrameSkipped {
            angle_index: 90,
            reason,
        });
        assert_eq!(format_event(&event), vec![
            "    090 skipped: projection matrix is singular (normalized determinant 0e0)"
        ]);
    }

    #[test]
    fn sweep_summary_line() {
        let event = PipelineEvent::Sweep(SweepEvent::Finished {
            rendered: 358,
            skipped: 2,
        });
        assert_eq!(format_event(&event), vec!["Rendered 358 frames (2 skipped)"]);
    }

    #[test]
    fn persisted_shows_directory() {
        let event = PipelineEvent::FramesPersisted {
            count: 360,
            dir: PathBuf::from("frames"),
        };
        assert_eq!(format_event(&event), vec![
            "Saved 360 frames",
            "    Directory: frames"
        ]);
    }

    #[test]
    fn sampled_line() {
        let event = PipelineEvent::Sampled {
            kept: 90,
            total: 360,
            stride: 4,
        };
        assert_eq!(format_event(&event), vec![
            "Sampled 90 of 360 frames (stride 4)"
        ]);
    }

    #[test]
    fn optimized_lists_passes_and_failure() {
        let event = PipelineEvent::Optimized {
            optimizer: "builtin".into(),
            passes: vec![PassReport {
                scale: 0.7,
                bytes: 2048,
            }],
            met_target: false,
            failure: Some("boom".into()),
        };
        assert_eq!(format_event(&event), vec![
            "Optimized with builtin",
            "    pass 1 at scale 0.70: 2.0 KiB",
            "    failed: boom",
        ]);
    }

    // =========================================================================
    // Report tests
    // =========================================================================

    #[test]
    fn report_lists_skipped_indices() {
        let lines = format_report(&report());
        assert_eq!(lines[0], "Sweep");
        assert_eq!(lines[1], "    360 angles, axis yz, 640x480");
        assert_eq!(lines[2], "    358 rendered, 2 skipped (090, 270)");
    }

    #[test]
    fn report_shows_animation_timing() {
        let lines = format_report(&report());
        assert!(lines.contains(&"    90 frames, 50 ms each, looping".to_string()));
    }

    #[test]
    fn report_shows_target_outcome() {
        let lines = format_report(&report());
        assert!(lines.contains(&"    Optimizer: gifsicle (1 pass)".to_string()));
        assert!(lines.contains(&"    Final: 412.3 KiB (target 128.0 KiB, missed)".to_string()));
        assert_eq!(lines.last().unwrap(), "    Fingerprint: abc123");
    }

    #[test]
    fn report_without_optimizer_or_skips() {
        let mut r = report();
        r.skipped.clear();
        r.optimizer = None;
        r.passes.clear();
        r.frames_dir = Some(PathBuf::from("out/frames"));
        let lines = format_report(&r);
        assert!(lines.contains(&"    358 rendered, 0 skipped".to_string()));
        assert!(lines.contains(&"    Frames: out/frames".to_string()));
        assert!(!lines.iter().any(|l| l.contains("Optimizer")));
    }
}
