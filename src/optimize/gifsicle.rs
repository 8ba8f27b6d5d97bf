//! Size optimization through the external `gifsicle` binary.
//!
//! The artifact is piped through `gifsicle --optimize --scale=<s> -w`, so no
//! temporary files are needed. The system binary is used rather than a
//! library binding; when it is missing the pass fails with
//! [`OptimizeError::ToolMissing`] and the caller keeps the unoptimized GIF.

use super::Scale;
use super::backend::{OptimizeError, Optimizer};
use crate::assemble::{AnimationSequence, OutputArtifact};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

const PROGRAM: &str = "gifsicle";

pub fn is_gifsicle_on_path() -> bool {
    Command::new(PROGRAM)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Command-line arguments for one pass at `scale`.
pub fn gifsicle_args(scale: Scale) -> Vec<String> {
    vec![
        "--optimize".to_string(),
        format!("--scale={:.3}", scale.value()),
        // Suppress warnings
        "-w".to_string(),
    ]
}

pub struct Gifsicle {
    program: PathBuf,
}

impl Gifsicle {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from(PROGRAM),
        }
    }

    /// Use a specific binary instead of looking `gifsicle` up on PATH.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for Gifsicle {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer for Gifsicle {
    fn name(&self) -> &'static str {
        PROGRAM
    }

    fn optimize(
        &self,
        _sequence: &AnimationSequence,
        artifact: &OutputArtifact,
        scale: Scale,
    ) -> Result<OutputArtifact, OptimizeError> {
        let mut child = Command::new(&self.program)
            .args(gifsicle_args(scale))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => {
                    OptimizeError::ToolMissing(self.program.display().to_string())
                }
                _ => OptimizeError::Io(e),
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("gifsicle stdin was not captured"))?;

        // Feed stdin from a second thread so a full stdout pipe cannot
        // deadlock against a full stdin pipe.
        let (output, written) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(artifact.bytes()));
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("gifsicle stdin writer panicked")));
            (output, written)
        });
        let output = output?;

        if !output.status.success() {
            return Err(OptimizeError::ToolFailed {
                tool: PROGRAM.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        written?;
        Ok(OutputArtifact::new(output.stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::{EncodeSpeed, encode_gif};
    use crate::config::AnimationConfig;
    use crate::test_helpers::frames_with_size;

    fn sample_sequence() -> AnimationSequence {
        AnimationSequence::new(frames_with_size([3, 7], 16, 16), &AnimationConfig::default())
            .unwrap()
    }

    #[test]
    fn args_carry_scale_and_quiet_flag() {
        assert_eq!(
            gifsicle_args(Scale::new(0.7)),
            vec!["--optimize", "--scale=0.700", "-w"]
        );
    }

    #[test]
    fn missing_binary_reports_tool_missing() {
        let seq = sample_sequence();
        let artifact = encode_gif(&seq, EncodeSpeed::default()).unwrap();
        let optimizer = Gifsicle::with_program("/nonexistent/bin/gifsicle");
        let result = optimizer.optimize(&seq, &artifact, Scale::new(0.7));
        assert!(matches!(result, Err(OptimizeError::ToolMissing(_))));
    }

    #[test]
    fn optimizes_when_available() {
        if !is_gifsicle_on_path() {
            return;
        }
        let seq = sample_sequence();
        let artifact = encode_gif(&seq, EncodeSpeed::default()).unwrap();
        let optimized = Gifsicle::new()
            .optimize(&seq, &artifact, Scale::new(0.5))
            .unwrap();
        assert!(optimized.bytes().starts_with(b"GIF8"));
    }
}
