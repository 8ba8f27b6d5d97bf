//! Optimizer trait and shared error type.
//!
//! An [`Optimizer`] takes an encoded animation and tries to make it smaller
//! at a given scale factor. Two implementations ship with the crate:
//!
//! | Optimizer | How |
//! |---|---|
//! | [`Gifsicle`](super::gifsicle::Gifsicle) | external `gifsicle --optimize --scale` over stdin/stdout |
//! | [`Rescale`](super::rescale::Rescale) | resize frames in-process (Lanczos3) and re-encode |
//!
//! Optimizers receive both the sequence and its encoded bytes so each can
//! work from whichever representation it needs.

use super::Scale;
use crate::assemble::{AnimationSequence, AssembleError, OutputArtifact};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OptimizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0} was not found on PATH")]
    ToolMissing(String),
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },
    #[error("re-encoding failed: {0}")]
    Encode(#[from] AssembleError),
}

/// One size-reduction pass.
pub trait Optimizer: Sync {
    /// Short name shown in progress output and the run report.
    fn name(&self) -> &'static str;

    /// Produce a smaller artifact at `scale` of the original frame size.
    ///
    /// `artifact` is always the unoptimized encoding of `sequence`, so
    /// repeated passes never compound their losses.
    fn optimize(
        &self,
        sequence: &AnimationSequence,
        artifact: &OutputArtifact,
        scale: Scale,
    ) -> Result<OutputArtifact, OptimizeError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::config::AnimationConfig;
    use crate::test_helpers::frames_with_indices;
    use std::sync::Mutex;

    /// Mock optimizer that returns canned sizes and records each call.
    /// Uses Mutex (not RefCell) so it is Sync like real optimizers.
    #[derive(Default)]
    pub struct MockOptimizer {
        /// Output sizes returned by successive passes, in order.
        pub sizes: Mutex<Vec<usize>>,
        pub fail: bool,
        pub calls: Mutex<Vec<RecordedPass>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedPass {
        pub scale: f32,
        pub input_len: usize,
    }

    impl MockOptimizer {
        pub fn with_sizes(sizes: Vec<usize>) -> Self {
            Self {
                sizes: Mutex::new(sizes),
                ..Self::default()
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn get_calls(&self) -> Vec<RecordedPass> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Optimizer for MockOptimizer {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn optimize(
            &self,
            _sequence: &AnimationSequence,
            artifact: &OutputArtifact,
            scale: Scale,
        ) -> Result<OutputArtifact, OptimizeError> {
            self.calls.lock().unwrap().push(RecordedPass {
                scale: scale.value(),
                input_len: artifact.len(),
            });
            if self.fail {
                return Err(OptimizeError::ToolMissing("mock".into()));
            }
            let mut sizes = self.sizes.lock().unwrap();
            let len = if sizes.is_empty() {
                artifact.len()
            } else {
                sizes.remove(0)
            };
            Ok(OutputArtifact::new(vec![0; len]))
        }
    }

    #[test]
    fn mock_returns_sizes_in_order() {
        let seq =
            AnimationSequence::new(frames_with_indices([3]), &AnimationConfig::default()).unwrap();
        let optimizer = MockOptimizer::with_sizes(vec![30, 20]);
        let input = OutputArtifact::new(vec![0; 50]);

        let first = optimizer.optimize(&seq, &input, Scale::new(0.7)).unwrap();
        let second = optimizer.optimize(&seq, &input, Scale::new(0.5)).unwrap();
        assert_eq!(first.len(), 30);
        assert_eq!(second.len(), 20);

        let calls = optimizer.get_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], RecordedPass { scale: 0.7, input_len: 50 });
        assert_eq!(calls[1].scale, 0.5);
    }

    #[test]
    fn mock_failure_is_an_error() {
        let seq =
            AnimationSequence::new(frames_with_indices([3]), &AnimationConfig::default()).unwrap();
        let result = MockOptimizer::failing().optimize(
            &seq,
            &OutputArtifact::new(vec![1, 2, 3]),
            Scale::new(0.7),
        );
        assert!(matches!(result, Err(OptimizeError::ToolMissing(_))));
    }
}
