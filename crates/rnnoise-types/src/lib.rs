//! Shared types for the frame denoising workspace.
//!
//! Defines the fixed frame contract, the transform provider trait and the
//! cooperative cancellation token that workers poll.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

/// Number of samples in one frame exchanged with a transform provider.
pub const FRAME_SIZE: usize = 480;

/// One fixed-size frame of samples.
pub type Frame = [f32; FRAME_SIZE];

/// A zeroed frame.
pub const SILENT_FRAME: Frame = [0.0; FRAME_SIZE];

/// Errors a transform provider can report from `process_frame`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// The provider observed a cancellation request at a check-in point.
    #[error("transform cancelled")]
    Cancelled,

    /// The provider could not produce an output frame.
    #[error("transform failed: {0}")]
    Failed(String),
}

/// Stateful frame transform, consumed by the invoker.
///
/// Implementations are not reentrant: one `&mut self` call at a time.
/// `create` is the implementation's constructor and `destroy` is `Drop`.
pub trait DenoiseTransform: Send + 'static {
    /// Upper bound, in bytes, of stack the provider may use inside
    /// `process_frame`. Workers are never spawned with less.
    fn worst_case_stack(&self) -> usize;

    /// Transform `input` into `output`, updating internal model state.
    ///
    /// Long computations should call [`CancelToken::check`] at coarse
    /// intervals so an abandoned worker can stop early.
    fn process_frame(
        &mut self,
        input: &Frame,
        output: &mut Frame,
        cancel: &CancelToken,
    ) -> Result<(), TransformError>;
}

/// Flag the worker checks periodically to abort early.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Check-in point: `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<(), TransformError> {
        if self.is_cancelled() {
            Err(TransformError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Copy a slice into a boxed frame, or `None` if the length is wrong.
pub fn frame_from_slice(samples: &[f32]) -> Option<Box<Frame>> {
    let frame: &Frame = samples.try_into().ok()?;
    Some(Box::new(*frame))
}
