//! Error types for the invoker.

use std::time::Duration;

use thiserror::Error;

/// Why an invocation did not produce an output frame.
#[derive(Error, Debug)]
pub enum InvokeError {
    /// The worker could not be created. Buffers are untouched and no worker
    /// exists, so the call can be retried.
    #[error("failed to spawn worker: {0}")]
    SpawnFailed(#[source] std::io::Error),

    /// The worker did not signal before the deadline. The output buffer is
    /// unspecified and the handle has been invalidated.
    #[error("worker did not complete within {deadline:?}")]
    Timeout { deadline: Duration },

    /// The provider reported an error or panicked on the worker.
    #[error("transform failed: {0}")]
    TransformFailed(String),

    /// A previous timeout or panic left the handle's state unreliable.
    /// Call `TransformHandle::reset` before using it again.
    #[error("transform handle was invalidated by an earlier failed invocation")]
    HandleInvalidated,

    #[error("frame must hold {expected} samples, got {actual}")]
    FrameSize { expected: usize, actual: usize },

    #[error("stack budget of {budget} bytes is below the provider's worst case of {required} bytes")]
    StackBudgetTooSmall { budget: usize, required: usize },
}

impl InvokeError {
    /// Whether retrying the same call unchanged can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, InvokeError::SpawnFailed(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, InvokeError::Timeout { .. })
    }
}

/// Result type alias for invoker operations
pub type Result<T> = std::result::Result<T, InvokeError>;
