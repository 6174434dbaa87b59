//! Bounded-stack, deadline-bounded frame transforms.
//!
//! A transform whose stack needs exceed the caller's runs on a freshly
//! spawned worker with its own stack. The caller blocks until the worker
//! signals completion or the deadline elapses, so it always regains control:
//! - Stack isolation: each worker gets a caller-chosen stack size
//! - Bounded wait: a wedged worker costs at most the deadline plus grace
//! - No shared buffers: the worker owns copies of its input and output

pub mod error;
pub mod handle;
pub mod invoker;
pub mod reaper;
pub mod scheduler;
pub mod state;

pub use error::{InvokeError, Result};
pub use handle::TransformHandle;
pub use invoker::{InvokeOptions, Invoker};
pub use reaper::Reaper;
pub use scheduler::{Scheduler, ThreadScheduler, WorkerJob, WorkerSpec, WorkerTask};
pub use state::InvocationState;
