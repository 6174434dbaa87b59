//! Benchmark harness for the bounded-stack frame invoker.
//!
//! Drives `rnnoise-worker` the way an embedded audio loop would: one warm-up
//! call on silence, then a run of timed in-place invocations on synthetic
//! frames, with optional memory statistics around the run.

pub mod bench;
pub mod logging;
pub mod memory;

pub use bench::{fill_random_frame, run_benchmark, BenchOptions, BenchReport};
pub use memory::MemorySnapshot;
