//! Worker creation capability.
//!
//! The invoker never spawns threads itself; it asks an injected
//! [`Scheduler`] for a worker with a given stack size. `ThreadScheduler` is
//! the OS-thread implementation. Tests substitute their own.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};

/// Body a worker runs to completion.
pub type WorkerJob = Box<dyn FnOnce() + Send + 'static>;

/// What kind of worker to create.
#[derive(Debug, Clone)]
pub struct WorkerSpec {
    pub name: String,
    pub stack_size: usize,
}

/// A spawned worker context.
pub trait WorkerTask: Send {
    /// Whether the job has returned.
    fn is_finished(&self) -> bool;

    /// Block up to `timeout` for the job to return. `true` once it has.
    fn wait_exit(&self, timeout: Duration) -> bool;

    /// Release the worker's resources, blocking until its job has returned.
    fn reclaim(self: Box<Self>);
}

/// Creates worker contexts with a dedicated stack.
pub trait Scheduler: Send + Sync {
    fn spawn(&self, spec: WorkerSpec, job: WorkerJob) -> io::Result<Box<dyn WorkerTask>>;

    /// Workers whose job has not yet returned.
    fn live_workers(&self) -> usize;
}

/// Decrements the live count and signals exit when the job's thread
/// unwinds or returns.
struct ExitGuard {
    live: Arc<AtomicUsize>,
    exited: Sender<()>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        let _ = self.exited.send(());
    }
}

/// Spawns each worker as an OS thread with `spec.stack_size` bytes of stack.
#[derive(Debug, Default)]
pub struct ThreadScheduler {
    live: Arc<AtomicUsize>,
}

impl ThreadScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for ThreadScheduler {
    fn spawn(&self, spec: WorkerSpec, job: WorkerJob) -> io::Result<Box<dyn WorkerTask>> {
        // Builder::spawn panics on these instead of failing
        if spec.name.contains('\0') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("worker name {:?} contains a NUL byte", spec.name),
            ));
        }
        let (exited_tx, exited_rx) = crossbeam_channel::bounded(1);
        self.live.fetch_add(1, Ordering::SeqCst);
        let guard = ExitGuard {
            live: Arc::clone(&self.live),
            exited: exited_tx,
        };

        let name = spec.name.clone();
        let spawned = thread::Builder::new()
            .name(spec.name)
            .stack_size(spec.stack_size)
            .spawn(move || {
                let _guard = guard;
                job();
            });

        // on failure the closure, and with it the guard, is dropped,
        // which undoes the live count
        let join = spawned?;
        debug!(
            "[SCHEDULER] Spawned worker '{name}' ({} byte stack)",
            spec.stack_size
        );
        Ok(Box::new(ThreadWorker {
            join,
            exited: exited_rx,
        }))
    }

    fn live_workers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

struct ThreadWorker {
    join: JoinHandle<()>,
    exited: Receiver<()>,
}

impl WorkerTask for ThreadWorker {
    fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    fn wait_exit(&self, timeout: Duration) -> bool {
        match self.exited.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => false,
        }
    }

    fn reclaim(self: Box<Self>) {
        let ThreadWorker { join, .. } = *self;
        let name = join.thread().name().unwrap_or("worker").to_string();
        if join.join().is_err() {
            warn!("[SCHEDULER] Worker '{name}' panicked outside its job");
        }
    }
}
