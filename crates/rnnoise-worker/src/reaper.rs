//! Holding area for workers that outlived their invocation.
//!
//! A timed-out worker that ignores cancellation past the grace period is
//! adopted here. Each later invocation sweeps the list and joins whichever
//! orphans have finished since.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use log::{debug, warn};

use crate::scheduler::WorkerTask;

#[derive(Default)]
pub struct Reaper {
    orphans: Mutex<Vec<Box<dyn WorkerTask>>>,
    adopted: AtomicU64,
    reaped: AtomicU64,
}

impl Reaper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn adopt(&self, task: Box<dyn WorkerTask>) {
        let total = self.adopted.fetch_add(1, Ordering::Relaxed) + 1;
        warn!("[REAPER] Adopted unresponsive worker (orphan #{total})");
        self.lock().push(task);
    }

    /// Join orphans that have finished. Returns how many were reclaimed.
    pub fn sweep(&self) -> usize {
        let finished: Vec<Box<dyn WorkerTask>> = {
            let mut orphans = self.lock();
            let (done, still_running): (Vec<_>, Vec<_>) =
                orphans.drain(..).partition(|task| task.is_finished());
            *orphans = still_running;
            done
        };

        let count = finished.len();
        for task in finished {
            task.reclaim();
        }
        if count > 0 {
            self.reaped.fetch_add(count as u64, Ordering::Relaxed);
            debug!("[REAPER] Reclaimed {count} orphaned worker(s)");
        }
        count
    }

    /// Orphans not yet reclaimed.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    pub fn adopted_total(&self) -> u64 {
        self.adopted.load(Ordering::Relaxed)
    }

    pub fn reaped_total(&self) -> u64 {
        self.reaped.load(Ordering::Relaxed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Box<dyn WorkerTask>>> {
        self.orphans
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        self.sweep();
        let remaining = self.pending();
        if remaining > 0 {
            // joining could block forever on a wedged worker; let them go
            warn!("[REAPER] Detaching {remaining} worker(s) still running at shutdown");
        }
    }
}

impl std::fmt::Debug for Reaper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reaper")
            .field("pending", &self.pending())
            .field("adopted", &self.adopted_total())
            .field("reaped", &self.reaped_total())
            .finish()
    }
}
