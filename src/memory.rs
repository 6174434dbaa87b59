//! Memory statistics printed around a benchmark run.

use std::fmt;

use sysinfo::{ProcessesToUpdate, System};

#[derive(Debug, Clone, Copy)]
pub struct MemorySnapshot {
    pub total_kb: u64,
    pub free_kb: u64,
    pub available_kb: u64,
    /// Resident memory of this process, when the platform reports it.
    pub process_kb: Option<u64>,
}

impl MemorySnapshot {
    pub fn capture() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();

        let process_kb = sysinfo::get_current_pid().ok().and_then(|pid| {
            sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
            sys.process(pid).map(|p| p.memory() / 1024)
        });

        Self {
            total_kb: sys.total_memory() / 1024,
            free_kb: sys.free_memory() / 1024,
            available_kb: sys.available_memory() / 1024,
            process_kb,
        }
    }
}

impl fmt::Display for MemorySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Current Memory Usage:")?;
        writeln!(f, "Total memory: {} KB", self.total_kb)?;
        writeln!(f, "Free memory: {} KB", self.free_kb)?;
        writeln!(f, "Available memory: {} KB", self.available_kb)?;
        match self.process_kb {
            Some(kb) => write!(f, "Process resident: {kb} KB"),
            None => write!(f, "Process resident: unknown"),
        }
    }
}
