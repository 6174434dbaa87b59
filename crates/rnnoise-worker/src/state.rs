//! Per-invocation lifecycle.
//!
//! `Idle → Spawning → Running → {Completed, TimedOut, Failed}`, with
//! `Spawning → SpawnFailed` when no worker could be created.

use std::fmt;

use log::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Idle,
    Spawning,
    Running,
    Completed,
    TimedOut,
    Failed,
    SpawnFailed,
}

impl InvocationState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            InvocationState::Completed
                | InvocationState::TimedOut
                | InvocationState::Failed
                | InvocationState::SpawnFailed
        )
    }

    pub fn can_transition_to(self, next: InvocationState) -> bool {
        use InvocationState::*;
        matches!(
            (self, next),
            (Idle, Spawning)
                | (Spawning, Running)
                | (Spawning, SpawnFailed)
                | (Running, Completed)
                | (Running, TimedOut)
                | (Running, Failed)
        )
    }
}

impl fmt::Display for InvocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Tracks one invocation's state and logs each step.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    id: u64,
    state: InvocationState,
}

impl Lifecycle {
    pub(crate) fn new(id: u64) -> Self {
        Self {
            id,
            state: InvocationState::Idle,
        }
    }

    pub(crate) fn state(&self) -> InvocationState {
        self.state
    }

    pub(crate) fn advance(&mut self, next: InvocationState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal invocation transition {} -> {}",
            self.state,
            next
        );
        trace!("[INVOKER] #{} {} -> {}", self.id, self.state, next);
        self.state = next;
    }
}
