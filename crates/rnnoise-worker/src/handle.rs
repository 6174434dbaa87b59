//! Caller-owned transform state, lent to one worker per invocation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use rnnoise_types::{CancelToken, DenoiseTransform, Frame, TransformError};

/// Provider state plus the marker set when a worker may have left it
/// half-updated.
pub(crate) struct SharedState<P> {
    provider: Mutex<P>,
    invalidated: AtomicBool,
}

impl<P> SharedState<P> {
    pub(crate) fn lock(&self) -> MutexGuard<'_, P> {
        // a poisoned lock only means a previous worker panicked, which
        // already invalidated the handle
        self.provider
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// `None` while another thread, normally an orphaned worker, holds the
    /// state.
    fn try_lock(&self) -> Option<MutexGuard<'_, P>> {
        match self.provider.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    pub(crate) fn invalidate(&self) {
        self.invalidated.store(true, Ordering::SeqCst);
    }

    fn is_invalidated(&self) -> bool {
        self.invalidated.load(Ordering::SeqCst)
    }
}

/// Owned handle to a transform provider's state.
///
/// The invoker borrows it mutably for one call, so two overlapping
/// invocations on the same handle do not compile. After a timeout the
/// worker that held the state may still be running; the handle is then
/// invalidated and [`TransformHandle::reset`] swaps in fresh state while the
/// orphan keeps the old allocation alive until it exits.
///
/// Caller-side accessors never block on the state lock, since a wedged
/// orphan may hold it indefinitely.
pub struct TransformHandle<P> {
    shared: Arc<SharedState<P>>,
    worst_case_stack: usize,
}

impl<P: DenoiseTransform> TransformHandle<P> {
    pub fn new(provider: P) -> Self {
        Self {
            worst_case_stack: provider.worst_case_stack(),
            shared: Self::fresh(provider),
        }
    }

    fn fresh(provider: P) -> Arc<SharedState<P>> {
        Arc::new(SharedState {
            provider: Mutex::new(provider),
            invalidated: AtomicBool::new(false),
        })
    }

    pub fn is_invalidated(&self) -> bool {
        self.shared.is_invalidated()
    }

    /// Replace the provider state with `provider` and clear invalidation.
    pub fn reset(&mut self, provider: P) {
        self.worst_case_stack = provider.worst_case_stack();
        self.shared = Self::fresh(provider);
    }

    /// Stack the provider said it needs when the handle was created or reset.
    pub fn worst_case_stack(&self) -> usize {
        self.worst_case_stack
    }

    /// Run the provider on the calling thread, without isolation.
    ///
    /// Fails on an invalidated handle instead of touching suspect state.
    pub fn process_direct(
        &mut self,
        input: &Frame,
        output: &mut Frame,
    ) -> Result<(), TransformError> {
        if self.is_invalidated() {
            return Err(TransformError::Failed("transform state invalidated".into()));
        }
        let mut provider = self.shared.try_lock().ok_or_else(|| {
            TransformError::Failed("transform state held by an unfinished worker".into())
        })?;
        provider.process_frame(input, output, &CancelToken::new())
    }

    /// Inspect the provider state. `None` while an orphaned worker still
    /// holds it.
    pub fn with_provider<R>(&self, f: impl FnOnce(&P) -> R) -> Option<R> {
        self.shared.try_lock().map(|provider| f(&provider))
    }

    pub(crate) fn share(&self) -> Arc<SharedState<P>> {
        Arc::clone(&self.shared)
    }

    pub(crate) fn invalidate(&self) {
        self.shared.invalidate();
    }
}

impl<P> std::fmt::Debug for TransformHandle<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformHandle")
            .field("invalidated", &self.shared.is_invalidated())
            .field("holders", &Arc::strong_count(&self.shared))
            .finish()
    }
}
