//! Bounded-stack invoker.
//!
//! Each call spawns one worker with a dedicated stack, hands it a request
//! that owns a copy of the input frame, and waits for the completion message
//! up to a deadline. On timeout the worker is cancelled and, unless it has
//! already exited (or exits within an opt-in grace period), handed to the
//! [`Reaper`] so the caller regains control at the deadline.
//!
//! Thread design per invocation:
//! - caller: builds the request, spawns, blocks once in `recv_timeout`
//! - worker: locks provider state, runs `process_frame`, sends the result,
//!   returns

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, Sender};
use log::{debug, error, warn};
use rnnoise_config::InvokerConfig;
use rnnoise_types::{
    frame_from_slice, CancelToken, DenoiseTransform, Frame, TransformError, FRAME_SIZE,
    SILENT_FRAME,
};

use crate::error::{InvokeError, Result};
use crate::handle::{SharedState, TransformHandle};
use crate::reaper::Reaper;
use crate::scheduler::{Scheduler, ThreadScheduler, WorkerSpec, WorkerTask};
use crate::state::{InvocationState, Lifecycle};

/// Stack and deadline for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvokeOptions {
    /// Bytes of stack for the worker.
    pub stack_budget: usize,
    /// Longest the caller blocks waiting for completion.
    pub deadline: Duration,
}

impl From<&InvokerConfig> for InvokeOptions {
    fn from(config: &InvokerConfig) -> Self {
        Self {
            stack_budget: config.stack_bytes,
            deadline: config.deadline(),
        }
    }
}

/// Message from worker to caller.
enum Completion {
    Done(Box<Frame>),
    Failed(TransformError),
    Panicked(String),
}

/// Everything one worker needs, moved into it at spawn.
struct InvocationRequest<P> {
    state: Arc<SharedState<P>>,
    input: Box<Frame>,
    cancel: CancelToken,
    done: Sender<Completion>,
}

impl<P: DenoiseTransform> InvocationRequest<P> {
    /// Worker body.
    fn run(self) {
        let InvocationRequest {
            state,
            input,
            cancel,
            done,
        } = self;

        let mut output = Box::new(SILENT_FRAME);
        let outcome = {
            let mut provider = state.lock();
            panic::catch_unwind(AssertUnwindSafe(|| {
                provider.process_frame(&input, &mut output, &cancel)
            }))
        };

        let completion = match outcome {
            Ok(Ok(())) => Completion::Done(output),
            Ok(Err(e)) => Completion::Failed(e),
            Err(payload) => {
                state.invalidate();
                Completion::Panicked(panic_message(&*payload))
            }
        };

        // the caller may have stopped listening after a timeout
        let _ = done.send(completion);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Runs transform calls on freshly spawned, separately stacked workers.
pub struct Invoker<S = ThreadScheduler> {
    scheduler: S,
    reaper: Reaper,
    options: InvokeOptions,
    grace: Duration,
    worker_name: String,
    next_id: AtomicU64,
}

impl Invoker<ThreadScheduler> {
    /// Invoker backed by OS threads.
    pub fn new(config: &InvokerConfig) -> Self {
        Self::with_scheduler(ThreadScheduler::new(), config)
    }
}

impl<S: Scheduler> Invoker<S> {
    pub fn with_scheduler(scheduler: S, config: &InvokerConfig) -> Self {
        Self {
            scheduler,
            reaper: Reaper::new(),
            options: InvokeOptions::from(config),
            grace: config.grace(),
            worker_name: config.worker_name.clone(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Default options used by [`Invoker::invoke`].
    pub fn options(&self) -> InvokeOptions {
        self.options
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Workers still running, including orphans.
    pub fn live_workers(&self) -> usize {
        self.scheduler.live_workers()
    }

    /// Timed-out workers not yet reclaimed.
    pub fn orphans(&self) -> usize {
        self.reaper.pending()
    }

    /// Reclaim orphans that have exited since they were abandoned.
    pub fn reap(&self) -> usize {
        self.reaper.sweep()
    }

    /// Transform `input` into `output` with the default stack and deadline.
    pub fn invoke<P: DenoiseTransform>(
        &self,
        handle: &mut TransformHandle<P>,
        input: &[f32],
        output: &mut [f32],
    ) -> Result<()> {
        self.invoke_with(handle, input, output, self.options)
    }

    /// Transform `frame` in place with the default stack and deadline.
    pub fn invoke_in_place<P: DenoiseTransform>(
        &self,
        handle: &mut TransformHandle<P>,
        frame: &mut [f32],
    ) -> Result<()> {
        let input = frame_from_slice(frame).ok_or(InvokeError::FrameSize {
            expected: FRAME_SIZE,
            actual: frame.len(),
        })?;
        let result = self.run(handle, input, self.options)?;
        frame.copy_from_slice(&result[..]);
        Ok(())
    }

    /// Transform `input` into `output` on a worker with `options.stack_budget`
    /// bytes of stack, waiting at most `options.deadline`.
    ///
    /// On success `output` holds the full result. On any error `output` is
    /// not written. After `Timeout` the handle is invalidated, because the
    /// worker may have stopped partway through updating provider state.
    pub fn invoke_with<P: DenoiseTransform>(
        &self,
        handle: &mut TransformHandle<P>,
        input: &[f32],
        output: &mut [f32],
        options: InvokeOptions,
    ) -> Result<()> {
        if output.len() != FRAME_SIZE {
            return Err(InvokeError::FrameSize {
                expected: FRAME_SIZE,
                actual: output.len(),
            });
        }
        let input = frame_from_slice(input).ok_or(InvokeError::FrameSize {
            expected: FRAME_SIZE,
            actual: input.len(),
        })?;

        let result = self.run(handle, input, options)?;
        output.copy_from_slice(&result[..]);
        Ok(())
    }

    fn run<P: DenoiseTransform>(
        &self,
        handle: &mut TransformHandle<P>,
        input: Box<Frame>,
        options: InvokeOptions,
    ) -> Result<Box<Frame>> {
        self.reaper.sweep();

        if handle.is_invalidated() {
            return Err(InvokeError::HandleInvalidated);
        }
        let required = handle.worst_case_stack();
        if options.stack_budget < required {
            return Err(InvokeError::StackBudgetTooSmall {
                budget: options.stack_budget,
                required,
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut life = Lifecycle::new(id);
        life.advance(InvocationState::Spawning);

        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let cancel = CancelToken::new();
        let request = InvocationRequest {
            state: handle.share(),
            input,
            cancel: cancel.clone(),
            done: done_tx,
        };
        let spec = WorkerSpec {
            name: format!("{}-{id}", self.worker_name),
            stack_size: options.stack_budget,
        };

        let started = Instant::now();
        let task = match self.scheduler.spawn(spec, Box::new(move || request.run())) {
            Ok(task) => task,
            Err(e) => {
                life.advance(InvocationState::SpawnFailed);
                warn!("[INVOKER] #{id} could not spawn worker: {e}");
                return Err(InvokeError::SpawnFailed(e));
            }
        };
        life.advance(InvocationState::Running);

        match done_rx.recv_timeout(options.deadline) {
            Ok(Completion::Done(frame)) => {
                life.advance(InvocationState::Completed);
                task.reclaim();
                debug!("[INVOKER] #{id} {} in {:?}", life.state(), started.elapsed());
                Ok(frame)
            }
            Ok(Completion::Failed(e)) => {
                life.advance(InvocationState::Failed);
                task.reclaim();
                warn!("[INVOKER] #{id} transform error: {e}");
                Err(InvokeError::TransformFailed(e.to_string()))
            }
            Ok(Completion::Panicked(msg)) => {
                life.advance(InvocationState::Failed);
                task.reclaim();
                error!("[INVOKER] #{id} worker panicked: {msg}");
                Err(InvokeError::TransformFailed(format!("worker panicked: {msg}")))
            }
            Err(RecvTimeoutError::Timeout) => {
                life.advance(InvocationState::TimedOut);
                handle.invalidate();
                error!(
                    "[INVOKER] #{id} frame processing timeout after {:?}",
                    options.deadline
                );
                self.terminate(id, task, &cancel);
                Err(InvokeError::Timeout {
                    deadline: options.deadline,
                })
            }
            Err(RecvTimeoutError::Disconnected) => {
                life.advance(InvocationState::Failed);
                handle.invalidate();
                task.reclaim();
                error!("[INVOKER] #{id} worker exited without signalling");
                Err(InvokeError::TransformFailed(
                    "worker exited without signalling completion".to_string(),
                ))
            }
        }
    }

    /// Cancel, then join the worker if it is already gone or orphan it.
    ///
    /// Blocks at most `grace`, which is zero unless configured.
    fn terminate(&self, id: u64, task: Box<dyn WorkerTask>, cancel: &CancelToken) {
        cancel.cancel();
        if task.wait_exit(self.grace) {
            task.reclaim();
            debug!("[INVOKER] #{id} worker stopped after cancellation");
        } else {
            debug!(
                "[INVOKER] #{id} worker still running after {:?} grace, detaching",
                self.grace
            );
            self.reaper.adopt(task);
        }
    }
}

impl<S> std::fmt::Debug for Invoker<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invoker")
            .field("options", &self.options)
            .field("grace", &self.grace)
            .field("worker_name", &self.worker_name)
            .field("reaper", &self.reaper)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rnnoise_engine::GateDenoiser;

    const SMALL_STACK: usize = 4 * 1024;

    /// Never finishes until cancelled.
    struct StallingTransform;

    impl DenoiseTransform for StallingTransform {
        fn worst_case_stack(&self) -> usize {
            SMALL_STACK
        }

        fn process_frame(
            &mut self,
            _input: &Frame,
            _output: &mut Frame,
            cancel: &CancelToken,
        ) -> std::result::Result<(), TransformError> {
            loop {
                cancel.check()?;
                thread::sleep(Duration::from_millis(1));
            }
        }
    }

    /// Sleeps through cancellation.
    struct StubbornTransform(Duration);

    impl DenoiseTransform for StubbornTransform {
        fn worst_case_stack(&self) -> usize {
            SMALL_STACK
        }

        fn process_frame(
            &mut self,
            _input: &Frame,
            _output: &mut Frame,
            _cancel: &CancelToken,
        ) -> std::result::Result<(), TransformError> {
            thread::sleep(self.0);
            Ok(())
        }
    }

    struct PanickingTransform;

    impl DenoiseTransform for PanickingTransform {
        fn worst_case_stack(&self) -> usize {
            SMALL_STACK
        }

        fn process_frame(
            &mut self,
            _input: &Frame,
            _output: &mut Frame,
            _cancel: &CancelToken,
        ) -> std::result::Result<(), TransformError> {
            panic!("model weights corrupt");
        }
    }

    struct RefusingTransform;

    impl DenoiseTransform for RefusingTransform {
        fn worst_case_stack(&self) -> usize {
            SMALL_STACK
        }

        fn process_frame(
            &mut self,
            _input: &Frame,
            _output: &mut Frame,
            _cancel: &CancelToken,
        ) -> std::result::Result<(), TransformError> {
            Err(TransformError::Failed("unsupported sample rate".into()))
        }
    }

    /// Thread scheduler that counts spawn requests.
    #[derive(Default)]
    struct CountingScheduler {
        inner: ThreadScheduler,
        spawns: AtomicUsize,
    }

    impl Scheduler for CountingScheduler {
        fn spawn(
            &self,
            spec: WorkerSpec,
            job: crate::WorkerJob,
        ) -> io::Result<Box<dyn WorkerTask>> {
            self.spawns.fetch_add(1, Ordering::SeqCst);
            self.inner.spawn(spec, job)
        }

        fn live_workers(&self) -> usize {
            self.inner.live_workers()
        }
    }

    impl CountingScheduler {
        fn spawns(&self) -> usize {
            self.spawns.load(Ordering::SeqCst)
        }
    }

    /// Simulates resource exhaustion.
    struct ExhaustedScheduler;

    impl Scheduler for ExhaustedScheduler {
        fn spawn(
            &self,
            _spec: WorkerSpec,
            _job: crate::WorkerJob,
        ) -> io::Result<Box<dyn WorkerTask>> {
            Err(io::Error::new(
                io::ErrorKind::OutOfMemory,
                "no memory for worker stack",
            ))
        }

        fn live_workers(&self) -> usize {
            0
        }
    }

    fn config(deadline_ms: u64, grace_ms: u64) -> InvokerConfig {
        InvokerConfig {
            deadline_ms,
            grace_ms,
            ..InvokerConfig::default()
        }
    }

    fn counting_invoker(deadline_ms: u64, grace_ms: u64) -> Invoker<CountingScheduler> {
        Invoker::with_scheduler(CountingScheduler::default(), &config(deadline_ms, grace_ms))
    }

    fn random_frame(rng: &mut StdRng) -> Vec<f32> {
        (0..FRAME_SIZE)
            .map(|_| rng.gen::<f32>() * 32767.0)
            .collect()
    }

    #[test]
    fn test_silent_frame_on_fresh_handle() {
        let invoker = Invoker::new(&InvokerConfig::default());
        let mut handle = TransformHandle::new(GateDenoiser::new());
        let input = vec![0.0f32; FRAME_SIZE];
        let mut output = vec![1.0f32; FRAME_SIZE];

        invoker.invoke(&mut handle, &input, &mut output).unwrap();

        let mut expected = [0.0f32; FRAME_SIZE];
        GateDenoiser::new()
            .process_frame(&SILENT_FRAME, &mut expected, &CancelToken::new())
            .unwrap();
        assert_eq!(output, expected.to_vec());
        assert_eq!(invoker.live_workers(), 0);
    }

    #[test]
    fn test_isolation_matches_direct_call() {
        let invoker = Invoker::new(&InvokerConfig::default());
        let mut isolated = TransformHandle::new(GateDenoiser::new());
        let mut direct = TransformHandle::new(GateDenoiser::new());
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..5 {
            let input = random_frame(&mut rng);
            let frame: Frame = input.as_slice().try_into().unwrap();

            let mut via_worker = vec![0.0f32; FRAME_SIZE];
            invoker.invoke(&mut isolated, &input, &mut via_worker).unwrap();

            let mut via_direct = [0.0f32; FRAME_SIZE];
            direct.process_direct(&frame, &mut via_direct).unwrap();

            assert_eq!(via_worker, via_direct.to_vec());
        }
    }

    #[test]
    fn test_fifty_sequential_invocations_do_not_leak_workers() {
        let invoker = counting_invoker(2_000, 250);
        let mut handle = TransformHandle::new(GateDenoiser::new());
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..50 {
            let mut frame = random_frame(&mut rng);
            invoker.invoke_in_place(&mut handle, &mut frame).unwrap();
            assert!(frame.iter().all(|s| s.is_finite()));
            assert_eq!(invoker.live_workers(), 0);
        }

        assert_eq!(invoker.scheduler().spawns(), 50);
        assert_eq!(handle.with_provider(|p| p.frames_processed()), Some(50));
    }

    #[test]
    fn test_in_place_matches_separate_buffers() {
        let invoker = Invoker::new(&InvokerConfig::default());
        let mut a = TransformHandle::new(GateDenoiser::new());
        let mut b = TransformHandle::new(GateDenoiser::new());
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..3 {
            let input = random_frame(&mut rng);
            let mut in_place = input.clone();
            let mut separate = vec![0.0f32; FRAME_SIZE];

            invoker.invoke_in_place(&mut a, &mut in_place).unwrap();
            invoker.invoke(&mut b, &input, &mut separate).unwrap();
            assert_eq!(in_place, separate);
        }
    }

    #[test]
    fn test_stalled_worker_times_out_and_is_reclaimed() {
        let deadline = Duration::from_millis(50);
        let invoker = counting_invoker(50, 1_000);
        let mut handle = TransformHandle::new(StallingTransform);
        let input = vec![0.5f32; FRAME_SIZE];

        for _ in 0..5 {
            let mut output = vec![9.0f32; FRAME_SIZE];
            let started = Instant::now();
            let err = invoker.invoke(&mut handle, &input, &mut output).unwrap_err();
            let elapsed = started.elapsed();

            assert!(matches!(err, InvokeError::Timeout { deadline: d } if d == deadline));
            assert!(elapsed >= deadline);
            assert!(elapsed < deadline + Duration::from_secs(1), "took {elapsed:?}");
            assert!(output.iter().all(|&s| s == 9.0));

            assert_eq!(invoker.live_workers(), 0);
            assert_eq!(invoker.orphans(), 0);
            handle.reset(StallingTransform);
        }
        assert_eq!(invoker.scheduler().spawns(), 5);
    }

    #[test]
    fn test_timeout_returns_at_deadline_with_default_grace() {
        let deadline = Duration::from_millis(50);
        let invoker = Invoker::new(&InvokerConfig {
            deadline_ms: 50,
            ..InvokerConfig::default()
        });
        let mut handle = TransformHandle::new(StubbornTransform(Duration::from_secs(1)));
        let input = vec![0.0f32; FRAME_SIZE];
        let mut output = vec![0.0f32; FRAME_SIZE];

        let started = Instant::now();
        let err = invoker.invoke(&mut handle, &input, &mut output).unwrap_err();
        let elapsed = started.elapsed();

        assert!(err.is_timeout());
        assert!(elapsed >= deadline);
        assert!(
            elapsed < deadline + Duration::from_millis(50),
            "caller blocked {elapsed:?} past a {deadline:?} deadline"
        );
        assert_eq!(invoker.orphans(), 1);
    }

    #[test]
    fn test_handle_stays_usable_while_orphan_holds_state() {
        let invoker = counting_invoker(20, 0);
        let mut handle = TransformHandle::new(StubbornTransform(Duration::from_secs(2)));
        let input = vec![0.0f32; FRAME_SIZE];
        let mut output = vec![0.0f32; FRAME_SIZE];

        assert!(invoker
            .invoke(&mut handle, &input, &mut output)
            .unwrap_err()
            .is_timeout());
        assert_eq!(invoker.orphans(), 1);

        let started = Instant::now();
        assert_eq!(handle.worst_case_stack(), SMALL_STACK);
        assert!(handle.with_provider(|_| ()).is_none());
        let mut frame = [0.0f32; FRAME_SIZE];
        assert!(handle.process_direct(&SILENT_FRAME, &mut frame).is_err());
        let err = invoker.invoke(&mut handle, &input, &mut output).unwrap_err();
        assert!(matches!(err, InvokeError::HandleInvalidated));
        assert!(started.elapsed() < Duration::from_millis(50));

        handle.reset(StubbornTransform(Duration::ZERO));
        let relaxed = InvokeOptions {
            deadline: Duration::from_secs(2),
            ..invoker.options()
        };
        invoker
            .invoke_with(&mut handle, &input, &mut output, relaxed)
            .unwrap();
        assert_eq!(invoker.scheduler().spawns(), 2);
    }

    #[test]
    fn test_timeout_invalidates_handle_until_reset() {
        let invoker = counting_invoker(20, 500);
        let mut handle = TransformHandle::new(StallingTransform);
        let input = vec![0.0f32; FRAME_SIZE];
        let mut output = vec![0.0f32; FRAME_SIZE];

        assert!(invoker
            .invoke(&mut handle, &input, &mut output)
            .unwrap_err()
            .is_timeout());
        assert!(handle.is_invalidated());

        let err = invoker.invoke(&mut handle, &input, &mut output).unwrap_err();
        assert!(matches!(err, InvokeError::HandleInvalidated));
        assert_eq!(invoker.scheduler().spawns(), 1);

        handle.reset(StallingTransform);
        assert!(!handle.is_invalidated());
    }

    #[test]
    fn test_unresponsive_worker_is_orphaned_then_reaped() {
        let invoker = counting_invoker(20, 10);
        let mut handle = TransformHandle::new(StubbornTransform(Duration::from_millis(200)));
        let input = vec![0.0f32; FRAME_SIZE];
        let mut output = vec![0.0f32; FRAME_SIZE];

        let err = invoker.invoke(&mut handle, &input, &mut output).unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(invoker.orphans(), 1);
        assert_eq!(invoker.live_workers(), 1);

        let give_up = Instant::now() + Duration::from_secs(5);
        while invoker.orphans() > 0 && Instant::now() < give_up {
            invoker.reap();
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(invoker.orphans(), 0);
        assert_eq!(invoker.live_workers(), 0);
    }

    #[test]
    fn test_spawn_failure_leaves_buffers_untouched() {
        let invoker = Invoker::with_scheduler(ExhaustedScheduler, &InvokerConfig::default());
        let mut handle = TransformHandle::new(GateDenoiser::new());
        let input: Vec<f32> = (0..FRAME_SIZE).map(|i| i as f32).collect();
        let mut output = vec![-1.0f32; FRAME_SIZE];

        let err = invoker.invoke(&mut handle, &input, &mut output).unwrap_err();

        assert!(matches!(err, InvokeError::SpawnFailed(_)));
        assert!(err.is_retryable());
        assert!(output.iter().all(|&s| s == -1.0));
        assert_eq!(input[FRAME_SIZE - 1], (FRAME_SIZE - 1) as f32);
        assert!(!handle.is_invalidated());
        assert_eq!(handle.with_provider(|p| p.frames_processed()), Some(0));
    }

    #[test]
    fn test_unspawnable_worker_name_is_spawn_failure() {
        let invoker = Invoker::new(&InvokerConfig {
            worker_name: "rnnoise\0task".into(),
            ..InvokerConfig::default()
        });
        let mut handle = TransformHandle::new(GateDenoiser::new());
        let input = vec![0.0f32; FRAME_SIZE];
        let mut output = vec![0.0f32; FRAME_SIZE];

        let err = invoker.invoke(&mut handle, &input, &mut output).unwrap_err();
        assert!(matches!(err, InvokeError::SpawnFailed(_)));
        assert_eq!(invoker.live_workers(), 0);
    }

    #[test]
    fn test_wrong_frame_size_is_rejected_before_spawn() {
        let invoker = counting_invoker(2_000, 250);
        let mut handle = TransformHandle::new(GateDenoiser::new());
        let mut output = vec![0.0f32; FRAME_SIZE];

        let err = invoker
            .invoke(&mut handle, &[0.0; 160], &mut output)
            .unwrap_err();
        assert!(matches!(
            err,
            InvokeError::FrameSize {
                expected: FRAME_SIZE,
                actual: 160
            }
        ));

        let mut short = vec![0.0f32; 10];
        let err = invoker.invoke_in_place(&mut handle, &mut short).unwrap_err();
        assert!(matches!(err, InvokeError::FrameSize { actual: 10, .. }));
        assert_eq!(invoker.scheduler().spawns(), 0);
    }

    #[test]
    fn test_stack_budget_below_provider_bound_is_rejected() {
        let invoker = counting_invoker(2_000, 250);
        let mut handle = TransformHandle::new(GateDenoiser::new());
        let input = vec![0.0f32; FRAME_SIZE];
        let mut output = vec![0.0f32; FRAME_SIZE];
        let options = InvokeOptions {
            stack_budget: 1024,
            deadline: Duration::from_secs(2),
        };

        let err = invoker
            .invoke_with(&mut handle, &input, &mut output, options)
            .unwrap_err();
        assert!(matches!(
            err,
            InvokeError::StackBudgetTooSmall { budget: 1024, .. }
        ));
        assert_eq!(invoker.scheduler().spawns(), 0);
    }

    #[test]
    fn test_panic_invalidates_handle_and_reset_recovers() {
        // room for the panic hook's formatting
        let invoker = Invoker::new(&InvokerConfig {
            stack_bytes: 256 * 1024,
            ..InvokerConfig::default()
        });
        let mut handle = TransformHandle::new(PanickingTransform);
        let input = vec![0.0f32; FRAME_SIZE];
        let mut output = vec![0.0f32; FRAME_SIZE];

        let err = invoker.invoke(&mut handle, &input, &mut output).unwrap_err();
        match err {
            InvokeError::TransformFailed(msg) => assert!(msg.contains("model weights corrupt")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(handle.is_invalidated());
        assert_eq!(invoker.live_workers(), 0);

        handle.reset(PanickingTransform);
        assert!(!handle.is_invalidated());
    }

    #[test]
    fn test_provider_error_is_surfaced_without_invalidating() {
        let invoker = Invoker::new(&InvokerConfig::default());
        let mut handle = TransformHandle::new(RefusingTransform);
        let input = vec![0.0f32; FRAME_SIZE];
        let mut output = vec![3.0f32; FRAME_SIZE];

        let err = invoker.invoke(&mut handle, &input, &mut output).unwrap_err();
        assert!(matches!(err, InvokeError::TransformFailed(ref m) if m.contains("sample rate")));
        assert!(!handle.is_invalidated());
        assert!(output.iter().all(|&s| s == 3.0));
    }
}
