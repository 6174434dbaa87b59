//! Benchmark loop: warm-up, then timed in-place invocations on random frames.

use std::time::{Duration, Instant};

use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rnnoise_types::{DenoiseTransform, FRAME_SIZE};
use rnnoise_worker::{InvokeError, Invoker, Scheduler, TransformHandle};

/// Peak magnitude of synthetic samples (16-bit PCM range).
pub const SAMPLE_PEAK: f32 = 32767.0;

#[derive(Debug, Clone, Copy)]
pub struct BenchOptions {
    pub iterations: usize,
    pub seed: u64,
}

impl Default for BenchOptions {
    fn default() -> Self {
        Self {
            iterations: 50,
            seed: 0x5eed,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BenchReport {
    pub iterations: usize,
    pub completed: usize,
    pub timeouts: usize,
    pub failures: usize,
    /// Wall-clock time of all timed invocations, failed ones included.
    pub total: Duration,
}

impl BenchReport {
    /// Mean time per timed invocation.
    pub fn average(&self) -> Duration {
        match u32::try_from(self.iterations) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.total / n,
            Err(_) => Duration::from_secs_f64(self.total.as_secs_f64() / self.iterations as f64),
        }
    }

    pub fn all_completed(&self) -> bool {
        self.completed == self.iterations
    }
}

/// Fill `frame` with uniform samples in `[0, SAMPLE_PEAK]`.
pub fn fill_random_frame<R: Rng>(rng: &mut R, frame: &mut [f32]) {
    for sample in frame.iter_mut() {
        *sample = rng.gen::<f32>() * SAMPLE_PEAK;
    }
}

/// Run one untimed warm-up on silence, then `options.iterations` timed calls.
///
/// Failures never abort the run. A timeout or invalidated handle resets the
/// handle with `fresh_provider` so later iterations can proceed.
pub fn run_benchmark<S, P, F>(
    invoker: &Invoker<S>,
    handle: &mut TransformHandle<P>,
    options: &BenchOptions,
    fresh_provider: F,
) -> BenchReport
where
    S: Scheduler,
    P: DenoiseTransform,
    F: Fn() -> P,
{
    let mut frame = vec![0.0f32; FRAME_SIZE];
    if let Err(e) = invoker.invoke_in_place(handle, &mut frame) {
        warn!("[BENCH] Warm-up invocation failed: {e}");
        recover(handle, &e, &fresh_provider);
    }

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut report = BenchReport {
        iterations: options.iterations,
        ..BenchReport::default()
    };

    for i in 0..options.iterations {
        fill_random_frame(&mut rng, &mut frame);

        let started = Instant::now();
        let result = invoker.invoke_in_place(handle, &mut frame);
        report.total += started.elapsed();

        match result {
            Ok(()) => report.completed += 1,
            Err(e) if e.is_timeout() => {
                report.timeouts += 1;
                error!("[BENCH] Frame processing timeout! (iteration {i})");
                recover(handle, &e, &fresh_provider);
            }
            Err(e) => {
                report.failures += 1;
                error!("[BENCH] Iteration {i} failed: {e}");
                recover(handle, &e, &fresh_provider);
            }
        }
    }

    info!(
        "[BENCH] {} of {} invocations completed ({} timeouts, {} failures)",
        report.completed, report.iterations, report.timeouts, report.failures
    );
    report
}

fn recover<P, F>(handle: &mut TransformHandle<P>, error: &InvokeError, fresh_provider: &F)
where
    P: DenoiseTransform,
    F: Fn() -> P,
{
    if handle.is_invalidated() {
        warn!("[BENCH] Resetting transform state after: {error}");
        handle.reset(fresh_provider());
    }
}
