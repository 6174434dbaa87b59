//! Reference transform provider.
//!
//! `GateDenoiser` is a deterministic, stateful noise gate with the same
//! frame contract as a recurrent denoiser: one 480-sample frame in, one out,
//! model state carried across calls. It keeps a two-frame analysis window on
//! the stack, which is why it declares a worst-case stack bound.

use rnnoise_types::{CancelToken, DenoiseTransform, Frame, TransformError, FRAME_SIZE};

/// Samples processed between cancellation check-ins.
const CHECK_INTERVAL: usize = 120;

/// Declared stack bound for `process_frame` (analysis window plus slack).
pub const GATE_WORST_CASE_STACK: usize = 16 * 1024;

const ENERGY_EPSILON: f32 = 1e-9;

/// Tunables for [`GateDenoiser`].
#[derive(Debug, Clone, Copy)]
pub struct GateParams {
    /// Per-frame multiplicative rise of the tracked noise floor.
    pub floor_rise: f32,
    /// Weight of the previous sample in the output smoothing filter.
    pub smoothing: f32,
    /// Lowest gain applied to a frame.
    pub min_gain: f32,
}

impl Default for GateParams {
    fn default() -> Self {
        Self {
            floor_rise: 0.05,
            smoothing: 0.25,
            min_gain: 0.0,
        }
    }
}

/// Deterministic noise gate with minimum-tracking noise floor.
#[derive(Debug, Clone)]
pub struct GateDenoiser {
    params: GateParams,
    noise_floor: f32,
    history: Frame,
    frames_processed: u64,
}

impl Default for GateDenoiser {
    fn default() -> Self {
        Self::new()
    }
}

impl GateDenoiser {
    pub fn new() -> Self {
        Self::with_params(GateParams::default())
    }

    pub fn with_params(params: GateParams) -> Self {
        Self {
            params,
            noise_floor: 0.0,
            history: [0.0; FRAME_SIZE],
            frames_processed: 0,
        }
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn noise_floor(&self) -> f32 {
        self.noise_floor
    }

    fn frame_gain(&mut self, rms: f32) -> f32 {
        if self.frames_processed == 0 {
            self.noise_floor = rms;
        } else {
            let risen = self.noise_floor * (1.0 + self.params.floor_rise);
            self.noise_floor = rms.min(risen);
        }

        if rms <= ENERGY_EPSILON {
            return self.params.min_gain;
        }
        ((rms - self.noise_floor) / rms).clamp(self.params.min_gain, 1.0)
    }
}

impl DenoiseTransform for GateDenoiser {
    fn worst_case_stack(&self) -> usize {
        GATE_WORST_CASE_STACK
    }

    fn process_frame(
        &mut self,
        input: &Frame,
        output: &mut Frame,
        cancel: &CancelToken,
    ) -> Result<(), TransformError> {
        // previous frame followed by the current one
        let mut window = [0.0f32; 2 * FRAME_SIZE];
        window[..FRAME_SIZE].copy_from_slice(&self.history);
        window[FRAME_SIZE..].copy_from_slice(input);

        let energy: f32 = input.iter().map(|s| s * s).sum();
        let rms = (energy / FRAME_SIZE as f32).sqrt();
        if !rms.is_finite() {
            return Err(TransformError::Failed(format!(
                "non-finite frame energy ({rms})"
            )));
        }
        let gain = self.frame_gain(rms);

        let a = self.params.smoothing;
        for (i, out) in output.iter_mut().enumerate() {
            if i % CHECK_INTERVAL == 0 {
                cancel.check()?;
            }
            let current = window[FRAME_SIZE + i];
            let previous = window[FRAME_SIZE + i - 1];
            *out = gain * ((1.0 - a) * current + a * previous);
        }

        self.history = *input;
        self.frames_processed += 1;
        Ok(())
    }
}
