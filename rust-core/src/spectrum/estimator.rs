//! Per-frame spectral estimation
//!
//! Extracts the latest window of a channel, applies the window function,
//! transforms, and folds the bin magnitudes into the channel's running
//! amplitude vector with a one-pole smoother.

use realfft::RealToComplex;

use super::arena::SharedScratch;
use super::fft::{forward_magnitude, FftEngine};
use crate::audio::ChannelState;

/// One configured analysis pass over the shared scratch
///
/// The estimator owns the scratch borrow for as long as it lives, so only
/// one channel can be in flight per arena.
pub struct SpectrumEstimator<'a> {
    plan: &'a dyn RealToComplex<f32>,
    scratch: SharedScratch<'a>,
    fft_size: usize,
    tau: f32,
    analyzer_active: bool,
}

impl<'a> SpectrumEstimator<'a> {
    pub fn new(
        plan: &'a dyn RealToComplex<f32>,
        scratch: SharedScratch<'a>,
        tau: f32,
        analyzer_active: bool,
    ) -> Self {
        Self {
            fft_size: plan.len(),
            plan,
            scratch,
            tau,
            analyzer_active,
        }
    }

    pub fn bins(&self) -> usize {
        FftEngine::num_bins(self.fft_size)
    }

    /// Update `amp` from the channel's ring as it stands now
    ///
    /// Frozen channels keep their spectrum; disabled channels (or a disabled
    /// analyzer) read as silence.
    pub fn analyze(&mut self, channel: &ChannelState, storage: &[f32], amp: &mut [f32]) {
        if channel.is_frozen() {
            return;
        }

        if !(self.analyzer_active && channel.is_active()) {
            amp.fill(0.0);
            return;
        }

        let n = self.fft_size;
        let bins = self.bins();
        let signal = &mut self.scratch.signal[..n];

        // Single windowing pass, straight out of the ring
        channel
            .ring()
            .read_last_weighted(storage, channel.delay(), &self.scratch.window[..n], signal);

        let transformed = forward_magnitude(
            self.plan,
            signal,
            &mut self.scratch.spectrum[..bins],
            &mut self.scratch.fft_scratch[..],
        );
        if transformed.is_err() {
            return;
        }

        let keep = 1.0 - self.tau;
        for (a, m) in amp[..bins].iter_mut().zip(signal[..bins].iter()) {
            *a = *a * keep + m * self.tau;
        }
    }
}
