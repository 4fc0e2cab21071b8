//! Streaming multichannel spectrum analyzer
//!
//! Combines the ring-buffered channels, the lazily reconfigured parameters
//! and the FFT engine into a real-time analyzer: feed blocks with
//! [`ingest`](SpectrumAnalyzer::ingest), read smoothed spectra with
//! [`get_spectrum`](SpectrumAnalyzer::get_spectrum) or
//! [`get_level`](SpectrumAnalyzer::get_level).
//!
//! Parameter changes are only recorded by the setters and applied at the top
//! of the next `ingest`, so a running stream never sees a half-applied
//! configuration. After `initialize` nothing allocates.

use serde::Serialize;
use tracing::{debug, warn};

use super::arena::{Arena, ArenaLayout, ArenaParts};
use super::config::{
    AnalyzerLimits, AnalyzerSettings, ConfigController, DirtyFlags, ParamDomain,
    MAX_SUPPORTED_RANK, MIN_RANK,
};
use super::estimator::SpectrumEstimator;
use super::fft::FftEngine;
use super::query::{bin_index, fill_grid, FrequencyScale};
use crate::audio::ChannelState;
use crate::curves::{generate_envelope, generate_window, EnvelopeType, WindowType};
use crate::error::AnalyzerError;

/// Snapshot of one channel's scheduling state
#[derive(Debug, Clone, Serialize)]
pub struct ChannelSnapshot {
    pub head: usize,
    pub counter: f64,
    pub delay: usize,
    pub frozen: bool,
    pub active: bool,
}

/// Diagnostic dump of the whole analyzer
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzerState {
    pub limits: Option<AnalyzerLimits>,
    pub settings: Option<AnalyzerSettings>,
    pub pending: DirtyFlags,
    pub fft_size: usize,
    pub period: f64,
    pub tau: f32,
    pub ring_capacity: usize,
    pub arena_bytes: usize,
    pub channels: Vec<ChannelSnapshot>,
}

/// Real-time spectrum analyzer
///
/// Created empty; call [`initialize`](Self::initialize) before use. Every
/// entry point on an empty analyzer is a harmless no-op or failure.
#[derive(Default)]
pub struct SpectrumAnalyzer {
    controller: Option<ConfigController>,
    channels: Vec<ChannelState>,
    arena: Arena,
    fft: Option<FftEngine>,
}

impl SpectrumAnalyzer {
    /// Create an empty analyzer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and initialize in one step
    pub fn with_limits(
        channels: usize,
        max_rank: usize,
        max_sample_rate: u32,
        min_rate: f32,
    ) -> Result<Self, AnalyzerError> {
        let mut analyzer = Self::new();
        analyzer.initialize(channels, max_rank, max_sample_rate, min_rate)?;
        Ok(analyzer)
    }

    /// Allocate everything the analyzer will ever need
    ///
    /// # Arguments
    /// * `channels` - Number of input channels
    /// * `max_rank` - Largest transform rank (log2 of size) `set_rank` may select
    /// * `max_sample_rate` - Largest sample rate `set_sample_rate` accepts
    /// * `min_rate` - Lowest frame rate; bounds the longest period to buffer
    ///
    /// On failure the analyzer is left empty.
    pub fn initialize(
        &mut self,
        channels: usize,
        max_rank: usize,
        max_sample_rate: u32,
        min_rate: f32,
    ) -> Result<(), AnalyzerError> {
        *self = Self::default();

        let result = self.try_initialize(channels, max_rank, max_sample_rate, min_rate);
        if let Err(e) = &result {
            warn!("Analyzer initialization rejected: {e}");
            *self = Self::default();
        }
        result
    }

    fn try_initialize(
        &mut self,
        channels: usize,
        max_rank: usize,
        max_sample_rate: u32,
        min_rate: f32,
    ) -> Result<(), AnalyzerError> {
        if channels == 0 {
            return Err(AnalyzerError::InvalidChannel { channel: 0, channels: 0 });
        }
        if !(MIN_RANK..=MAX_SUPPORTED_RANK).contains(&max_rank) {
            return Err(AnalyzerError::InvalidRank {
                rank: max_rank,
                max_rank: MAX_SUPPORTED_RANK,
            });
        }
        if !(min_rate > 0.0 && min_rate.is_finite()) {
            return Err(AnalyzerError::InvalidRate(min_rate));
        }

        let fft = FftEngine::new(max_rank);
        let max_period = max_sample_rate as f64 / min_rate as f64;
        let layout = ArenaLayout::new(channels, max_rank, max_period, fft.scratch_len())?;
        self.arena.allocate(layout)?;

        let mut states = Vec::new();
        states
            .try_reserve_exact(channels)
            .map_err(|_| AnalyzerError::AllocationFailure { requested: channels })?;
        states.resize_with(channels, ChannelState::new);

        self.channels = states;
        self.fft = Some(fft);
        self.controller = Some(ConfigController::new(AnalyzerLimits {
            channels,
            max_rank,
            max_sample_rate,
            min_rate,
        }));

        debug!(
            channels,
            max_rank,
            max_sample_rate,
            min_rate,
            ring_capacity = layout.ring_capacity,
            arena_bytes = self.arena.bytes(),
            "Analyzer initialized"
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.controller.is_some()
    }

    /// Set the input sample rate, clamped to `max_sample_rate`
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        if let Some(c) = self.controller.as_mut() {
            c.set_sample_rate(sample_rate);
        }
    }

    /// Set frames per second per channel, clamped to at least `min_rate`
    pub fn set_rate(&mut self, rate: f32) {
        if let Some(c) = self.controller.as_mut() {
            c.set_rate(rate);
        }
    }

    pub fn set_window(&mut self, window: WindowType) {
        if let Some(c) = self.controller.as_mut() {
            c.set_window(window);
        }
    }

    pub fn set_envelope(&mut self, envelope: EnvelopeType) {
        if let Some(c) = self.controller.as_mut() {
            c.set_envelope(envelope);
        }
    }

    /// Set the envelope gain multiplier
    pub fn set_shift(&mut self, shift: f32) {
        if let Some(c) = self.controller.as_mut() {
            c.set_shift(shift);
        }
    }

    /// Set the smoothing time in seconds (negative values mean none)
    pub fn set_reactivity(&mut self, reactivity: f32) {
        if let Some(c) = self.controller.as_mut() {
            c.set_reactivity(reactivity);
        }
    }

    /// Select a transform of `2^rank` samples
    pub fn set_rank(&mut self, rank: usize) -> Result<(), AnalyzerError> {
        self.controller
            .as_mut()
            .ok_or(AnalyzerError::Uninitialized)?
            .set_rank(rank)
    }

    /// Enable or disable the whole analyzer; takes effect at the next frame
    pub fn set_active(&mut self, active: bool) {
        if let Some(c) = self.controller.as_mut() {
            c.set_active(active);
        }
    }

    /// Route every field of `settings` through the validated setters
    ///
    /// The rank goes first: if it is rejected, nothing else is stored.
    pub fn apply_settings(&mut self, settings: &AnalyzerSettings) -> Result<(), AnalyzerError> {
        self.set_rank(settings.rank)?;
        self.set_sample_rate(settings.sample_rate);
        self.set_rate(settings.rate);
        self.set_window(settings.window);
        self.set_envelope(settings.envelope);
        self.set_shift(settings.shift);
        self.set_reactivity(settings.reactivity);
        self.set_active(settings.active);
        Ok(())
    }

    /// Zero every smoothed spectrum at the next processing boundary
    pub fn clear(&mut self) {
        if let Some(c) = self.controller.as_mut() {
            c.request_clear();
        }
    }

    /// Keep (or stop keeping) the last spectrum of `channel`
    pub fn freeze_channel(&mut self, channel: usize, freeze: bool) -> Result<(), AnalyzerError> {
        self.channel_mut(channel)?.set_frozen(freeze);
        Ok(())
    }

    /// Enable or disable analysis of `channel`; disabled channels read as silence
    pub fn enable_channel(&mut self, channel: usize, enable: bool) -> Result<(), AnalyzerError> {
        self.channel_mut(channel)?.set_active(enable);
        Ok(())
    }

    fn channel_mut(&mut self, channel: usize) -> Result<&mut ChannelState, AnalyzerError> {
        let channels = self.channels.len();
        self.channels
            .get_mut(channel)
            .ok_or(AnalyzerError::InvalidChannel { channel, channels })
    }

    /// Apply every pending parameter change
    ///
    /// Runs automatically at the top of [`ingest`](Self::ingest). Returns
    /// `false` when nothing was pending.
    pub fn reconfigure(&mut self) -> bool {
        let Some(controller) = self.controller.as_mut() else {
            return false;
        };

        let pending = controller.commit();
        if pending.is_empty() {
            return false;
        }

        let settings = controller.settings();
        let derived = *controller.derived();
        let n = derived.fft_size;

        let Some(ArenaParts { mut shared, mut channels }) = self.arena.split_mut() else {
            return false;
        };

        if pending.contains(ParamDomain::Envelope) {
            let envelope = &mut shared.envelope[..n];
            generate_envelope(envelope, settings.envelope);
            let norm = settings.shift / n as f32;
            envelope.iter_mut().for_each(|g| *g *= norm);
        }

        if pending.contains(ParamDomain::AnalysisClear) {
            for amp in channels.amplitudes_mut() {
                amp.fill(0.0);
            }
        }

        if pending.contains(ParamDomain::Window) {
            generate_window(&mut shared.window[..n], settings.window);
        }

        if pending.contains(ParamDomain::Counters) {
            for (i, ch) in self.channels.iter_mut().enumerate() {
                ch.set_phase(i * derived.stagger);
            }
        }

        debug!(
            pending = pending.bits(),
            fft_size = n,
            period = derived.period,
            tau = derived.tau,
            stagger = derived.stagger,
            "Analyzer reconfigured"
        );
        true
    }

    /// Whether a setter has changed something not yet applied
    pub fn needs_reconfiguration(&self) -> bool {
        self.controller
            .as_ref()
            .map(|c| !c.pending().is_empty())
            .unwrap_or(false)
    }

    /// Feed a block of samples to `channel`
    ///
    /// Applies pending configuration first, then buffers the block and runs
    /// one analysis frame per elapsed period. Unknown channels are ignored.
    ///
    /// # Returns
    /// Number of frames analyzed during this call
    pub fn ingest(&mut self, channel: usize, samples: &[f32]) -> usize {
        if channel >= self.channels.len() {
            return 0;
        }

        self.reconfigure();

        let Some(controller) = self.controller.as_ref() else {
            return 0;
        };
        let derived = *controller.derived();
        let active = controller.settings().active;

        let Some(plan) = self.fft.as_ref().and_then(|f| f.plan(derived.rank)) else {
            return 0;
        };
        let Some(ArenaParts { shared, mut channels }) = self.arena.split_mut() else {
            return 0;
        };
        let Some((ring, amp)) = channels.get_mut(channel) else {
            return 0;
        };

        let mut estimator = SpectrumEstimator::new(plan.as_ref(), shared, derived.tau, active);
        self.channels[channel].ingest(
            ring,
            samples,
            derived.period,
            derived.fft_size,
            |state, storage| estimator.analyze(state, storage, amp),
        )
    }

    /// Fill `freqs` with `freqs.len()` frequencies from `start` to `stop`
    pub fn read_frequencies(
        &self,
        freqs: &mut [f32],
        start: f32,
        stop: f32,
        scale: FrequencyScale,
    ) -> Result<(), AnalyzerError> {
        if !self.is_initialized() {
            return Err(AnalyzerError::Uninitialized);
        }
        fill_grid(freqs, start, stop, scale)
    }

    /// Logarithmic grid from `start` to `stop` plus the nearest bin of each point
    ///
    /// Maps with the current rank and sample rate, pending or not; fills
    /// `min(freqs.len(), indices.len())` points.
    pub fn get_frequencies(&self, freqs: &mut [f32], indices: &mut [usize], start: f32, stop: f32) {
        let count = freqs.len().min(indices.len());
        let freqs = &mut freqs[..count];
        if fill_grid(freqs, start, stop, FrequencyScale::Logarithmic).is_err() {
            return;
        }

        let (fft_size, sample_rate) = self.configured_grid();
        for (ix, &f) in indices.iter_mut().zip(freqs.iter()) {
            *ix = bin_index(f, fft_size, sample_rate);
        }
    }

    /// `out[i] = amplitude[indices[i]] * envelope[indices[i]]`
    ///
    /// Indices beyond the current Nyquist bin read as zero.
    pub fn get_spectrum(
        &self,
        channel: usize,
        out: &mut [f32],
        indices: &[usize],
    ) -> Result<(), AnalyzerError> {
        let amp = self.amplitude(channel)?;
        let envelope = self.arena.envelope();
        let bins = self.bins();

        for (o, &j) in out.iter_mut().zip(indices.iter()) {
            *o = if j < bins { amp[j] * envelope[j] } else { 0.0 };
        }
        Ok(())
    }

    /// Envelope-normalized level of one bin, or 0 for a bad channel or bin
    pub fn get_level(&self, channel: usize, index: usize) -> f32 {
        match self.amplitude(channel) {
            Ok(amp) if index < self.bins() => amp[index] * self.arena.envelope()[index],
            _ => 0.0,
        }
    }

    /// Raw smoothed magnitudes of `channel` for the current transform size
    pub fn amplitude(&self, channel: usize) -> Result<&[f32], AnalyzerError> {
        let channels = self.channels.len();
        let amp = self
            .arena
            .amplitude(channel)
            .ok_or(AnalyzerError::InvalidChannel { channel, channels })?;
        Ok(&amp[..self.bins()])
    }

    fn configured_grid(&self) -> (usize, u32) {
        self.settings()
            .map(|s| (1usize << s.rank, s.sample_rate))
            .unwrap_or((0, 0))
    }

    pub fn channels(&self) -> usize {
        self.channels.len()
    }

    pub fn settings(&self) -> Option<&AnalyzerSettings> {
        self.controller.as_ref().map(|c| c.settings())
    }

    pub fn limits(&self) -> Option<&AnalyzerLimits> {
        self.controller.as_ref().map(|c| c.limits())
    }

    /// Transform size the stream currently runs with
    pub fn fft_size(&self) -> usize {
        self.controller.as_ref().map(|c| c.derived().fft_size).unwrap_or(0)
    }

    /// Number of bins the stream currently produces (0 before initialization)
    pub fn bins(&self) -> usize {
        match self.fft_size() {
            0 => 0,
            n => FftEngine::num_bins(n),
        }
    }

    /// Samples between frames, as applied
    pub fn period(&self) -> f64 {
        self.controller.as_ref().map(|c| c.derived().period).unwrap_or(0.0)
    }

    /// Smoothing coefficient, as applied
    pub fn tau(&self) -> f32 {
        self.controller.as_ref().map(|c| c.derived().tau).unwrap_or(1.0)
    }

    pub fn is_active(&self) -> bool {
        self.settings().map(|s| s.active).unwrap_or(false)
    }

    pub fn is_frozen(&self, channel: usize) -> bool {
        self.channels.get(channel).map(|c| c.is_frozen()).unwrap_or(false)
    }

    pub fn is_enabled(&self, channel: usize) -> bool {
        self.channels.get(channel).map(|c| c.is_active()).unwrap_or(false)
    }

    /// Window coefficients for the current transform size
    pub fn window_coefficients(&self) -> &[f32] {
        let w = self.arena.window();
        &w[..self.fft_size().min(w.len())]
    }

    /// Envelope gains for the current transform size
    pub fn envelope_gains(&self) -> &[f32] {
        let e = self.arena.envelope();
        &e[..self.fft_size().min(e.len())]
    }

    /// Snapshot of the scalar state and per-channel counters
    pub fn dump(&self) -> AnalyzerState {
        let derived = self.controller.as_ref().map(|c| *c.derived()).unwrap_or_default();
        AnalyzerState {
            limits: self.limits().copied(),
            settings: self.settings().cloned(),
            pending: self.controller.as_ref().map(|c| c.pending()).unwrap_or_default(),
            fft_size: self.fft_size(),
            period: derived.period,
            tau: derived.tau,
            ring_capacity: self.arena.layout().map(|l| l.ring_capacity).unwrap_or(0),
            arena_bytes: self.arena.bytes(),
            channels: self
                .channels
                .iter()
                .map(|c| ChannelSnapshot {
                    head: c.ring().head(),
                    counter: c.counter(),
                    delay: c.delay(),
                    frozen: c.is_frozen(),
                    active: c.is_active(),
                })
                .collect(),
        }
    }
}
