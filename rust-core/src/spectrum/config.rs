//! Analyzer parameters and lazy reconfiguration
//!
//! Setters never recompute anything. They record which parameter domains
//! went stale in a [`DirtyFlags`] set; the analyzer resolves the whole set
//! in one pass at the next processing boundary using [`derive`].

use crate::curves::{EnvelopeType, WindowType};
use crate::error::AnalyzerError;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_1_SQRT_2;

/// Largest rank accepted by `initialize`
pub const MAX_SUPPORTED_RANK: usize = 24;

/// Smallest valid rank
pub const MIN_RANK: usize = 2;

/// Derived quantities that can go stale independently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ParamDomain {
    Window = 1 << 0,
    Envelope = 1 << 1,
    Tau = 1 << 2,
    Counters = 1 << 3,
    AnalysisClear = 1 << 4,
}

impl ParamDomain {
    pub const ALL: [ParamDomain; 5] = [
        ParamDomain::Window,
        ParamDomain::Envelope,
        ParamDomain::Tau,
        ParamDomain::Counters,
        ParamDomain::AnalysisClear,
    ];
}

/// Set of pending recomputations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DirtyFlags(u8);

impl DirtyFlags {
    pub const NONE: DirtyFlags = DirtyFlags(0);
    pub const ALL: DirtyFlags = DirtyFlags(0b1_1111);

    pub fn only(domain: ParamDomain) -> Self {
        DirtyFlags(domain as u8)
    }

    pub fn mark(&mut self, domain: ParamDomain) {
        self.0 |= domain as u8;
    }

    pub fn mark_all(&mut self) {
        *self = Self::ALL;
    }

    pub fn contains(&self, domain: ParamDomain) -> bool {
        self.0 & domain as u8 != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Return the pending set and leave this one empty
    pub fn take(&mut self) -> DirtyFlags {
        std::mem::take(self)
    }

    pub fn iter(&self) -> impl Iterator<Item = ParamDomain> + '_ {
        ParamDomain::ALL.into_iter().filter(|d| self.contains(*d))
    }

    pub fn bits(&self) -> u8 {
        self.0
    }
}

/// User-facing analyzer parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerSettings {
    /// Sample rate in Hz (0 until the host provides one)
    pub sample_rate: u32,

    /// log2 of the transform size
    pub rank: usize,

    /// Frames per second per channel
    pub rate: f32,

    /// Envelope gain multiplier
    pub shift: f32,

    /// Time in seconds for the smoothed spectrum to reach -3 dB of a step
    pub reactivity: f32,

    pub window: WindowType,
    pub envelope: EnvelopeType,

    /// Global switch; an inactive analyzer produces silent spectra
    pub active: bool,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            sample_rate: 0,
            rank: 10,
            rate: 1.0,
            shift: 1.0,
            reactivity: 0.0,
            window: WindowType::Hann,
            envelope: EnvelopeType::Pink,
            active: true,
        }
    }
}

/// Limits fixed at initialization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerLimits {
    pub channels: usize,
    pub max_rank: usize,
    pub max_sample_rate: u32,
    pub min_rate: f32,
}

/// Values the streaming path actually runs with
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Derived {
    pub sample_rate: u32,
    pub rank: usize,
    pub fft_size: usize,
    /// Samples between frames; fractional on purpose
    pub period: f64,
    /// One-pole smoothing coefficient
    pub tau: f32,
    /// Phase offset between neighbouring channels
    pub stagger: usize,
}

impl Default for Derived {
    fn default() -> Self {
        Self {
            sample_rate: 0,
            rank: MIN_RANK,
            fft_size: 1 << MIN_RANK,
            period: 0.0,
            tau: 1.0,
            stagger: 0,
        }
    }
}

/// Smoothing coefficient that brings a step response to -3 dB after
/// `reactivity` seconds at `frame_rate` frames per second
pub fn smoothing_coefficient(reactivity: f32, frame_rate: f64) -> f32 {
    let frames = reactivity as f64 * frame_rate;
    // frames == 0 gives exp(-inf) == 0, i.e. no smoothing at all
    let tau = 1.0 - ((1.0 - FRAC_1_SQRT_2).ln() / frames).exp();
    if tau.is_finite() {
        tau.clamp(0.0, 1.0) as f32
    } else {
        1.0
    }
}

/// Per-channel phase step: an even share of the transform, rounded down to 4 samples
pub fn stagger_step(fft_size: usize, channels: usize) -> usize {
    if channels == 0 {
        return 0;
    }
    let step = fft_size / channels;
    step - (step & 0x3)
}

/// Recompute the scalar derived values for `pending`
///
/// The period always follows the current settings; tau and stagger are only
/// refreshed when their domain is pending, otherwise `previous` carries over.
pub fn derive(
    pending: DirtyFlags,
    settings: &AnalyzerSettings,
    channels: usize,
    previous: &Derived,
) -> Derived {
    let fft_size = 1usize << settings.rank;
    let period = settings.sample_rate as f64 / settings.rate as f64;

    let tau = if pending.contains(ParamDomain::Tau) {
        let frame_rate = if period > 0.0 {
            settings.sample_rate as f64 / period
        } else {
            settings.rate as f64
        };
        smoothing_coefficient(settings.reactivity, frame_rate)
    } else {
        previous.tau
    };

    let stagger = if pending.contains(ParamDomain::Counters) {
        stagger_step(fft_size, channels)
    } else {
        previous.stagger
    };

    Derived {
        sample_rate: settings.sample_rate,
        rank: settings.rank,
        fft_size,
        period,
        tau,
        stagger,
    }
}

/// Owner of the user-facing parameters and the dirty set
///
/// Every setter validates, stores, and marks the minimal set of domains it
/// invalidates. Repeating a value marks nothing.
#[derive(Debug, Clone)]
pub struct ConfigController {
    limits: AnalyzerLimits,
    settings: AnalyzerSettings,
    dirty: DirtyFlags,
    derived: Derived,
}

impl ConfigController {
    pub fn new(limits: AnalyzerLimits) -> Self {
        let defaults = AnalyzerSettings::default();
        let settings = AnalyzerSettings {
            rank: limits.max_rank,
            rate: defaults.rate.max(limits.min_rate),
            ..defaults
        };

        Self {
            limits,
            settings,
            dirty: DirtyFlags::ALL,
            derived: Derived::default(),
        }
    }

    pub fn limits(&self) -> &AnalyzerLimits {
        &self.limits
    }

    pub fn settings(&self) -> &AnalyzerSettings {
        &self.settings
    }

    pub fn derived(&self) -> &Derived {
        &self.derived
    }

    pub fn pending(&self) -> DirtyFlags {
        self.dirty
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        let sample_rate = sample_rate.min(self.limits.max_sample_rate);
        if self.settings.sample_rate == sample_rate {
            return;
        }
        self.settings.sample_rate = sample_rate;
        self.dirty.mark_all();
    }

    pub fn set_rate(&mut self, rate: f32) {
        // NaN falls back to the minimum as well
        let rate = if rate >= self.limits.min_rate {
            rate
        } else {
            self.limits.min_rate
        };
        if self.settings.rate == rate {
            return;
        }
        self.settings.rate = rate;
        self.dirty.mark(ParamDomain::Counters);
        // Period drives the frame rate the smoothing is tuned for
        self.dirty.mark(ParamDomain::Tau);
    }

    pub fn set_window(&mut self, window: WindowType) {
        if self.settings.window == window {
            return;
        }
        self.settings.window = window;
        self.dirty.mark(ParamDomain::Window);
    }

    pub fn set_envelope(&mut self, envelope: EnvelopeType) {
        if self.settings.envelope == envelope {
            return;
        }
        self.settings.envelope = envelope;
        self.dirty.mark(ParamDomain::Envelope);
    }

    pub fn set_shift(&mut self, shift: f32) {
        if self.settings.shift == shift {
            return;
        }
        self.settings.shift = shift;
        self.dirty.mark(ParamDomain::Envelope);
    }

    pub fn set_reactivity(&mut self, reactivity: f32) {
        let reactivity = if reactivity > 0.0 { reactivity } else { 0.0 };
        if self.settings.reactivity == reactivity {
            return;
        }
        self.settings.reactivity = reactivity;
        self.dirty.mark(ParamDomain::Tau);
    }

    pub fn set_rank(&mut self, rank: usize) -> Result<(), AnalyzerError> {
        if rank < MIN_RANK || rank > self.limits.max_rank {
            return Err(AnalyzerError::InvalidRank {
                rank,
                max_rank: self.limits.max_rank,
            });
        }
        if self.settings.rank == rank {
            return Ok(());
        }
        self.settings.rank = rank;
        self.dirty.mark_all();
        Ok(())
    }

    pub fn set_active(&mut self, active: bool) {
        self.settings.active = active;
    }

    /// Request zeroing of every smoothed spectrum at the next boundary
    pub fn request_clear(&mut self) {
        self.dirty.mark(ParamDomain::AnalysisClear);
    }

    /// Take the pending set and commit freshly derived values
    ///
    /// Returns the set that was pending; empty means nothing changed.
    pub fn commit(&mut self) -> DirtyFlags {
        let pending = self.dirty.take();
        if !pending.is_empty() {
            self.derived = derive(pending, &self.settings, self.limits.channels, &self.derived);
        }
        pending
    }
}
