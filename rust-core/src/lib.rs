//! Streaming Analyzer - Real-Time Multichannel Spectrum Core
//!
//! Buffers interleaved audio streams per channel, runs a windowed FFT at a
//! fixed frame rate and keeps a smoothed magnitude spectrum per channel for
//! display or metering.

pub mod audio;
pub mod curves;
pub mod error;
pub mod spectrum;

pub use curves::{EnvelopeType, WindowType};
pub use error::AnalyzerError;
pub use spectrum::{AnalyzerSettings, FrequencyScale, SpectrumAnalyzer};
