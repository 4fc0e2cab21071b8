//! Spectral analysis with FFT

pub mod analysis;
pub mod arena;
pub mod config;
pub mod estimator;
pub mod fft;
pub mod query;

pub use analysis::{AnalyzerState, ChannelSnapshot, SpectrumAnalyzer};
pub use config::{AnalyzerLimits, AnalyzerSettings, DirtyFlags, ParamDomain};
pub use fft::FftEngine;
pub use query::FrequencyScale;
