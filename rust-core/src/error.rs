//! Analyzer error type
//!
//! Every failure is local and non-fatal: the analyzer is left exactly as it
//! was before the failing call.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyzerError {
    #[error("Failed to allocate analyzer memory ({requested} samples)")]
    AllocationFailure { requested: usize },

    #[error("Channel {channel} out of range (analyzer has {channels} channels)")]
    InvalidChannel { channel: usize, channels: usize },

    #[error("Rank {rank} out of range (expected 2..={max_rank})")]
    InvalidRank { rank: usize, max_rank: usize },

    #[error("Unrecognized frequency scale flag: {0}")]
    InvalidFrequencyGridFlag(u32),

    #[error("Frequency grid must hold at least one point")]
    EmptyFrequencyGrid,

    #[error("Unrecognized window family tag: {0}")]
    UnknownWindow(u32),

    #[error("Unrecognized envelope family tag: {0}")]
    UnknownEnvelope(u32),

    #[error("Refresh rate must be positive and finite (found: {0})")]
    InvalidRate(f32),

    #[error("Analyzer has not been initialized")]
    Uninitialized,
}
