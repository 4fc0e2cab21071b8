//! Normalization envelopes
//!
//! An envelope is the inverse amplitude slope of a reference noise colour,
//! one gain per bin. Multiplying a spectrum by the pink envelope makes pink
//! noise read flat, and so on.

use crate::error::AnalyzerError;
use serde::{Deserialize, Serialize};

/// Reference noise colours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeType {
    /// +6 dB/octave
    Violet,
    /// +3 dB/octave
    Blue,
    /// Flat
    White,
    /// -3 dB/octave
    #[default]
    Pink,
    /// -6 dB/octave
    Brown,
}

impl EnvelopeType {
    /// Exponent of the noise amplitude with respect to frequency
    pub fn amplitude_slope(&self) -> f64 {
        match self {
            EnvelopeType::Violet => 1.0,
            EnvelopeType::Blue => 0.5,
            EnvelopeType::White => 0.0,
            EnvelopeType::Pink => -0.5,
            EnvelopeType::Brown => -1.0,
        }
    }
}

impl TryFrom<u32> for EnvelopeType {
    type Error = AnalyzerError;

    fn try_from(tag: u32) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(EnvelopeType::Violet),
            1 => Ok(EnvelopeType::Blue),
            2 => Ok(EnvelopeType::White),
            3 => Ok(EnvelopeType::Pink),
            4 => Ok(EnvelopeType::Brown),
            other => Err(AnalyzerError::UnknownEnvelope(other)),
        }
    }
}

/// Generate the compensation curve for `envelope_type` into `buffer`
///
/// Index `i` is bin `i`; the DC gain is pinned to the gain of bin 1.
pub fn generate_envelope(buffer: &mut [f32], envelope_type: EnvelopeType) {
    let exponent = -envelope_type.amplitude_slope();

    if exponent == 0.0 {
        buffer.fill(1.0);
        return;
    }

    for (i, g) in buffer.iter_mut().enumerate() {
        let bin = i.max(1) as f64;
        *g = bin.powf(exponent) as f32;
    }
}
