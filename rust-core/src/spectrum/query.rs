//! Frequency grids and bin lookup for spectrum read-out

use crate::error::AnalyzerError;
use serde::{Deserialize, Serialize};

/// Spacing of a frequency grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyScale {
    #[default]
    Logarithmic,
    Linear,
}

impl TryFrom<u32> for FrequencyScale {
    type Error = AnalyzerError;

    fn try_from(flag: u32) -> Result<Self, Self::Error> {
        match flag {
            0 => Ok(FrequencyScale::Logarithmic),
            1 => Ok(FrequencyScale::Linear),
            other => Err(AnalyzerError::InvalidFrequencyGridFlag(other)),
        }
    }
}

/// Fill `freqs` with a grid from `start` to `stop` inclusive
///
/// A single point is exactly `start`; otherwise both endpoints are exact and
/// the interior follows `scale`. A logarithmic grid needs positive endpoints
/// and falls back to linear spacing without them.
pub fn fill_grid(
    freqs: &mut [f32],
    start: f32,
    stop: f32,
    scale: FrequencyScale,
) -> Result<(), AnalyzerError> {
    let count = freqs.len();
    match count {
        0 => return Err(AnalyzerError::EmptyFrequencyGrid),
        1 => {
            freqs[0] = start;
            return Ok(());
        }
        _ => {}
    }

    let last = count - 1;
    let (start_f, stop_f) = (start as f64, stop as f64);

    let log_spaced = start_f > 0.0 && stop_f > 0.0;
    match scale {
        FrequencyScale::Logarithmic if log_spaced => {
            let norm = (stop_f / start_f).ln() / last as f64;
            for (i, f) in freqs[..last].iter_mut().enumerate().skip(1) {
                *f = (start_f * (i as f64 * norm).exp()) as f32;
            }
        }
        _ => {
            let norm = (stop_f - start_f) / last as f64;
            for (i, f) in freqs[..last].iter_mut().enumerate().skip(1) {
                *f = (start_f + i as f64 * norm) as f32;
            }
        }
    }

    freqs[0] = start;
    freqs[last] = stop;
    Ok(())
}

/// Nearest bin for `frequency` in a `fft_size`-point transform at `sample_rate`
///
/// Clamped to the Nyquist bin; negative or non-finite frequencies map to DC.
pub fn bin_index(frequency: f32, fft_size: usize, sample_rate: u32) -> usize {
    if sample_rate == 0 || fft_size == 0 {
        return 0;
    }

    let last = fft_size / 2;
    let exact = frequency as f64 * fft_size as f64 / sample_rate as f64;
    if !(exact > 0.0) {
        return 0;
    }

    let ix = exact.round();
    if ix >= last as f64 {
        last
    } else {
        ix as usize
    }
}
