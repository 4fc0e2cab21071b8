//! Window functions for spectral analysis
//!
//! Coefficients are written straight into a caller-owned buffer so the
//! analyzer can regenerate them inside its arena without allocating.

use crate::error::AnalyzerError;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Window function families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowType {
    /// Hann window: w[n] = 0.5 - 0.5*cos(2πn/(M-1))
    /// Peak sidelobe: ~-31 dB
    #[default]
    Hann,

    /// Hamming window: w[n] = 0.54 - 0.46*cos(2πn/(M-1))
    /// Peak sidelobe: ~-43 dB
    Hamming,

    /// Blackman window: w[n] = 0.42 - 0.5*cos(2πn/(M-1)) + 0.08*cos(4πn/(M-1))
    /// Peak sidelobe: ~-58 dB
    Blackman,

    /// 4-term Nuttall window, peak sidelobe ~-93 dB
    Nuttall,

    /// 4-term Blackman-Harris window, peak sidelobe ~-92 dB
    BlackmanHarris,

    /// 5-term flat-top window for amplitude-accurate metering
    FlatTop,

    /// Triangular window: w[n] = 1 - |2n/(M-1) - 1|
    Triangular,

    /// Rectangular window (no windowing)
    Rectangular,
}

impl WindowType {
    /// Approximate level of the highest sidelobe relative to the main lobe, in dB
    pub fn sidelobe_level_db(&self) -> f64 {
        match self {
            WindowType::Hann => -31.5,
            WindowType::Hamming => -42.7,
            WindowType::Blackman => -58.1,
            WindowType::Nuttall => -93.3,
            WindowType::BlackmanHarris => -92.0,
            WindowType::FlatTop => -88.0,
            WindowType::Triangular => -26.5,
            WindowType::Rectangular => -13.3,
        }
    }

    /// Cosine-sum coefficients a0, a1, ... (alternating signs are applied by the generator)
    fn cosine_terms(&self) -> Option<&'static [f64]> {
        match self {
            WindowType::Hann => Some(&[0.5, 0.5]),
            WindowType::Hamming => Some(&[0.54, 0.46]),
            WindowType::Blackman => Some(&[0.42, 0.5, 0.08]),
            WindowType::Nuttall => Some(&[0.355768, 0.487396, 0.144232, 0.012604]),
            WindowType::BlackmanHarris => Some(&[0.35875, 0.48829, 0.14128, 0.01168]),
            WindowType::FlatTop => Some(&[
                0.21557895,
                0.41663158,
                0.277263158,
                0.083578947,
                0.006947368,
            ]),
            WindowType::Triangular | WindowType::Rectangular => None,
        }
    }
}

impl TryFrom<u32> for WindowType {
    type Error = AnalyzerError;

    fn try_from(tag: u32) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(WindowType::Hann),
            1 => Ok(WindowType::Hamming),
            2 => Ok(WindowType::Blackman),
            3 => Ok(WindowType::Nuttall),
            4 => Ok(WindowType::BlackmanHarris),
            5 => Ok(WindowType::FlatTop),
            6 => Ok(WindowType::Triangular),
            7 => Ok(WindowType::Rectangular),
            other => Err(AnalyzerError::UnknownWindow(other)),
        }
    }
}

/// Generate window coefficients into `buffer`
///
/// # Arguments
/// * `buffer` - Destination, one coefficient per sample (M = buffer.len())
/// * `window_type` - Type of window function
pub fn generate_window(buffer: &mut [f32], window_type: WindowType) {
    let length = buffer.len();
    if length == 0 {
        return;
    }
    if length == 1 {
        buffer[0] = 1.0;
        return;
    }

    let m1 = (length - 1) as f64;

    if let Some(terms) = window_type.cosine_terms() {
        // w[n] = a0 - a1*cos(2πn/(M-1)) + a2*cos(4πn/(M-1)) - ...
        for (n, w) in buffer.iter_mut().enumerate() {
            let angle = 2.0 * PI * n as f64 / m1;
            let mut sum = 0.0;
            let mut sign = 1.0;
            for (k, a) in terms.iter().enumerate() {
                sum += sign * a * (k as f64 * angle).cos();
                sign = -sign;
            }
            *w = sum as f32;
        }
        return;
    }

    match window_type {
        WindowType::Triangular => {
            for (n, w) in buffer.iter_mut().enumerate() {
                *w = (1.0 - (2.0 * n as f64 / m1 - 1.0).abs()) as f32;
            }
        }
        _ => buffer.fill(1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_generation() {
        let length = 161;
        let mut hann = vec![0.0f32; length];
        let mut hamming = vec![0.0f32; length];
        let mut blackman = vec![0.0f32; length];

        generate_window(&mut hann, WindowType::Hann);
        generate_window(&mut hamming, WindowType::Hamming);
        generate_window(&mut blackman, WindowType::Blackman);

        // Check symmetry
        assert!((hann[0] - hann[length - 1]).abs() < 1e-6);
        assert!((hamming[0] - hamming[length - 1]).abs() < 1e-6);
        assert!((blackman[0] - blackman[length - 1]).abs() < 1e-6);

        // Center values should be 1.0 for odd symmetric windows
        let center = length / 2;
        assert!((hann[center] - 1.0).abs() < 1e-6);
        assert!((hamming[center] - 1.0).abs() < 1e-6);
        assert!((blackman[center] - 1.0).abs() < 1e-6);

        // Hamming should have non-zero endpoints (0.08)
        assert!(hamming[0] > 0.07 && hamming[0] < 0.09);
        assert!(hann[0].abs() < 1e-6);
    }

    #[test]
    fn test_four_term_windows_peak_near_one() {
        for kind in [WindowType::Nuttall, WindowType::BlackmanHarris] {
            let mut w = vec![0.0f32; 257];
            generate_window(&mut w, kind);
            assert!((w[128] - 1.0).abs() < 1e-3, "{kind:?} center = {}", w[128]);
            assert!(w[0] < 1e-3);
        }
    }

    #[test]
    fn test_triangular_and_rectangular() {
        let mut tri = vec![0.0f32; 5];
        generate_window(&mut tri, WindowType::Triangular);
        assert_eq!(tri, vec![0.0, 0.5, 1.0, 0.5, 0.0]);

        let mut rect = vec![0.0f32; 100];
        generate_window(&mut rect, WindowType::Rectangular);
        assert!(rect.iter().all(|&w| w == 1.0));
    }

    #[test]
    fn test_degenerate_lengths() {
        let mut empty: [f32; 0] = [];
        generate_window(&mut empty, WindowType::Hann);

        let mut single = [0.0f32];
        generate_window(&mut single, WindowType::Blackman);
        assert_eq!(single[0], 1.0);
    }

    #[test]
    fn test_tag_conversion() {
        assert_eq!(WindowType::try_from(0), Ok(WindowType::Hann));
        assert_eq!(WindowType::try_from(7), Ok(WindowType::Rectangular));
        assert_eq!(WindowType::try_from(42), Err(AnalyzerError::UnknownWindow(42)));
    }
}
