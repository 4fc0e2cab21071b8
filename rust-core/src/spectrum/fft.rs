//! FFT engine using realfft for real-valued signals
//!
//! Every rank the analyzer may switch to is planned up front, so changing
//! the transform size on a live stream never plans or allocates.

use num_complex::Complex32;
use realfft::{FftError, RealFftPlanner, RealToComplex};
use std::sync::Arc;

use super::config::MIN_RANK;

/// Forward real FFTs for ranks `MIN_RANK..=max_rank`
pub struct FftEngine {
    /// plans[i] transforms 2^(i + MIN_RANK) samples
    plans: Vec<Arc<dyn RealToComplex<f32>>>,

    /// Largest scratch any plan needs
    scratch_len: usize,
}

impl FftEngine {
    /// Plan every rank up to `max_rank`
    pub fn new(max_rank: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();

        let plans: Vec<_> = (MIN_RANK..=max_rank.max(MIN_RANK))
            .map(|rank| planner.plan_fft_forward(1 << rank))
            .collect();

        let scratch_len = plans
            .iter()
            .map(|p| p.get_scratch_len())
            .max()
            .unwrap_or(0);

        Self { plans, scratch_len }
    }

    pub fn max_rank(&self) -> usize {
        self.plans.len() + MIN_RANK - 1
    }

    /// Complex scratch length that satisfies every plan
    pub fn scratch_len(&self) -> usize {
        self.scratch_len
    }

    pub fn plan(&self, rank: usize) -> Option<&Arc<dyn RealToComplex<f32>>> {
        rank.checked_sub(MIN_RANK).and_then(|i| self.plans.get(i))
    }

    /// Number of frequency bins for a transform of `fft_size` samples
    pub fn num_bins(fft_size: usize) -> usize {
        fft_size / 2 + 1
    }
}

/// Run `plan` over `input` into `output`, then store |X[k]| for the first
/// `output.len()` bins back into `input`
///
/// The transform consumes `input` anyway, so the magnitudes reuse it.
pub fn forward_magnitude(
    plan: &dyn RealToComplex<f32>,
    input: &mut [f32],
    output: &mut [Complex32],
    scratch: &mut [Complex32],
) -> Result<(), FftError> {
    let scratch_len = plan.get_scratch_len();
    plan.process_with_scratch(input, output, &mut scratch[..scratch_len])?;

    for (m, c) in input.iter_mut().zip(output.iter()) {
        *m = c.norm();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn run(engine: &FftEngine, rank: usize, signal: &[f32]) -> Vec<f32> {
        let n = 1 << rank;
        let plan = engine.plan(rank).unwrap();
        let mut input = signal.to_vec();
        let mut output = vec![Complex32::new(0.0, 0.0); FftEngine::num_bins(n)];
        let mut scratch = vec![Complex32::new(0.0, 0.0); engine.scratch_len()];

        forward_magnitude(plan.as_ref(), &mut input, &mut output, &mut scratch).unwrap();
        input.truncate(FftEngine::num_bins(n));
        input
    }

    #[test]
    fn test_plans_every_rank() {
        let engine = FftEngine::new(12);
        assert_eq!(engine.max_rank(), 12);

        assert!(engine.plan(1).is_none());
        assert!(engine.plan(13).is_none());
        for rank in 2..=12 {
            assert_eq!(engine.plan(rank).unwrap().len(), 1 << rank);
        }
    }

    #[test]
    fn test_fft_dc_signal() {
        let engine = FftEngine::new(10);
        let spectrum = run(&engine, 10, &vec![1.0; 1024]);

        assert_eq!(spectrum.len(), 513);
        assert!((spectrum[0] - 1024.0).abs() < 1e-2);
        assert!(spectrum[10] < 1e-2);
    }

    #[test]
    fn test_fft_sine_wave() {
        let engine = FftEngine::new(10);

        // Bin-centred sine at bin 64
        let signal: Vec<f32> = (0..1024)
            .map(|n| (2.0 * PI * 64.0 * n as f32 / 1024.0).sin())
            .collect();
        let spectrum = run(&engine, 10, &signal);

        let (peak_bin, &peak_mag) = spectrum
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .unwrap();

        assert_eq!(peak_bin, 64);
        // N/2 for a unit sine
        assert!((peak_mag - 512.0).abs() < 0.5);
    }
}
