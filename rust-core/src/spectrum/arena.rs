//! Analyzer memory arena
//!
//! All analyzer memory is obtained once, at initialization, from a
//! closed-form layout: one real pool holding the shared scratch and every
//! channel's ring and amplitude vector, plus one complex pool for the
//! transform. Regions never overlap and are handed out as plain slices.
//!
//! Real pool:
//! ```text
//! | signal | window | envelope | ring 0 | amp 0 | ring 1 | amp 1 | ... |
//!   fft      fft      fft        ring     bins
//! ```
//! Complex pool: `| spectrum (bins) | fft scratch |`

use num_complex::Complex32;
use std::ops::Range;

use crate::error::AnalyzerError;

/// Ring capacities are rounded up to this many samples
pub const RING_ALIGN: usize = 16;

/// Region sizes, all in elements, for the largest configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaLayout {
    pub channels: usize,
    /// Transform size at `max_rank`
    pub fft_size: usize,
    /// Bins at `max_rank`
    pub bins: usize,
    /// Per-channel sample history
    pub ring_capacity: usize,
    pub fft_scratch: usize,
}

impl ArenaLayout {
    /// Layout for `channels` channels up to `max_rank`, where a frame may be
    /// up to `max_period` samples apart
    pub fn new(
        channels: usize,
        max_rank: usize,
        max_period: f64,
        fft_scratch: usize,
    ) -> Result<Self, AnalyzerError> {
        let overflow = AnalyzerError::AllocationFailure { requested: usize::MAX };

        let fft_size = 1usize.checked_shl(max_rank as u32).ok_or(overflow.clone())?;
        if !max_period.is_finite() || max_period < 0.0 || max_period >= usize::MAX as f64 {
            return Err(overflow);
        }

        // One window, the largest stagger (< one window) and one full period
        let ring_capacity = fft_size
            .checked_mul(2)
            .and_then(|n| n.checked_add(max_period.ceil() as usize))
            .and_then(|n| n.checked_next_multiple_of(RING_ALIGN))
            .ok_or(overflow)?;

        Ok(Self {
            channels,
            fft_size,
            bins: fft_size / 2 + 1,
            ring_capacity,
            fft_scratch,
        })
    }

    fn channel_stride(&self) -> usize {
        self.ring_capacity + self.bins
    }

    fn shared_len(&self) -> usize {
        3 * self.fft_size
    }

    pub fn real_len(&self) -> Option<usize> {
        self.channel_stride()
            .checked_mul(self.channels)?
            .checked_add(self.shared_len())
    }

    pub fn complex_len(&self) -> Option<usize> {
        self.bins.checked_add(self.fft_scratch)
    }

    pub fn window_range(&self) -> Range<usize> {
        self.fft_size..2 * self.fft_size
    }

    pub fn envelope_range(&self) -> Range<usize> {
        2 * self.fft_size..3 * self.fft_size
    }

    pub fn ring_range(&self, channel: usize) -> Range<usize> {
        let start = self.shared_len() + channel * self.channel_stride();
        start..start + self.ring_capacity
    }

    pub fn amp_range(&self, channel: usize) -> Range<usize> {
        let start = self.shared_len() + channel * self.channel_stride() + self.ring_capacity;
        start..start + self.bins
    }
}

/// Shared scratch, reused by one channel's analysis pass at a time
pub struct SharedScratch<'a> {
    pub signal: &'a mut [f32],
    pub window: &'a mut [f32],
    pub envelope: &'a mut [f32],
    pub spectrum: &'a mut [Complex32],
    pub fft_scratch: &'a mut [Complex32],
}

/// Mutable view over all channel regions
pub struct ChannelRegions<'a> {
    data: &'a mut [f32],
    ring_capacity: usize,
    bins: usize,
}

impl<'a> ChannelRegions<'a> {
    /// Ring storage and amplitude vector of `channel`
    pub fn get_mut(&mut self, channel: usize) -> Option<(&mut [f32], &mut [f32])> {
        let stride = self.ring_capacity + self.bins;
        let region = self.data.get_mut(channel * stride..(channel + 1) * stride)?;
        Some(region.split_at_mut(self.ring_capacity))
    }

    pub fn amplitudes_mut(&mut self) -> impl Iterator<Item = &mut [f32]> + '_ {
        let ring_capacity = self.ring_capacity;
        self.data
            .chunks_exact_mut(self.ring_capacity + self.bins)
            .map(move |c| &mut c[ring_capacity..])
    }
}

/// Disjoint mutable borrow of the whole arena
pub struct ArenaParts<'a> {
    pub shared: SharedScratch<'a>,
    pub channels: ChannelRegions<'a>,
}

/// The analyzer's single block of memory
#[derive(Debug, Default)]
pub struct Arena {
    layout: Option<ArenaLayout>,
    real: Vec<f32>,
    complex: Vec<Complex32>,
}

fn try_filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>, AnalyzerError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| AnalyzerError::AllocationFailure { requested: len })?;
    v.resize(len, value);
    Ok(v)
}

impl Arena {
    /// Empty arena; every accessor yields nothing until `allocate`
    pub fn new() -> Self {
        Self::default()
    }

    /// Obtain zeroed memory for `layout`, replacing any previous block
    ///
    /// On failure the arena is left empty.
    pub fn allocate(&mut self, layout: ArenaLayout) -> Result<(), AnalyzerError> {
        *self = Self::default();

        let overflow = AnalyzerError::AllocationFailure { requested: usize::MAX };
        let real_len = layout.real_len().ok_or(overflow.clone())?;
        let complex_len = layout.complex_len().ok_or(overflow)?;

        let real = try_filled(real_len, 0.0f32)?;
        let complex = try_filled(complex_len, Complex32::new(0.0, 0.0))?;

        *self = Self {
            layout: Some(layout),
            real,
            complex,
        };
        Ok(())
    }

    pub fn layout(&self) -> Option<&ArenaLayout> {
        self.layout.as_ref()
    }

    pub fn is_allocated(&self) -> bool {
        self.layout.is_some()
    }

    /// Total bytes held
    pub fn bytes(&self) -> usize {
        self.real.len() * std::mem::size_of::<f32>()
            + self.complex.len() * std::mem::size_of::<Complex32>()
    }

    pub fn window(&self) -> &[f32] {
        match &self.layout {
            Some(l) => &self.real[l.window_range()],
            None => &[],
        }
    }

    pub fn envelope(&self) -> &[f32] {
        match &self.layout {
            Some(l) => &self.real[l.envelope_range()],
            None => &[],
        }
    }

    pub fn amplitude(&self, channel: usize) -> Option<&[f32]> {
        let l = self.layout.as_ref()?;
        if channel >= l.channels {
            return None;
        }
        self.real.get(l.amp_range(channel))
    }

    /// Split the arena into shared scratch and channel regions
    pub fn split_mut(&mut self) -> Option<ArenaParts<'_>> {
        let l = self.layout?;

        let (signal, rest) = self.real.split_at_mut(l.fft_size);
        let (window, rest) = rest.split_at_mut(l.fft_size);
        let (envelope, channels) = rest.split_at_mut(l.fft_size);
        let (spectrum, fft_scratch) = self.complex.split_at_mut(l.bins);

        Some(ArenaParts {
            shared: SharedScratch {
                signal,
                window,
                envelope,
                spectrum,
                fft_scratch,
            },
            channels: ChannelRegions {
                data: channels,
                ring_capacity: l.ring_capacity,
                bins: l.bins,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_sizes() {
        let layout = ArenaLayout::new(2, 12, 48000.0, 0).unwrap();

        assert_eq!(layout.fft_size, 4096);
        assert_eq!(layout.bins, 2049);
        assert_eq!(layout.ring_capacity, 2 * 4096 + 48000);
        assert_eq!(layout.ring_capacity % RING_ALIGN, 0);
        assert_eq!(layout.real_len(), Some(3 * 4096 + 2 * (56192 + 2049)));
    }

    #[test]
    fn test_ring_capacity_is_aligned() {
        let layout = ArenaLayout::new(1, 4, 44100.0 / 7.0, 0).unwrap();
        // 32 + ceil(6300) = 6332 -> 6336
        assert_eq!(layout.ring_capacity, 6336);
    }

    #[test]
    fn test_regions_do_not_overlap() {
        let layout = ArenaLayout::new(3, 6, 100.0, 8).unwrap();

        let mut ranges = vec![0..layout.fft_size, layout.window_range(), layout.envelope_range()];
        for ch in 0..3 {
            ranges.push(layout.ring_range(ch));
            ranges.push(layout.amp_range(ch));
        }

        let mut sorted = ranges.clone();
        sorted.sort_by_key(|r| r.start);
        for pair in sorted.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(sorted.last().unwrap().end, layout.real_len().unwrap());
    }

    #[test]
    fn test_split_matches_layout() {
        let layout = ArenaLayout::new(2, 4, 10.0, 5).unwrap();
        let mut arena = Arena::new();
        arena.allocate(layout).unwrap();

        {
            let mut parts = arena.split_mut().unwrap();
            assert_eq!(parts.shared.signal.len(), 16);
            assert_eq!(parts.shared.window.len(), 16);
            assert_eq!(parts.shared.envelope.len(), 16);
            assert_eq!(parts.shared.spectrum.len(), 9);
            assert_eq!(parts.shared.fft_scratch.len(), 5);

            parts.shared.envelope.fill(2.0);
            let (ring, amp) = parts.channels.get_mut(1).unwrap();
            assert_eq!(ring.len(), layout.ring_capacity);
            assert_eq!(amp.len(), 9);
            amp.fill(3.0);

            assert!(parts.channels.get_mut(2).is_none());
        }

        assert!(arena.envelope().iter().all(|&v| v == 2.0));
        assert!(arena.amplitude(0).unwrap().iter().all(|&v| v == 0.0));
        assert!(arena.amplitude(1).unwrap().iter().all(|&v| v == 3.0));
        assert!(arena.amplitude(2).is_none());
    }

    #[test]
    fn test_empty_arena() {
        let mut arena = Arena::new();
        assert!(!arena.is_allocated());
        assert!(arena.split_mut().is_none());
        assert!(arena.amplitude(0).is_none());
        assert!(arena.window().is_empty());
        assert_eq!(arena.bytes(), 0);
    }

    #[test]
    fn test_oversized_layout_is_rejected() {
        assert!(matches!(
            ArenaLayout::new(1, 80, 10.0, 0),
            Err(AnalyzerError::AllocationFailure { .. })
        ));

        let layout = ArenaLayout {
            channels: usize::MAX,
            fft_size: 1024,
            bins: 513,
            ring_capacity: 4096,
            fft_scratch: 0,
        };
        let mut arena = Arena::new();
        assert!(arena.allocate(layout).is_err());
        assert!(!arena.is_allocated());
    }
}
