//! Per-channel ingestion state and frame scheduling

use super::buffer::RingCursor;

/// Streaming state of one analyzer channel
///
/// Sample storage and the amplitude vector live in the arena; this struct
/// only carries the bookkeeping.
#[derive(Debug, Clone)]
pub struct ChannelState {
    ring: RingCursor,

    /// Samples accumulated since the last frame, fractional carry included
    counter: f64,

    /// Stagger: read offset behind the head, also the initial counter value
    delay: usize,

    frozen: bool,
    active: bool,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelState {
    pub fn new() -> Self {
        Self {
            ring: RingCursor::new(),
            counter: 0.0,
            delay: 0,
            frozen: false,
            active: true,
        }
    }

    pub fn ring(&self) -> &RingCursor {
        &self.ring
    }

    pub fn counter(&self) -> f64 {
        self.counter
    }

    pub fn delay(&self) -> usize {
        self.delay
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Restart the phase: counter and read offset both become `delay`
    pub fn set_phase(&mut self, delay: usize) {
        self.delay = delay;
        self.counter = delay as f64;
    }

    /// Buffer `input` and fire `on_frame` each time a full period has elapsed
    ///
    /// Samples go into `storage` in chunks that never cross a frame boundary
    /// and never exceed `max_chunk`, so every frame sees the ring exactly as
    /// it stood at that boundary. The period is subtracted rather than the
    /// counter reset, which keeps the fractional remainder.
    ///
    /// A non-positive period (no sample rate yet) only buffers.
    ///
    /// # Returns
    /// Number of frames fired
    pub fn ingest<F>(
        &mut self,
        storage: &mut [f32],
        mut input: &[f32],
        period: f64,
        max_chunk: usize,
        mut on_frame: F,
    ) -> usize
    where
        F: FnMut(&ChannelState, &[f32]),
    {
        if !(period > 0.0 && period.is_finite()) {
            self.ring.write(storage, input);
            return 0;
        }

        let max_chunk = max_chunk.max(1);
        let mut frames = 0;

        while !input.is_empty() {
            let due = (period - self.counter).ceil().max(1.0) as usize;
            let take = due.min(input.len()).min(max_chunk);

            self.ring.write(storage, &input[..take]);
            self.counter += take as f64;
            input = &input[take..];

            while self.counter >= period {
                on_frame(self, storage);
                self.counter -= period;
                frames += 1;
            }
        }

        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integral_period_fires_once_per_period() {
        let mut state = ChannelState::new();
        let mut storage = vec![0.0f32; 64];
        let input = vec![1.0f32; 100];

        let frames = state.ingest(&mut storage, &input, 10.0, 16, |_, _| {});
        assert_eq!(frames, 10);
        assert_eq!(state.counter(), 0.0);
    }

    #[test]
    fn test_fractional_period_does_not_drift() {
        let mut state = ChannelState::new();
        let mut storage = vec![0.0f32; 64];
        let period = 7.25;

        // 29_000 samples fed in awkward blocks: exactly 4000 periods
        let block = vec![0.0f32; 29];
        let mut frames = 0;
        for _ in 0..1000 {
            frames += state.ingest(&mut storage, &block, period, 32, |_, _| {});
        }

        assert_eq!(frames, 4000);
        assert!(state.counter().abs() < 1e-9);
    }

    #[test]
    fn test_frames_see_ring_at_boundary() {
        let mut state = ChannelState::new();
        let mut storage = vec![0.0f32; 16];
        let input: Vec<f32> = (1..=12).map(|v| v as f32).collect();

        let mut seen = Vec::new();
        state.ingest(&mut storage, &input, 4.0, 16, |ch, store| {
            let mut last = [0.0f32; 1];
            ch.ring().read_last(store, 0, &mut last);
            seen.push(last[0]);
        });

        assert_eq!(seen, vec![4.0, 8.0, 12.0]);
    }

    #[test]
    fn test_phase_offset_fires_early() {
        let mut state = ChannelState::new();
        state.set_phase(6);
        let mut storage = vec![0.0f32; 32];

        let frames = state.ingest(&mut storage, &[0.0; 4], 10.0, 32, |_, _| {});
        assert_eq!(frames, 1);
        assert_eq!(state.counter(), 0.0);
        assert_eq!(state.delay(), 6);
    }

    #[test]
    fn test_zero_period_only_buffers() {
        let mut state = ChannelState::new();
        let mut storage = vec![0.0f32; 8];

        let frames = state.ingest(&mut storage, &[1.0, 2.0, 3.0], 0.0, 8, |_, _| {
            panic!("no frame expected")
        });
        assert_eq!(frames, 0);
        assert_eq!(state.ring().head(), 3);
    }

    #[test]
    fn test_empty_input_is_noop() {
        let mut state = ChannelState::new();
        state.set_phase(20);
        let mut storage = vec![0.0f32; 8];

        let frames = state.ingest(&mut storage, &[], 10.0, 8, |_, _| {});
        assert_eq!(frames, 0);
        assert_eq!(state.counter(), 20.0);
    }
}
