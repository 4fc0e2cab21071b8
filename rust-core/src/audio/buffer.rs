//! Look-back ring buffer for per-channel sample history
//!
//! The storage itself lives in the analyzer arena; `RingCursor` only tracks
//! the write head and knows how to split a request into at most two
//! contiguous segments.

use std::ops::Range;

/// Contiguous pieces of a wrapped region, in chronological order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segments {
    pub first: Range<usize>,
    pub second: Range<usize>,
}

impl Segments {
    /// Total number of samples covered
    pub fn len(&self) -> usize {
        self.first.len() + self.second.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Write head over a fixed-capacity circular sample store
#[derive(Debug, Clone, Default)]
pub struct RingCursor {
    head: usize,
}

impl RingCursor {
    pub fn new() -> Self {
        Self { head: 0 }
    }

    /// Current write position
    pub fn head(&self) -> usize {
        self.head
    }

    /// Append `input` to `storage`, overwriting the oldest samples
    ///
    /// Callers keep `input.len() <= storage.len()`; anything longer only
    /// leaves its tail in the store.
    pub fn write(&mut self, storage: &mut [f32], input: &[f32]) {
        let capacity = storage.len();
        if capacity == 0 || input.is_empty() {
            return;
        }

        let input = if input.len() > capacity {
            &input[input.len() - capacity..]
        } else {
            input
        };

        let tail = capacity - self.head;
        if tail < input.len() {
            storage[self.head..].copy_from_slice(&input[..tail]);
            storage[..input.len() - tail].copy_from_slice(&input[tail..]);
            self.head = input.len() - tail;
        } else {
            storage[self.head..self.head + input.len()].copy_from_slice(input);
            self.head += input.len();
            if self.head == capacity {
                self.head = 0;
            }
        }
    }

    /// Segments holding the `len` samples that end `delay` samples before the head
    ///
    /// `len + delay` must not exceed `capacity`.
    pub fn last(&self, capacity: usize, len: usize, delay: usize) -> Segments {
        debug_assert!(len + delay <= capacity);

        // end and start are taken modulo capacity without going negative
        let end = (self.head + capacity - delay % capacity) % capacity;
        let start = (end + capacity - len % capacity) % capacity;

        if len == 0 {
            return Segments { first: start..start, second: 0..0 };
        }

        if start < end {
            Segments { first: start..end, second: 0..0 }
        } else {
            // Wrapped (or len == capacity, where start == end)
            Segments { first: start..capacity, second: 0..end }
        }
    }

    /// Copy the `out.len()` samples ending `delay` samples before the head into `out`
    pub fn read_last(&self, storage: &[f32], delay: usize, out: &mut [f32]) {
        let seg = self.last(storage.len(), out.len(), delay);
        let split = seg.first.len();
        out[..split].copy_from_slice(&storage[seg.first]);
        out[split..].copy_from_slice(&storage[seg.second]);
    }

    /// Like [`read_last`](Self::read_last) but multiplies by `weights` on the way out
    pub fn read_last_weighted(
        &self,
        storage: &[f32],
        delay: usize,
        weights: &[f32],
        out: &mut [f32],
    ) {
        let seg = self.last(storage.len(), out.len(), delay);
        let samples = storage[seg.first].iter().chain(storage[seg.second].iter());
        for ((o, s), w) in out.iter_mut().zip(samples).zip(weights.iter()) {
            *o = s * w;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_without_wrap() {
        let mut storage = vec![0.0f32; 8];
        let mut ring = RingCursor::new();

        ring.write(&mut storage, &[1.0, 2.0, 3.0]);
        assert_eq!(ring.head(), 3);
        assert_eq!(&storage[..3], &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_write_wraps_in_two_segments() {
        let mut storage = vec![0.0f32; 5];
        let mut ring = RingCursor::new();

        ring.write(&mut storage, &[1.0, 2.0, 3.0, 4.0]);
        ring.write(&mut storage, &[5.0, 6.0, 7.0]);

        assert_eq!(ring.head(), 2);
        assert_eq!(storage, vec![6.0, 7.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_write_longer_than_capacity_keeps_tail() {
        let mut storage = vec![0.0f32; 4];
        let mut ring = RingCursor::new();

        let input: Vec<f32> = (1..=10).map(|v| v as f32).collect();
        ring.write(&mut storage, &input);

        let mut out = vec![0.0f32; 4];
        ring.read_last(&storage, 0, &mut out);
        assert_eq!(out, vec![7.0, 8.0, 9.0, 10.0]);
    }

    #[test]
    fn test_read_last_across_wrap() {
        let mut storage = vec![0.0f32; 6];
        let mut ring = RingCursor::new();

        let input: Vec<f32> = (1..=8).map(|v| v as f32).collect();
        ring.write(&mut storage, &input);

        let mut out = vec![0.0f32; 4];
        ring.read_last(&storage, 0, &mut out);
        assert_eq!(out, vec![5.0, 6.0, 7.0, 8.0]);

        // Delayed read ends two samples earlier
        ring.read_last(&storage, 2, &mut out);
        assert_eq!(out, vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_full_capacity_read() {
        let mut storage = vec![0.0f32; 4];
        let mut ring = RingCursor::new();
        ring.write(&mut storage, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let seg = ring.last(4, 4, 0);
        assert_eq!(seg.len(), 4);

        let mut out = vec![0.0f32; 4];
        ring.read_last(&storage, 0, &mut out);
        assert_eq!(out, vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_weighted_read_matches_plain_read() {
        let mut storage = vec![0.0f32; 7];
        let mut ring = RingCursor::new();
        let input: Vec<f32> = (1..=11).map(|v| v as f32).collect();
        ring.write(&mut storage, &input);

        let weights = [0.5f32, 1.0, 2.0, 0.0];
        let mut plain = vec![0.0f32; 4];
        let mut weighted = vec![0.0f32; 4];
        ring.read_last(&storage, 1, &mut plain);
        ring.read_last_weighted(&storage, 1, &weights, &mut weighted);

        assert_eq!(plain, vec![7.0, 8.0, 9.0, 10.0]);
        assert_eq!(weighted, vec![3.5, 8.0, 18.0, 0.0]);
    }
}
