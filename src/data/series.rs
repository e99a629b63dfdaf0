//! Bounded time-series buffers for charting.

use std::collections::VecDeque;

/// Maximum number of points a series retains.
pub const SERIES_CAPACITY: usize = 100;

/// How many trailing points contribute to a render fingerprint.
pub const FINGERPRINT_TAIL: usize = 5;

/// The metric a series tracks for one adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SeriesKind {
    /// Average message latency in milliseconds.
    Latency,
    /// Success rate as a fraction in [0, 1].
    SuccessRate,
}

impl SeriesKind {
    /// All kinds, in chart display order.
    pub const ALL: [SeriesKind; 2] = [SeriesKind::Latency, SeriesKind::SuccessRate];

    pub fn label(&self) -> &'static str {
        match self {
            SeriesKind::Latency => "Latency (ms)",
            SeriesKind::SuccessRate => "Success rate (%)",
        }
    }

    /// Short slug used in panel ids and fingerprints.
    pub fn slug(&self) -> &'static str {
        match self {
            SeriesKind::Latency => "latency",
            SeriesKind::SuccessRate => "success",
        }
    }
}

/// Fixed-capacity FIFO of `(elapsed_seconds, value)` points.
///
/// Appending past [`SERIES_CAPACITY`] evicts the oldest point. The
/// x-coordinate is clamped so it never decreases, regardless of clock
/// oddities in the inputs.
#[derive(Debug, Clone, Default)]
pub struct SeriesBuffer {
    points: VecDeque<(f64, f64)>,
}

impl SeriesBuffer {
    pub fn new() -> Self {
        Self { points: VecDeque::with_capacity(SERIES_CAPACITY) }
    }

    /// Append a point, evicting the oldest one when full.
    pub fn push(&mut self, x: f64, y: f64) {
        let x = match self.points.back() {
            Some(&(last_x, _)) if x < last_x => last_x,
            _ => x,
        };
        if self.points.len() == SERIES_CAPACITY {
            self.points.pop_front();
        }
        self.points.push_back((x, y));
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.points.iter().copied()
    }

    pub fn first(&self) -> Option<(f64, f64)> {
        self.points.front().copied()
    }

    pub fn last(&self) -> Option<(f64, f64)> {
        self.points.back().copied()
    }

    /// The last `min(n, len)` points, oldest first.
    pub fn tail(&self, n: usize) -> impl Iterator<Item = (f64, f64)> + '_ {
        let skip = self.points.len().saturating_sub(n);
        self.points.iter().skip(skip).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_order() {
        let mut buf = SeriesBuffer::new();
        buf.push(0.0, 1.0);
        buf.push(1.0, 2.0);
        let points: Vec<_> = buf.iter().collect();
        assert_eq!(points, vec![(0.0, 1.0), (1.0, 2.0)]);
    }

    #[test]
    fn test_capacity_bound_and_fifo_eviction() {
        let mut buf = SeriesBuffer::new();
        for i in 0..SERIES_CAPACITY {
            buf.push(i as f64, i as f64);
        }
        assert_eq!(buf.len(), SERIES_CAPACITY);

        // The 101st point evicts the oldest; the new point is last.
        buf.push(100.0, 42.0);
        assert_eq!(buf.len(), SERIES_CAPACITY);
        assert_eq!(buf.first(), Some((1.0, 1.0)));
        assert_eq!(buf.last(), Some((100.0, 42.0)));
    }

    #[test]
    fn test_bound_holds_for_any_sequence() {
        let mut buf = SeriesBuffer::new();
        for i in 0..1000 {
            buf.push(i as f64 * 0.5, (i % 7) as f64);
            assert!(buf.len() <= SERIES_CAPACITY);
        }
    }

    #[test]
    fn test_monotonic_x_clamped() {
        let mut buf = SeriesBuffer::new();
        buf.push(5.0, 1.0);
        buf.push(3.0, 2.0); // clock went backwards
        let points: Vec<_> = buf.iter().collect();
        assert_eq!(points, vec![(5.0, 1.0), (5.0, 2.0)]);
    }

    #[test]
    fn test_tail_shorter_than_requested() {
        let mut buf = SeriesBuffer::new();
        buf.push(0.0, 1.0);
        buf.push(1.0, 2.0);
        let tail: Vec<_> = buf.tail(5).collect();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0], (0.0, 1.0));
    }

    #[test]
    fn test_tail_takes_newest() {
        let mut buf = SeriesBuffer::new();
        for i in 0..10 {
            buf.push(i as f64, i as f64);
        }
        let tail: Vec<_> = buf.tail(3).collect();
        assert_eq!(tail, vec![(7.0, 7.0), (8.0, 8.0), (9.0, 9.0)]);
    }
}
