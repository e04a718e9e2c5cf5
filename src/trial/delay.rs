//! Randomized cue delays

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Draws delays uniformly from an inclusive millisecond range.
///
/// `Rng::random_range` samples integer ranges without modulo bias: draws
/// that would land in the uneven tail of the generator's range are rejected
/// and redrawn.
#[derive(Debug, Clone)]
pub struct DelaySampler<R: Rng = StdRng> {
    rng: R,
    min_ms: u64,
    max_ms: u64,
}

impl DelaySampler<StdRng> {
    /// Sampler seeded from the operating system
    pub fn from_os_rng(min_ms: u64, max_ms: u64) -> Self {
        Self::with_rng(StdRng::from_os_rng(), min_ms, max_ms)
    }
}

impl<R: Rng> DelaySampler<R> {
    /// Bounds are swapped if given in the wrong order
    pub fn with_rng(rng: R, min_ms: u64, max_ms: u64) -> Self {
        Self {
            rng,
            min_ms: min_ms.min(max_ms),
            max_ms: max_ms.max(min_ms),
        }
    }

    /// Next delay in `[min_ms, max_ms]`
    pub fn next_delay_ms(&mut self) -> u64 {
        if self.min_ms == self.max_ms {
            return self.min_ms;
        }
        self.rng.random_range(self.min_ms..=self.max_ms)
    }
}
