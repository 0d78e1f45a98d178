//! Reproducible seed source for random buffer generation.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::rngs::SmallRng;
use rand::SeedableRng;

/// Deterministic seeds derived from one base seed.
///
/// `seed_at(n)` depends only on the base and `n`; buffer generators use it
/// with their generation number. `next_seed` walks the same sequence through
/// an atomic counter for one-off draws such as initial lattices.
#[derive(Debug)]
pub struct SeedSequence {
    base: u64,
    counter: AtomicU64,
}

/// SplitMix64 finalizer.
fn mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

impl SeedSequence {
    pub fn new(base: u64) -> Self {
        SeedSequence {
            base,
            counter: AtomicU64::new(0),
        }
    }

    /// Independent sequence for a sub-task (e.g. one temperature point).
    pub fn child(&self, stream: u64) -> SeedSequence {
        SeedSequence::new(mix(self.base ^ mix(stream.wrapping_add(0x9e37_79b9_7f4a_7c15))))
    }

    /// The n-th seed of the sequence, independent of the counter.
    pub fn seed_at(&self, n: u64) -> u64 {
        mix(self.base.wrapping_add(n.wrapping_mul(0x9e37_79b9_7f4a_7c15)))
    }

    pub fn next_seed(&self) -> u64 {
        self.seed_at(self.counter.fetch_add(1, Ordering::Relaxed))
    }

    pub fn rng_at(&self, n: u64) -> SmallRng {
        SmallRng::seed_from_u64(self.seed_at(n))
    }

    /// A generator seeded from the next seed in the sequence.
    pub fn next_rng(&self) -> SmallRng {
        SmallRng::seed_from_u64(self.next_seed())
    }
}
