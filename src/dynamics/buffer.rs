//! Double-buffered value supply with background refills.
//!
//! One buffer is always ready for the consumer while `k` worker threads each
//! compute a replacement with the same generator. Every worker reports its
//! slot on a shared completion channel when it returns. A refill takes the
//! first slot reported, swaps that worker's result in and immediately
//! relaunches the slot, so `k` generations stay in flight. Buffer order is
//! irrelevant: any freshly generated buffer is as good as any other.
//!
//! Each launch is numbered on the consumer's thread and the generator receives
//! that number, so generators can derive their randomness from it. With a
//! single worker the buffer sequence is fully deterministic.
//!
//! Workers never touch the lattice. Dropping the supply joins every
//! outstanding worker.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rand::Rng;
use tracing::debug;

use super::seed::SeedSequence;
use crate::error::{Result, SimError};

type Generator<T> = Arc<dyn Fn(u64) -> T + Send + Sync>;

/// Reports a worker's slot when dropped, so a panicking generator still
/// wakes the consumer.
struct Completion {
    slot: usize,
    sender: Sender<usize>,
}

impl Drop for Completion {
    fn drop(&mut self) {
        // The receiver only disappears once the supply is being dropped.
        let _ = self.sender.send(self.slot);
    }
}

/// One background generation.
struct Pending<T> {
    handle: JoinHandle<T>,
}

impl<T: Send + 'static> Pending<T> {
    fn launch(
        generator: &Generator<T>,
        generation: u64,
        slot: usize,
        sender: &Sender<usize>,
    ) -> Self {
        let generator = Arc::clone(generator);
        let completion = Completion {
            slot,
            sender: sender.clone(),
        };
        let handle = thread::spawn(move || {
            let _completion = completion;
            generator(generation)
        });
        Pending { handle }
    }

    /// Blocks until the worker returns. A panicking generator re-panics here.
    fn wait(self) -> T {
        match self.handle.join() {
            Ok(value) => value,
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }
}

pub struct BufferSupply<T: Send + 'static> {
    current: T,
    in_flight: Vec<Pending<T>>,
    generator: Generator<T>,
    sender: Sender<usize>,
    /// Slots in the order their workers finished.
    finished: Receiver<usize>,
    /// Number handed to the next launch.
    launched: u64,
}

impl<T: Send + 'static> BufferSupply<T> {
    /// Generates buffer 0 on the calling thread, then launches `workers`
    /// background generations numbered from 1.
    pub fn new<F>(generator: F, workers: usize) -> Result<Self>
    where
        F: Fn(u64) -> T + Send + Sync + 'static,
    {
        if workers == 0 {
            return Err(SimError::InvalidWorkerCount);
        }
        let generator: Generator<T> = Arc::new(generator);
        let (sender, finished) = mpsc::channel();
        let current = generator(0);
        let in_flight = (0..workers)
            .map(|slot| Pending::launch(&generator, slot as u64 + 1, slot, &sender))
            .collect();
        Ok(BufferSupply {
            current,
            in_flight,
            generator,
            sender,
            finished,
            launched: workers as u64 + 1,
        })
    }

    /// The ready buffer. Valid until the next `refill`.
    #[inline]
    pub fn current(&self) -> &T {
        &self.current
    }

    /// Number of background generations kept in flight.
    pub fn workers(&self) -> usize {
        self.in_flight.len()
    }

    /// Replaces the current buffer with the first finished background result.
    ///
    /// Blocks only when no worker has finished yet, and then only until the
    /// first one does.
    pub fn refill(&mut self) {
        // Every launch reports exactly once and the supply holds a sender,
        // so `recv` cannot disconnect.
        let slot = self.finished.recv().unwrap_or(0);

        let relaunched = Pending::launch(&self.generator, self.launched, slot, &self.sender);
        self.launched += 1;
        let finished = std::mem::replace(&mut self.in_flight[slot], relaunched);
        self.current = finished.wait();
    }
}

impl<T: Send + 'static> Drop for BufferSupply<T> {
    fn drop(&mut self) {
        for pending in self.in_flight.drain(..) {
            // A generator panic has nowhere to go during drop; the join still
            // guarantees the thread is gone.
            let _ = pending.handle.join();
        }
    }
}

/// Generator of `len` uniform rolls in [0, 1), seeded by generation number.
pub fn uniform_rolls(len: usize, seeds: SeedSequence) -> impl Fn(u64) -> Vec<f64> + Send + Sync {
    move |generation| {
        let mut rng = seeds.rng_at(generation);
        let rolls: Vec<f64> = (0..len).map(|_| rng.random::<f64>()).collect();
        debug!(
            "uniform roll buffer {} ({} values) done on {:?}",
            generation,
            len,
            thread::current().id()
        );
        rolls
    }
}

/// Generator of `len` uniformly drawn `(row, column)` sites.
pub fn site_indices(
    len: usize,
    width: usize,
    height: usize,
    seeds: SeedSequence,
) -> impl Fn(u64) -> Vec<(usize, usize)> + Send + Sync {
    move |generation| {
        let mut rng = seeds.rng_at(generation);
        let sites: Vec<(usize, usize)> = (0..len)
            .map(|_| (rng.random_range(0..height), rng.random_range(0..width)))
            .collect();
        debug!(
            "site index buffer {} ({} sites) done on {:?}",
            generation,
            len,
            thread::current().id()
        );
        sites
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(
            BufferSupply::new(|_| 0u32, 0),
            Err(SimError::InvalidWorkerCount)
        ));
    }

    #[test]
    fn test_first_buffer_ready_immediately() {
        let supply = BufferSupply::new(|_| vec![1u8; 16], 2).unwrap();
        assert_eq!(supply.current().len(), 16);
        assert_eq!(supply.workers(), 2);
    }

    #[test]
    fn test_refills_never_reuse_a_buffer() {
        let counter = Arc::new(AtomicUsize::new(0));
        let source = Arc::clone(&counter);
        let mut supply =
            BufferSupply::new(move |_| source.fetch_add(1, Ordering::SeqCst), 3).unwrap();

        let mut seen = vec![*supply.current()];
        for _ in 0..20 {
            supply.refill();
            seen.push(*supply.current());
        }
        let mut unique = seen.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), seen.len(), "a buffer was handed out twice");
        // Initial + 3 in flight + one relaunch per refill
        drop(supply);
        assert_eq!(counter.load(Ordering::SeqCst), 1 + 3 + 20);
    }

    #[test]
    fn test_single_worker_hands_out_generations_in_order() {
        let mut supply = BufferSupply::new(|generation| generation, 1).unwrap();
        let mut seen = vec![*supply.current()];
        for _ in 0..5 {
            supply.refill();
            seen.push(*supply.current());
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_drop_waits_for_workers() {
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let (s, f) = (Arc::clone(&started), Arc::clone(&finished));
        let supply = BufferSupply::new(
            move |_| {
                s.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                f.fetch_add(1, Ordering::SeqCst);
            },
            4,
        )
        .unwrap();
        drop(supply);
        assert_eq!(started.load(Ordering::SeqCst), 5);
        assert_eq!(finished.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_refill_blocks_until_a_worker_finishes() {
        let mut supply = BufferSupply::new(
            |_| {
                thread::sleep(Duration::from_millis(10));
                7u64
            },
            1,
        )
        .unwrap();
        for _ in 0..3 {
            supply.refill();
            assert_eq!(*supply.current(), 7);
        }
    }

    #[test]
    fn test_refill_takes_first_finished_worker() {
        // Generation 1 is stuck in slot 0 while slot 1 finishes quickly
        let mut supply = BufferSupply::new(
            |generation| {
                let delay = if generation == 1 { 800 } else { 20 };
                thread::sleep(Duration::from_millis(delay));
                generation
            },
            2,
        )
        .unwrap();

        let start = Instant::now();
        supply.refill();
        assert_eq!(*supply.current(), 2);
        assert!(
            start.elapsed() < Duration::from_millis(400),
            "refill waited {:?} on the slow worker",
            start.elapsed()
        );

        supply.refill();
        assert_ne!(*supply.current(), 2);
    }

    #[test]
    #[should_panic(expected = "generator failed")]
    fn test_generator_panic_reaches_refill() {
        let mut supply = BufferSupply::new(
            |generation| {
                if generation == 1 {
                    panic!("generator failed");
                }
                generation
            },
            1,
        )
        .unwrap();
        supply.refill();
    }

    #[test]
    fn test_uniform_rolls_in_unit_interval() {
        let generate = uniform_rolls(1000, SeedSequence::new(9));
        let rolls = generate(4);
        assert_eq!(rolls.len(), 1000);
        assert!(rolls.iter().all(|&r| (0.0..1.0).contains(&r)));
        assert_eq!(rolls, generate(4));
        assert_ne!(rolls, generate(5));
    }

    #[test]
    fn test_site_indices_in_bounds() {
        let generate = site_indices(500, 7, 3, SeedSequence::new(2));
        let sites = generate(0);
        assert_eq!(sites.len(), 500);
        assert!(sites.iter().all(|&(i, j)| i < 3 && j < 7));
    }
}
