//! Swendsen-Wang cluster dynamics.
//!
//! A sweep freezes each east and north bond between equal spins with
//! probability `p = 1 - exp(-2J / T)`, then decomposes the lattice into
//! clusters of frozen bonds by breadth-first search and flips each cluster
//! as a whole on a fair coin. All four directions wrap periodically, matching
//! the neighbor definition in `grid`.

use std::collections::VecDeque;

use tracing::trace;

use super::buffer::{uniform_rolls, BufferSupply};
use super::grid::{east, north, south, west};
use super::seed::SeedSequence;
use super::temperature::TemperatureField;
use super::LatticeAlgorithm;
use crate::error::{check_dimensions, check_temperature, Result, SimError};
use crate::lattice::Lattice;

/// Probability that a bond between two equal spins is frozen.
pub fn freeze_probability(coupling: i32, temperature: f64) -> f64 {
    1.0 - (-2.0 * coupling as f64 / temperature).exp()
}

/// Frozen bonds of one sweep.
///
/// `east[idx]` joins `(i, j)` to `(i, j + 1)`, `north[idx]` joins `(i, j)` to
/// `(i - 1, j)`, both wrapping. A bond is only ever set between equal spins.
#[derive(Clone, Debug)]
pub struct BondGraph {
    pub east: Vec<bool>,
    pub north: Vec<bool>,
}

impl BondGraph {
    pub fn new(sites: usize) -> Self {
        BondGraph {
            east: vec![false; sites],
            north: vec![false; sites],
        }
    }

    pub fn frozen_count(&self) -> usize {
        self.east.iter().chain(&self.north).filter(|&&b| b).count()
    }
}

/// Decide every bond from its roll. `probability(idx)` is the freeze
/// probability at site `idx`.
pub fn freeze_bonds<P>(
    lattice: &Lattice,
    east_rolls: &[f64],
    north_rolls: &[f64],
    probability: P,
    bonds: &mut BondGraph,
) where
    P: Fn(usize) -> f64,
{
    for i in 0..lattice.height() {
        let up = north(lattice, i);
        for j in 0..lattice.width() {
            let idx = lattice.index(i, j);
            let spin = lattice.spin_at(idx);
            let p = probability(idx);
            bonds.east[idx] = east_rolls[idx] < p && spin == lattice.spin(i, east(lattice, j));
            bonds.north[idx] = north_rolls[idx] < p && spin == lattice.spin(up, j);
        }
    }
}

/// Reusable traversal state for `flip_clusters`.
#[derive(Debug, Default)]
pub struct ClusterScratch {
    discovered: Vec<bool>,
    queue: VecDeque<usize>,
}

/// Grow every cluster from its first undiscovered cell (row-major) and flip
/// it when that seed cell's coin is below one half. Cells are flipped as they
/// leave the queue. Returns the number of clusters.
pub fn flip_clusters(
    lattice: &mut Lattice,
    bonds: &BondGraph,
    coins: &[f64],
    scratch: &mut ClusterScratch,
) -> usize {
    let sites = lattice.len();
    scratch.discovered.clear();
    scratch.discovered.resize(sites, false);
    scratch.queue.clear();

    let mut clusters = 0;
    for seed in 0..sites {
        if scratch.discovered[seed] {
            continue;
        }
        clusters += 1;
        let flip = coins[seed] < 0.5;
        scratch.discovered[seed] = true;
        scratch.queue.push_back(seed);

        while let Some(idx) = scratch.queue.pop_front() {
            let (i, j) = (idx / lattice.width(), idx % lattice.width());
            let spin = lattice.spin_at(idx);

            let e = lattice.index(i, east(lattice, j));
            let s = lattice.index(south(lattice, i), j);
            let w = lattice.index(i, west(lattice, j));
            let n = lattice.index(north(lattice, i), j);
            let edges = [
                (e, bonds.east[idx]),
                (s, bonds.north[s]),
                (w, bonds.east[w]),
                (n, bonds.north[idx]),
            ];
            for (next, frozen) in edges {
                if frozen && !scratch.discovered[next] && lattice.spin_at(next) == spin {
                    scratch.discovered[next] = true;
                    scratch.queue.push_back(next);
                }
            }

            if flip {
                lattice.flip_at(idx);
            }
        }
    }
    clusters
}

/// Roll buffers plus the per-sweep scratch storage.
struct ClusterBuffers {
    width: usize,
    height: usize,
    east_rolls: BufferSupply<Vec<f64>>,
    north_rolls: BufferSupply<Vec<f64>>,
    coins: BufferSupply<Vec<f64>>,
    bonds: BondGraph,
    scratch: ClusterScratch,
    last_clusters: usize,
}

impl ClusterBuffers {
    fn spawn(width: usize, height: usize, workers: usize, seeds: &SeedSequence) -> Result<Self> {
        check_dimensions(width, height)?;
        let len = width * height;
        let east_rolls = BufferSupply::new(uniform_rolls(len, seeds.child(0)), workers)?;
        let north_rolls = BufferSupply::new(uniform_rolls(len, seeds.child(1)), workers)?;
        let coins = BufferSupply::new(uniform_rolls(len, seeds.child(2)), workers)?;
        Ok(ClusterBuffers::assemble(width, height, east_rolls, north_rolls, coins))
    }

    fn assemble(
        width: usize,
        height: usize,
        east_rolls: BufferSupply<Vec<f64>>,
        north_rolls: BufferSupply<Vec<f64>>,
        coins: BufferSupply<Vec<f64>>,
    ) -> Self {
        ClusterBuffers {
            width,
            height,
            east_rolls,
            north_rolls,
            coins,
            bonds: BondGraph::new(width * height),
            scratch: ClusterScratch::default(),
            last_clusters: 0,
        }
    }

    fn check(&self) -> Result<()> {
        check_dimensions(self.width, self.height)?;
        let expected = self.width * self.height;
        for actual in [
            self.east_rolls.current().len(),
            self.north_rolls.current().len(),
            self.coins.current().len(),
        ] {
            if actual != expected {
                return Err(SimError::BufferLength { expected, actual });
            }
        }
        Ok(())
    }

    fn sweep<P: Fn(usize) -> f64>(&mut self, lattice: &mut Lattice, probability: P) {
        debug_assert_eq!((lattice.width(), lattice.height()), (self.width, self.height));
        freeze_bonds(
            lattice,
            self.east_rolls.current(),
            self.north_rolls.current(),
            probability,
            &mut self.bonds,
        );
        self.last_clusters = flip_clusters(
            lattice,
            &self.bonds,
            self.coins.current(),
            &mut self.scratch,
        );
        trace!("swendsen-wang sweep: {} clusters", self.last_clusters);

        self.east_rolls.refill();
        self.north_rolls.refill();
        self.coins.refill();
    }
}

/// Swendsen-Wang at one uniform temperature.
pub struct SwendsenWang {
    probability: f64,
    buffers: ClusterBuffers,
}

impl SwendsenWang {
    pub fn new(
        coupling: i32,
        temperature: f64,
        width: usize,
        height: usize,
        workers: usize,
        seeds: &SeedSequence,
    ) -> Result<Self> {
        check_temperature(temperature)?;
        Ok(SwendsenWang {
            probability: freeze_probability(coupling, temperature),
            buffers: ClusterBuffers::spawn(width, height, workers, seeds)?,
        })
    }

    /// Build from caller-supplied roll sources, each `width * height` long.
    pub fn with_supplies(
        coupling: i32,
        temperature: f64,
        width: usize,
        height: usize,
        east_rolls: BufferSupply<Vec<f64>>,
        north_rolls: BufferSupply<Vec<f64>>,
        coins: BufferSupply<Vec<f64>>,
    ) -> Result<Self> {
        check_temperature(temperature)?;
        let buffers = ClusterBuffers::assemble(width, height, east_rolls, north_rolls, coins);
        buffers.check()?;
        Ok(SwendsenWang {
            probability: freeze_probability(coupling, temperature),
            buffers,
        })
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Clusters found by the most recent sweep.
    pub fn last_cluster_count(&self) -> usize {
        self.buffers.last_clusters
    }
}

impl LatticeAlgorithm for SwendsenWang {
    fn run(&mut self, lattice: &mut Lattice) {
        let p = self.probability;
        self.buffers.sweep(lattice, |_| p);
    }
}

/// Swendsen-Wang with a per-site freeze probability derived from a
/// temperature field. A bond uses the probability of the site it is stored at.
pub struct VariableSwendsenWang {
    probabilities: Vec<f64>,
    buffers: ClusterBuffers,
}

impl VariableSwendsenWang {
    pub fn new(
        coupling: i32,
        temperatures: &TemperatureField,
        workers: usize,
        seeds: &SeedSequence,
    ) -> Result<Self> {
        Ok(VariableSwendsenWang {
            probabilities: site_probabilities(coupling, temperatures),
            buffers: ClusterBuffers::spawn(
                temperatures.width,
                temperatures.height,
                workers,
                seeds,
            )?,
        })
    }

    pub fn with_supplies(
        coupling: i32,
        temperatures: &TemperatureField,
        east_rolls: BufferSupply<Vec<f64>>,
        north_rolls: BufferSupply<Vec<f64>>,
        coins: BufferSupply<Vec<f64>>,
    ) -> Result<Self> {
        let buffers = ClusterBuffers::assemble(
            temperatures.width,
            temperatures.height,
            east_rolls,
            north_rolls,
            coins,
        );
        buffers.check()?;
        Ok(VariableSwendsenWang {
            probabilities: site_probabilities(coupling, temperatures),
            buffers,
        })
    }

    pub fn last_cluster_count(&self) -> usize {
        self.buffers.last_clusters
    }
}

fn site_probabilities(coupling: i32, temperatures: &TemperatureField) -> Vec<f64> {
    temperatures
        .values
        .iter()
        .map(|&t| freeze_probability(coupling, t))
        .collect()
}

impl LatticeAlgorithm for VariableSwendsenWang {
    fn run(&mut self, lattice: &mut Lattice) {
        let probabilities = &self.probabilities;
        self.buffers.sweep(lattice, |idx| probabilities[idx]);
    }
}
