//! Per-temperature runs and the parallel temperature sweep.
//!
//! Each temperature point is independent: it owns its lattice, its
//! algorithm (and that algorithm's background buffer workers) and its
//! measurement series. Points are fanned out over a rayon pool and their
//! results land in the slot of their temperature index.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::info;

use crate::dynamics::{
    build_algorithm, AlgorithmKind, LatticeAlgorithm, SeedSequence, TemperatureProfile,
};
use crate::error::{check_dimensions, Result, SimError};
use crate::lattice::{Lattice, UP};
use crate::measurement::{Measurement, PhysicsResult};

/// Receives the lattice before every measurement of a run.
pub trait SnapshotSink {
    fn snapshot(&mut self, lattice: &Lattice) -> Result<()>;

    /// Called once with the final state after the last sweep.
    fn finish(&mut self, lattice: &Lattice) -> Result<()>;
}

/// Sink that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSnapshots;

impl SnapshotSink for NoSnapshots {
    fn snapshot(&mut self, _lattice: &Lattice) -> Result<()> {
        Ok(())
    }

    fn finish(&mut self, _lattice: &Lattice) -> Result<()> {
        Ok(())
    }
}

/// How each run's lattice is initialised.
#[derive(Clone, Debug, PartialEq)]
pub enum InitialState {
    Random,
    Uniform,
    /// A fixed configuration, copied for every temperature.
    Given(Lattice),
}

impl InitialState {
    fn build(&self, width: usize, height: usize, seeds: &SeedSequence) -> Result<Lattice> {
        match self {
            InitialState::Random => Lattice::randomized(width, height, &mut seeds.next_rng()),
            InitialState::Uniform => Lattice::uniform(width, height, UP),
            InitialState::Given(lattice) => Ok(lattice.clone()),
        }
    }
}

/// Everything a run needs besides its temperature.
#[derive(Clone, Debug)]
pub struct SimulationParams {
    pub width: usize,
    pub height: usize,
    pub coupling: i32,
    pub warmup_sweeps: usize,
    pub iterations: usize,
    pub algorithm: AlgorithmKind,
    pub buffer_workers: usize,
    pub initial: InitialState,
}

impl SimulationParams {
    pub fn validate(&self) -> Result<()> {
        check_dimensions(self.width, self.height)?;
        if self.iterations == 0 {
            return Err(SimError::InvalidIterations);
        }
        if self.buffer_workers == 0 {
            return Err(SimError::InvalidWorkerCount);
        }
        if let InitialState::Given(lattice) = &self.initial {
            if lattice.width() != self.width || lattice.height() != self.height {
                return Err(SimError::BufferLength {
                    expected: self.width * self.height,
                    actual: lattice.len(),
                });
            }
        }
        Ok(())
    }
}

/// Simulate one temperature point.
///
/// Runs `warmup_sweeps` Swendsen-Wang sweeps regardless of the chosen
/// algorithm, then `iterations` rounds of snapshot, measure, advance.
pub fn run_temperature(
    params: &SimulationParams,
    temperature: &TemperatureProfile,
    seeds: &SeedSequence,
    sink: &mut dyn SnapshotSink,
) -> Result<PhysicsResult> {
    params.validate()?;
    let reported = temperature.representative();
    info!(
        "Starting computations for T={:.4}, L={}x{}",
        reported, params.width, params.height
    );

    let mut lattice = params.initial.build(params.width, params.height, seeds)?;

    if params.warmup_sweeps > 0 {
        let mut warmup = build_algorithm(
            AlgorithmKind::SwendsenWang,
            params.coupling,
            temperature,
            params.width,
            params.height,
            params.buffer_workers,
            &seeds.child(0),
        )?;
        for _ in 0..params.warmup_sweeps {
            warmup.run(&mut lattice);
        }
    }

    let mut algorithm = build_algorithm(
        params.algorithm,
        params.coupling,
        temperature,
        params.width,
        params.height,
        params.buffer_workers,
        &seeds.child(1),
    )?;

    let mut measurements = Vec::with_capacity(params.iterations);
    for _ in 0..params.iterations {
        sink.snapshot(&lattice)?;
        measurements.push(Measurement::sample(&lattice));
        algorithm.run(&mut lattice);
    }
    sink.finish(&lattice)?;

    let result = PhysicsResult::aggregate(&measurements, lattice.len(), reported)
        .ok_or(SimError::InvalidIterations)?;
    info!(
        "Finished T={:.4}: E={:.5} M={:.5} cv={:.5} chi={:.5}",
        result.temperature,
        result.energy,
        result.magnetization,
        result.heat_capacity,
        result.susceptibility
    );
    Ok(result)
}

/// A lattice bound to the algorithm that advances it.
pub struct Simulation {
    lattice: Lattice,
    algorithm: Box<dyn LatticeAlgorithm>,
    sweeps: u64,
}

impl Simulation {
    /// Builds the algorithm for the lattice's dimensions.
    pub fn new(
        lattice: Lattice,
        kind: AlgorithmKind,
        coupling: i32,
        temperature: &TemperatureProfile,
        workers: usize,
        seeds: &SeedSequence,
    ) -> Result<Self> {
        let algorithm = build_algorithm(
            kind,
            coupling,
            temperature,
            lattice.width(),
            lattice.height(),
            workers,
            seeds,
        )?;
        Ok(Simulation {
            lattice,
            algorithm,
            sweeps: 0,
        })
    }

    pub fn advance(&mut self, sweeps: usize) {
        for _ in 0..sweeps {
            self.algorithm.run(&mut self.lattice);
        }
        self.sweeps += sweeps as u64;
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// Direct access for importing states. Dimensions cannot change.
    pub fn lattice_mut(&mut self) -> &mut Lattice {
        &mut self.lattice
    }

    /// Sweeps performed since construction.
    pub fn sweeps(&self) -> u64 {
        self.sweeps
    }

    pub fn measure(&self) -> Measurement {
        Measurement::sample(&self.lattice)
    }
}

/// Build the pool temperature points run on. `threads == 0` lets rayon pick.
pub fn build_pool(threads: usize) -> Result<ThreadPool> {
    Ok(ThreadPoolBuilder::new().num_threads(threads).build()?)
}

/// Simulate every temperature in parallel on `pool`.
///
/// `make_sink` is called on the worker that runs a temperature, with that
/// temperature. Results are in the order of `temperatures`.
pub fn run_sweep<F>(
    pool: &ThreadPool,
    params: &SimulationParams,
    temperatures: &[f64],
    seeds: &SeedSequence,
    make_sink: F,
) -> Result<Vec<PhysicsResult>>
where
    F: Fn(f64) -> Box<dyn SnapshotSink> + Sync,
{
    params.validate()?;
    pool.install(|| {
        temperatures
            .par_iter()
            .enumerate()
            .map(|(k, &t)| {
                let mut sink = make_sink(t);
                run_temperature(
                    params,
                    &TemperatureProfile::Uniform(t),
                    &seeds.child(k as u64),
                    sink.as_mut(),
                )
            })
            .collect()
    })
}

/// `steps` temperatures from `min` to `max` inclusive. One step yields `[min]`.
pub fn equidistant_temperatures(min: f64, max: f64, steps: usize) -> Vec<f64> {
    match steps {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let dt = (max - min) / (steps - 1) as f64;
            (0..steps).map(|k| min + k as f64 * dt).collect()
        }
    }
}
