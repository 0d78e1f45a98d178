//! Lattice evolution: update algorithms and their random-number supply.
//!
//! An algorithm is picked once per run (`build_algorithm`) and then driven
//! through the `LatticeAlgorithm` trait; callers never branch on which one
//! they hold.

pub mod buffer;
pub mod grid;
pub mod metropolis;
pub mod region;
pub mod seed;
pub mod swendsen_wang;
pub mod temperature;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::lattice::Lattice;

pub use buffer::BufferSupply;
pub use grid::{energy_delta, total_energy, total_magnetization};
pub use metropolis::{BoltzmannTable, Metropolis, VariableMetropolis};
pub use region::{extract_region, import_region, to_grey};
pub use seed::SeedSequence;
pub use swendsen_wang::{SwendsenWang, VariableSwendsenWang};
pub use temperature::{TemperatureField, TemperatureProfile};

/// One sweep of an update rule.
///
/// `run` has exclusive access to the lattice for its duration. The lattice
/// must have the dimensions the algorithm was built for.
pub trait LatticeAlgorithm: Send {
    fn run(&mut self, lattice: &mut Lattice);
}

/// Which update rule drives the sampling phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmKind {
    #[default]
    Metropolis,
    #[serde(alias = "sw")]
    SwendsenWang,
}

/// Construct the algorithm for `kind` at `temperature`.
///
/// Field temperatures select the per-site variants and must match the
/// lattice dimensions.
pub fn build_algorithm(
    kind: AlgorithmKind,
    coupling: i32,
    temperature: &TemperatureProfile,
    width: usize,
    height: usize,
    workers: usize,
    seeds: &SeedSequence,
) -> Result<Box<dyn LatticeAlgorithm>> {
    if let TemperatureProfile::Field(field) = temperature {
        if field.width != width || field.height != height {
            return Err(SimError::BufferLength {
                expected: width * height,
                actual: field.width * field.height,
            });
        }
    }

    let algorithm: Box<dyn LatticeAlgorithm> = match (kind, temperature) {
        (AlgorithmKind::Metropolis, TemperatureProfile::Uniform(t)) => Box::new(
            Metropolis::new(coupling, *t, width, height, workers, seeds)?,
        ),
        (AlgorithmKind::Metropolis, TemperatureProfile::Field(field)) => Box::new(
            VariableMetropolis::new(coupling, field.clone(), workers, seeds)?,
        ),
        (AlgorithmKind::SwendsenWang, TemperatureProfile::Uniform(t)) => Box::new(
            SwendsenWang::new(coupling, *t, width, height, workers, seeds)?,
        ),
        (AlgorithmKind::SwendsenWang, TemperatureProfile::Field(field)) => Box::new(
            VariableSwendsenWang::new(coupling, field, workers, seeds)?,
        ),
    };
    Ok(algorithm)
}
