//! Per-sweep measurements and their reduction into thermodynamic observables.

use serde::Serialize;

use crate::dynamics::grid::{total_energy, total_magnetization};
use crate::lattice::Lattice;

/// Energy and absolute magnetization (both per site) at one point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Measurement {
    pub energy: f64,
    pub magnetization: f64,
}

impl Measurement {
    pub fn sample(lattice: &Lattice) -> Self {
        Measurement {
            energy: total_energy(lattice),
            magnetization: total_magnetization(lattice),
        }
    }
}

/// Observables for one temperature point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PhysicsResult {
    pub temperature: f64,
    pub energy: f64,
    pub heat_capacity: f64,
    pub magnetization: f64,
    pub susceptibility: f64,
}

fn mean(values: impl Iterator<Item = f64>, n: f64) -> f64 {
    values.sum::<f64>() / n
}

/// `Var(X) = <X²> - <X>²`.
fn variance(values: impl Iterator<Item = f64> + Clone, n: f64) -> f64 {
    let m = mean(values.clone(), n);
    mean(values.map(|x| x * x), n) - m * m
}

impl PhysicsResult {
    /// Reduce a run's measurements. `sites` plays the role of L² in
    /// `Cv = Var(E) L² / T²` and `χ = Var(M) L² / T`.
    ///
    /// Returns `None` for an empty sample.
    pub fn aggregate(measurements: &[Measurement], sites: usize, temperature: f64) -> Option<Self> {
        if measurements.is_empty() {
            return None;
        }
        let n = measurements.len() as f64;
        let energies = measurements.iter().map(|m| m.energy);
        let mags = measurements.iter().map(|m| m.magnetization);
        let sites = sites as f64;

        Some(PhysicsResult {
            temperature,
            energy: mean(energies.clone(), n),
            heat_capacity: variance(energies, n) * sites / (temperature * temperature),
            magnetization: mean(mags.clone(), n),
            susceptibility: variance(mags, n) * sites / temperature,
        })
    }
}
