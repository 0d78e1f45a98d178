//! Single-spin-flip Metropolis dynamics.
//!
//! One sweep walks a buffer of `width * height` pre-drawn candidate sites and
//! a matching buffer of uniform rolls. A candidate flips when the energy
//! change is non-positive or its roll is below the Boltzmann factor. Both
//! buffers are refilled from background workers after the sweep.

use super::buffer::{site_indices, uniform_rolls, BufferSupply};
use super::grid::energy_delta;
use super::seed::SeedSequence;
use super::temperature::TemperatureField;
use super::LatticeAlgorithm;
use crate::error::{check_dimensions, check_temperature, Result, SimError};
use crate::lattice::Lattice;

/// `exp(-dE / T)` for every reachable `dE = J * energy_delta`.
///
/// A 4-neighbor flip changes the energy by a multiple of 2J within
/// `[-8|J|, 8|J|]`, so the table holds `16|J| + 1` entries indexed by
/// `dE + 8|J|`.
#[derive(Clone, Debug)]
pub struct BoltzmannTable {
    offset: i32,
    factors: Vec<f64>,
}

impl BoltzmannTable {
    pub fn new(coupling: i32, temperature: f64) -> Self {
        let offset = 8 * coupling.abs();
        let factors = (0..=2 * offset)
            .map(|k| (-((k - offset) as f64) / temperature).exp())
            .collect();
        BoltzmannTable { offset, factors }
    }

    #[inline]
    pub fn factor(&self, delta: i32) -> f64 {
        self.factors[(delta + self.offset) as usize]
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

/// Candidate sites and acceptance rolls for one sweep each.
struct ProposalBuffers {
    sites: BufferSupply<Vec<(usize, usize)>>,
    rolls: BufferSupply<Vec<f64>>,
}

impl ProposalBuffers {
    fn spawn(width: usize, height: usize, workers: usize, seeds: &SeedSequence) -> Result<Self> {
        check_dimensions(width, height)?;
        let len = width * height;
        let sites = BufferSupply::new(site_indices(len, width, height, seeds.child(0)), workers)?;
        let rolls = BufferSupply::new(uniform_rolls(len, seeds.child(1)), workers)?;
        Ok(ProposalBuffers { sites, rolls })
    }

    fn check(&self, width: usize, height: usize) -> Result<()> {
        check_dimensions(width, height)?;
        let expected = width * height;
        for actual in [self.sites.current().len(), self.rolls.current().len()] {
            if actual != expected {
                return Err(SimError::BufferLength { expected, actual });
            }
        }
        Ok(())
    }

    /// Run one pass over the current buffers, then refill both.
    fn sweep<F>(&mut self, lattice: &mut Lattice, coupling: i32, accept: F)
    where
        F: Fn(usize, i32, f64) -> bool,
    {
        for (&(i, j), &roll) in self.sites.current().iter().zip(self.rolls.current()) {
            let delta = coupling * energy_delta(lattice, i, j);
            if delta <= 0 || accept(lattice.index(i, j), delta, roll) {
                lattice.flip(i, j);
            }
        }
        self.rolls.refill();
        self.sites.refill();
    }
}

/// Metropolis at one uniform temperature, using a cached Boltzmann table.
pub struct Metropolis {
    coupling: i32,
    width: usize,
    height: usize,
    table: BoltzmannTable,
    buffers: ProposalBuffers,
}

impl Metropolis {
    pub fn new(
        coupling: i32,
        temperature: f64,
        width: usize,
        height: usize,
        workers: usize,
        seeds: &SeedSequence,
    ) -> Result<Self> {
        check_temperature(temperature)?;
        let buffers = ProposalBuffers::spawn(width, height, workers, seeds)?;
        Ok(Metropolis {
            coupling,
            width,
            height,
            table: BoltzmannTable::new(coupling, temperature),
            buffers,
        })
    }

    /// Build from caller-supplied buffer sources (fixed sequences in tests,
    /// alternative RNGs elsewhere). Each buffer must hold `width * height` entries.
    pub fn with_supplies(
        coupling: i32,
        temperature: f64,
        width: usize,
        height: usize,
        sites: BufferSupply<Vec<(usize, usize)>>,
        rolls: BufferSupply<Vec<f64>>,
    ) -> Result<Self> {
        check_temperature(temperature)?;
        let buffers = ProposalBuffers { sites, rolls };
        buffers.check(width, height)?;
        Ok(Metropolis {
            coupling,
            width,
            height,
            table: BoltzmannTable::new(coupling, temperature),
            buffers,
        })
    }

    pub fn table(&self) -> &BoltzmannTable {
        &self.table
    }
}

impl LatticeAlgorithm for Metropolis {
    fn run(&mut self, lattice: &mut Lattice) {
        debug_assert_eq!((lattice.width(), lattice.height()), (self.width, self.height));
        let table = &self.table;
        self.buffers
            .sweep(lattice, self.coupling, |_, delta, roll| roll < table.factor(delta));
    }
}

/// Metropolis with a per-site temperature; the Boltzmann factor is
/// evaluated at the candidate site's own temperature.
pub struct VariableMetropolis {
    coupling: i32,
    temperatures: TemperatureField,
    buffers: ProposalBuffers,
}

impl VariableMetropolis {
    pub fn new(
        coupling: i32,
        temperatures: TemperatureField,
        workers: usize,
        seeds: &SeedSequence,
    ) -> Result<Self> {
        let buffers =
            ProposalBuffers::spawn(temperatures.width, temperatures.height, workers, seeds)?;
        Ok(VariableMetropolis {
            coupling,
            temperatures,
            buffers,
        })
    }

    pub fn with_supplies(
        coupling: i32,
        temperatures: TemperatureField,
        sites: BufferSupply<Vec<(usize, usize)>>,
        rolls: BufferSupply<Vec<f64>>,
    ) -> Result<Self> {
        let buffers = ProposalBuffers { sites, rolls };
        buffers.check(temperatures.width, temperatures.height)?;
        Ok(VariableMetropolis {
            coupling,
            temperatures,
            buffers,
        })
    }
}

impl LatticeAlgorithm for VariableMetropolis {
    fn run(&mut self, lattice: &mut Lattice) {
        debug_assert!(self.temperatures.matches(lattice));
        let temperatures = &self.temperatures;
        self.buffers.sweep(lattice, self.coupling, |idx, delta, roll| {
            roll < (-(delta as f64) / temperatures.at(idx)).exp()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::grid::total_magnetization;
    use crate::lattice::{DOWN, UP};

    /// Visits every site once in row-major order.
    fn row_major(width: usize, height: usize) -> BufferSupply<Vec<(usize, usize)>> {
        BufferSupply::new(
            move |_| {
                (0..height)
                    .flat_map(|i| (0..width).map(move |j| (i, j)))
                    .collect()
            },
            1,
        )
        .unwrap()
    }

    fn constant_rolls(len: usize, roll: f64) -> BufferSupply<Vec<f64>> {
        BufferSupply::new(move |_| vec![roll; len], 1).unwrap()
    }

    /// 4x4 all up with a single down spin at (1, 1).
    fn defect_lattice() -> Lattice {
        let mut lattice = Lattice::uniform(4, 4, UP).unwrap();
        lattice.flip(1, 1);
        lattice
    }

    #[test]
    fn test_table_size_and_values() {
        for coupling in [1, 2, -1, 3] {
            let table = BoltzmannTable::new(coupling, 2.0);
            assert_eq!(table.len(), 16 * coupling.unsigned_abs() as usize + 1);
        }
        let table = BoltzmannTable::new(1, 2.0);
        assert_eq!(table.factor(0), 1.0);
        assert!((table.factor(4) - (-2.0f64).exp()).abs() < 1e-15);
        assert!((table.factor(8) - (-4.0f64).exp()).abs() < 1e-15);
        assert!((table.factor(-8) - 4.0f64.exp()).abs() < 1e-12);
    }

    #[test]
    fn test_zero_roll_accepts_every_proposal() {
        // exp(-dE/T) > 0 = roll for every dE, so each visited site flips once
        let mut metro =
            Metropolis::with_supplies(1, 2.0, 4, 4, row_major(4, 4), constant_rolls(16, 0.0))
                .unwrap();
        let mut lattice = defect_lattice();
        metro.run(&mut lattice);

        let mut expected = Lattice::uniform(4, 4, DOWN).unwrap();
        expected.flip(1, 1);
        assert_eq!(lattice, expected);
    }

    #[test]
    fn test_unit_roll_accepts_only_downhill() {
        // roll = 1.0 is never below exp(-dE/T) for dE > 0. In row-major order
        // (0,0)..(1,0) see dE of 8 or 4 and stay, (1,1) has dE = -8 and
        // flips, after which every remaining site sits in a uniform
        // neighborhood with dE = 8.
        let mut metro =
            Metropolis::with_supplies(1, 2.0, 4, 4, row_major(4, 4), constant_rolls(16, 1.0))
                .unwrap();
        let mut lattice = defect_lattice();
        metro.run(&mut lattice);
        assert_eq!(lattice, Lattice::uniform(4, 4, UP).unwrap());
    }

    #[test]
    fn test_roll_between_factors() {
        // T = 2: exp(-4/2) = 0.135, exp(-8/2) = 0.018. A roll of 0.1 accepts
        // dE = 4 but rejects dE = 8.
        let mut lattice = defect_lattice();
        let sites = BufferSupply::new(|_| vec![(0, 1); 16], 1).unwrap();
        let mut metro =
            Metropolis::with_supplies(1, 2.0, 4, 4, sites, constant_rolls(16, 0.1)).unwrap();
        metro.run(&mut lattice);
        // (0,1) first flips (dE = 4), then sees dE = -4 and flips back, and so
        // on: an even number of visits leaves it where it started.
        assert_eq!(lattice, defect_lattice());

        let sites = BufferSupply::new(|_| vec![(3, 3); 16], 1).unwrap();
        let mut metro =
            Metropolis::with_supplies(1, 2.0, 4, 4, sites, constant_rolls(16, 0.1)).unwrap();
        let mut lattice = defect_lattice();
        metro.run(&mut lattice);
        assert_eq!(lattice, defect_lattice());
    }

    #[test]
    fn test_with_supplies_checks_lengths() {
        let result = Metropolis::with_supplies(1, 2.0, 4, 4, row_major(4, 4), constant_rolls(15, 0.5));
        assert!(matches!(
            result,
            Err(SimError::BufferLength { expected: 16, actual: 15 })
        ));
        assert!(Metropolis::with_supplies(1, -1.0, 4, 4, row_major(4, 4), constant_rolls(16, 0.5))
            .is_err());
    }

    #[test]
    fn test_high_temperature_disorders() {
        let seeds = SeedSequence::new(17);
        let mut lattice = Lattice::uniform(32, 32, UP).unwrap();
        let mut metro = Metropolis::new(1, 1000.0, 32, 32, 2, &seeds).unwrap();
        let mut mean = 0.0;
        for sweep in 0..120 {
            metro.run(&mut lattice);
            if sweep >= 20 {
                mean += total_magnetization(&lattice);
            }
        }
        mean /= 100.0;
        assert!(mean < 0.1, "mean |m| at T=1000 was {mean}");
    }

    #[test]
    fn test_low_temperature_stays_ordered() {
        let seeds = SeedSequence::new(23);
        let mut lattice = Lattice::uniform(32, 32, DOWN).unwrap();
        let mut metro = Metropolis::new(1, 0.5, 32, 32, 2, &seeds).unwrap();
        for _ in 0..50 {
            metro.run(&mut lattice);
        }
        assert!(total_magnetization(&lattice) > 0.95);
    }

    #[test]
    fn test_variable_matches_uniform_field_behavior() {
        let field = TemperatureField::new(4, 4, vec![2.0; 16]).unwrap();
        let mut metro =
            VariableMetropolis::with_supplies(1, field, row_major(4, 4), constant_rolls(16, 1.0))
                .unwrap();
        let mut lattice = defect_lattice();
        metro.run(&mut lattice);
        assert_eq!(lattice, Lattice::uniform(4, 4, UP).unwrap());
    }

    #[test]
    fn test_variable_uses_site_temperature() {
        // Only (0,1) is hot enough for a roll of 0.5 to pass its dE = 4 flip
        let mut values = vec![0.1; 16];
        values[1] = 100.0;
        let field = TemperatureField::new(4, 4, values).unwrap();
        let sites = BufferSupply::new(
            |_| {
                let mut s = vec![(2, 2); 16];
                s[0] = (0, 1);
                s[1] = (0, 2);
                s
            },
            1,
        )
        .unwrap();
        let mut metro =
            VariableMetropolis::with_supplies(1, field, sites, constant_rolls(16, 0.5)).unwrap();
        let mut lattice = defect_lattice();
        metro.run(&mut lattice);
        assert_eq!(lattice.spin(0, 1), DOWN);
        assert_eq!(lattice.spin(0, 2), UP);
        assert_eq!(lattice.spin(2, 2), UP);
    }
}
