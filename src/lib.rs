//! Ising Lattice - Monte Carlo simulation of the 2D Ising model
//!
//! Spins live on a periodic `width x height` lattice and are advanced by
//! single-flip Metropolis or Swendsen-Wang cluster sweeps. Random numbers are
//! produced ahead of time by background workers (`dynamics::buffer`) so the
//! sweep loop never waits on the generator. A temperature sweep runs every
//! point on a rayon pool and reduces each run to energy, magnetization, heat
//! capacity and susceptibility.
//!
//! The library is driven from the `ising` binary through a JSON `job`, or
//! embedded through the C ABI in `ffi`.

pub mod dynamics;
pub mod error;
pub mod ffi;
pub mod job;
pub mod lattice;
pub mod logging;
pub mod measurement;
pub mod output;
pub mod simulation;

pub use error::{Result, SimError};
pub use job::Job;
pub use lattice::Lattice;
pub use measurement::{Measurement, PhysicsResult};
pub use simulation::{run_sweep, run_temperature, Simulation, SimulationParams};
