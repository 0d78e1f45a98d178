//! C ABI for embedding the engine.
//!
//! All functions are `#[no_mangle] extern "C"`. Handles are opaque boxed
//! pointers: create with `*_create`, free with the matching `*_destroy`.
//! Every function tolerates null handles and reports them through its
//! return value instead of crashing.
//!
//! The logic lives in `lattice`, `dynamics` and `simulation`; these are thin
//! wrappers that handle null checks and C-to-Rust conversions.

pub mod lattice;
pub mod region;
pub mod simulation;

pub use lattice::{
    ising_lattice_create, ising_lattice_destroy, ising_lattice_energy,
    ising_lattice_get_spin, ising_lattice_magnetization, ising_lattice_set_spin,
};
pub use region::{ising_extract_region, ising_import_region};
pub use simulation::{
    ising_simulation_create, ising_simulation_destroy, ising_simulation_energy,
    ising_simulation_lattice, ising_simulation_magnetization, ising_simulation_sweep,
    ising_simulation_sweeps,
};
