//! Running simulation handles: a lattice plus the algorithm advancing it.

use crate::dynamics::{AlgorithmKind, SeedSequence, TemperatureProfile};
use crate::lattice::{Lattice, UP};
use crate::simulation::Simulation;

fn algorithm_from_code(code: u8) -> Option<AlgorithmKind> {
    match code {
        0 => Some(AlgorithmKind::Metropolis),
        1 => Some(AlgorithmKind::SwendsenWang),
        _ => None,
    }
}

/// Creates a simulation at a uniform temperature.
///
/// `algorithm`: 0 = Metropolis, 1 = Swendsen-Wang. `ordered` != 0 starts
/// from all spins up, otherwise from random spins drawn from `seed`.
/// `workers` is the number of background buffer generations kept in flight.
///
/// # Returns
/// A pointer to a new simulation, or null if any argument is invalid.
///
/// # Safety
/// The returned pointer must eventually be freed with `ising_simulation_destroy()`.
#[no_mangle]
pub extern "C" fn ising_simulation_create(
    width: u32,
    height: u32,
    coupling: i32,
    temperature: f64,
    algorithm: u8,
    ordered: u8,
    workers: u32,
    seed: u64,
) -> *mut Simulation {
    let Some(kind) = algorithm_from_code(algorithm) else {
        return std::ptr::null_mut();
    };
    let seeds = SeedSequence::new(seed);
    let (width, height) = (width as usize, height as usize);
    let lattice = if ordered != 0 {
        Lattice::uniform(width, height, UP)
    } else {
        Lattice::randomized(width, height, &mut seeds.next_rng())
    };

    let simulation = lattice.and_then(|lattice| {
        Simulation::new(
            lattice,
            kind,
            coupling,
            &TemperatureProfile::Uniform(temperature),
            workers as usize,
            &seeds.child(0),
        )
    });
    match simulation {
        Ok(simulation) => Box::into_raw(Box::new(simulation)),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Destroys a simulation, joining its background buffer workers.
///
/// # Safety
/// - `ptr` must be a pointer returned by `ising_simulation_create()`, or null
/// - `ptr` must not be used after this call
#[no_mangle]
pub unsafe extern "C" fn ising_simulation_destroy(ptr: *mut Simulation) {
    if !ptr.is_null() {
        drop(Box::from_raw(ptr));
    }
}

/// Advances the simulation by `count` sweeps.
///
/// # Safety
/// - `ptr` must be a valid simulation pointer, or null
///
/// # Returns
/// 0 on success, 1 on null pointer.
#[no_mangle]
pub unsafe extern "C" fn ising_simulation_sweep(ptr: *mut Simulation, count: u32) -> i32 {
    if ptr.is_null() {
        return 1;
    }
    (*ptr).advance(count as usize);
    0
}

/// Sweeps performed so far, or 0 if `ptr` is null.
///
/// # Safety
/// - `ptr` must be a valid simulation pointer, or null
#[no_mangle]
pub unsafe extern "C" fn ising_simulation_sweeps(ptr: *const Simulation) -> u64 {
    if ptr.is_null() {
        return 0;
    }
    (*ptr).sweeps()
}

/// Energy per site of the current state, or NaN if `ptr` is null.
///
/// # Safety
/// - `ptr` must be a valid simulation pointer, or null
#[no_mangle]
pub unsafe extern "C" fn ising_simulation_energy(ptr: *const Simulation) -> f64 {
    if ptr.is_null() {
        return f64::NAN;
    }
    (*ptr).measure().energy
}

/// Absolute magnetization per site of the current state, or NaN if `ptr` is null.
///
/// # Safety
/// - `ptr` must be a valid simulation pointer, or null
#[no_mangle]
pub unsafe extern "C" fn ising_simulation_magnetization(ptr: *const Simulation) -> f64 {
    if ptr.is_null() {
        return f64::NAN;
    }
    (*ptr).measure().magnetization
}

/// Borrows the simulation's lattice for the `ising_lattice_*` and region
/// functions.
///
/// # Safety
/// - `ptr` must be a valid simulation pointer, or null
/// - The returned pointer is owned by the simulation: never pass it to
///   `ising_lattice_destroy()`, and do not use it after
///   `ising_simulation_destroy()` or during `ising_simulation_sweep()`
///
/// # Returns
/// The lattice pointer, or null if `ptr` is null.
#[no_mangle]
pub unsafe extern "C" fn ising_simulation_lattice(ptr: *mut Simulation) -> *mut Lattice {
    if ptr.is_null() {
        return std::ptr::null_mut();
    }
    (*ptr).lattice_mut()
}
