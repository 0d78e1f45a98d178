//! Lattice creation, spin access and observables.

use crate::dynamics::{total_energy, total_magnetization, SeedSequence};
use crate::lattice::{Lattice, DOWN, UP};

/// Creates a lattice and returns an opaque pointer.
///
/// `fill` selects the initial state: 1 = all up, -1 = all down, anything
/// else = random spins drawn from `seed`.
///
/// # Returns
/// A pointer to a new lattice, or null if either dimension is below 2 or
/// the site count exceeds `MAX_SITES`.
///
/// # Safety
/// The returned pointer must eventually be freed with `ising_lattice_destroy()`.
#[no_mangle]
pub extern "C" fn ising_lattice_create(width: u32, height: u32, fill: i8, seed: u64) -> *mut Lattice {
    let (width, height) = (width as usize, height as usize);
    let lattice = match fill {
        UP | DOWN => Lattice::uniform(width, height, fill),
        _ => Lattice::randomized(width, height, &mut SeedSequence::new(seed).next_rng()),
    };
    match lattice {
        Ok(lattice) => Box::into_raw(Box::new(lattice)),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Destroys a lattice created by `ising_lattice_create()`.
///
/// # Safety
/// - `ptr` must be a pointer returned by `ising_lattice_create()`, or null
/// - `ptr` must not be used after this call
#[no_mangle]
pub unsafe extern "C" fn ising_lattice_destroy(ptr: *mut Lattice) {
    if !ptr.is_null() {
        drop(Box::from_raw(ptr));
    }
}

/// Gets the spin at `(row, col)`.
///
/// # Safety
/// - `ptr` must be a valid lattice pointer, or null
///
/// # Returns
/// 1 or -1; 0 if out of bounds or `ptr` is null.
#[no_mangle]
pub unsafe extern "C" fn ising_lattice_get_spin(ptr: *const Lattice, row: u32, col: u32) -> i8 {
    if ptr.is_null() {
        return 0;
    }
    let lattice = &*ptr;
    let (row, col) = (row as usize, col as usize);
    if row >= lattice.height() || col >= lattice.width() {
        return 0;
    }
    lattice.spin(row, col)
}

/// Sets the spin at `(row, col)`: positive `spin` is up, anything else down.
///
/// # Safety
/// - `ptr` must be a valid lattice pointer, or null
///
/// # Returns
/// 0 on success, 1 on null pointer, -1 if out of bounds.
#[no_mangle]
pub unsafe extern "C" fn ising_lattice_set_spin(ptr: *mut Lattice, row: u32, col: u32, spin: i8) -> i32 {
    if ptr.is_null() {
        return 1;
    }
    let lattice = &mut *ptr;
    let (row, col) = (row as usize, col as usize);
    if row >= lattice.height() || col >= lattice.width() {
        return -1;
    }
    lattice.set(row, col, spin > 0);
    0
}

/// Energy per site.
///
/// # Safety
/// - `ptr` must be a valid lattice pointer, or null
///
/// # Returns
/// The energy, or NaN if `ptr` is null.
#[no_mangle]
pub unsafe extern "C" fn ising_lattice_energy(ptr: *const Lattice) -> f64 {
    if ptr.is_null() {
        return f64::NAN;
    }
    total_energy(&*ptr)
}

/// Absolute magnetization per site.
///
/// # Safety
/// - `ptr` must be a valid lattice pointer, or null
///
/// # Returns
/// The magnetization, or NaN if `ptr` is null.
#[no_mangle]
pub unsafe extern "C" fn ising_lattice_magnetization(ptr: *const Lattice) -> f64 {
    if ptr.is_null() {
        return f64::NAN;
    }
    total_magnetization(&*ptr)
}
