//! Region extraction and import FFI functions.

use crate::dynamics;
use crate::lattice::Lattice;

/// Extracts a rectangular region of spins into a flat grey buffer.
///
/// # Layout
/// Row-major over `[min_row, max_row) x [min_col, max_col)`, clamped to the
/// lattice. Up spins are written as 255, down spins as 0. This matches the
/// layout expected by `ising_import_region`.
///
/// # Safety
/// - `ptr` must be a valid lattice pointer, or null
/// - `out_buf` must point to at least `out_len` writable bytes
///
/// # Returns
/// Number of bytes written, or 0 on error.
#[no_mangle]
pub unsafe extern "C" fn ising_extract_region(
    ptr: *const Lattice,
    out_buf: *mut u8,
    out_len: u64,
    min_row: u32,
    min_col: u32,
    max_row: u32,
    max_col: u32,
) -> u64 {
    if ptr.is_null() || out_buf.is_null() {
        return 0;
    }

    let buf_slice = std::slice::from_raw_parts_mut(out_buf, out_len as usize);
    dynamics::extract_region(
        &*ptr,
        buf_slice,
        min_row as usize,
        min_col as usize,
        max_row as usize,
        max_col as usize,
    ) as u64
}

/// Imports a rectangular region of spins from a flat grey buffer.
///
/// # Layout
/// Row-major, matching `ising_extract_region`. Values of 128 and above
/// become up spins, everything else down.
///
/// # Safety
/// - `ptr` must be a valid lattice pointer, or null
/// - `in_buf` must point to at least `in_len` readable bytes
///
/// # Returns
/// Number of bytes read, or 0 on error.
#[no_mangle]
pub unsafe extern "C" fn ising_import_region(
    ptr: *mut Lattice,
    in_buf: *const u8,
    in_len: u64,
    min_row: u32,
    min_col: u32,
    max_row: u32,
    max_col: u32,
) -> u64 {
    if ptr.is_null() || in_buf.is_null() {
        return 0;
    }

    let buf_slice = std::slice::from_raw_parts(in_buf, in_len as usize);
    dynamics::import_region(
        &mut *ptr,
        buf_slice,
        min_row as usize,
        min_col as usize,
        max_row as usize,
        max_col as usize,
    ) as u64
}
