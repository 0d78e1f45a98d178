//! Region extraction and import between a lattice and grey byte buffers.
//!
//! This is the byte-level seam for snapshot writers (extract) and for
//! initial states decoded from images (import).

use crate::lattice::Lattice;

/// Grey level written for an up spin; down spins are written as 0.
pub const UP_GREY: u8 = 255;

/// Clamp `[min, max)` rows and columns to the lattice. `None` when empty.
fn clamp(
    lattice: &Lattice,
    min_row: usize,
    min_col: usize,
    max_row: usize,
    max_col: usize,
) -> Option<(usize, usize, usize, usize)> {
    let max_row = max_row.min(lattice.height());
    let max_col = max_col.min(lattice.width());
    if min_row >= max_row || min_col >= max_col {
        return None;
    }
    Some((min_row, min_col, max_row, max_col))
}

/// Extract a rectangular region into a flat grey buffer.
///
/// # Layout
/// Row-major (row changes slowest). Up spins become `UP_GREY`, down spins 0.
///
/// # Returns
/// Number of bytes written, or 0 if the region is empty or the buffer too short.
pub fn extract_region(
    lattice: &Lattice,
    out_buf: &mut [u8],
    min_row: usize,
    min_col: usize,
    max_row: usize,
    max_col: usize,
) -> usize {
    let Some((min_row, min_col, max_row, max_col)) =
        clamp(lattice, min_row, min_col, max_row, max_col)
    else {
        return 0;
    };

    let total_size = (max_row - min_row) * (max_col - min_col);
    if out_buf.len() < total_size {
        return 0;
    }

    let mut offset = 0;
    for i in min_row..max_row {
        for j in min_col..max_col {
            out_buf[offset] = if lattice.spin(i, j) > 0 { UP_GREY } else { 0 };
            offset += 1;
        }
    }
    offset
}

/// Whole-lattice grey image, row-major.
pub fn to_grey(lattice: &Lattice) -> Vec<u8> {
    let mut buf = vec![0u8; lattice.len()];
    extract_region(lattice, &mut buf, 0, 0, lattice.height(), lattice.width());
    buf
}

/// Import a rectangular region from a flat grey buffer.
///
/// # Layout
/// Row-major, matching `extract_region`. Values of 128 and above become up
/// spins, everything else down.
///
/// # Returns
/// Number of bytes read, or 0 if the region is empty or the buffer too short.
pub fn import_region(
    lattice: &mut Lattice,
    in_buf: &[u8],
    min_row: usize,
    min_col: usize,
    max_row: usize,
    max_col: usize,
) -> usize {
    let Some((min_row, min_col, max_row, max_col)) =
        clamp(lattice, min_row, min_col, max_row, max_col)
    else {
        return 0;
    };

    let total_size = (max_row - min_row) * (max_col - min_col);
    if in_buf.len() < total_size {
        return 0;
    }

    let mut offset = 0;
    for i in min_row..max_row {
        for j in min_col..max_col {
            lattice.set(i, j, in_buf[offset] >= 128);
            offset += 1;
        }
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::{DOWN, UP};

    #[test]
    fn test_extract_region_basic() {
        let mut lattice = Lattice::uniform(8, 8, DOWN).unwrap();
        lattice.flip(2, 2);
        lattice.flip(2, 3);
        lattice.flip(3, 2);

        let mut buffer = vec![7u8; 16];
        let written = extract_region(&lattice, &mut buffer, 2, 2, 6, 6);
        assert_eq!(written, 16);
        assert_eq!(buffer[0], UP_GREY); // (2,2)
        assert_eq!(buffer[1], UP_GREY); // (2,3)
        assert_eq!(buffer[4], UP_GREY); // (3,2)
        assert_eq!(buffer[5], 0); // (3,3)
    }

    #[test]
    fn test_extract_region_clamps_and_checks_length() {
        let lattice = Lattice::uniform(4, 4, UP).unwrap();
        let mut buffer = vec![0u8; 64];
        assert_eq!(extract_region(&lattice, &mut buffer, 0, 0, 10, 10), 16);
        assert!(buffer[..16].iter().all(|&b| b == UP_GREY));

        let mut short = vec![0u8; 3];
        assert_eq!(extract_region(&lattice, &mut short, 0, 0, 2, 2), 0);
        assert_eq!(extract_region(&lattice, &mut buffer, 3, 3, 2, 2), 0);
    }

    #[test]
    fn test_import_region_threshold() {
        let mut lattice = Lattice::uniform(4, 4, DOWN).unwrap();
        let buffer = [0u8, 127, 128, 255];
        assert_eq!(import_region(&mut lattice, &buffer, 1, 0, 2, 4), 4);
        assert_eq!(lattice.spin(1, 0), DOWN);
        assert_eq!(lattice.spin(1, 1), DOWN);
        assert_eq!(lattice.spin(1, 2), UP);
        assert_eq!(lattice.spin(1, 3), UP);
        // Other rows untouched
        assert!((0..4).all(|j| lattice.spin(0, j) == DOWN));
    }

    #[test]
    fn test_extract_import_symmetry() {
        let mut first = Lattice::uniform(6, 6, DOWN).unwrap();
        first.flip(0, 5);
        first.flip(4, 1);
        let grey = to_grey(&first);

        let mut second = Lattice::uniform(6, 6, UP).unwrap();
        assert_eq!(import_region(&mut second, &grey, 0, 0, 6, 6), 36);
        assert_eq!(first, second);
    }
}
