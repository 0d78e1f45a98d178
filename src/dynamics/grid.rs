//! Periodic neighbor lookup and energy / magnetization reductions.

use crate::lattice::Lattice;

/// Row above `i`, wrapping at the top edge.
#[inline]
pub fn north(lattice: &Lattice, i: usize) -> usize {
    if i == 0 {
        lattice.height() - 1
    } else {
        i - 1
    }
}

/// Row below `i`, wrapping at the bottom edge.
#[inline]
pub fn south(lattice: &Lattice, i: usize) -> usize {
    if i + 1 == lattice.height() {
        0
    } else {
        i + 1
    }
}

/// Column right of `j`, wrapping at the right edge.
#[inline]
pub fn east(lattice: &Lattice, j: usize) -> usize {
    if j + 1 == lattice.width() {
        0
    } else {
        j + 1
    }
}

/// Column left of `j`, wrapping at the left edge.
#[inline]
pub fn west(lattice: &Lattice, j: usize) -> usize {
    if j == 0 {
        lattice.width() - 1
    } else {
        j - 1
    }
}

/// Sum of the four periodic neighbors of `(i, j)`.
#[inline]
pub fn neighbor_sum(lattice: &Lattice, i: usize, j: usize) -> i32 {
    lattice.spin(i, east(lattice, j)) as i32
        + lattice.spin(south(lattice, i), j) as i32
        + lattice.spin(i, west(lattice, j)) as i32
        + lattice.spin(north(lattice, i), j) as i32
}

/// Change in total energy (in units of J) if `(i, j)` were flipped.
#[inline]
pub fn energy_delta(lattice: &Lattice, i: usize, j: usize) -> i32 {
    2 * lattice.spin(i, j) as i32 * neighbor_sum(lattice, i, j)
}

/// Energy per site. Only the east and south bonds of each cell are counted,
/// so every bond enters exactly once.
pub fn total_energy(lattice: &Lattice) -> f64 {
    let mut energy: i64 = 0;
    for i in 0..lattice.height() {
        let below = south(lattice, i);
        for j in 0..lattice.width() {
            let right = east(lattice, j);
            let s = lattice.spin(i, j) as i64;
            energy -= s * (lattice.spin(i, right) as i64 + lattice.spin(below, j) as i64);
        }
    }
    energy as f64 / lattice.len() as f64
}

/// Absolute magnetization per site.
pub fn total_magnetization(lattice: &Lattice) -> f64 {
    let sum: i64 = lattice.spins().iter().map(|&s| s as i64).sum();
    sum.unsigned_abs() as f64 / lattice.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::{DOWN, UP};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_neighbors_wrap() {
        let lattice = Lattice::uniform(4, 3, UP).unwrap();
        assert_eq!(north(&lattice, 0), 2);
        assert_eq!(south(&lattice, 2), 0);
        assert_eq!(east(&lattice, 3), 0);
        assert_eq!(west(&lattice, 0), 3);
        assert_eq!(north(&lattice, 1), 0);
        assert_eq!(east(&lattice, 1), 2);
    }

    #[test]
    fn test_ordered_ground_state() {
        for spin in [UP, DOWN] {
            let lattice = Lattice::uniform(8, 8, spin).unwrap();
            assert_eq!(total_energy(&lattice), -2.0);
            assert_eq!(total_magnetization(&lattice), 1.0);
        }
    }

    #[test]
    fn test_checkerboard_is_antiferro_state() {
        let spins = (0..36)
            .map(|idx| if (idx / 6 + idx % 6) % 2 == 0 { UP } else { DOWN })
            .collect();
        let lattice = Lattice::from_spins(6, 6, spins).unwrap();
        assert_eq!(total_energy(&lattice), 2.0);
        assert_eq!(total_magnetization(&lattice), 0.0);
        // Flipping any cell satisfies all four of its bonds
        assert_eq!(energy_delta(&lattice, 2, 3), -8);
    }

    #[test]
    fn test_two_by_two_delta_counts_self_wrap() {
        let lattice = Lattice::uniform(2, 2, UP).unwrap();
        for i in 0..2 {
            for j in 0..2 {
                assert_eq!(energy_delta(&lattice, i, j), 8);
            }
        }
    }

    #[test]
    fn test_single_defect_delta() {
        let mut lattice = Lattice::uniform(4, 4, UP).unwrap();
        lattice.flip(1, 1);
        assert_eq!(energy_delta(&lattice, 1, 1), -8);
        assert_eq!(energy_delta(&lattice, 0, 1), 4);
        assert_eq!(energy_delta(&lattice, 3, 3), 8);
    }

    #[test]
    fn test_delta_matches_total_energy_change() {
        let mut rng = SmallRng::seed_from_u64(11);
        let mut lattice = Lattice::randomized(7, 5, &mut rng).unwrap();
        let sites = lattice.len() as f64;
        for (i, j) in [(0, 0), (4, 6), (2, 3), (0, 6), (4, 0)] {
            let before = total_energy(&lattice) * sites;
            let delta = energy_delta(&lattice, i, j);
            lattice.flip(i, j);
            let after = total_energy(&lattice) * sites;
            assert_eq!((after - before).round() as i32, delta);
            // Flipping back negates the delta
            assert_eq!(energy_delta(&lattice, i, j), -delta);
        }
    }
}
