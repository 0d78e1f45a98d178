//! Spin lattice storage.

use rand::Rng;

use crate::error::{check_dimensions, Result, SimError};

pub const UP: i8 = 1;
pub const DOWN: i8 = -1;

/// A rectangular grid of ±1 spins on a torus.
///
/// Cells are stored row-major: `(i, j)` is row `i` (0..height), column `j`
/// (0..width). Every cell holds exactly `UP` or `DOWN`; the only mutators
/// negate or overwrite with one of those two values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lattice {
    width: usize,
    height: usize,
    spins: Vec<i8>,
}

impl Lattice {
    /// Every cell independently `UP` or `DOWN` with equal probability.
    pub fn randomized<R: Rng + ?Sized>(width: usize, height: usize, rng: &mut R) -> Result<Self> {
        check_dimensions(width, height)?;
        let spins = (0..width * height)
            .map(|_| if rng.random_bool(0.5) { UP } else { DOWN })
            .collect();
        Ok(Lattice {
            width,
            height,
            spins,
        })
    }

    /// Every cell set to `spin` (normalized to ±1 by sign).
    pub fn uniform(width: usize, height: usize, spin: i8) -> Result<Self> {
        check_dimensions(width, height)?;
        let spin = if spin >= 0 { UP } else { DOWN };
        Ok(Lattice {
            width,
            height,
            spins: vec![spin; width * height],
        })
    }

    /// Build from an explicit row-major spin vector.
    pub fn from_spins(width: usize, height: usize, spins: Vec<i8>) -> Result<Self> {
        check_dimensions(width, height)?;
        if spins.len() != width * height {
            return Err(SimError::BufferLength {
                expected: width * height,
                actual: spins.len(),
            });
        }
        if let Some(bad) = spins.iter().find(|&&s| s != UP && s != DOWN) {
            return Err(SimError::Decode(format!("spin value {bad} is not ±1")));
        }
        Ok(Lattice {
            width,
            height,
            spins,
        })
    }

    /// Decode interleaved 8-bit pixel data (`channels` bytes per pixel).
    ///
    /// The pixel's channel mean decides the spin: 128 and above is `UP`.
    pub fn from_pixels(width: usize, height: usize, channels: usize, data: &[u8]) -> Result<Self> {
        check_dimensions(width, height)?;
        if channels == 0 {
            return Err(SimError::Decode("pixel data has zero channels".into()));
        }
        let expected = width * height * channels;
        if data.len() != expected {
            return Err(SimError::BufferLength {
                expected,
                actual: data.len(),
            });
        }
        let spins = data
            .chunks_exact(channels)
            .map(|px| {
                let mean = px.iter().map(|&c| c as usize).sum::<usize>() / channels;
                if mean >= 128 {
                    UP
                } else {
                    DOWN
                }
            })
            .collect();
        Ok(Lattice {
            width,
            height,
            spins,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of sites.
    #[inline]
    pub fn len(&self) -> usize {
        self.spins.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.spins.is_empty()
    }

    /// Linear index of row `i`, column `j`.
    #[inline]
    pub fn index(&self, i: usize, j: usize) -> usize {
        i * self.width + j
    }

    #[inline]
    pub fn spin(&self, i: usize, j: usize) -> i8 {
        self.spins[self.index(i, j)]
    }

    #[inline]
    pub fn spin_at(&self, idx: usize) -> i8 {
        self.spins[idx]
    }

    #[inline]
    pub fn flip(&mut self, i: usize, j: usize) {
        let idx = self.index(i, j);
        self.spins[idx] = -self.spins[idx];
    }

    #[inline]
    pub fn flip_at(&mut self, idx: usize) {
        self.spins[idx] = -self.spins[idx];
    }

    /// Overwrite a cell: `true` is `UP`, `false` is `DOWN`.
    #[inline]
    pub fn set(&mut self, i: usize, j: usize, up: bool) {
        let idx = self.index(i, j);
        self.spins[idx] = if up { UP } else { DOWN };
    }

    /// Row-major view of all spins.
    pub fn spins(&self) -> &[i8] {
        &self.spins
    }
}
