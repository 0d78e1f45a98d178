//! Error types for the lattice engine and its I/O adapters.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid lattice dimensions {width}x{height} (both at least 2, at most 2^26 sites)")]
    InvalidDimensions { width: usize, height: usize },

    #[error("invalid temperature {0} (must be finite and positive)")]
    InvalidTemperature(f64),

    #[error("buffer supply needs at least one worker")]
    InvalidWorkerCount,

    #[error("iteration count must be at least 1")]
    InvalidIterations,

    #[error("buffer holds {actual} bytes, expected {expected}")]
    BufferLength { expected: usize, actual: usize },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("format template error: {0}")]
    Template(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, SimError>;

/// Rejects temperatures the Boltzmann weights are undefined for.
pub fn check_temperature(temperature: f64) -> Result<()> {
    if temperature.is_finite() && temperature > 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidTemperature(temperature))
    }
}

/// Upper bound on `width * height` for any lattice.
pub const MAX_SITES: usize = 1 << 26;

/// Rejects lattices too small to have four distinct neighbors per cell, or
/// too large to allocate.
pub fn check_dimensions(width: usize, height: usize) -> Result<()> {
    let sites = width.checked_mul(height);
    if width >= 2 && height >= 2 && sites.is_some_and(|n| n <= MAX_SITES) {
        Ok(())
    } else {
        Err(SimError::InvalidDimensions { width, height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_bounds() {
        assert!(check_dimensions(2, 2).is_ok());
        assert!(check_dimensions(1 << 13, 1 << 13).is_ok());
        assert!(check_dimensions(1, 64).is_err());
        assert!(check_dimensions(1 << 13, (1 << 13) + 1).is_err());
        assert!(check_dimensions(usize::MAX, 2).is_err());
    }
}
