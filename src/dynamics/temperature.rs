//! Per-site temperature fields.

use crate::error::{check_dimensions, check_temperature, Result, SimError};
use crate::lattice::Lattice;

/// Row-major temperatures, one per lattice site.
#[derive(Clone, Debug, PartialEq)]
pub struct TemperatureField {
    pub width: usize,
    pub height: usize,
    pub values: Vec<f64>,
}

impl TemperatureField {
    /// Validates every value and the shape.
    pub fn new(width: usize, height: usize, values: Vec<f64>) -> Result<Self> {
        check_dimensions(width, height)?;
        if values.len() != width * height {
            return Err(SimError::BufferLength {
                expected: width * height,
                actual: values.len(),
            });
        }
        for &t in &values {
            check_temperature(t)?;
        }
        Ok(TemperatureField {
            width,
            height,
            values,
        })
    }

    /// Map 8-bit pixel data onto `[t_min, t_max)`: `t_min + grey / 256 * (t_max - t_min)`,
    /// where grey is the channel mean of each pixel.
    pub fn from_pixels(
        width: usize,
        height: usize,
        channels: usize,
        data: &[u8],
        t_min: f64,
        t_max: f64,
    ) -> Result<Self> {
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
        let span = t_max - t_min;
        let values = data
            .chunks_exact(channels)
            .map(|px| {
                let grey = px.iter().map(|&c| c as usize).sum::<usize>() / channels;
                t_min + grey as f64 / 256.0 * span
            })
            .collect();
        TemperatureField::new(width, height, values)
    }

    #[inline]
    pub fn at(&self, idx: usize) -> f64 {
        self.values[idx]
    }

    pub fn mean(&self) -> f64 {
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    pub fn matches(&self, lattice: &Lattice) -> bool {
        self.width == lattice.width() && self.height == lattice.height()
    }
}

/// Temperature of a run: one value for every site, or a field.
#[derive(Clone, Debug, PartialEq)]
pub enum TemperatureProfile {
    Uniform(f64),
    Field(TemperatureField),
}

impl TemperatureProfile {
    /// The temperature reported for the run (the field's mean for fields).
    pub fn representative(&self) -> f64 {
        match self {
            TemperatureProfile::Uniform(t) => *t,
            TemperatureProfile::Field(field) => field.mean(),
        }
    }
}
