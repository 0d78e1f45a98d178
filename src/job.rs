//! JSON job description and the driver that turns one into results.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dynamics::{AlgorithmKind, SeedSequence, TemperatureProfile};
use crate::error::{check_dimensions, check_temperature, Result, SimError};
use crate::measurement::PhysicsResult;
use crate::output::{
    load_spin_image, load_temperature_image, write_results, EndSnapshot, IntervalSnapshots,
    DEFAULT_FORMAT,
};
use crate::simulation::{
    build_pool, equidistant_temperatures, run_sweep, run_temperature, InitialState, NoSnapshots,
    SimulationParams, SnapshotSink,
};

pub const DEFAULT_CONFIG_PATH: &str = "magneto_config.json";

/// Critical temperature of the square lattice with J = 1.
const CRITICAL_TEMPERATURE: f64 = 2.269;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinStart {
    #[default]
    Random,
    Ones,
    Image(PathBuf),
}

fn default_t_min() -> f64 {
    1.0
}

fn default_t_max() -> f64 {
    5.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureSpec {
    Single(f64),
    Range {
        min: f64,
        max: f64,
        steps: usize,
    },
    Image {
        path: PathBuf,
        #[serde(default = "default_t_min")]
        t_min: f64,
        #[serde(default = "default_t_max")]
        t_max: f64,
    },
}

impl Default for TemperatureSpec {
    fn default() -> Self {
        TemperatureSpec::Single(CRITICAL_TEMPERATURE)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageMode {
    #[default]
    None,
    Intervals {
        path: PathBuf,
        every: usize,
    },
    End {
        path: PathBuf,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsOutput {
    pub path: PathBuf,
    pub format: String,
}

impl Default for PhysicsOutput {
    fn default() -> Self {
        PhysicsOutput {
            path: PathBuf::from("magneto_results.txt"),
            format: DEFAULT_FORMAT.to_string(),
        }
    }
}

/// A complete run description. Every field has a default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Job {
    pub spin_start: SpinStart,
    pub temperature: TemperatureSpec,
    pub width: usize,
    pub height: usize,
    pub coupling: i32,
    pub warmup_sweeps: usize,
    pub iterations: usize,
    pub algorithm: AlgorithmKind,
    pub image_mode: ImageMode,
    pub physics: PhysicsOutput,
    /// rayon pool size; 0 lets rayon decide.
    pub threads: usize,
    pub buffer_workers: usize,
    pub seed: Option<u64>,
}

impl Default for Job {
    fn default() -> Self {
        Job {
            spin_start: SpinStart::Random,
            temperature: TemperatureSpec::default(),
            width: 128,
            height: 128,
            coupling: 1,
            warmup_sweeps: 0,
            iterations: 100,
            algorithm: AlgorithmKind::Metropolis,
            image_mode: ImageMode::None,
            physics: PhysicsOutput::default(),
            threads: 0,
            buffer_workers: 2,
            seed: None,
        }
    }
}

impl Job {
    /// Parse and validate a JSON job.
    pub fn from_json(json: &str) -> Result<Self> {
        let job: Job = serde_json::from_str(json)?;
        job.validate()?;
        Ok(job)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Job::from_json(&json)
    }

    /// Rejects configurations that cannot run, before anything is built.
    pub fn validate(&self) -> Result<()> {
        check_dimensions(self.width, self.height)?;
        if self.iterations == 0 {
            return Err(SimError::InvalidIterations);
        }
        if self.buffer_workers == 0 {
            return Err(SimError::InvalidWorkerCount);
        }
        match &self.temperature {
            TemperatureSpec::Single(t) => check_temperature(*t)?,
            TemperatureSpec::Range { min, max, steps } => {
                check_temperature(*min)?;
                check_temperature(*max)?;
                if *steps == 0 {
                    return Err(SimError::Decode(
                        "temperature range needs at least one step".into(),
                    ));
                }
            }
            TemperatureSpec::Image { t_min, t_max, .. } => {
                check_temperature(*t_min)?;
                check_temperature(*t_max)?;
            }
        }
        Ok(())
    }

    /// Uniform temperatures to sweep; empty for an image temperature field.
    pub fn temperatures(&self) -> Vec<f64> {
        match &self.temperature {
            TemperatureSpec::Single(t) => vec![*t],
            TemperatureSpec::Range { min, max, steps } => {
                equidistant_temperatures(*min, *max, *steps)
            }
            TemperatureSpec::Image { .. } => Vec::new(),
        }
    }

    /// Resolve the spin start. An image that cannot be decoded falls back
    /// to random initialisation at the configured size.
    fn initial_state(&self) -> (InitialState, usize, usize) {
        match &self.spin_start {
            SpinStart::Random => (InitialState::Random, self.width, self.height),
            SpinStart::Ones => (InitialState::Uniform, self.width, self.height),
            SpinStart::Image(path) => match load_spin_image(path) {
                Ok(lattice) => {
                    let (width, height) = (lattice.width(), lattice.height());
                    (InitialState::Given(lattice), width, height)
                }
                Err(err) => {
                    warn!(
                        "Could not load spin image {}: {}; using random spins",
                        path.display(),
                        err
                    );
                    (InitialState::Random, self.width, self.height)
                }
            },
        }
    }

    pub fn params(&self) -> SimulationParams {
        let (initial, width, height) = self.initial_state();
        SimulationParams {
            width,
            height,
            coupling: self.coupling,
            warmup_sweeps: self.warmup_sweeps,
            iterations: self.iterations,
            algorithm: self.algorithm,
            buffer_workers: self.buffer_workers,
            initial,
        }
    }

    fn sink_for(&self, temperature: f64) -> Box<dyn SnapshotSink> {
        match &self.image_mode {
            ImageMode::None => Box::new(NoSnapshots),
            ImageMode::Intervals { path, every } => {
                Box::new(IntervalSnapshots::new(path.clone(), temperature, *every))
            }
            ImageMode::End { path } => Box::new(EndSnapshot::new(path.clone(), temperature)),
        }
    }

    /// Run every temperature point. Results are in temperature-list order.
    pub fn run(&self) -> Result<Vec<PhysicsResult>> {
        self.validate()?;
        let seed = self.seed.unwrap_or_else(rand::random);
        info!("Using seed {}", seed);
        let seeds = SeedSequence::new(seed);
        let params = self.params();

        match &self.temperature {
            TemperatureSpec::Image { path, t_min, t_max } => {
                let field =
                    load_temperature_image(path, params.width, params.height, *t_min, *t_max)?;
                let profile = TemperatureProfile::Field(field);
                let mut sink = self.sink_for(profile.representative());
                let result = run_temperature(&params, &profile, &seeds, sink.as_mut())?;
                Ok(vec![result])
            }
            _ => {
                let pool = build_pool(self.threads)?;
                let temperatures = self.temperatures();
                run_sweep(&pool, &params, &temperatures, &seeds, |t| self.sink_for(t))
            }
        }
    }

    /// Run and write the results table.
    pub fn run_and_write(&self) -> Result<Vec<PhysicsResult>> {
        let results = self.run()?;
        write_results(&self.physics.path, &self.physics.format, &results)?;
        info!(
            "Wrote {} result line(s) to {}",
            results.len(),
            self.physics.path.display()
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let job = Job::from_json("{}").unwrap();
        assert_eq!(job, Job::default());
        assert_eq!(job.temperatures(), vec![2.269]);
        assert_eq!(job.physics.path, PathBuf::from("magneto_results.txt"));
    }

    #[test]
    fn test_full_config_parses() {
        let json = r#"{
            "spin_start": "ones",
            "temperature": { "range": { "min": 1.0, "max": 3.0, "steps": 3 } },
            "width": 16,
            "height": 8,
            "coupling": 2,
            "warmup_sweeps": 10,
            "iterations": 50,
            "algorithm": "swendsen_wang",
            "image_mode": { "intervals": { "path": "out/frame.png", "every": 5 } },
            "physics": { "path": "res.csv", "format": "{T},{E},{cv},{M},{chi}" },
            "threads": 4,
            "buffer_workers": 3,
            "seed": 99
        }"#;
        let job = Job::from_json(json).unwrap();
        assert_eq!(job.spin_start, SpinStart::Ones);
        assert_eq!(job.temperatures(), vec![1.0, 2.0, 3.0]);
        assert_eq!((job.width, job.height, job.coupling), (16, 8, 2));
        assert_eq!(job.algorithm, AlgorithmKind::SwendsenWang);
        assert_eq!(
            job.image_mode,
            ImageMode::Intervals {
                path: PathBuf::from("out/frame.png"),
                every: 5
            }
        );
        assert_eq!(job.physics.format, "{T},{E},{cv},{M},{chi}");
        assert_eq!(job.seed, Some(99));
    }

    #[test]
    fn test_image_variants_parse() {
        let job = Job::from_json(
            r#"{ "spin_start": { "image": "start.png" },
                 "temperature": { "image": { "path": "temps.png" } } }"#,
        )
        .unwrap();
        assert_eq!(job.spin_start, SpinStart::Image(PathBuf::from("start.png")));
        assert_eq!(
            job.temperature,
            TemperatureSpec::Image {
                path: PathBuf::from("temps.png"),
                t_min: 1.0,
                t_max: 5.0
            }
        );
        assert!(job.temperatures().is_empty());
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(
            Job::from_json(r#"{ "width": 1 }"#),
            Err(SimError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            Job::from_json(r#"{ "iterations": 0 }"#),
            Err(SimError::InvalidIterations)
        ));
        assert!(matches!(
            Job::from_json(r#"{ "buffer_workers": 0 }"#),
            Err(SimError::InvalidWorkerCount)
        ));
        assert!(matches!(
            Job::from_json(r#"{ "temperature": { "single": -1.0 } }"#),
            Err(SimError::InvalidTemperature(_))
        ));
        assert!(matches!(
            Job::from_json(r#"{ "algorithm": "heat_bath" }"#),
            Err(SimError::Json(_))
        ));
    }

    #[test]
    fn test_missing_spin_image_falls_back_to_random() {
        let job = Job {
            spin_start: SpinStart::Image(PathBuf::from("/nonexistent/start.png")),
            width: 6,
            height: 4,
            ..Job::default()
        };
        let params = job.params();
        assert_eq!(params.initial, InitialState::Random);
        assert_eq!((params.width, params.height), (6, 4));
    }

    #[test]
    fn test_temperature_image_smaller_than_lattice() {
        let dir = std::env::temp_dir().join(format!("ising-job-field-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("temps.png");
        image::GrayImage::from_pixel(4, 4, image::Luma([128]))
            .save(&path)
            .unwrap();

        let job = Job {
            temperature: TemperatureSpec::Image {
                path,
                t_min: 1.0,
                t_max: 3.0,
            },
            width: 8,
            height: 8,
            iterations: 5,
            seed: Some(3),
            ..Job::default()
        };
        let results = job.run().unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].temperature - 2.0).abs() < 0.02);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_run_small_job() {
        let job = Job {
            temperature: TemperatureSpec::Range {
                min: 1.5,
                max: 3.0,
                steps: 4,
            },
            width: 8,
            height: 8,
            iterations: 10,
            warmup_sweeps: 2,
            threads: 2,
            seed: Some(5),
            ..Job::default()
        };
        let results = job.run().unwrap();
        let temperatures: Vec<f64> = results.iter().map(|r| r.temperature).collect();
        assert_eq!(temperatures, vec![1.5, 2.0, 2.5, 3.0]);
    }
}
