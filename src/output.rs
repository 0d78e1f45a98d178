//! File adapters: results table, PNG snapshots and image decoding.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::GrayImage;
use tracing::{debug, error};

use crate::dynamics::{to_grey, TemperatureField};
use crate::error::{check_dimensions, Result, SimError};
use crate::lattice::Lattice;
use crate::measurement::PhysicsResult;
use crate::simulation::SnapshotSink;

pub const DEFAULT_FORMAT: &str = "{T} {E} {cv} {M} {chi}";

fn placeholder(result: &PhysicsResult, name: &str) -> Option<f64> {
    match name {
        "T" => Some(result.temperature),
        "E" => Some(result.energy),
        "cv" => Some(result.heat_capacity),
        "M" => Some(result.magnetization),
        "chi" => Some(result.susceptibility),
        _ => None,
    }
}

/// Render one result with a template such as `"{T},{E},{cv},{M},{chi}"`.
///
/// A placeholder may carry a precision, e.g. `{E:.6}`. `{{` and `}}` are
/// literal braces.
pub fn format_result(template: &str, result: &PhysicsResult) -> Result<String> {
    let mut out = String::with_capacity(template.len() + 64);
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => field.push(c),
                        None => {
                            return Err(SimError::Template(format!(
                                "unterminated placeholder in {template:?}"
                            )))
                        }
                    }
                }
                let (name, spec) = field.split_once(':').unwrap_or((field.as_str(), ""));
                let value = placeholder(result, name).ok_or_else(|| {
                    SimError::Template(format!("unknown placeholder {{{name}}}"))
                })?;
                let written = match spec {
                    "" => write!(out, "{value}"),
                    _ => {
                        let precision = spec
                            .strip_prefix('.')
                            .and_then(|p| p.parse::<usize>().ok())
                            .ok_or_else(|| {
                                SimError::Template(format!("bad format spec {spec:?} for {name}"))
                            })?;
                        write!(out, "{value:.precision$}")
                    }
                };
                written.map_err(|e| SimError::Template(e.to_string()))?;
            }
            '}' => {
                return Err(SimError::Template(format!(
                    "unmatched '}}' in {template:?}"
                )))
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

/// Write one line per result, in the given order.
pub fn write_results(path: &Path, template: &str, results: &[PhysicsResult]) -> Result<()> {
    let mut content = String::new();
    for result in results {
        match format_result(template, result) {
            Ok(line) => {
                content.push_str(&line);
                content.push('\n');
            }
            Err(err) => {
                error!("Could not format results with {:?}: {}", template, err);
                return Err(err);
            }
        }
    }
    fs::write(path, content)?;
    Ok(())
}

/// Save the lattice as an 8-bit grey PNG (up 255, down 0).
pub fn save_png(lattice: &Lattice, path: &Path) -> Result<()> {
    let image = GrayImage::from_raw(
        lattice.width() as u32,
        lattice.height() as u32,
        to_grey(lattice),
    )
    .ok_or_else(|| SimError::Decode("grey buffer does not fit the lattice".into()))?;
    image.save(path)?;
    Ok(())
}

/// Decode a spin configuration from an image; the lattice takes its size.
pub fn load_spin_image(path: &Path) -> Result<Lattice> {
    let rgb = image::open(path)?.to_rgb8();
    let (width, height) = rgb.dimensions();
    Lattice::from_pixels(width as usize, height as usize, 3, rgb.as_raw())
}

/// Decode a temperature field from an image, grey mapped onto `[t_min, t_max)`.
///
/// The image is scaled to `width` x `height` first.
pub fn load_temperature_image(
    path: &Path,
    width: usize,
    height: usize,
    t_min: f64,
    t_max: f64,
) -> Result<TemperatureField> {
    check_dimensions(width, height)?;
    let mut rgb = image::open(path)?.to_rgb8();
    let (target_w, target_h) = (width as u32, height as u32);
    if rgb.dimensions() != (target_w, target_h) {
        debug!(
            "Scaling temperature image {} from {:?} to {}x{}",
            path.display(),
            rgb.dimensions(),
            width,
            height
        );
        rgb = imageops::resize(&rgb, target_w, target_h, FilterType::Triangle);
    }
    TemperatureField::from_pixels(width, height, 3, rgb.as_raw(), t_min, t_max)
}

/// `dir/stem.png` -> `dir/stem_<suffix>.png`.
fn suffixed(base: &Path, suffix: &str) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapshot".to_string());
    let ext = base
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "png".to_string());
    base.with_file_name(format!("{stem}_{suffix}.{ext}"))
}

/// PNG of every `every`-th measured state, numbered by frame.
pub struct IntervalSnapshots {
    base: PathBuf,
    temperature: f64,
    every: usize,
    seen: usize,
    frame: usize,
}

impl IntervalSnapshots {
    /// `every == 0` is treated as 1.
    pub fn new(base: impl Into<PathBuf>, temperature: f64, every: usize) -> Self {
        IntervalSnapshots {
            base: base.into(),
            temperature,
            every: every.max(1),
            seen: 0,
            frame: 0,
        }
    }

    pub fn frames_written(&self) -> usize {
        self.frame
    }
}

impl SnapshotSink for IntervalSnapshots {
    fn snapshot(&mut self, lattice: &Lattice) -> Result<()> {
        if self.seen % self.every == 0 {
            let path = suffixed(
                &self.base,
                &format!("{:.4}_{:05}", self.temperature, self.frame),
            );
            save_png(lattice, &path)?;
            self.frame += 1;
        }
        self.seen += 1;
        Ok(())
    }

    fn finish(&mut self, _lattice: &Lattice) -> Result<()> {
        Ok(())
    }
}

/// One PNG of the final state.
pub struct EndSnapshot {
    base: PathBuf,
    temperature: f64,
}

impl EndSnapshot {
    pub fn new(base: impl Into<PathBuf>, temperature: f64) -> Self {
        EndSnapshot {
            base: base.into(),
            temperature,
        }
    }

    pub fn path(&self) -> PathBuf {
        suffixed(&self.base, &format!("{:.4}", self.temperature))
    }
}

impl SnapshotSink for EndSnapshot {
    fn snapshot(&mut self, _lattice: &Lattice) -> Result<()> {
        Ok(())
    }

    fn finish(&mut self, lattice: &Lattice) -> Result<()> {
        save_png(lattice, &self.path())
    }
}
