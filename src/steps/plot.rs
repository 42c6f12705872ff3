//! Draw every vector as a line series on one chart.
use super::{announce_run, resolve_inputs, sum, Step, StepContext};
use crate::array;
use crate::manifest::Manifest;
use anyhow::{anyhow, Result};
use nalgebra::DVector;
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const NAME: &str = "plot";
pub const PLOTS_DIR: &str = "plots";
pub const PLOT_FILE_NAME: &str = "plot.png";

const WIDTH: u32 = 1024;
const HEIGHT: u32 = 768;

/// Load every input vector and draw them together; saves `plots/plot.png`
/// and a one-row manifest.
#[derive(Debug)]
pub struct Plot {
    upstream: Vec<String>,
    manifest: Option<PathBuf>,
}

impl Plot {
    pub fn new() -> Self {
        Plot::with_upstream(sum::NAME)
    }

    /// Point the step at a different vector producer (the mapped chain).
    pub fn with_upstream(upstream: &str) -> Self {
        Plot { upstream: vec![upstream.to_string()], manifest: None }
    }

    /// Read inputs from an explicit manifest instead of the upstream default.
    pub fn from_manifest(path: PathBuf) -> Self {
        Plot { manifest: Some(path), ..Plot::new() }
    }
}

impl Default for Plot {
    fn default() -> Self {
        Plot::new()
    }
}

impl Step for Plot {
    fn name(&self) -> &str {
        NAME
    }

    fn upstream(&self) -> &[String] {
        &self.upstream
    }

    fn run(&self, ctx: &StepContext, inputs: Option<Vec<PathBuf>>) -> Result<Vec<PathBuf>> {
        announce_run(NAME, ctx);
        let inputs =
            resolve_inputs(ctx, inputs, self.manifest.as_deref(), &self.upstream[0])?;
        let vectors = load_vectors(&inputs)?;
        let dir = ctx.staging.ensure_artifact_dir(NAME, PLOTS_DIR)?;
        let path = dir.join(PLOT_FILE_NAME);
        draw(&path, &vectors)?;
        debug!(step = NAME, curves = vectors.len(), "chart saved");
        Manifest::from_paths([path.clone()]).save(&ctx.staging.manifest_path(NAME))?;
        Ok(vec![path])
    }
}

pub(crate) fn load_vectors(paths: &[PathBuf]) -> Result<Vec<DVector<f64>>> {
    if paths.is_empty() {
        return Err(anyhow!("no input vectors to plot"));
    }
    paths
        .iter()
        .map(|path| {
            let vector = array::load_vector(path)?;
            if vector.is_empty() {
                return Err(anyhow!(
                    "vector {} has no elements to draw",
                    path.display()
                ));
            }
            Ok(vector)
        })
        .collect()
}

/// Widen a degenerate range so the chart always has area to draw into.
pub(crate) fn padded(min: f64, max: f64) -> (f64, f64) {
    if max > min {
        (min, max)
    } else {
        (min - 0.5, min + 0.5)
    }
}

fn draw(path: &Path, vectors: &[DVector<f64>]) -> Result<()> {
    let longest = vectors.iter().map(DVector::len).max().unwrap_or(1);
    let (x_min, x_max) = padded(0.0, longest.saturating_sub(1) as f64);
    let low = vectors
        .iter()
        .flat_map(|v| v.iter().copied())
        .fold(f64::INFINITY, f64::min);
    let high = vectors
        .iter()
        .flat_map(|v| v.iter().copied())
        .fold(f64::NEG_INFINITY, f64::max);
    let (y_min, y_max) = padded(low, high);

    let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(16)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
    for (index, vector) in vectors.iter().enumerate() {
        let color = Palette99::pick(index);
        chart.draw_series(LineSeries::new(
            vector.iter().enumerate().map(|(x, y)| (x as f64, *y)),
            &color,
        ))?;
    }
    root.present()?;
    Ok(())
}
