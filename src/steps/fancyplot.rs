//! Gradient-filled variant of the vector chart.
use super::plot::{load_vectors, padded};
use super::{announce_run, resolve_inputs, sum, Step, StepContext};
use crate::manifest::Manifest;
use anyhow::{anyhow, Result};
use nalgebra::DVector;
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const NAME: &str = "fancyplot";
pub const FANCYPLOTS_DIR: &str = "fancyplots";
pub const PLOT_FILE_NAME: &str = "plot_fancy.png";

const WIDTH: u32 = 1024;
const HEIGHT: u32 = 768;
// Vertical slices approximating the continuous fade under each curve.
const FILL_BANDS: usize = 16;

/// Draw every curve with a vertical gradient fill beneath it, rows ordered
/// ascending by their final element, line colors from the classic gnuplot
/// palette. Saves `fancyplots/plot_fancy.png` and a one-row manifest.
#[derive(Debug)]
pub struct Fancyplot {
    upstream: Vec<String>,
    manifest: Option<PathBuf>,
}

impl Fancyplot {
    pub fn new() -> Self {
        Fancyplot::with_upstream(sum::NAME)
    }

    /// Point the step at a different vector producer (the mapped chain).
    pub fn with_upstream(upstream: &str) -> Self {
        Fancyplot { upstream: vec![upstream.to_string()], manifest: None }
    }

    /// Read inputs from an explicit manifest instead of the upstream default.
    pub fn from_manifest(path: PathBuf) -> Self {
        Fancyplot { manifest: Some(path), ..Fancyplot::new() }
    }
}

impl Default for Fancyplot {
    fn default() -> Self {
        Fancyplot::new()
    }
}

impl Step for Fancyplot {
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
        let mut rows = load_vectors(&inputs)?;
        let width = rows[0].len();
        for (path, row) in inputs.iter().zip(&rows) {
            if row.len() != width {
                return Err(anyhow!(
                    "vector {} has length {}, expected {} like the first input",
                    path.display(),
                    row.len(),
                    width
                ));
            }
        }
        sort_rows_by_final(&mut rows);

        let dir = ctx.staging.ensure_artifact_dir(NAME, FANCYPLOTS_DIR)?;
        let path = dir.join(PLOT_FILE_NAME);
        draw(&path, &rows)?;
        debug!(step = NAME, curves = rows.len(), "chart saved");
        Manifest::from_paths([path.clone()]).save(&ctx.staging.manifest_path(NAME))?;
        Ok(vec![path])
    }
}

/// Reorder curves ascending by their final element.
pub(crate) fn sort_rows_by_final(rows: &mut [DVector<f64>]) {
    rows.sort_by(|a, b| f64::total_cmp(&a[a.len() - 1], &b[b.len() - 1]));
}

/// Classic gnuplot palette: r = sqrt(t), g = t^3, b = sin(2*pi*t).
pub(crate) fn gnuplot_rgb(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let r = t.sqrt();
    let g = t * t * t;
    let b = (std::f64::consts::TAU * t).sin().max(0.0);
    RGBColor((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8)
}

fn draw(path: &Path, rows: &[DVector<f64>]) -> Result<()> {
    let width = rows[0].len();
    let (x_min, x_max) = padded(0.0, width.saturating_sub(1) as f64);
    let low = rows
        .iter()
        .flat_map(|row| row.iter().copied())
        .fold(f64::INFINITY, f64::min);
    let high = rows
        .iter()
        .flat_map(|row| row.iter().copied())
        .fold(f64::NEG_INFINITY, f64::max);
    let (y_min, y_max) = padded(low, high);
    let global_max = high.abs().max(f64::MIN_POSITIVE);

    let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(16)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    for row in rows {
        let curve: Vec<(f64, f64)> = row
            .iter()
            .enumerate()
            .map(|(x, y)| (x as f64, *y))
            .collect();
        let curve_max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let color = gnuplot_rgb(curve_max / global_max);
        for band in 0..FILL_BANDS {
            let lower = band as f64 / FILL_BANDS as f64;
            let upper = (band + 1) as f64 / FILL_BANDS as f64;
            let mut points: Vec<(f64, f64)> = curve
                .iter()
                .map(|&(x, y)| (x, y_min + upper * (y - y_min)))
                .collect();
            points.extend(
                curve
                    .iter()
                    .rev()
                    .map(|&(x, y)| (x, y_min + lower * (y - y_min))),
            );
            let alpha = 0.05 + 0.30 * upper;
            chart.draw_series(std::iter::once(Polygon::new(points, color.mix(alpha).filled())))?;
        }
        chart.draw_series(LineSeries::new(curve, color.stroke_width(2)))?;
    }
    root.present()?;
    Ok(())
}
