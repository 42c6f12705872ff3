//! Reduce each matrix to a sorted cumulative-sum vector.
use super::{announce_run, invert, resolve_inputs, Step, StepContext};
use crate::array;
use crate::manifest::Manifest;
use anyhow::{anyhow, Result};
use nalgebra::DVector;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const NAME: &str = "sum";
pub const VECTORS_DIR: &str = "vectors";

/// For each input matrix: take the column-wise maximum, sort it ascending,
/// then take the cumulative sum. Saves `vectors/vector_{i}.npy` per input.
#[derive(Debug)]
pub struct Sum {
    upstream: Vec<String>,
    manifest: Option<PathBuf>,
}

impl Sum {
    pub fn new() -> Self {
        Sum { upstream: vec![invert::NAME.to_string()], manifest: None }
    }

    /// Read inputs from an explicit manifest instead of the upstream default.
    pub fn from_manifest(path: PathBuf) -> Self {
        Sum { manifest: Some(path), ..Sum::new() }
    }
}

impl Default for Sum {
    fn default() -> Self {
        Sum::new()
    }
}

impl Step for Sum {
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
        let dir = ctx.staging.ensure_artifact_dir(NAME, VECTORS_DIR)?;
        let mut outputs = Vec::with_capacity(inputs.len());
        for (index, input) in inputs.iter().enumerate() {
            let vector = reduce_to_vector(input)?;
            let path = dir.join(array::vector_file_name(index));
            array::save_vector(&path, &vector)?;
            debug!(step = NAME, index, "vector saved");
            outputs.push(path);
        }
        Manifest::from_paths(outputs.iter().cloned())
            .save(&ctx.staging.manifest_path(NAME))?;
        Ok(outputs)
    }
}

/// The reduction itself: column maxima, sorted ascending, cumulatively summed.
pub(crate) fn reduce_to_vector(input: &Path) -> Result<DVector<f64>> {
    let matrix = array::load_matrix(input)?;
    if matrix.is_empty() {
        return Err(anyhow!(
            "matrix {} has no elements to reduce",
            input.display()
        ));
    }
    let mut maxima: Vec<f64> = matrix.column_iter().map(|column| column.max()).collect();
    maxima.sort_by(f64::total_cmp);
    let mut running = 0.0;
    for value in &mut maxima {
        running += *value;
        *value = running;
    }
    Ok(DVector::from_vec(maxima))
}
