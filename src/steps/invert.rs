//! Invert each input matrix.
use super::{announce_run, raw, resolve_inputs, Step, StepContext};
use crate::array;
use crate::manifest::Manifest;
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const NAME: &str = "invert";
pub const INVERTED_DIR: &str = "inverted";

/// Load each upstream matrix, invert it, and save the inverse under the same
/// file name in `inverted/`.
#[derive(Debug)]
pub struct Invert {
    upstream: Vec<String>,
    manifest: Option<PathBuf>,
}

impl Invert {
    pub fn new() -> Self {
        Invert { upstream: vec![raw::NAME.to_string()], manifest: None }
    }

    /// Read inputs from an explicit manifest instead of the upstream default.
    pub fn from_manifest(path: PathBuf) -> Self {
        Invert { manifest: Some(path), ..Invert::new() }
    }
}

impl Default for Invert {
    fn default() -> Self {
        Invert::new()
    }
}

impl Step for Invert {
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
        let dir = ctx.staging.ensure_artifact_dir(NAME, INVERTED_DIR)?;
        let mut outputs = Vec::with_capacity(inputs.len());
        for input in &inputs {
            let path = invert_one(input, &dir)?;
            debug!(step = NAME, input = %input.display(), "matrix inverted");
            outputs.push(path);
        }
        Manifest::from_paths(outputs.iter().cloned())
            .save(&ctx.staging.manifest_path(NAME))?;
        Ok(outputs)
    }
}

/// Invert the matrix at `input` into `dir`, keeping the input's file name.
pub(crate) fn invert_one(input: &Path, dir: &Path) -> Result<PathBuf> {
    let matrix = array::load_matrix(input)?;
    if matrix.nrows() != matrix.ncols() {
        return Err(anyhow!(
            "matrix {} is not square ({}x{})",
            input.display(),
            matrix.nrows(),
            matrix.ncols()
        ));
    }
    let inverse = matrix
        .try_inverse()
        .ok_or_else(|| anyhow!("matrix {} is singular", input.display()))?;
    let file_name = input
        .file_name()
        .ok_or_else(|| anyhow!("input {} has no file name", input.display()))?;
    let path = dir.join(file_name);
    array::save_matrix(&path, &inverse)?;
    Ok(path)
}
