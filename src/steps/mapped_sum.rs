//! Sum, fanned out over the executor.
use super::{announce_run, mapped_invert, resolve_inputs, sum, Step, StepContext};
use crate::array;
use crate::manifest::Manifest;
use anyhow::Result;
use std::path::PathBuf;

pub const NAME: &str = "mappedsum";

/// Same reduction as [`sum::Sum`], one job per input, with the same
/// index-recovery convention as the other mapped steps. Outputs are named
/// `vectors/vector_{i}.npy` by the recovered index.
#[derive(Debug)]
pub struct MappedSum {
    upstream: Vec<String>,
    manifest: Option<PathBuf>,
}

impl MappedSum {
    pub fn new() -> Self {
        MappedSum { upstream: vec![mapped_invert::NAME.to_string()], manifest: None }
    }

    /// Read inputs from an explicit manifest instead of the upstream default.
    pub fn from_manifest(path: PathBuf) -> Self {
        MappedSum { manifest: Some(path), ..MappedSum::new() }
    }
}

impl Default for MappedSum {
    fn default() -> Self {
        MappedSum::new()
    }
}

impl Step for MappedSum {
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
        let dir = ctx.staging.ensure_artifact_dir(NAME, sum::VECTORS_DIR)?;
        let indexed = ctx.executor.map(inputs, |input| {
            let index = array::index_from_file_name(&input)?;
            let vector = sum::reduce_to_vector(&input)?;
            let path = dir.join(array::vector_file_name(index));
            array::save_vector(&path, &vector)?;
            Ok((index, path))
        })?;
        let manifest = Manifest::from_indexed(indexed)?;
        let outputs = manifest.paths();
        manifest.save(&ctx.staging.manifest_path(NAME))?;
        Ok(outputs)
    }
}
