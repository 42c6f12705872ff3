//! Invert, fanned out over the executor.
use super::{announce_run, invert, mapped_raw, resolve_inputs, Step, StepContext};
use crate::array;
use crate::manifest::Manifest;
use anyhow::Result;
use std::path::PathBuf;

pub const NAME: &str = "mappedinvert";

/// Same operation as [`invert::Invert`], one job per input. Jobs finish in
/// arbitrary order, so each returns the index parsed from its input file
/// name and the manifest row is placed by that index.
#[derive(Debug)]
pub struct MappedInvert {
    upstream: Vec<String>,
    manifest: Option<PathBuf>,
}

impl MappedInvert {
    pub fn new() -> Self {
        MappedInvert { upstream: vec![mapped_raw::NAME.to_string()], manifest: None }
    }

    /// Read inputs from an explicit manifest instead of the upstream default.
    pub fn from_manifest(path: PathBuf) -> Self {
        MappedInvert { manifest: Some(path), ..MappedInvert::new() }
    }
}

impl Default for MappedInvert {
    fn default() -> Self {
        MappedInvert::new()
    }
}

impl Step for MappedInvert {
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
        let dir = ctx.staging.ensure_artifact_dir(NAME, invert::INVERTED_DIR)?;
        let indexed = ctx.executor.map(inputs, |input| {
            let index = array::index_from_file_name(&input)?;
            let path = invert::invert_one(&input, &dir)?;
            Ok((index, path))
        })?;
        let manifest = Manifest::from_indexed(indexed)?;
        let outputs = manifest.paths();
        manifest.save(&ctx.staging.manifest_path(NAME))?;
        Ok(outputs)
    }
}
