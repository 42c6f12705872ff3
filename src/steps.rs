//! The step convention: named, stateless units with declared upstreams.
//!
//! A step resolves its inputs, does one numeric operation, writes artifacts
//! into its own staging subdirectory, and records them in `manifest.csv`.
//! Everything else (ordering, data verbs) is shared machinery.
pub mod fancyplot;
pub mod invert;
pub mod mapped_invert;
pub mod mapped_raw;
pub mod mapped_sum;
pub mod plot;
pub mod raw;
pub mod sum;

pub use fancyplot::Fancyplot;
pub use invert::Invert;
pub use mapped_invert::MappedInvert;
pub use mapped_raw::MappedRaw;
pub use mapped_sum::MappedSum;
pub use plot::Plot;
pub use raw::Raw;
pub use sum::Sum;

use crate::flow::Executor;
use crate::manifest::{self, FILEPATH_COLUMN};
use crate::staging::{self, Registry, StagingPaths};
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_N: usize = 100;
pub const DEFAULT_M: usize = 100;
pub const DEFAULT_SEED: u64 = 1;

/// Effective run parameters, shared by every step in a run.
#[derive(Debug, Clone)]
pub struct RunParams {
    /// How many matrices the generator steps produce.
    pub n: usize,
    /// Square matrix dimension.
    pub m: usize,
    /// Base RNG seed.
    pub seed: u64,
    /// Manifest column the consumer steps read input paths from.
    pub filepath_column: String,
}

impl Default for RunParams {
    fn default() -> Self {
        RunParams {
            n: DEFAULT_N,
            m: DEFAULT_M,
            seed: DEFAULT_SEED,
            filepath_column: FILEPATH_COLUMN.to_string(),
        }
    }
}

/// Everything a step needs at run time.
pub struct StepContext {
    pub staging: StagingPaths,
    pub params: RunParams,
    pub executor: Executor,
}

impl StepContext {
    pub fn new(staging: StagingPaths, params: RunParams, executor: Executor) -> Self {
        StepContext { staging, params, executor }
    }
}

/// A named unit of work with declared direct upstreams.
///
/// `run` takes the upstream's output paths when the flow provides them and
/// falls back to manifests on disk when invoked solo. The data verbs are
/// shared: they only need the step's name and upstream list.
pub trait Step: std::fmt::Debug {
    fn name(&self) -> &str;

    /// Names of the steps whose output this step consumes.
    fn upstream(&self) -> &[String];

    /// Produce this step's artifacts and return their paths in index order.
    fn run(&self, ctx: &StepContext, inputs: Option<Vec<PathBuf>>) -> Result<Vec<PathBuf>>;

    /// Publish this step's staging directory into the registry.
    fn push(&self, ctx: &StepContext, registry: &Registry) -> Result<Vec<PathBuf>> {
        staging::push_step(&ctx.staging, registry, self.name())
    }

    /// Materialize this step's registry copy into local staging.
    fn checkout(&self, ctx: &StepContext, registry: &Registry) -> Result<Vec<PathBuf>> {
        staging::checkout_step(&ctx.staging, registry, self.name())
    }

    /// Check out every direct upstream, which is all a solo run needs.
    fn pull(&self, ctx: &StepContext, registry: &Registry) -> Result<Vec<PathBuf>> {
        let mut fetched = Vec::new();
        for upstream in self.upstream() {
            fetched.extend(staging::checkout_step(&ctx.staging, registry, upstream)?);
        }
        Ok(fetched)
    }

    /// Delete this step's local staging directory.
    fn clean(&self, ctx: &StepContext) -> Result<()> {
        staging::clean_step(&ctx.staging, self.name())
    }
}

/// CLI spelling of a step name (`mappedraw` runs as `mflow step mapped-raw`).
pub fn cli_name(step: &str) -> String {
    match step {
        mapped_raw::NAME => "mapped-raw".to_string(),
        mapped_invert::NAME => "mapped-invert".to_string(),
        mapped_sum::NAME => "mapped-sum".to_string(),
        other => other.to_string(),
    }
}

/// Log the effective run parameters once, as each step starts.
pub(crate) fn announce_run(step: &str, ctx: &StepContext) {
    info!(
        step,
        staging = %ctx.staging.root().display(),
        executor = %ctx.executor.describe(),
        n = ctx.params.n,
        m = ctx.params.m,
        seed = ctx.params.seed,
        filepath_column = %ctx.params.filepath_column,
        "step starting"
    );
}

/// Shared input resolution for the consumer steps.
///
/// Priority: paths handed over by the flow, then an explicit manifest, then
/// the default upstream's `manifest.csv` in local staging.
pub(crate) fn resolve_inputs(
    ctx: &StepContext,
    inputs: Option<Vec<PathBuf>>,
    manifest_override: Option<&Path>,
    upstream: &str,
) -> Result<Vec<PathBuf>> {
    if let Some(paths) = inputs {
        return Ok(paths);
    }
    if let Some(path) = manifest_override {
        return manifest::load_column(path, &ctx.params.filepath_column);
    }
    let default_path = ctx.staging.manifest_path(upstream);
    if !default_path.exists() {
        return Err(anyhow!(
            "no manifest at {} (run `mflow step {}` first)",
            default_path.display(),
            cli_name(upstream)
        ));
    }
    manifest::load_column(&default_path, &ctx.params.filepath_column)
}
