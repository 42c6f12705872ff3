//! Generate random square matrices.
use super::{announce_run, Step, StepContext};
use crate::array;
use crate::manifest::Manifest;
use anyhow::Result;
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tracing::debug;

pub const NAME: &str = "raw";
pub const MATRICES_DIR: &str = "matrices";

/// Seed one RNG, draw `n` matrices of shape `m x m` with entries uniform in
/// [0, 1), and save them as `matrices/matrix_{i}.npy`.
#[derive(Debug, Default)]
pub struct Raw;

impl Raw {
    pub fn new() -> Self {
        Raw
    }
}

impl Step for Raw {
    fn name(&self) -> &str {
        NAME
    }

    fn upstream(&self) -> &[String] {
        &[]
    }

    fn run(&self, ctx: &StepContext, _inputs: Option<Vec<PathBuf>>) -> Result<Vec<PathBuf>> {
        announce_run(NAME, ctx);
        let dir = ctx.staging.ensure_artifact_dir(NAME, MATRICES_DIR)?;
        let mut rng = StdRng::seed_from_u64(ctx.params.seed);
        let mut outputs = Vec::with_capacity(ctx.params.n);
        for index in 0..ctx.params.n {
            let matrix =
                DMatrix::from_fn(ctx.params.m, ctx.params.m, |_, _| rng.gen::<f64>());
            let path = dir.join(array::matrix_file_name(index));
            array::save_matrix(&path, &matrix)?;
            debug!(step = NAME, index, "matrix saved");
            outputs.push(path);
        }
        Manifest::from_paths(outputs.iter().cloned())
            .save(&ctx.staging.manifest_path(NAME))?;
        Ok(outputs)
    }
}
