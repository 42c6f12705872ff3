//! Raw, fanned out over the executor.
use super::{announce_run, raw, Step, StepContext};
use crate::array;
use crate::manifest::Manifest;
use anyhow::Result;
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;

pub const NAME: &str = "mappedraw";

/// Same outputs as [`raw::Raw`], but each index is generated as an
/// independent job. Per-index determinism comes from seeding job `i`'s RNG
/// with `seed + i`, so results do not depend on worker scheduling.
#[derive(Debug, Default)]
pub struct MappedRaw;

impl MappedRaw {
    pub fn new() -> Self {
        MappedRaw
    }
}

impl Step for MappedRaw {
    fn name(&self) -> &str {
        NAME
    }

    fn upstream(&self) -> &[String] {
        &[]
    }

    fn run(&self, ctx: &StepContext, _inputs: Option<Vec<PathBuf>>) -> Result<Vec<PathBuf>> {
        announce_run(NAME, ctx);
        let dir = ctx.staging.ensure_artifact_dir(NAME, raw::MATRICES_DIR)?;
        let m = ctx.params.m;
        let seed = ctx.params.seed;
        let indices: Vec<usize> = (0..ctx.params.n).collect();
        let outputs = ctx.executor.map(indices, |index| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(index as u64));
            let matrix = DMatrix::from_fn(m, m, |_, _| rng.gen::<f64>());
            let path = dir.join(array::matrix_file_name(index));
            array::save_matrix(&path, &matrix)?;
            Ok(path)
        })?;
        Manifest::from_paths(outputs.iter().cloned())
            .save(&ctx.staging.manifest_path(NAME))?;
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::Executor;
    use crate::staging::StagingPaths;
    use crate::steps::{testing, RunParams};

    #[test]
    fn three_matrices_mean_three_manifest_rows() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let ctx = testing::context(dir.path());

        let outputs = MappedRaw::new().run(&ctx, None).expect("run mappedraw");

        assert_eq!(outputs.len(), 3);
        for (index, path) in outputs.iter().enumerate() {
            assert!(path.ends_with(format!("matrices/matrix_{index}.npy")));
        }
        let manifest = Manifest::load(&ctx.staging.manifest_path(NAME)).expect("load manifest");
        assert_eq!(manifest.len(), 3);
    }

    #[test]
    fn pool_and_serial_runs_agree() {
        let serial_dir = tempfile::tempdir().expect("create temp dir");
        let pool_dir = tempfile::tempdir().expect("create temp dir");
        let serial_ctx = testing::context(serial_dir.path());
        let pool_ctx = StepContext::new(
            StagingPaths::new(pool_dir.path().to_path_buf()),
            RunParams { n: 3, m: 4, seed: 7, ..RunParams::default() },
            Executor::pool(2).expect("build pool"),
        );

        let serial = MappedRaw::new().run(&serial_ctx, None).expect("serial run");
        let pooled = MappedRaw::new().run(&pool_ctx, None).expect("pooled run");

        for (a, b) in serial.iter().zip(&pooled) {
            let left = array::load_matrix(a).expect("load matrix");
            let right = array::load_matrix(b).expect("load matrix");
            assert_eq!(left, right);
        }
    }
}
