//! Shared test infrastructure for integration tests.
// Each integration test target compiles this module separately and uses a
// subset of the helpers.
#![allow(dead_code)]

use matrix_flow::flow::Executor;
use matrix_flow::{RunParams, StagingPaths, StepContext};
use std::path::Path;
use std::process::{Command, Output};

/// Path to the compiled `mflow` binary.
pub fn mflow_bin() -> &'static str {
    env!("CARGO_BIN_EXE_mflow")
}

/// Run `mflow` with `args` from `cwd` and capture its output.
pub fn run_mflow(cwd: &Path, args: &[&str]) -> Output {
    Command::new(mflow_bin())
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("run mflow")
}

pub fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Write a workflow_config.json pointing staging and registry into the
/// test's scratch space.
pub fn write_config(path: &Path, staging: &Path, registry: &Path, max_workers: usize) {
    let config = serde_json::json!({
        "local_staging_dir": staging,
        "registry_dir": registry,
        "max_workers": max_workers,
    });
    std::fs::write(
        path,
        serde_json::to_string_pretty(&config).expect("serialize config"),
    )
    .expect("write config");
}

/// Serial step context over `root` with small, fast parameters.
pub fn tiny_context(root: &Path, n: usize, m: usize, seed: u64) -> StepContext {
    let params = RunParams { n, m, seed, ..RunParams::default() };
    StepContext::new(
        StagingPaths::new(root.to_path_buf()),
        params,
        Executor::serial(),
    )
}

/// Like [`tiny_context`] but backed by a two-worker pool.
pub fn pooled_context(root: &Path, n: usize, m: usize, seed: u64) -> StepContext {
    let params = RunParams { n, m, seed, ..RunParams::default() };
    StepContext::new(
        StagingPaths::new(root.to_path_buf()),
        params,
        Executor::pool(2).expect("build pool"),
    )
}
