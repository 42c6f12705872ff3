//! End-to-end flow runs against a scratch staging tree.
mod common;

use common::{pooled_context, tiny_context};
use matrix_flow::staging::MANIFEST_FILE_NAME;
use matrix_flow::{All, Manifest};

#[test]
fn the_full_flow_stages_every_step() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let ctx = tiny_context(dir.path(), 3, 4, 11);

    let outputs = All::flow(false).run(&ctx, false).expect("run flow");

    for (step, rows) in [
        ("raw", 3),
        ("invert", 3),
        ("sum", 3),
        ("plot", 1),
        ("fancyplot", 1),
    ] {
        let manifest_path = dir.path().join(step).join(MANIFEST_FILE_NAME);
        let manifest = Manifest::load(&manifest_path).expect("load manifest");
        assert_eq!(manifest.len(), rows, "manifest rows for step `{step}`");
        assert_eq!(outputs[step].len(), rows, "returned paths for step `{step}`");
        for path in manifest.paths() {
            assert!(path.exists(), "artifact {} should exist", path.display());
        }
    }
    assert!(dir.path().join("plot/plots/plot.png").exists());
    assert!(dir.path().join("fancyplot/fancyplots/plot_fancy.png").exists());
}

#[test]
fn the_mapped_flow_stages_the_same_shape_under_a_pool() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let ctx = pooled_context(dir.path(), 4, 3, 2);

    let outputs = All::flow(true).run(&ctx, false).expect("run mapped flow");

    for (step, rows) in [("mappedraw", 4), ("mappedinvert", 4), ("mappedsum", 4)] {
        let manifest_path = dir.path().join(step).join(MANIFEST_FILE_NAME);
        let manifest = Manifest::load(&manifest_path).expect("load manifest");
        assert_eq!(manifest.len(), rows, "manifest rows for step `{step}`");
        // Row position matches the index embedded in each file name.
        for (index, path) in manifest.paths().iter().enumerate() {
            let name = path.file_name().expect("file name").to_string_lossy();
            assert!(
                name.ends_with(&format!("_{index}.npy")),
                "row {index} holds {name}"
            );
        }
    }
    assert!(outputs["plot"][0].exists());
    assert!(outputs["fancyplot"][0].exists());
}

#[test]
fn rerunning_a_flow_is_idempotent_over_staging() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let ctx = tiny_context(dir.path(), 2, 3, 5);

    All::flow(false).run(&ctx, false).expect("first run");
    let first = Manifest::load(&dir.path().join("raw").join(MANIFEST_FILE_NAME))
        .expect("load manifest");
    All::flow(false).run(&ctx, true).expect("second run with clean");
    let second = Manifest::load(&dir.path().join("raw").join(MANIFEST_FILE_NAME))
        .expect("load manifest");

    assert_eq!(first.paths(), second.paths());
}
