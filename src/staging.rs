//! Staging-tree layout and the registry behind the data-management verbs.
//!
//! Centralizing path construction keeps file access consistent across steps
//! and prevents drift when the layout evolves.
use crate::config::WorkflowConfig;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Per-step manifest file name.
pub const MANIFEST_FILE_NAME: &str = "manifest.csv";

/// Typed paths into the local staging tree.
#[derive(Debug, Clone)]
pub struct StagingPaths {
    root: PathBuf,
}

impl StagingPaths {
    /// Create a path helper rooted at the staging root.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Return the staging root used for path derivation.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return `local_staging/<step>/`.
    pub fn step_dir(&self, step: &str) -> PathBuf {
        self.root.join(step)
    }

    /// Return `local_staging/<step>/manifest.csv`.
    pub fn manifest_path(&self, step: &str) -> PathBuf {
        self.step_dir(step).join(MANIFEST_FILE_NAME)
    }

    /// Return the artifact subdirectory `local_staging/<step>/<sub>/`.
    pub fn artifact_dir(&self, step: &str, sub: &str) -> PathBuf {
        self.step_dir(step).join(sub)
    }

    /// Create the artifact subdirectory for a step and return it.
    pub fn ensure_artifact_dir(&self, step: &str, sub: &str) -> Result<PathBuf> {
        let dir = self.artifact_dir(step, sub);
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        Ok(dir)
    }
}

/// The directory registry backing `push`, `checkout`, and `pull`.
#[derive(Debug, Clone)]
pub struct Registry {
    root: PathBuf,
}

impl Registry {
    /// Create a registry handle rooted at an explicit directory.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Resolve the registry root from config, defaulting to the user data dir.
    pub fn resolve(config: &WorkflowConfig) -> Result<Self> {
        if let Some(dir) = &config.registry_dir {
            return Ok(Self::new(dir.clone()));
        }
        let data_dir = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| anyhow!("cannot determine a registry directory; set registry_dir"))?;
        Ok(Self::new(data_dir.join("mflow").join("registry")))
    }

    /// Return the registry root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the registry copy of a step's staging directory.
    pub fn step_dir(&self, step: &str) -> PathBuf {
        self.root.join(step)
    }

    fn backup_dir(&self, step: &str) -> PathBuf {
        self.root.join(".backup").join(step)
    }
}

/// Publish a step's staging directory into the registry.
///
/// Files are written via temp + rename; registry files being overwritten are
/// moved into a backup dir first and restored if any later write fails, so a
/// failed push leaves the registry as it was. Returns the published paths; a
/// step with no staging directory publishes nothing.
pub fn push_step(staging: &StagingPaths, registry: &Registry, step: &str) -> Result<Vec<PathBuf>> {
    let source_root = staging.step_dir(step);
    if !source_root.exists() {
        return Ok(Vec::new());
    }
    let files = collect_files_recursive(&source_root)?;
    let dest_root = registry.step_dir(step);
    let backup_root = registry.backup_dir(step);
    if backup_root.exists() {
        fs::remove_dir_all(&backup_root)
            .with_context(|| format!("clear stale backup {}", backup_root.display()))?;
    }
    fs::create_dir_all(&backup_root)
        .with_context(|| format!("create {}", backup_root.display()))?;

    let mut published = Vec::new();
    let mut backups: Vec<(PathBuf, PathBuf)> = Vec::new();
    let mut created: Vec<PathBuf> = Vec::new();
    for file in files {
        let rel = file
            .strip_prefix(&source_root)
            .context("strip staging prefix")?;
        let dest = dest_root.join(rel);
        if dest.exists() {
            let backup = backup_root.join(rel);
            if let Some(parent) = backup.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
            fs::rename(&dest, &backup)
                .or_else(|_| fs::copy(&dest, &backup).map(|_| ()))
                .with_context(|| format!("backup {}", dest.display()))?;
            backups.push((dest.clone(), backup));
        } else {
            created.push(dest.clone());
        }

        if let Err(err) = publish_file(&file, &dest) {
            rollback_push(&published, &backups, &created)?;
            return Err(err);
        }
        published.push(dest);
    }
    Ok(published)
}

/// Materialize a step's registry copy into local staging, overwriting any
/// staged files of the same name.
pub fn checkout_step(
    staging: &StagingPaths,
    registry: &Registry,
    step: &str,
) -> Result<Vec<PathBuf>> {
    let source_root = registry.step_dir(step);
    if !source_root.exists() {
        return Err(anyhow!(
            "no registry data for step `{step}` at {} (run `mflow push` after producing it)",
            source_root.display()
        ));
    }
    let files = collect_files_recursive(&source_root)?;
    let dest_root = staging.step_dir(step);
    let mut restored = Vec::new();
    for file in files {
        let rel = file
            .strip_prefix(&source_root)
            .context("strip registry prefix")?;
        let dest = dest_root.join(rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        fs::copy(&file, &dest).with_context(|| format!("checkout {}", dest.display()))?;
        restored.push(dest);
    }
    Ok(restored)
}

/// Delete a step's local staging directory. Idempotent.
pub fn clean_step(staging: &StagingPaths, step: &str) -> Result<()> {
    let dir = staging.step_dir(step);
    if dir.exists() {
        fs::remove_dir_all(&dir).with_context(|| format!("remove {}", dir.display()))?;
    }
    Ok(())
}

/// Collect every file beneath `root`, sorted for stable publish order.
pub fn collect_files_recursive(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !root.exists() {
        return Ok(files);
    }
    for entry in fs::read_dir(root).with_context(|| format!("read {}", root.display()))? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            files.extend(collect_files_recursive(&path)?);
        } else if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn publish_file(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let file_name = dest
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("staged");
    let tmp_path = dest
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!(".{file_name}.tmp"));
    fs::copy(source, &tmp_path).with_context(|| format!("publish {}", dest.display()))?;
    fs::rename(&tmp_path, dest).with_context(|| format!("publish {}", dest.display()))?;
    Ok(())
}

fn rollback_push(
    published: &[PathBuf],
    backups: &[(PathBuf, PathBuf)],
    created: &[PathBuf],
) -> Result<()> {
    for path in published {
        if path.exists() {
            let _ = fs::remove_file(path);
        }
    }
    for path in created {
        if path.exists() {
            let _ = fs::remove_file(path);
        }
    }
    for (dest, backup) in backups {
        if let Some(parent) = dest.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let _ = fs::rename(backup, dest).or_else(|_| fs::copy(backup, dest).map(|_| ()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch() -> (tempfile::TempDir, StagingPaths, Registry) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let staging = StagingPaths::new(dir.path().join("local_staging"));
        let registry = Registry::new(dir.path().join("registry"));
        (dir, staging, registry)
    }

    fn write_file(path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, contents).expect("write file");
    }

    #[test]
    fn layout_paths_are_stable() {
        let staging = StagingPaths::new(PathBuf::from("local_staging"));
        assert_eq!(
            staging.manifest_path("raw"),
            PathBuf::from("local_staging/raw/manifest.csv")
        );
        assert_eq!(
            staging.artifact_dir("raw", "matrices"),
            PathBuf::from("local_staging/raw/matrices")
        );
    }

    #[test]
    fn push_then_checkout_round_trips() {
        let (_dir, staging, registry) = scratch();
        write_file(
            &staging.manifest_path("raw"),
            "filepath\nmatrices/matrix_0.npy\n",
        );
        write_file(
            &staging.artifact_dir("raw", "matrices").join("matrix_0.npy"),
            "bytes",
        );

        let published = push_step(&staging, &registry, "raw").expect("push raw");
        assert_eq!(published.len(), 2);
        assert!(registry.step_dir("raw").join(MANIFEST_FILE_NAME).is_file());

        clean_step(&staging, "raw").expect("clean raw");
        assert!(!staging.step_dir("raw").exists());

        let restored = checkout_step(&staging, &registry, "raw").expect("checkout raw");
        assert_eq!(restored.len(), 2);
        let manifest = fs::read_to_string(staging.manifest_path("raw")).expect("read manifest");
        assert!(manifest.contains("matrix_0.npy"));
    }

    #[test]
    fn push_backs_up_overwritten_registry_files() {
        let (_dir, staging, registry) = scratch();
        write_file(&staging.manifest_path("raw"), "filepath\nnew\n");
        write_file(
            &registry.step_dir("raw").join(MANIFEST_FILE_NAME),
            "filepath\nold\n",
        );

        push_step(&staging, &registry, "raw").expect("push raw");

        let published =
            fs::read_to_string(registry.step_dir("raw").join(MANIFEST_FILE_NAME)).expect("read");
        assert!(published.contains("new"));
        let backup = registry.backup_dir("raw").join(MANIFEST_FILE_NAME);
        let backed_up = fs::read_to_string(backup).expect("read backup");
        assert!(backed_up.contains("old"));
    }

    #[test]
    fn push_without_staging_publishes_nothing() {
        let (_dir, staging, registry) = scratch();
        let published = push_step(&staging, &registry, "raw").expect("push raw");
        assert!(published.is_empty());
    }

    #[test]
    fn checkout_without_registry_names_the_fix() {
        let (_dir, staging, registry) = scratch();
        let err = checkout_step(&staging, &registry, "raw").expect_err("missing registry");
        assert!(err.to_string().contains("mflow push"));
    }
}
