//! Workflow configuration helpers.
//!
//! The config file is optional: a missing `workflow_config.json` means
//! defaults, so a fresh checkout can run the pipeline without setup.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory when `--config` is absent.
pub const CONFIG_FILE_NAME: &str = "workflow_config.json";

/// Worker ceiling used when `--distributed` is requested without a config.
pub const DEFAULT_MAX_WORKERS: usize = 40;

fn default_staging_dir() -> PathBuf {
    PathBuf::from("local_staging")
}

fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

/// Project-level settings shared by every step.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Root of the per-step staging tree, relative to the working directory
    /// unless absolute.
    #[serde(default = "default_staging_dir")]
    pub local_staging_dir: PathBuf,

    /// Registry backing `push`/`pull`/`checkout`. Defaults to the user data
    /// dir when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_dir: Option<PathBuf>,

    /// Pool size ceiling for `--distributed` runs.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            local_staging_dir: default_staging_dir(),
            registry_dir: None,
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

/// Load the workflow config, falling back to defaults.
///
/// An explicit `--config` path must exist; the conventional file in the
/// working directory is used when present, skipped when not.
pub fn load_config(explicit: Option<&Path>) -> Result<WorkflowConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(anyhow!("config not found at {}", path.display()));
            }
            path.to_path_buf()
        }
        None => {
            let conventional = PathBuf::from(CONFIG_FILE_NAME);
            if !conventional.is_file() {
                return Ok(WorkflowConfig::default());
            }
            conventional
        }
    };
    let bytes = fs::read(&path).with_context(|| format!("read config {}", path.display()))?;
    let config: WorkflowConfig =
        serde_json::from_slice(&bytes).context("parse workflow config JSON")?;
    validate_config(&config)?;
    Ok(config)
}

/// Persist a config in a stable pretty-JSON form.
pub fn write_config(path: &Path, config: &WorkflowConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(config).context("serialize workflow config")?;
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Validate user-provided settings.
pub fn validate_config(config: &WorkflowConfig) -> Result<()> {
    if config.local_staging_dir.as_os_str().is_empty() {
        return Err(anyhow!("local_staging_dir must be non-empty"));
    }
    if config.max_workers == 0 {
        return Err(anyhow!("max_workers must be at least 1"));
    }
    Ok(())
}
