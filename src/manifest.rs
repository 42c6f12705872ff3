//! CSV manifests indexing the artifacts a step produced.
//!
//! One row per artifact, one `filepath` column; row position matches the
//! index embedded in the artifact file name.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Column read by downstream steps unless a run overrides it.
pub const FILEPATH_COLUMN: &str = "filepath";

/// A single manifest entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestRow {
    pub filepath: PathBuf,
}

/// The tabular index a step writes after it finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    rows: Vec<ManifestRow>,
}

impl Manifest {
    /// Build a manifest from paths in row order.
    pub fn from_paths<I>(paths: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        Self {
            rows: paths
                .into_iter()
                .map(|filepath| ManifestRow { filepath })
                .collect(),
        }
    }

    /// Build a manifest from unordered `(index, path)` pairs.
    ///
    /// The mapped steps gather results in completion order; the index parsed
    /// from each artifact file name decides the row position. The index set
    /// must be exactly `0..len`.
    pub fn from_indexed<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, PathBuf)>,
    {
        let entries: Vec<(usize, PathBuf)> = entries.into_iter().collect();
        let len = entries.len();
        let mut slots: Vec<Option<PathBuf>> = vec![None; len];
        for (index, path) in entries {
            if index >= len {
                return Err(anyhow!(
                    "artifact index {index} out of range for a manifest of {len} rows"
                ));
            }
            if slots[index].is_some() {
                return Err(anyhow!("duplicate artifact index {index}"));
            }
            slots[index] = Some(path);
        }
        let rows = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.map(|filepath| ManifestRow { filepath })
                    .ok_or_else(|| anyhow!("no artifact carried index {index}"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rows })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the manifest has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in manifest order.
    pub fn rows(&self) -> &[ManifestRow] {
        &self.rows
    }

    /// Artifact paths in manifest order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.rows.iter().map(|row| row.filepath.clone()).collect()
    }

    /// Load a manifest reading the default `filepath` column.
    pub fn load(path: &Path) -> Result<Self> {
        let paths = load_column(path, FILEPATH_COLUMN)?;
        Ok(Self::from_paths(paths))
    }

    /// Write the manifest as CSV, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("write manifest {}", path.display()))?;
        // `serialize` only emits the header with the first row; a zero-row
        // manifest still needs one to load back.
        if self.rows.is_empty() {
            writer
                .write_record([FILEPATH_COLUMN])
                .with_context(|| format!("write manifest {}", path.display()))?;
        }
        for row in &self.rows {
            writer
                .serialize(row)
                .with_context(|| format!("write manifest {}", path.display()))?;
        }
        writer
            .flush()
            .with_context(|| format!("write manifest {}", path.display()))?;
        Ok(())
    }
}

/// Read one column of a manifest CSV as paths.
///
/// Used when a run points a step at a manifest whose path column is not the
/// conventional `filepath`.
pub fn load_column(path: &Path, column: &str) -> Result<Vec<PathBuf>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("read manifest {}", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("read manifest {}", path.display()))?;
    let position = headers
        .iter()
        .position(|header| header == column)
        .ok_or_else(|| {
            anyhow!(
                "manifest {} has no `{column}` column (columns: {})",
                path.display(),
                headers.iter().collect::<Vec<_>>().join(", ")
            )
        })?;

    let mut paths = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("read manifest {}", path.display()))?;
        let field = record.get(position).unwrap_or("");
        if field.is_empty() {
            return Err(anyhow!(
                "manifest {} row {row} has an empty `{column}` value",
                path.display()
            ));
        }
        paths.push(PathBuf::from(field));
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_csv() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("manifest.csv");
        let manifest = Manifest::from_paths(vec![
            PathBuf::from("matrices/matrix_0.npy"),
            PathBuf::from("matrices/matrix_1.npy"),
        ]);

        manifest.save(&path).expect("save manifest");
        let loaded = Manifest::load(&path).expect("load manifest");
        assert_eq!(loaded, manifest);
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn an_empty_manifest_round_trips() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("manifest.csv");

        Manifest::from_paths(Vec::<PathBuf>::new())
            .save(&path)
            .expect("save manifest");

        let contents = std::fs::read_to_string(&path).expect("read manifest");
        assert!(contents.starts_with(FILEPATH_COLUMN));
        let loaded = Manifest::load(&path).expect("load manifest");
        assert!(loaded.is_empty());
    }

    #[test]
    fn reads_a_caller_chosen_column() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("manifest.csv");
        std::fs::write(&path, "id,source_path\n0,a.npy\n1,b.npy\n").expect("write csv");

        let paths = load_column(&path, "source_path").expect("load column");
        assert_eq!(paths, vec![PathBuf::from("a.npy"), PathBuf::from("b.npy")]);
    }

    #[test]
    fn missing_column_names_the_available_ones() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("manifest.csv");
        std::fs::write(&path, "id,source_path\n0,a.npy\n").expect("write csv");

        let err = load_column(&path, "filepath").expect_err("missing column");
        let message = err.to_string();
        assert!(message.contains("no `filepath` column"));
        assert!(message.contains("source_path"));
    }

    #[test]
    fn indexed_rows_land_by_index_not_arrival_order() {
        let manifest = Manifest::from_indexed(vec![
            (2, PathBuf::from("vector_2.npy")),
            (0, PathBuf::from("vector_0.npy")),
            (1, PathBuf::from("vector_1.npy")),
        ])
        .expect("build manifest");

        let paths = manifest.paths();
        assert_eq!(paths[0], PathBuf::from("vector_0.npy"));
        assert_eq!(paths[2], PathBuf::from("vector_2.npy"));
    }

    #[test]
    fn indexed_rows_reject_gaps_and_duplicates() {
        let gap = Manifest::from_indexed(vec![
            (0, PathBuf::from("vector_0.npy")),
            (2, PathBuf::from("vector_2.npy")),
        ]);
        assert!(gap.is_err());

        let duplicate = Manifest::from_indexed(vec![
            (0, PathBuf::from("vector_0.npy")),
            (0, PathBuf::from("vector_0_again.npy")),
        ]);
        assert!(duplicate.is_err());
    }

    #[test]
    fn missing_manifest_is_a_contextual_error() {
        let err = Manifest::load(Path::new("/nonexistent/manifest.csv")).expect_err("missing");
        assert!(err.to_string().contains("manifest"));
    }
}
