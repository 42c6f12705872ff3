//! `.npy` persistence for the f64 matrices and vectors steps exchange.
use anyhow::{anyhow, Context, Result};
use nalgebra::{DMatrix, DVector};
use npyz::WriterBuilder;
use std::fs;
use std::path::Path;

/// Conventional file name for the matrix artifact at `index`.
pub fn matrix_file_name(index: usize) -> String {
    format!("matrix_{index}.npy")
}

/// Conventional file name for the vector artifact at `index`.
pub fn vector_file_name(index: usize) -> String {
    format!("vector_{index}.npy")
}

/// Recover the artifact index from a file name like `matrix_7.npy`.
///
/// The mapped steps rely on this after an unordered parallel map: the index
/// travels in the file name, not in completion order.
pub fn index_from_file_name(path: &Path) -> Result<usize> {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| anyhow!("artifact {} has no file name", path.display()))?;
    let (_, index) = stem.rsplit_once('_').ok_or_else(|| {
        anyhow!("artifact {} carries no `_<index>` suffix", path.display())
    })?;
    index.parse::<usize>().with_context(|| {
        format!("artifact {} carries a non-numeric index", path.display())
    })
}

/// Save a matrix in C (row-major) order.
pub fn save_matrix(path: &Path, matrix: &DMatrix<f64>) -> Result<()> {
    let mut values = Vec::with_capacity(matrix.nrows() * matrix.ncols());
    for row in matrix.row_iter() {
        values.extend(row.iter().copied());
    }
    write_npy(path, &[matrix.nrows() as u64, matrix.ncols() as u64], values)
}

/// Load a matrix, accepting either C or Fortran element order.
pub fn load_matrix(path: &Path) -> Result<DMatrix<f64>> {
    let (shape, order, data) = read_npy(path)?;
    if shape.len() != 2 {
        return Err(anyhow!(
            "expected a 2-d array in {}, found {}-d",
            path.display(),
            shape.len()
        ));
    }
    let (rows, cols) = (shape[0] as usize, shape[1] as usize);
    let matrix = match order {
        npyz::Order::C => DMatrix::from_row_slice(rows, cols, &data),
        npyz::Order::Fortran => DMatrix::from_column_slice(rows, cols, &data),
    };
    Ok(matrix)
}

/// Save a vector as a 1-d array.
pub fn save_vector(path: &Path, vector: &DVector<f64>) -> Result<()> {
    write_npy(path, &[vector.len() as u64], vector.iter().copied().collect())
}

/// Load a 1-d array.
pub fn load_vector(path: &Path) -> Result<DVector<f64>> {
    let (shape, _, data) = read_npy(path)?;
    if shape.len() != 1 {
        return Err(anyhow!(
            "expected a 1-d array in {}, found {}-d",
            path.display(),
            shape.len()
        ));
    }
    Ok(DVector::from_vec(data))
}

fn write_npy(path: &Path, shape: &[u64], values: Vec<f64>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let mut buffer = Vec::new();
    let mut writer = npyz::WriteOptions::new()
        .default_dtype()
        .shape(shape)
        .writer(&mut buffer)
        .begin_nd()
        .with_context(|| format!("write array {}", path.display()))?;
    writer
        .extend(values)
        .with_context(|| format!("write array {}", path.display()))?;
    writer
        .finish()
        .with_context(|| format!("write array {}", path.display()))?;
    fs::write(path, buffer).with_context(|| format!("write array {}", path.display()))?;
    Ok(())
}

fn read_npy(path: &Path) -> Result<(Vec<u64>, npyz::Order, Vec<f64>)> {
    let bytes = fs::read(path).with_context(|| format!("read array {}", path.display()))?;
    let npy = npyz::NpyFile::new(&bytes[..])
        .with_context(|| format!("parse array {}", path.display()))?;
    let shape = npy.shape().to_vec();
    let order = npy.order();
    let data: Vec<f64> = npy
        .into_vec()
        .with_context(|| format!("read array {}", path.display()))?;
    Ok((shape, order, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn matrix_round_trips_in_row_major_order() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("matrix_0.npy");
        let matrix = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        save_matrix(&path, &matrix).expect("save matrix");
        let loaded = load_matrix(&path).expect("load matrix");
        assert_eq!(loaded, matrix);
        assert_eq!(loaded[(0, 2)], 3.0);
        assert_eq!(loaded[(1, 0)], 4.0);
    }

    #[test]
    fn fortran_order_files_load_identically() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("matrix_f.npy");
        let matrix = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);

        // Write column-major by hand to exercise the Fortran branch.
        let mut buffer = Vec::new();
        let mut writer = npyz::WriteOptions::new()
            .default_dtype()
            .order(npyz::Order::Fortran)
            .shape(&[2, 2])
            .writer(&mut buffer)
            .begin_nd()
            .expect("begin npy");
        writer
            .extend(matrix.as_slice().iter().copied())
            .expect("write values");
        writer.finish().expect("finish npy");
        std::fs::write(&path, buffer).expect("write file");

        let loaded = load_matrix(&path).expect("load matrix");
        assert_eq!(loaded, matrix);
    }

    #[test]
    fn vector_round_trips() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("vector_0.npy");
        let vector = DVector::from_vec(vec![0.5, 1.5, 2.5]);

        save_vector(&path, &vector).expect("save vector");
        let loaded = load_vector(&path).expect("load vector");
        assert_eq!(loaded, vector);
    }

    #[test]
    fn vector_loader_rejects_matrices() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("matrix_0.npy");
        save_matrix(&path, &DMatrix::from_element(2, 2, 1.0)).expect("save matrix");

        let err = load_vector(&path).expect_err("matrix is not a vector");
        assert!(err.to_string().contains("1-d"));
    }

    #[test]
    fn file_name_index_parses_and_rejects() {
        assert_eq!(
            index_from_file_name(&PathBuf::from("matrices/matrix_3.npy")).expect("index"),
            3
        );
        assert_eq!(
            index_from_file_name(&PathBuf::from("vector_12.npy")).expect("index"),
            12
        );
        assert!(index_from_file_name(&PathBuf::from("plot.png")).is_err());
        assert!(index_from_file_name(&PathBuf::from("matrix_x.npy")).is_err());
    }
}
