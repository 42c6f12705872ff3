//! Read-only inspector for staging trees, manifests, and array artifacts.
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use matrix_flow::array;
use matrix_flow::manifest::Manifest;
use matrix_flow::staging::{collect_files_recursive, MANIFEST_FILE_NAME};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "mflow-inspect",
    version,
    about = "Read-only inspector for matrix workflow artifacts"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a manifest's rows and whether each listed file exists
    Manifest(ManifestArgs),
    /// Print an array artifact's shape and value summary
    Array(ArrayArgs),
    /// Summarize every step directory under a staging root
    Staging(StagingArgs),
}

#[derive(Parser, Debug)]
struct ManifestArgs {
    /// Path to a manifest.csv
    path: PathBuf,
}

#[derive(Parser, Debug)]
struct ArrayArgs {
    /// Path to a .npy artifact
    path: PathBuf,
}

#[derive(Parser, Debug)]
struct StagingArgs {
    /// Staging root holding one directory per step
    root: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Manifest(args) => cmd_manifest(&args.path),
        Commands::Array(args) => cmd_array(&args.path),
        Commands::Staging(args) => cmd_staging(&args.root),
    }
}

fn cmd_manifest(path: &Path) -> Result<()> {
    let manifest = Manifest::load(path)?;
    let mut missing = 0usize;
    for (index, row) in manifest.rows().iter().enumerate() {
        let marker = if row.filepath.exists() {
            "ok"
        } else {
            missing += 1;
            "missing"
        };
        println!("{index:>4}  {marker:<7}  {}", row.filepath.display());
    }
    println!("{} rows, {} missing files", manifest.len(), missing);
    Ok(())
}

fn cmd_array(path: &Path) -> Result<()> {
    if let Ok(matrix) = array::load_matrix(path) {
        println!("matrix {}x{}", matrix.nrows(), matrix.ncols());
        print_stats(matrix.iter().copied());
        return Ok(());
    }
    let vector = array::load_vector(path)
        .with_context(|| format!("read {} as a matrix or a vector", path.display()))?;
    println!("vector of length {}", vector.len());
    print_stats(vector.iter().copied());
    Ok(())
}

fn cmd_staging(root: &Path) -> Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(root)
        .with_context(|| format!("read staging root {}", root.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .collect();
    entries.sort();

    for step_dir in entries {
        let name = step_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let manifest_path = step_dir.join(MANIFEST_FILE_NAME);
        let rows = if manifest_path.exists() {
            Manifest::load(&manifest_path)?.len().to_string()
        } else {
            "-".to_string()
        };
        let files = collect_files_recursive(&step_dir)?.len();
        println!("{name:<14} manifest rows: {rows:<5} files: {files}");
    }
    Ok(())
}

fn print_stats<I: Iterator<Item = f64>>(values: I) {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for value in values {
        count += 1;
        sum += value;
        min = min.min(value);
        max = max.max(value);
    }
    if count == 0 {
        println!("  empty");
        return;
    }
    println!(
        "  min {:.6}  max {:.6}  mean {:.6}",
        min,
        max,
        sum / count as f64
    );
}
