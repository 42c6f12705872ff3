//! CLI argument parsing for the matrix workflow.
//!
//! The CLI is intentionally thin: every subcommand maps onto one library
//! call, so the same steps can be driven from code without going through
//! argument parsing.
use crate::manifest::FILEPATH_COLUMN;
use crate::steps::{DEFAULT_M, DEFAULT_N, DEFAULT_SEED};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint for the workflow.
///
/// Keeping a single `RootArgs` type makes command routing obvious and avoids
/// hidden defaults in subcommand constructors.
#[derive(Parser, Debug)]
#[command(
    name = "mflow",
    version,
    about = "Step-based matrix workflow with staged artifacts and manifest tracking",
    after_help = "Commands:\n  run                     Run the whole flow (--mapped for the worker-pool chain)\n  push [--step NAME]      Publish staged artifacts into the registry\n  checkout [--step NAME]  Materialize registry artifacts into local staging\n  pull [--step NAME]      Check out each step's upstream artifacts\n  clean [--step NAME]     Delete local staging\n  step <name>             Run a single step solo\n\nExamples:\n  mflow run --debug\n  mflow run --mapped --distributed --n 500\n  mflow step raw --n 10 --m 16 --seed 3\n  mflow step sum --matrices local_staging/invert/manifest.csv\n  mflow push --step raw\n  mflow checkout",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level workflow commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Run(RunArgs),
    Pull(DataArgs),
    Checkout(DataArgs),
    Push(DataArgs),
    Clean(DataArgs),
    Step(StepArgs),
}

/// Run command inputs for the whole flow.
#[derive(Parser, Debug)]
#[command(about = "Run the full flow in dependency order")]
pub struct RunArgs {
    /// Use the worker-pool (mapped) chain instead of the serial steps
    #[arg(long)]
    pub mapped: bool,

    /// Size the worker pool to the configured max_workers ceiling
    #[arg(long)]
    pub distributed: bool,

    /// Wipe every step's staging directory before running
    #[arg(long)]
    pub clean: bool,

    /// Developer mode: cap n at a small value and run serially
    #[arg(long)]
    pub debug: bool,

    /// How many matrices the generator step produces
    #[arg(long, value_name = "COUNT", default_value_t = DEFAULT_N)]
    pub n: usize,

    /// Square matrix dimension
    #[arg(long, value_name = "DIM", default_value_t = DEFAULT_M)]
    pub m: usize,

    /// Base RNG seed
    #[arg(long, value_name = "SEED", default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Local staging root (overrides the configured directory)
    #[arg(long, value_name = "DIR")]
    pub staging: Option<PathBuf>,

    /// Path to workflow_config.json
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Shared inputs for the data-management verbs.
#[derive(Parser, Debug)]
#[command(about = "Move step artifacts between staging and the registry")]
pub struct DataArgs {
    /// Operate on one step instead of all of them
    #[arg(long, value_name = "NAME")]
    pub step: Option<String>,

    /// Local staging root (overrides the configured directory)
    #[arg(long, value_name = "DIR")]
    pub staging: Option<PathBuf>,

    /// Path to workflow_config.json
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Step command wrapper selecting which step to run solo.
#[derive(Parser, Debug)]
#[command(about = "Run a single step solo")]
pub struct StepArgs {
    #[command(subcommand)]
    pub step: StepCommand,
}

/// One subcommand per step, each with its own typed flags.
#[derive(Subcommand, Debug)]
pub enum StepCommand {
    Raw(GenerateArgs),
    Invert(MatrixInputArgs),
    Sum(MatrixInputArgs),
    Plot(VectorInputArgs),
    Fancyplot(VectorInputArgs),
    MappedRaw(MappedGenerateArgs),
    MappedInvert(MappedMatrixInputArgs),
    MappedSum(MappedMatrixInputArgs),
}

/// Generator inputs (raw).
#[derive(Parser, Debug)]
#[command(about = "Generate random square matrices")]
pub struct GenerateArgs {
    /// How many matrices to generate
    #[arg(long, value_name = "COUNT", default_value_t = DEFAULT_N)]
    pub n: usize,

    /// Square matrix dimension
    #[arg(long, value_name = "DIM", default_value_t = DEFAULT_M)]
    pub m: usize,

    /// RNG seed
    #[arg(long, value_name = "SEED", default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Local staging root (overrides the configured directory)
    #[arg(long, value_name = "DIR")]
    pub staging: Option<PathBuf>,

    /// Path to workflow_config.json
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Generator inputs for the worker-pool variant (mapped-raw).
#[derive(Parser, Debug)]
#[command(about = "Generate random square matrices via the worker pool")]
pub struct MappedGenerateArgs {
    /// How many matrices to generate
    #[arg(long, value_name = "COUNT", default_value_t = DEFAULT_N)]
    pub n: usize,

    /// Square matrix dimension
    #[arg(long, value_name = "DIM", default_value_t = DEFAULT_M)]
    pub m: usize,

    /// RNG seed (job i derives its RNG from seed + i)
    #[arg(long, value_name = "SEED", default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Size the worker pool to the configured max_workers ceiling
    #[arg(long)]
    pub distributed: bool,

    /// Local staging root (overrides the configured directory)
    #[arg(long, value_name = "DIR")]
    pub staging: Option<PathBuf>,

    /// Path to workflow_config.json
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Consumer inputs reading a matrix manifest (invert, sum).
#[derive(Parser, Debug)]
#[command(about = "Process matrices listed in an upstream manifest")]
pub struct MatrixInputArgs {
    /// Manifest listing input matrices (defaults to the upstream manifest)
    #[arg(long, value_name = "PATH")]
    pub matrices: Option<PathBuf>,

    /// Manifest column holding input file paths
    #[arg(long, value_name = "COLUMN", default_value = FILEPATH_COLUMN)]
    pub filepath_column: String,

    /// Local staging root (overrides the configured directory)
    #[arg(long, value_name = "DIR")]
    pub staging: Option<PathBuf>,

    /// Path to workflow_config.json
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Consumer inputs for the worker-pool variants (mapped-invert, mapped-sum).
#[derive(Parser, Debug)]
#[command(about = "Process matrices via the worker pool")]
pub struct MappedMatrixInputArgs {
    /// Manifest listing input matrices (defaults to the upstream manifest)
    #[arg(long, value_name = "PATH")]
    pub matrices: Option<PathBuf>,

    /// Manifest column holding input file paths
    #[arg(long, value_name = "COLUMN", default_value = FILEPATH_COLUMN)]
    pub filepath_column: String,

    /// Size the worker pool to the configured max_workers ceiling
    #[arg(long)]
    pub distributed: bool,

    /// Local staging root (overrides the configured directory)
    #[arg(long, value_name = "DIR")]
    pub staging: Option<PathBuf>,

    /// Path to workflow_config.json
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Chart inputs reading a vector manifest (plot, fancyplot).
#[derive(Parser, Debug)]
#[command(about = "Chart vectors listed in an upstream manifest")]
pub struct VectorInputArgs {
    /// Manifest listing input vectors (defaults to the upstream manifest)
    #[arg(long, value_name = "PATH")]
    pub vectors: Option<PathBuf>,

    /// Manifest column holding input file paths
    #[arg(long, value_name = "COLUMN", default_value = FILEPATH_COLUMN)]
    pub filepath_column: String,

    /// Local staging root (overrides the configured directory)
    #[arg(long, value_name = "DIR")]
    pub staging: Option<PathBuf>,

    /// Path to workflow_config.json
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
