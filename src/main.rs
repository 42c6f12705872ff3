//! Binary entrypoint: parse arguments, initialize logging, dispatch.
use anyhow::Result;
use clap::Parser;
use matrix_flow::all::{self, All};
use matrix_flow::cli::{Command, DataArgs, RootArgs, RunArgs, StepArgs, StepCommand};
use matrix_flow::config::{self, WorkflowConfig};
use matrix_flow::flow::Executor;
use matrix_flow::staging::{Registry, StagingPaths};
use matrix_flow::steps::{
    Fancyplot, Invert, MappedInvert, MappedRaw, MappedSum, Plot, Raw, RunParams, Step,
    StepContext, Sum,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Upper bound on `n` in debug mode, to keep iteration fast.
const DEBUG_N_CAP: usize = 10;

fn main() -> Result<()> {
    let root = RootArgs::parse();
    init_tracing(matches!(&root.command, Command::Run(args) if args.debug));

    match root.command {
        Command::Run(args) => cmd_run(args),
        Command::Pull(args) => cmd_data(args, DataVerb::Pull),
        Command::Checkout(args) => cmd_data(args, DataVerb::Checkout),
        Command::Push(args) => cmd_data(args, DataVerb::Push),
        Command::Clean(args) => cmd_data(args, DataVerb::Clean),
        Command::Step(args) => cmd_step(args),
    }
}

fn init_tracing(debug: bool) {
    let default = if debug {
        "matrix_flow=debug,mflow=debug"
    } else {
        "matrix_flow=info,mflow=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
}

/// Config plus the staging root it implies (or the CLI override).
struct Session {
    config: WorkflowConfig,
    staging: StagingPaths,
}

fn session(staging: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<Session> {
    let config = config::load_config(config_path.as_deref())?;
    let root = staging.unwrap_or_else(|| config.local_staging_dir.clone());
    Ok(Session { config, staging: StagingPaths::new(root) })
}

/// Pool sizing: `--distributed` takes the configured ceiling, otherwise use
/// whatever parallelism the host offers.
fn executor_for(distributed: bool, config: &WorkflowConfig) -> Result<Executor> {
    if distributed {
        Executor::pool(config.max_workers)
    } else {
        let workers = std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1);
        Executor::pool(workers)
    }
}

fn effective_n(requested: usize, debug: bool) -> usize {
    if debug {
        requested.min(DEBUG_N_CAP)
    } else {
        requested
    }
}

fn cmd_run(args: RunArgs) -> Result<()> {
    let session = session(args.staging, args.config)?;
    let executor = if args.debug {
        Executor::serial()
    } else {
        executor_for(args.distributed, &session.config)?
    };
    let n = effective_n(args.n, args.debug);
    if n < args.n {
        info!(requested = args.n, capped = n, "debug mode capped n");
    }
    let params = RunParams { n, m: args.m, seed: args.seed, ..RunParams::default() };
    let ctx = StepContext::new(session.staging, params, executor);

    let outputs = All::flow(args.mapped).run(&ctx, args.clean)?;
    for (step, artifacts) in &outputs {
        println!("Step `{step}` wrote {} artifacts.", artifacts.len());
    }
    Ok(())
}

enum DataVerb {
    Pull,
    Checkout,
    Push,
    Clean,
}

fn cmd_data(args: DataArgs, verb: DataVerb) -> Result<()> {
    let session = session(args.staging, args.config)?;
    let ctx = StepContext::new(session.staging, RunParams::default(), Executor::serial());

    if let DataVerb::Clean = verb {
        match &args.step {
            Some(name) => {
                let step = all::step_by_name(name)?;
                step.clean(&ctx)?;
                println!("Cleaned staging for step `{}`.", step.name());
            }
            None => {
                All::every_step().clean(&ctx)?;
                println!("Cleaned staging for every step.");
            }
        }
        return Ok(());
    }

    let registry = Registry::resolve(&session.config)?;
    let count = match (&args.step, verb) {
        (Some(name), DataVerb::Push) => {
            let step = all::step_by_name(name)?;
            step.push(&ctx, &registry)?.len()
        }
        (Some(name), DataVerb::Checkout) => {
            let step = all::step_by_name(name)?;
            step.checkout(&ctx, &registry)?.len()
        }
        (Some(name), DataVerb::Pull) => {
            let step = all::step_by_name(name)?;
            step.pull(&ctx, &registry)?.len()
        }
        (None, DataVerb::Push) => All::every_step().push(&ctx, &registry)?.len(),
        (None, DataVerb::Checkout) => All::every_step().checkout(&ctx, &registry)?.len(),
        (None, DataVerb::Pull) => All::every_step().pull(&ctx, &registry)?.len(),
        (_, DataVerb::Clean) => unreachable!("clean handled above"),
    };
    println!("Moved {count} files (registry at {}).", registry.root().display());
    Ok(())
}

fn cmd_step(args: StepArgs) -> Result<()> {
    match args.step {
        StepCommand::Raw(a) => {
            solo_generator(Raw::new(), a.n, a.m, a.seed, None, a.staging, a.config)
        }
        StepCommand::MappedRaw(a) => solo_generator(
            MappedRaw::new(),
            a.n,
            a.m,
            a.seed,
            Some(a.distributed),
            a.staging,
            a.config,
        ),
        StepCommand::Invert(a) => {
            let step: Box<dyn Step> = match a.matrices {
                Some(path) => Box::new(Invert::from_manifest(path)),
                None => Box::new(Invert::new()),
            };
            solo_consumer(step, a.filepath_column, None, a.staging, a.config)
        }
        StepCommand::Sum(a) => {
            let step: Box<dyn Step> = match a.matrices {
                Some(path) => Box::new(Sum::from_manifest(path)),
                None => Box::new(Sum::new()),
            };
            solo_consumer(step, a.filepath_column, None, a.staging, a.config)
        }
        StepCommand::Plot(a) => {
            let step: Box<dyn Step> = match a.vectors {
                Some(path) => Box::new(Plot::from_manifest(path)),
                None => Box::new(Plot::new()),
            };
            solo_consumer(step, a.filepath_column, None, a.staging, a.config)
        }
        StepCommand::Fancyplot(a) => {
            let step: Box<dyn Step> = match a.vectors {
                Some(path) => Box::new(Fancyplot::from_manifest(path)),
                None => Box::new(Fancyplot::new()),
            };
            solo_consumer(step, a.filepath_column, None, a.staging, a.config)
        }
        StepCommand::MappedInvert(a) => {
            let step: Box<dyn Step> = match a.matrices {
                Some(path) => Box::new(MappedInvert::from_manifest(path)),
                None => Box::new(MappedInvert::new()),
            };
            solo_consumer(step, a.filepath_column, Some(a.distributed), a.staging, a.config)
        }
        StepCommand::MappedSum(a) => {
            let step: Box<dyn Step> = match a.matrices {
                Some(path) => Box::new(MappedSum::from_manifest(path)),
                None => Box::new(MappedSum::new()),
            };
            solo_consumer(step, a.filepath_column, Some(a.distributed), a.staging, a.config)
        }
    }
}

fn solo_generator<S: Step>(
    step: S,
    n: usize,
    m: usize,
    seed: u64,
    distributed: Option<bool>,
    staging: Option<PathBuf>,
    config: Option<PathBuf>,
) -> Result<()> {
    let session = session(staging, config)?;
    let executor = match distributed {
        Some(flag) => executor_for(flag, &session.config)?,
        None => Executor::serial(),
    };
    let params = RunParams { n, m, seed, ..RunParams::default() };
    let ctx = StepContext::new(session.staging, params, executor);
    let outputs = step.run(&ctx, None)?;
    report_step(step.name(), &ctx, &outputs);
    Ok(())
}

fn solo_consumer(
    step: Box<dyn Step>,
    filepath_column: String,
    distributed: Option<bool>,
    staging: Option<PathBuf>,
    config: Option<PathBuf>,
) -> Result<()> {
    let session = session(staging, config)?;
    let executor = match distributed {
        Some(flag) => executor_for(flag, &session.config)?,
        None => Executor::serial(),
    };
    let params = RunParams { filepath_column, ..RunParams::default() };
    let ctx = StepContext::new(session.staging, params, executor);
    let outputs = step.run(&ctx, None)?;
    report_step(step.name(), &ctx, &outputs);
    Ok(())
}

fn report_step(step: &str, ctx: &StepContext, outputs: &[PathBuf]) {
    println!("Step `{step}` wrote {} artifacts.", outputs.len());
    println!("Manifest at {}.", ctx.staging.manifest_path(step).display());
}
