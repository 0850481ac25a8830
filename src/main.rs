use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use montepi::config::default_workers;
use montepi::experiment::{self, Experiment, DEFAULT_REPETITIONS};
use montepi::sampler::DEFAULT_SCRATCH_POINTS;
use montepi::{logging, CsvSink, RunOptions, SeedPolicy, Sweep, WorkerGroup};

#[derive(Parser)]
#[command(author, version, about = "Monte Carlo estimation of pi across a worker group", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the sweep once and append one row per sample count
    Run(RunArgs),
    /// Repeat the sweep for 1..=max workers and write an averaged summary
    Experiment(ExperimentArgs),
    /// Rebuild the summary from an existing raw results file
    Summarize {
        #[arg(long, default_value = "pi_results.csv")]
        raw_output: PathBuf,

        #[arg(long, default_value = "pi_summary.csv")]
        summary_output: PathBuf,
    },
}

#[derive(Args)]
struct SamplingArgs {
    /// Comma-separated sample counts (default: 10^2 through 10^9)
    #[arg(long)]
    samples: Option<Sweep>,

    /// Fixed seed base; the wall clock is used when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Points staged in memory at once per worker
    #[arg(long, default_value_t = DEFAULT_SCRATCH_POINTS)]
    scratch_points: usize,
}

impl SamplingArgs {
    fn sweep(&self) -> Sweep {
        self.samples.clone().unwrap_or_default()
    }

    fn options(&self, workers: usize) -> RunOptions {
        let seed = self.seed.map(SeedPolicy::Fixed).unwrap_or_default();
        RunOptions::new(workers)
            .with_seed(seed)
            .with_scratch_points(self.scratch_points)
    }
}

#[derive(Args)]
struct RunArgs {
    /// Number of workers (default: available cores)
    #[arg(short, long, env = "MONTEPI_WORKERS")]
    workers: Option<usize>,

    /// Results file, opened in append mode
    #[arg(short, long, env = "MONTEPI_OUTPUT", default_value = "pi_results.csv")]
    output: PathBuf,

    #[command(flatten)]
    sampling: SamplingArgs,
}

#[derive(Args)]
struct ExperimentArgs {
    /// Largest worker count to try
    #[arg(long, default_value_t = default_workers())]
    max_workers: usize,

    /// Runs per worker count
    #[arg(long, default_value_t = DEFAULT_REPETITIONS)]
    repetitions: usize,

    #[arg(long, default_value = "pi_results.csv")]
    raw_output: PathBuf,

    #[arg(long, default_value = "pi_summary.csv")]
    summary_output: PathBuf,

    /// Append to existing output instead of starting fresh
    #[arg(long)]
    keep_raw: bool,

    #[command(flatten)]
    sampling: SamplingArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    match Cli::parse().command {
        Command::Run(args) => run(args).await,
        Command::Experiment(args) => run_experiment(args).await,
        Command::Summarize {
            raw_output,
            summary_output,
        } => summarize(&raw_output, &summary_output),
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let workers = args.workers.unwrap_or_else(default_workers);
    let group = WorkerGroup::new(args.sampling.options(workers))?;
    let sink = CsvSink::open(&args.output)?;

    let results = group.run(&args.sampling.sweep(), Box::new(sink)).await?;
    info!(
        rows = results.len(),
        output = %args.output.display(),
        "run complete"
    );
    Ok(())
}

async fn run_experiment(args: ExperimentArgs) -> Result<()> {
    if !args.keep_raw {
        remove_if_present(&args.raw_output)?;
        remove_if_present(&args.summary_output)?;
    }

    let experiment = Experiment {
        max_workers: args.max_workers,
        repetitions: args.repetitions,
        sweep: args.sampling.sweep(),
        base: args.sampling.options(1),
        raw_output: args.raw_output.clone(),
    };
    let records = experiment.run().await?;
    info!(rows = records.len(), "raw collection finished");

    let rows = experiment::summarize(&records);
    experiment::write_summary(&args.summary_output, &rows)
        .with_context(|| format!("writing {}", args.summary_output.display()))?;
    info!(rows = rows.len(), output = %args.summary_output.display(), "summary written");
    Ok(())
}

fn summarize(raw: &Path, summary: &Path) -> Result<()> {
    let records = experiment::read_records(raw)
        .with_context(|| format!("reading {}", raw.display()))?;
    let rows = experiment::summarize(&records);
    experiment::write_summary(summary, &rows)
        .with_context(|| format!("writing {}", summary.display()))?;
    info!(rows = rows.len(), output = %summary.display(), "summary written");
    Ok(())
}

fn remove_if_present(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("removing {}", path.display())),
    }
}
