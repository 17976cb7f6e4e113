mod config;
mod executors;
mod ingest;
mod report;
mod resultset;

use clap::{Parser, Subcommand};
use config::{Experiment, ExperimentConfig};
use dbmsbench_analysis::BenchmarkContext;
use executors::Executors;
use ingest::BenchmarkResults;
use std::{
    path::{Path, PathBuf},
    process::exit,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_unwrap::ResultExt;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// log filter, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
    /// replace connection names by anonymous aliases
    #[arg(long)]
    anonymize: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Benchmark all queries against all connections
    Run {
        config: PathBuf,
        /// file to store the measured samples in
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compare previously stored results
    Report {
        config: PathBuf,
        results: PathBuf,
        /// restrict the report to one query (1-based)
        #[arg(short, long)]
        query: Option<usize>,
    },
}

fn load(path: &Path, anonymize: bool) -> (Experiment, BenchmarkContext) {
    let config = ExperimentConfig::load(path).unwrap_or_log();

    if config.preflight_checks() {
        error!("Configuration {path:?} contains errors, aborting");
        exit(1);
    }

    let mut context = BenchmarkContext::new(config.anonymize || anonymize);
    let experiment = config.build(&mut context).unwrap_or_log();

    (experiment, context)
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    match cli.command {
        Commands::Run { config, output } => {
            let (experiment, context) = load(&config, cli.anonymize);
            let mut executor = Executors::load(&experiment).unwrap_or_log();
            let mut timers = executors::timers();

            let resultsets = executor.execute(&experiment, &mut timers).unwrap_or_log();

            if let Some(output) = output {
                BenchmarkResults::from_timers(&timers, resultsets)
                    .store(&output)
                    .unwrap_or_log();
            }

            print!("{}", report::report(&experiment, &timers, context.registry(), None));
        }
        Commands::Report {
            config,
            results,
            query,
        } => {
            let (experiment, context) = load(&config, cli.anonymize);

            if let Some(number) = query {
                if number == 0 || number > experiment.queries.len() {
                    error!("Query {number} is not defined");
                    exit(1);
                }
            }

            let timers = BenchmarkResults::load(&results)
                .and_then(|results| results.into_timers(&experiment.queries))
                .unwrap_or_log();
            info!("Loaded results from {results:?}");

            print!(
                "{}",
                report::report(&experiment, &timers, context.registry(), query)
            );
        }
    }
}
