//! locus CLI
//!
//! Applies measurement recipes to recorded sweeps.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use locus_measure::{
    config::{Config, Recipe, SignalFile},
    core::{CallOverrides, Reducer},
    report::{measure_sweeps_with, BatchOutcome, BatchReport, SweepStatus},
    VERSION,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "locus")]
#[command(version = VERSION)]
#[command(about = "Location-based measurements on sampled signals", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply every measure in a recipe to every sweep in a signal file
    Run {
        /// Signal file (JSON)
        #[arg(long)]
        signal: PathBuf,

        /// Recipe file (JSON)
        #[arg(long)]
        recipe: PathBuf,

        /// Treat locator coordinates as absolute domain positions
        #[arg(long)]
        absolute: bool,

        /// Keep only this channel
        #[arg(long)]
        channel: Option<usize>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,

        /// Write the batch summary under the configured report path
        #[arg(long)]
        save_report: bool,
    },

    /// List the built-in reducers
    Reducers,

    /// Show configuration
    Config,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Json,
}

fn main() {
    let cli = Cli::parse();
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Note: using default configuration ({e})");
        Config::default()
    });
    init_tracing(&config.log_filter);

    let result = match cli.command {
        Commands::Run {
            signal,
            recipe,
            absolute,
            channel,
            format,
            save_report,
        } => cmd_run(&config, &signal, &recipe, absolute, channel, format, save_report),
        Commands::Reducers => {
            cmd_reducers();
            Ok(())
        }
        Commands::Config => cmd_config(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_run(
    config: &Config,
    signal_path: &Path,
    recipe_path: &Path,
    absolute: bool,
    channel: Option<usize>,
    format: Format,
    save_report: bool,
) -> Result<()> {
    let signals = SignalFile::load(signal_path)
        .with_context(|| format!("reading signal file {signal_path:?}"))?
        .into_signals()
        .context("building sweeps")?;
    let measures = Recipe::load(recipe_path)
        .with_context(|| format!("reading recipe {recipe_path:?}"))?
        .build(config)
        .context("building measures")?;

    let mut overrides = CallOverrides::default();
    if absolute {
        overrides = overrides.relative(false);
    }
    if channel.is_some() {
        overrides = overrides.channel(channel);
    }

    let report = BatchReport::new();
    let outcomes: Vec<BatchOutcome> = measures
        .iter()
        .map(|measure| {
            let outcome = measure_sweeps_with(measure, &signals, overrides);
            report.record(&outcome);
            outcome
        })
        .collect();

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&outcomes)?),
        Format::Table => print_table(&outcomes),
    }
    eprintln!("{}", report.summary());

    if save_report {
        config
            .ensure_directories()
            .context("creating report directory")?;
        let path = config.report_path.join(format!(
            "report_{}.json",
            Utc::now().format("%Y%m%d_%H%M%S")
        ));
        report
            .save(&path)
            .with_context(|| format!("writing report {path:?}"))?;
        eprintln!("Report written to {path:?}");
    }
    Ok(())
}

fn print_table(outcomes: &[BatchOutcome]) {
    println!("{:<20} {:<12} {:<9} VALUE", "MEASURE", "SWEEP", "STATUS");
    for outcome in outcomes {
        for entry in &outcome.entries {
            let sweep = entry
                .name
                .clone()
                .unwrap_or_else(|| entry.sweep.to_string());
            let status = match entry.status {
                SweepStatus::Measured => "ok",
                SweepStatus::Nan => "nan",
                SweepStatus::Failed => "failed",
            };
            let value = match &entry.error {
                Some(e) => e.clone(),
                None => entry
                    .measures
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            };
            println!("{:<20} {:<12} {:<9} {}", outcome.measure, sweep, status, value);
        }
    }
}

fn cmd_reducers() {
    println!("{:<14} {:<6} OUTPUT", "REDUCER", "ARITY");
    for reducer in Reducer::presets() {
        println!(
            "{:<14} {:<6} {:?}",
            reducer.name(),
            reducer.arity(),
            reducer.output()
        );
    }
}

fn cmd_config(config: &Config) -> Result<()> {
    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
