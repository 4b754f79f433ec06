//! tabfit CLI Module
//!
//! Command-line front end for the training service. `train` prints the
//! response envelope as JSON on stdout; progress and tables go to stderr so
//! the JSON can be piped.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::data::{drop_null_rows, encode_features, CsvLoader};
use crate::service::{ResponseEnvelope, TrainRequest, Trainer, TrainerConfig};
use crate::training::{parse_hyperparams, Algorithm, HyperParams, TaskRule};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString { s.truecolor(100, 210, 120) }
fn fail(s: &str) -> ColoredString { s.truecolor(240, 110, 110) }

fn step_run(msg: &str) {
    eprint!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    eprintln!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    eprintln!();
    eprintln!("  {}", title.white().bold());
    eprintln!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "tabfit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fit and evaluate a model on a CSV dataset in one call")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fit an algorithm on a dataset and print the evaluation
    Train {
        /// Input CSV file with a header row
        #[arg(short, long)]
        data: PathBuf,

        /// Algorithm name, e.g. "Random Forest" (see `tabfit algorithms`)
        #[arg(short, long)]
        algorithm: String,

        /// Target column; omit for clustering
        #[arg(short, long)]
        target: Option<String>,

        /// Hyperparameters as a JSON object
        #[arg(short, long, conflicts_with = "params_file")]
        params: Option<String>,

        /// File holding the hyperparameter JSON object
        #[arg(long)]
        params_file: Option<PathBuf>,

        /// Pretty-print the JSON envelope
        #[arg(long)]
        pretty: bool,
    },

    /// List the accepted algorithm names
    Algorithms,

    /// Show the schema and encoded width of a dataset
    Info {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,
    },
}

/// Dispatch a parsed command line.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Train {
            data,
            algorithm,
            target,
            params,
            params_file,
            pretty,
        } => cmd_train(&data, &algorithm, target, params.as_deref(), params_file.as_deref(), pretty),
        Commands::Algorithms => {
            cmd_algorithms();
            Ok(())
        }
        Commands::Info { data } => cmd_info(&data),
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

fn read_params(inline: Option<&str>, file: Option<&Path>) -> crate::error::Result<HyperParams> {
    match (inline, file) {
        (Some(text), _) => parse_hyperparams(text),
        (None, Some(path)) => parse_hyperparams(&std::fs::read_to_string(path)?),
        (None, None) => Ok(HyperParams::new()),
    }
}

/// Train and print the envelope. Error envelopes are output, not failures.
pub fn cmd_train(
    data_path: &Path,
    algorithm: &str,
    target: Option<String>,
    params: Option<&str>,
    params_file: Option<&Path>,
    pretty: bool,
) -> anyhow::Result<()> {
    section("Train");

    let envelope = match read_params(params, params_file) {
        Ok(params) => {
            let trainer = Trainer::new(TrainerConfig::default())?;
            let request = TrainRequest {
                algorithm: algorithm.to_string(),
                target,
                params,
            };

            step_run(&format!("Fitting {}", algorithm.cyan()));
            let start = Instant::now();
            let envelope = trainer.train_csv(data_path, &request);
            step_done(&format!("{:?}", start.elapsed()));
            envelope
        }
        Err(err) => ResponseEnvelope::from_error(&err),
    };

    match (envelope.results(), envelope.error()) {
        (Some(results), _) => eprintln!("  {} {}", ok("✓"), muted(&results.task_type().to_string())),
        (None, Some(message)) => eprintln!("  {} {}", fail("✗"), message),
        (None, None) => {}
    }
    eprintln!();

    println!("{}", envelope.to_json(pretty)?);
    Ok(())
}

pub fn cmd_algorithms() {
    section("Algorithms");
    eprintln!("  {:<28} {}", muted("Name"), muted("Task"));
    eprintln!("  {}", dim(&"─".repeat(50)));

    for algorithm in Algorithm::ALL {
        let rule = match algorithm.task_rule() {
            TaskRule::Unsupervised => "clustering",
            TaskRule::RegressionOnly => "regression",
            TaskRule::ClassificationOnly => "classification",
            TaskRule::DualMode => "classification or regression",
        };
        println!("  {:<28} {}", algorithm.name().white(), rule);
    }
    eprintln!();
}

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("Data Info");

    let config = TrainerConfig::default();
    let df = CsvLoader::new()
        .with_infer_schema_length(config.infer_schema_length)
        .with_max_input_bytes(config.max_input_bytes)
        .load_path(data_path)?;
    let clean = drop_null_rows(&df)?;
    let features = encode_features(&clean, None)?;

    println!("  {:<16} {}", muted("File"), data_path.display());
    println!("  {:<16} {}", muted("Rows"), df.height());
    println!("  {:<16} {}", muted("Complete rows"), clean.height());
    println!("  {:<16} {}", muted("Columns"), df.width());
    println!("  {:<16} {}", muted("Encoded width"), features.n_features());
    println!();

    println!("  {:<20} {:<12} {:>6} {:>8}", muted("Column"), muted("Type"), muted("Nulls"), muted("Unique"));
    println!("  {}", dim(&"─".repeat(50)));

    for col in df.get_columns() {
        println!(
            "  {:<20} {:<12} {:>6} {:>8}",
            col.name(),
            format!("{:?}", col.dtype()).truecolor(140, 140, 140),
            col.null_count(),
            col.n_unique().unwrap_or(0)
        );
    }

    println!();
    Ok(())
}
