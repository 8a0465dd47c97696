//! bodyeval CLI
//!
//! Compare generated function bodies against a reference tree.
//!
//! ## Quick Start
//!
//! ```bash
//! # Evaluate every repository under two parallel roots
//! ./bodyeval run --gold ./gold --prediction ./generated --output results.json
//!
//! # One repository per root, extra 3-gram overlap, JSON Lines output
//! ./bodyeval run --gold ./gold/repo --prediction ./generated/repo \
//!     --layout single --ngram-sizes 3,5,10 --format jsonl --output results.jsonl
//!
//! # Length distribution of an existing dataset
//! ./bodyeval report results.json
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use bodyeval_core::config::{OutputFormat, RepositoryLayout, RunConfig};
use bodyeval_core::evaluate::evaluate;
use bodyeval_core::report::{
    length_distribution, read_rows, render_length_report, render_summary, write_rows,
    write_summary,
};
use bodyeval_core::scoring::bleu::Smoothing;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LayoutArg {
    /// The root is one repository
    Single,
    /// Every subdirectory of the root is a repository
    Multi,
}

impl From<LayoutArg> for RepositoryLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Single => RepositoryLayout::Single,
            LayoutArg::Multi => RepositoryLayout::Multi,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Json,
    Jsonl,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Jsonl => OutputFormat::Jsonl,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SmoothingArg {
    None,
    Epsilon,
}

impl From<SmoothingArg> for Smoothing {
    fn from(arg: SmoothingArg) -> Self {
        match arg {
            SmoothingArg::None => Smoothing::None,
            SmoothingArg::Epsilon => Smoothing::Epsilon,
        }
    }
}

#[derive(Parser)]
#[command(name = "bodyeval")]
#[command(about = "Score generated function bodies against a reference tree")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk both trees, align documented functions and score their bodies
    ///
    /// Flags override values from the config file.
    Run {
        /// Path to a TOML run config
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Reference tree root
        #[arg(short, long)]
        gold: Option<PathBuf>,

        /// Generated tree root
        #[arg(short, long)]
        prediction: Option<PathBuf>,

        #[arg(long, value_enum)]
        layout: Option<LayoutArg>,

        /// N-gram overlap window sizes (comma-separated, e.g. "5,10")
        #[arg(long, value_delimiter = ',')]
        ngram_sizes: Option<Vec<usize>>,

        /// List files that could not be read or parsed in the summary
        #[arg(long)]
        include_failed_parses: bool,

        /// Glob pattern of files or directories to skip (repeatable)
        #[arg(long = "exclude")]
        exclude: Vec<String>,

        #[arg(short, long)]
        workers: Option<usize>,

        #[arg(long, value_enum)]
        smoothing: Option<SmoothingArg>,

        /// Output file for the per-function dataset
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, value_enum)]
        format: Option<FormatArg>,

        /// Output file for the summary (JSON)
        #[arg(long)]
        summary_output: Option<PathBuf>,
    },

    /// Print gold body length statistics of a dataset by repo and match status
    Report {
        /// Dataset written by `run` (JSON or JSON Lines)
        dataset: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            gold,
            prediction,
            layout,
            ngram_sizes,
            include_failed_parses,
            exclude,
            workers,
            smoothing,
            output,
            format,
            summary_output,
        } => {
            let mut run_config = match &config {
                Some(path) => RunConfig::load(path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => RunConfig::default(),
            };
            run_config.apply_env()?;

            if let Some(gold) = gold {
                run_config.gold_root = gold;
            }
            if let Some(prediction) = prediction {
                run_config.prediction_root = prediction;
            }
            if let Some(layout) = layout {
                run_config.layout = layout.into();
            }
            if let Some(sizes) = ngram_sizes {
                run_config.ngram_sizes = sizes;
            }
            if include_failed_parses {
                run_config.include_failed_parses_in_report = true;
            }
            run_config.exclude_patterns.extend(exclude);
            if let Some(workers) = workers {
                run_config.workers = workers;
            }
            if let Some(smoothing) = smoothing {
                run_config.smoothing = smoothing.into();
            }
            if let Some(output) = output {
                run_config.output = output;
            }
            if let Some(format) = format {
                run_config.output_format = format.into();
            }
            if summary_output.is_some() {
                run_config.summary_output = summary_output;
            }
            run_config.validate()?;

            run(&run_config)?;
        }

        Commands::Report { dataset } => {
            report(&dataset)?;
        }
    }

    Ok(())
}

fn run(config: &RunConfig) -> Result<()> {
    let evaluation = evaluate(config).context("Evaluation failed")?;

    write_rows(&evaluation.rows, &config.output, config.output_format)
        .with_context(|| format!("Failed to write {}", config.output.display()))?;
    info!("Wrote {} rows to {}", evaluation.rows.len(), config.output.display());

    if let Some(path) = &config.summary_output {
        write_summary(&evaluation.summary, path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote summary to {}", path.display());
    }

    print!("{}", render_summary(&evaluation.summary));
    Ok(())
}

fn report(dataset: &Path) -> Result<()> {
    let rows = read_rows(dataset)
        .with_context(|| format!("Failed to read dataset {}", dataset.display()))?;
    if rows.is_empty() {
        anyhow::bail!("Dataset {} has no rows", dataset.display());
    }
    print!("{}", render_length_report(&length_distribution(&rows)));
    Ok(())
}
