//! Depthkit Application
//!
//! Command-line front end for the depth-completion data pipeline.
//!
//! Subcommands:
//! - `check-modality`: validate a modality string
//! - `inspect`: open a split and report assembled tensor shapes
//! - `export`: write one assembled sample as `.npy` files plus a depth preview

mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Depthkit - depth-completion data assembly
#[derive(Parser, Debug)]
#[command(name = "depthkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a modality string and list its channels
    CheckModality {
        /// Modality string, e.g. rgb-kor-kw
        modality: String,
    },

    /// Open a dataset split and report the shapes of the first samples
    Inspect {
        #[command(flatten)]
        dataset: DatasetArgs,

        /// Number of samples to assemble
        #[arg(short, long, default_value_t = 8)]
        limit: usize,
    },

    /// Assemble one sample and write it to disk
    Export {
        #[command(flatten)]
        dataset: DatasetArgs,

        /// Sample index within the split
        #[arg(short, long)]
        index: usize,

        /// Output directory
        #[arg(short, long)]
        out: PathBuf,

        /// Skip the split transform and export raw synthesized channels
        #[arg(long)]
        raw: bool,
    },
}

/// Dataset selection shared by `inspect` and `export`.
#[derive(Args, Debug, Clone)]
pub struct DatasetArgs {
    /// Dataset directory holding train.txt / val.txt
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Split to open (train or val)
    #[arg(short, long, default_value = "val")]
    split: String,

    /// Modality string; overrides the config file
    #[arg(short, long)]
    modality: Option<String>,

    /// JSON dataset configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Points kept by the uniform sparsifier for `fd`
    #[arg(long)]
    num_samples: Option<usize>,

    /// Degrade invalid modality strings to zero channels instead of failing
    #[arg(long)]
    lenient: bool,

    /// Stack channels in the fixed legacy order instead of modality string order
    #[arg(long)]
    legacy_order: bool,
}

/// Logging configuration.
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

fn init_logging(config: &LoggingConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level)),
        )
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(&LoggingConfig {
        level: cli.log_level.clone(),
    });

    let result = match cli.command {
        Command::CheckModality { modality } => commands::check_modality(&modality),
        Command::Inspect { dataset, limit } => commands::inspect(&dataset, limit),
        Command::Export {
            dataset,
            index,
            out,
            raw,
        } => commands::export(&dataset, index, &out, raw),
    };

    if let Err(e) = result {
        eprintln!("Application error: {}", e);
        std::process::exit(1);
    }
}
