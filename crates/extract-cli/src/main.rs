//! Micrograph Extract CLI
//!
//! Finds figure panels in scientific documents, crops the micrographs inside
//! them and labels each with its microscopy modality.

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use rayon::ThreadPoolBuilder;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;
mod output;

use commands::documents::DocumentsCommand;
use commands::images::ImagesCommand;
use output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "micrograph-extract",
    version,
    about = "Extract and classify micrographs from scientific figures",
    after_help = "EXAMPLES:\n  \
                  # Check that all five models load\n  \
                  micrograph-extract models\n\n  \
                  # Rendered pages or figure images\n  \
                  micrograph-extract images page1.png page2.png\n\n  \
                  # PDFs, pages processed in parallel, JSON lines output\n  \
                  micrograph-extract --format jsonl documents --parallel papers/*.pdf\n\n\
                  ENVIRONMENT:\n  \
                  MICROGRAPH_MODEL_DIR  directory holding the ONNX weights\n  \
                  MICROGRAPH_DEVICE     auto | cpu\n  \
                  MICROGRAPH_THREADS    intra-op threads per model"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// YAML configuration file
    #[arg(short, long, global = true, value_name = "YAML")]
    config: Option<PathBuf>,

    /// Output format for metadata records
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Treat each image file as one page
    Images(ImagesCommand),

    /// Render PDF documents and process every page
    Documents(DocumentsCommand),

    /// Load all models and show where they came from
    Models,
}

fn main() -> Result<()> {
    // Page fan-out pool size, for tests and shared machines
    if let Ok(threads_str) = std::env::var("MICROGRAPH_PAGE_THREADS") {
        if let Ok(num_threads) = threads_str.parse::<usize>() {
            ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build_global()
                .ok();
        }
    }

    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    // Records go to stdout, logs to stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Images(cmd) => cmd.execute(config, cli.format),
        Commands::Documents(cmd) => cmd.execute(config, cli.format),
        Commands::Models => commands::models::show_models(config, cli.format),
    }
}
