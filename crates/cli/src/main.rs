//! mdpdf CLI - automatic Markdown to PDF conversion

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod config;

/// mdpdf - convert Markdown files to PDF, automatically
#[derive(Parser)]
#[command(name = "mdpdf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a single Markdown file to PDF
    Convert {
        /// Path to the Markdown file
        file: PathBuf,

        /// Output PDF path (default: input path with .pdf extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Watch a directory and convert Markdown files after they settle
    Watch {
        /// Directory to watch
        directory: PathBuf,

        /// Watch subdirectories recursively
        #[arg(short, long)]
        recursive: bool,

        /// Seconds of idle time before conversion (default: from config, 60)
        #[arg(short, long)]
        delay: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; default to info-level so scheduled/converted
    // lines are visible without RUST_LOG
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert { file, output } => cmd::convert::run(&file, output).await,
        Commands::Watch {
            directory,
            recursive,
            delay,
        } => cmd::watch::run(&directory, recursive, delay).await,
    }
}
