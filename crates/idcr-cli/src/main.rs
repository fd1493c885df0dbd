//! CLI application for identity document field extraction.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{batch, config, models, process};

/// Identity document OCR - Extract address, name and date from scanned documents
#[derive(Parser)]
#[command(name = "idcr")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Document to process (same as `idcr process <FILE>`)
    file: Option<PathBuf>,

    #[command(flatten)]
    output: process::OutputArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a single document
    Process(process::ProcessArgs),

    /// Process multiple documents
    Batch(batch::BatchArgs),

    /// Manage OCR models
    Models(models::ModelsArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();

    // Execute command
    match (cli.command, cli.file) {
        (Some(Commands::Process(args)), _) => process::run(args, config_path).await,
        (Some(Commands::Batch(args)), _) => batch::run(args, config_path).await,
        (Some(Commands::Models(args)), _) => models::run(args, config_path).await,
        (Some(Commands::Config(args)), _) => config::run(args, config_path).await,
        (None, Some(input)) => {
            let args = process::ProcessArgs {
                input,
                output: cli.output,
            };
            process::run(args, config_path).await
        }
        (None, None) => anyhow::bail!("No input file given. Run 'idcr --help' for usage."),
    }
}
