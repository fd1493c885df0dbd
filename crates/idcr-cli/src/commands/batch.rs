//! Batch command - extract fields from every file matching a glob.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use indicatif::ProgressBar;
use tracing::{debug, warn};

use idcr_core::models::config::IdcrConfig;

use super::process::{OutputFormat, build_extractor, format_fields, is_supported};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input glob pattern
    #[arg(required = true)]
    input: String,

    /// Write one result file per document here instead of stdout
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Keep going after a document fails
    #[arg(long)]
    continue_on_error: bool,
}

pub async fn run(args: BatchArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = IdcrConfig::load(config_path)?;

    let files: Vec<PathBuf> = glob::glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| is_supported(p))
        .collect();
    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    if let Some(output_dir) = &args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    // One engine for the whole batch
    let extractor = build_extractor(&config)?;
    let pb = ProgressBar::new(files.len() as u64);
    let mut failed = 0;

    for path in &files {
        match extractor.extract_file(path) {
            Ok(fields) => {
                let content = format_fields(&fields, args.format)?;
                match &args.output_dir {
                    Some(dir) => {
                        let output_path = output_path(dir, path, args.format);
                        fs::write(&output_path, content)?;
                        debug!("Wrote output to {}", output_path.display());
                    }
                    None => pb.println(format!("{}: {}", path.display(), content)),
                }
            }
            Err(e) if args.continue_on_error => {
                warn!("Failed to process {}: {}", path.display(), e);
                failed += 1;
            }
            Err(e) => {
                pb.abandon();
                anyhow::bail!("Processing failed for {}: {}", path.display(), e);
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    eprintln!(
        "{} Processed {} files, {} failed",
        style("✓").green(),
        files.len(),
        failed
    );

    Ok(())
}

fn output_path(dir: &Path, input: &Path, format: OutputFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    dir.join(format!("{}.{}", stem, format.extension()))
}
