//! Models command - check and download OCR model files.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use futures_util::StreamExt;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use idcr_core::models::config::{IdcrConfig, ModelConfig};

/// Arguments for the models command.
#[derive(Args)]
pub struct ModelsArgs {
    #[command(subcommand)]
    command: ModelsCommand,
}

#[derive(Subcommand)]
enum ModelsCommand {
    /// Check which model files are present
    Status,

    /// Download model files
    Download(DownloadArgs),
}

#[derive(Args)]
struct DownloadArgs {
    /// Base URL the model files are served from; each file is fetched from `<URL>/<file name>`
    #[arg(long)]
    base_url: String,

    /// Output directory (default: configured model directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Force re-download even if files exist
    #[arg(long)]
    force: bool,
}

pub async fn run(args: ModelsArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = IdcrConfig::load(config_path)?;
    match args.command {
        ModelsCommand::Status => check_status(&config.models),
        ModelsCommand::Download(download_args) => {
            download_models(download_args, &config.models).await
        }
    }
}

fn file_url(base_url: &str, filename: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), filename)
}

async fn download_models(args: DownloadArgs, models: &ModelConfig) -> anyhow::Result<()> {
    let output_dir = args.output.unwrap_or_else(|| models.model_dir.clone());
    fs::create_dir_all(&output_dir)?;

    println!(
        "{} Downloading models from {} to {}",
        style("ℹ").blue(),
        style(&args.base_url).cyan(),
        output_dir.display()
    );
    println!();

    let client = reqwest::Client::builder()
        .user_agent(concat!("idcr-cli/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let multi_progress = MultiProgress::new();
    let mut success_count = 0;
    let mut skip_count = 0;
    let mut error_count = 0;

    for filename in models.files() {
        let path = output_dir.join(filename);

        if path.exists() && !args.force {
            let size = fs::metadata(&path)?.len();
            if size > 0 {
                println!(
                    "  {} {} (already exists, {})",
                    style("✓").green(),
                    filename,
                    format_size(size)
                );
                skip_count += 1;
                continue;
            }
        }

        let pb = multi_progress.add(ProgressBar::new(0));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} {msg:<30} [{bar:25.cyan/blue}] {bytes}/{total_bytes}")?
                .progress_chars("=>-"),
        );
        pb.set_message(filename.to_string());

        match download_file(&client, &file_url(&args.base_url, filename), &path, &pb).await {
            Ok(()) => {
                pb.finish_with_message(format!("{} {}", style("✓").green(), filename));
                success_count += 1;
            }
            Err(e) => {
                pb.finish_with_message(format!("{} {} - {}", style("✗").red(), filename, e));
                error_count += 1;
            }
        }
    }

    println!();

    if error_count == 0 {
        println!("{} Models downloaded successfully!", style("✓").green().bold());
        if skip_count > 0 {
            println!(
                "   {} downloaded, {} already present",
                success_count, skip_count
            );
        }
    } else {
        println!(
            "{} Download completed with errors",
            style("⚠").yellow().bold()
        );
        println!(
            "   {} downloaded, {} skipped, {} failed",
            success_count, skip_count, error_count
        );
        println!();
        println!("Retry with: idcr models download --base-url {} --force", args.base_url);
    }

    println!();
    let downloaded = ModelConfig {
        model_dir: output_dir,
        ..models.clone()
    };
    check_status(&downloaded)?;

    if error_count > 0 {
        anyhow::bail!("{} model file(s) failed to download", error_count);
    }
    Ok(())
}

async fn download_file(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
    pb: &ProgressBar,
) -> anyhow::Result<()> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        anyhow::bail!("HTTP {}", response.status());
    }

    if let Some(content_length) = response.content_length() {
        pb.set_length(content_length);
    }

    // Write to a temp file and rename once complete
    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path)?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        pb.set_position(downloaded);
    }

    file.flush()?;
    drop(file);

    fs::rename(&temp_path, path)?;

    Ok(())
}

fn check_status(models: &ModelConfig) -> anyhow::Result<()> {
    println!("{}", style("Model Status").bold());
    println!("Model directory: {}", models.model_dir.display());
    println!();

    for filename in models.files() {
        let path = models.model_dir.join(filename);
        match fs::metadata(&path) {
            Ok(meta) => println!(
                "  {} {} ({})",
                style("✓").green(),
                filename,
                format_size(meta.len())
            ),
            Err(_) => println!("  {} {} (missing)", style("✗").red(), filename),
        }
    }

    println!();
    if models.is_complete() {
        println!("{} All model files present", style("✓").green());
    } else {
        println!(
            "{} Run 'idcr models download --base-url <URL>' to fetch missing files",
            style("ℹ").blue()
        );
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_url_joins_without_double_slash() {
        assert_eq!(
            file_url("https://host/models/", "det.onnx"),
            "https://host/models/det.onnx"
        );
        assert_eq!(file_url("http://h", "a.txt"), "http://h/a.txt");
    }

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }
}
