//! Process command - extract fields from a single document.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use idcr_core::models::config::IdcrConfig;
use idcr_core::{DocumentExtractor, ExtractedFields, PureOcrEngine, SourceKind};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF or image)
    #[arg(required = true)]
    pub input: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Output options shared by `idcr <FILE>` and `idcr process`.
#[derive(Args, Clone)]
pub struct OutputArgs {
    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON object of field -> value
    Json,
    /// One `field: value` line per field
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();

    if !args.input.exists() {
        anyhow::bail!("The file '{}' does not exist.", args.input.display());
    }

    let config = IdcrConfig::load(config_path)?;

    info!("Processing file: {}", args.input.display());

    let fields = if is_supported(&args.input) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
        );

        pb.set_message("Loading OCR models...");
        let extractor = build_extractor(&config)?;

        pb.set_message("Extracting fields...");
        let fields = extractor.extract_file(&args.input)?;
        pb.finish_and_clear();
        fields
    } else {
        warn!("Unsupported file type: {}", args.input.display());
        ExtractedFields::new()
    };

    let output = format_fields(&fields, args.output.format)?;

    if let Some(output_path) = &args.output.output {
        fs::write(output_path, &output)?;
        eprintln!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

pub fn is_supported(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(SourceKind::from_file_name)
        .is_some()
}

/// Load the OCR engine and templates named by `config`.
pub fn build_extractor(config: &IdcrConfig) -> anyhow::Result<DocumentExtractor<PureOcrEngine>> {
    if !config.models.is_complete() {
        anyhow::bail!(
            "OCR models not found in {}.\n\n\
             Run 'idcr models download --base-url <URL>' to fetch them.",
            config.models.model_dir.display()
        );
    }

    let engine = PureOcrEngine::from_dir(&config.models, config.ocr.clone())
        .map_err(|e| anyhow::anyhow!("Failed to load OCR models: {}", e))?;

    let extractor = DocumentExtractor::from_config(config, engine).map_err(|e| {
        anyhow::anyhow!(
            "Failed to set up extraction (templates at {}): {}",
            config.templates.path.display(),
            e
        )
    })?;
    Ok(extractor)
}

pub fn format_fields(fields: &ExtractedFields, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(fields)?),
        OutputFormat::Text => Ok(format_text(fields)),
    }
}

fn format_text(fields: &ExtractedFields) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{}: {}", key, value.replace('\n', " ")))
        .collect::<Vec<_>>()
        .join("\n")
}
