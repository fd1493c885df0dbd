use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use idcr_core::models::config::IdcrConfig;
use idcr_core::{DocumentExtractor, PureOcrEngine, TextRecognizer};
use idcr_server::{AppState, router};

/// Identity document OCR upload service
#[derive(Parser)]
#[command(name = "idcr-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides server.bind)
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let args = Args::parse();
    let config = IdcrConfig::load(args.config.as_deref())?;

    // Load the engine and templates once; every request shares them
    let engine = PureOcrEngine::from_dir(&config.models, config.ocr.clone())?;
    let recognizer: Box<dyn TextRecognizer> = Box::new(engine);
    let extractor = DocumentExtractor::from_config(&config, recognizer)?;

    let state = AppState::new(
        extractor,
        Duration::from_secs(config.server.request_timeout_secs),
    );
    let app = router(state, config.server.max_upload_bytes);

    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
