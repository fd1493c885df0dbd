//! HTTP upload service for identity document field extraction.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use idcr_core::{DocumentExtractor, IdcrError, SourceKind, TextRecognizer};

/// Extractor type served over HTTP; the engine is chosen at startup.
pub type SharedExtractor = DocumentExtractor<Box<dyn TextRecognizer>>;

/// Shared, read-only service state.
///
/// `timeout` bounds how long a request waits for its extraction, not the
/// extraction itself. A blocking task that outlives it keeps running to
/// completion and holds the OCR engine until then, so requests queued
/// behind it wait on the engine lock.
#[derive(Clone)]
pub struct AppState {
    extractor: Arc<SharedExtractor>,
    timeout: Duration,
}

impl AppState {
    pub fn new(extractor: SharedExtractor, timeout: Duration) -> Self {
        Self {
            extractor: Arc::new(extractor),
            timeout,
        }
    }
}

/// Build the service router.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/extract/", post(extract))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Errors returned to HTTP clients as `{"error": ...}`.
#[derive(Debug)]
pub enum ApiError {
    /// The multipart body had no `file` field.
    MissingFile,
    /// The multipart body could not be read.
    BadRequest(String),
    /// Extraction exceeded the configured time limit.
    Timeout,
    /// Extraction failed.
    Extraction(IdcrError),
    /// The worker task failed.
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingFile | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Extraction(IdcrError::Date(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Extraction(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::MissingFile => "missing multipart field 'file'".to_string(),
            Self::BadRequest(msg) => format!("invalid multipart body: {}", msg),
            Self::Timeout => "extraction timed out".to_string(),
            Self::Extraction(e) => e.to_string(),
            Self::Internal(msg) => msg.clone(),
        }
    }
}

impl From<IdcrError> for ApiError {
    fn from(e: IdcrError) -> Self {
        Self::Extraction(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self.message());
        } else {
            warn!("Request rejected: {}", self.message());
        }
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn extract(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        upload = Some((file_name, data));
        break;
    }

    let Some((file_name, data)) = upload else {
        return Err(ApiError::MissingFile);
    };

    if SourceKind::from_file_name(&file_name).is_none() {
        info!("Rejected upload {:?}: unsupported type", file_name);
        return Ok(Json(json!({ "message": "Invalid file type" })).into_response());
    }

    info!("Extracting fields from {} ({} bytes)", file_name, data.len());

    let extractor = Arc::clone(&state.extractor);
    let task = tokio::task::spawn_blocking(move || extractor.extract_bytes(&file_name, &data));

    let fields = match tokio::time::timeout(state.timeout, task).await {
        Err(_) => return Err(ApiError::Timeout),
        Ok(Err(join_error)) => return Err(ApiError::Internal(join_error.to_string())),
        Ok(Ok(result)) => result?,
    };

    Ok(Json(fields).into_response())
}
