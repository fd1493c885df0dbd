use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;

use idcr_core::models::config::ExtractionConfig;
use idcr_core::{
    DateErrorPolicy, DocumentExtractor, DocumentTypes, MockRecognizer, OcrError, PercentBox,
    TemplateCatalog, TemplateStore, TextLine, TextRecognizer,
};
use idcr_server::{AppState, router};

const BOUNDARY: &str = "idcr-test-boundary";

fn catalog() -> TemplateCatalog {
    let mut store = TemplateStore::default();
    store
        .insert("card", "name", PercentBox { x1: 10.0, y1: 10.0, x2: 60.0, y2: 30.0 })
        .unwrap();
    store
        .insert("card", "date", PercentBox { x1: 10.0, y1: 60.0, x2: 60.0, y2: 80.0 })
        .unwrap();
    let mut documents = DocumentTypes::new();
    documents.insert("card.png", "card");
    TemplateCatalog::new(documents, store)
}

fn app_with(recognizer: Box<dyn TextRecognizer>, timeout: Duration) -> Router {
    let extractor = DocumentExtractor::builder()
        .with_catalog(catalog())
        .with_config(ExtractionConfig {
            date_error_policy: DateErrorPolicy::Abort,
            ..ExtractionConfig::default()
        })
        .with_recognizer(recognizer)
        .build()
        .unwrap();
    router(AppState::new(extractor, timeout), 1024 * 1024)
}

fn app(lines: Vec<TextLine>) -> Router {
    app_with(Box::new(MockRecognizer::fixed(lines)), Duration::from_secs(30))
}

fn png() -> Vec<u8> {
    let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(120, 80, Luma([200])));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

fn multipart(field: &str, file_name: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/extract/")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_reports_ok() {
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(Vec::new()), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn unsupported_upload_is_reported_not_failed() {
    let (status, body) = send(app(Vec::new()), multipart("file", "notes.txt", b"hello")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Invalid file type" }));
}

#[tokio::test]
async fn known_document_returns_fields() {
    let lines = vec![TextLine::new(0.0, "14 Mac 1995", 0.9)];
    let (status, body) = send(app(lines), multipart("file", "card.png", &png())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "name": "14 Mac 1995", "date": "950314" }));
}

#[tokio::test]
async fn unknown_document_returns_empty_mapping() {
    let lines = vec![TextLine::new(0.0, "ignored", 0.9)];
    let (status, body) = send(app(lines), multipart("file", "other.png", &png())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn malformed_date_is_unprocessable() {
    let lines = vec![TextLine::new(0.0, "14 1995", 0.9)];
    let (status, body) = send(app(lines), multipart("file", "card.png", &png())).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("14 1995"));
}

#[tokio::test]
async fn corrupt_image_is_server_error() {
    let (status, body) =
        send(app(Vec::new()), multipart("file", "card.png", b"not a png")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn missing_file_field_is_bad_request() {
    let (status, body) = send(app(Vec::new()), multipart("upload", "card.png", &png())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("file"));
}

#[derive(Default)]
struct SlowRecognizer {
    finished: Arc<AtomicUsize>,
}

impl TextRecognizer for SlowRecognizer {
    fn recognize(&self, _image: &DynamicImage) -> Result<Vec<TextLine>, OcrError> {
        thread::sleep(Duration::from_millis(300));
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn slow_extraction_times_out() {
    let app = app_with(Box::new(SlowRecognizer::default()), Duration::from_millis(20));
    let (status, body) = send(app, multipart("file", "card.png", &png())).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body, json!({ "error": "extraction timed out" }));
}

#[tokio::test]
async fn timed_out_extraction_still_runs_to_completion() {
    let finished = Arc::new(AtomicUsize::new(0));
    let recognizer = SlowRecognizer {
        finished: Arc::clone(&finished),
    };
    let app = app_with(Box::new(recognizer), Duration::from_millis(20));

    let (status, _) = send(app, multipart("file", "card.png", &png())).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(finished.load(Ordering::SeqCst), 0);

    // name and date, two variants each
    for _ in 0..50 {
        if finished.load(Ordering::SeqCst) == 4 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(finished.load(Ordering::SeqCst), 4);
}
