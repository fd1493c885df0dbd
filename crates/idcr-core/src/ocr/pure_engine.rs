//! Pure Rust OCR engine wrapper using `pure-onnx-ocr`.

use std::sync::Mutex;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::{ModelConfig, OcrConfig};

use super::{TextLine, TextRecognizer};

/// OCR engine backed by `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).
///
/// Loaded once and shared; calls are serialized through a mutex.
pub struct PureOcrEngine {
    engine: Mutex<pure_onnx_ocr::engine::OcrEngine>,
    config: OcrConfig,
}

impl PureOcrEngine {
    /// Create an engine from the model files named in `models`.
    pub fn from_dir(models: &ModelConfig, config: OcrConfig) -> Result<Self, OcrError> {
        let det_path = models.model_dir.join(&models.detection_model);
        let rec_path = models.model_dir.join(&models.recognition_model);
        let dict_path = models.model_dir.join(&models.dictionary);

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!(
                    "missing model file {}",
                    path.display()
                )));
            }
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", models.model_dir.display());

        Ok(Self {
            engine: Mutex::new(engine),
            config,
        })
    }
}

impl TextRecognizer for PureOcrEngine {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<TextLine>, OcrError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(OcrError::InvalidImage(format!("{}x{}", width, height)));
        }

        let results = {
            let engine = self
                .engine
                .lock()
                .map_err(|_| OcrError::Recognition("engine lock poisoned".to_string()))?;
            engine
                .run_from_image(image)
                .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?
        };

        let lines: Vec<TextLine> = results
            .iter()
            .map(|r| {
                let text = if self.config.keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                };
                TextLine {
                    anchor_y: anchor_y(&r.bounding_box),
                    text,
                    confidence: r.confidence,
                }
            })
            .collect();

        debug!(
            "OCR on {}x{}: {} lines in {}ms",
            width,
            height,
            lines.len(),
            start.elapsed().as_millis()
        );

        Ok(lines)
    }
}

/// Y coordinate of the first exterior point of the detected polygon.
fn anchor_y(polygon: &pure_onnx_ocr::Polygon<f64>) -> f32 {
    polygon
        .exterior()
        .coords()
        .next()
        .map(|c| c.y as f32)
        .unwrap_or(0.0)
}
