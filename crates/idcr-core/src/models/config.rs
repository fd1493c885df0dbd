//! Configuration structures for the extraction pipeline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::fields::FieldKey;

/// Main configuration for idcr.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdcrConfig {
    /// OCR engine configuration.
    pub ocr: OcrConfig,

    /// Preprocessing variant configuration.
    pub preprocess: PreprocessConfig,

    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Model configuration.
    pub models: ModelConfig,

    /// Template store location.
    pub templates: TemplateConfig,

    /// Recognized file name -> document type.
    pub documents: DocumentConfig,

    /// HTTP service configuration.
    pub server: ServerConfig,
}

/// OCR engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Keep the recognizer's `[UNK]` tokens instead of replacing them with spaces.
    pub keep_unk: bool,
}

/// Built-in preprocessing variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantKind {
    /// Divide by a large Gaussian blur.
    Gaussian,
    /// Divide by a median blur and stretch to 0..=255.
    Median,
}

/// Preprocessing variant configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Variants to run, in voting order.
    pub variants: Vec<VariantKind>,

    /// Gaussian kernel size (odd, >= 3).
    pub gaussian_kernel: u32,

    /// Median kernel size (odd, >= 3).
    pub median_kernel: u32,

    /// Base padding unit in pixels.
    pub padding_unit: u32,

    /// Padding multiplier applied to the unit.
    pub padding_scale: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            variants: vec![VariantKind::Gaussian, VariantKind::Median],
            gaussian_kernel: 99,
            median_kernel: 51,
            padding_unit: 20,
            padding_scale: 2,
        }
    }
}

impl PreprocessConfig {
    /// Check kernel sizes and the variant list.
    pub fn validate(&self) -> Result<(), String> {
        for (name, kernel) in [
            ("gaussian_kernel", self.gaussian_kernel),
            ("median_kernel", self.median_kernel),
        ] {
            if kernel < 3 || kernel % 2 == 0 {
                return Err(format!("{name} must be odd and at least 3, got {kernel}"));
            }
        }
        if self.variants.is_empty() {
            return Err("at least one preprocessing variant is required".to_string());
        }
        Ok(())
    }

    /// Bottom/right padding in pixels.
    pub fn padding(&self) -> u32 {
        self.padding_unit * self.padding_scale
    }
}

/// What to do when a date field cannot be normalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateErrorPolicy {
    /// Fail the whole extraction call.
    #[default]
    Abort,
    /// Drop the date field and keep the other fields.
    Skip,
}

/// Field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Fields to extract, in output order.
    pub fields: Vec<FieldKey>,

    /// Minimum fuzzy score (0-100) to accept a month correction.
    pub month_score_cutoff: u8,

    /// Behaviour on malformed dates.
    pub date_error_policy: DateErrorPolicy,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            fields: FieldKey::ALL.to_vec(),
            month_score_cutoff: 60,
            date_error_policy: DateErrorPolicy::Abort,
        }
    }
}

/// Model file paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("idcr")
                .join("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
        }
    }
}

impl ModelConfig {
    /// All model file names, detection first.
    pub fn files(&self) -> [&str; 3] {
        [&self.detection_model, &self.recognition_model, &self.dictionary]
    }

    /// Whether every model file is present in `model_dir`.
    pub fn is_complete(&self) -> bool {
        self.files().iter().all(|f| self.model_dir.join(f).exists())
    }
}

/// Template store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// JSON file with document type -> field -> bounding box percentages.
    pub path: PathBuf,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("templates.json"),
        }
    }
}

/// File name to document type lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentConfig(pub BTreeMap<String, String>);

impl Default for DocumentConfig {
    fn default() -> Self {
        Self(BTreeMap::from([
            ("TM.pdf".to_string(), "tm".to_string()),
            ("tnb_physical.jpg".to_string(), "tnb-full".to_string()),
            ("tnb_digital.jpg".to_string(), "tnb-online".to_string()),
        ]))
    }
}

/// HTTP service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,

    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: usize,

    /// Upper bound for one extraction call, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            max_upload_bytes: 20 * 1024 * 1024,
            request_timeout_secs: 60,
        }
    }
}

impl IdcrConfig {
    /// Default location of the config file.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("idcr")
            .join("config.json")
    }

    /// Load from an explicit path, or from the default path if it exists,
    /// or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, std::io::Error> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Self::default_path();
                if default.exists() {
                    Self::from_file(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }

    /// Get full path to a model file.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.models.model_dir.join(model_name)
    }
}
