//! Core library for identity document field extraction.
//!
//! This crate provides:
//! - Template-driven regions of interest per document type
//! - Illumination-normalizing preprocessing variants
//! - An OCR adapter and line-level voting across variants
//! - Date normalization with fuzzy month correction
//! - Embedded raster extraction for scanned PDFs

pub mod document;
pub mod error;
pub mod extraction;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod template;

pub use document::{SourceKind, load_image_bytes};
pub use error::{DateError, IdcrError, OcrError, PdfError, Result, TemplateError};
pub use extraction::{DocumentExtractor, DocumentExtractorBuilder, DateNormalizer, normalize_date};
pub use models::{DateErrorPolicy, ExtractedFields, FieldKey, IdcrConfig, VariantKind};
pub use ocr::{EnsembleVoter, MockRecognizer, TextLine, TextRecognizer, VariantRegistry};
pub use template::{DocumentTypes, PercentBox, RoiBox, TemplateCatalog, TemplateStore};

#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
