//! Error types for the idcr-core library.

use thiserror::Error;

/// Main error type for the idcr library.
#[derive(Error, Debug)]
pub enum IdcrError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Date field could not be normalized.
    #[error("date error: {0}")]
    Date(#[from] DateError),

    /// Template store error.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),

    /// The page carries no decodable raster image.
    #[error("page {0} has no decodable raster image")]
    NoRaster(u32),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// The engine failed while recognizing an image.
    #[error("recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors raised while normalizing a date field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    /// The text did not split into day, month and year.
    #[error("expected 3 whitespace-separated tokens, found {found} in {text:?}")]
    TokenCount { found: usize, text: String },

    /// The recombined text is not a calendar date.
    #[error("not a valid \"day month year\" date: {text:?}")]
    Parse { text: String },
}

/// Errors related to the template store.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// The template file could not be read.
    #[error("failed to read templates: {0}")]
    Io(#[from] std::io::Error),

    /// The template file is not valid JSON for the store layout.
    #[error("failed to parse templates: {0}")]
    Parse(#[from] serde_json::Error),

    /// A bounding box is out of range or inverted.
    #[error("invalid bounding box for {document_type}/{field}: {reason}")]
    InvalidBox {
        document_type: String,
        field: String,
        reason: String,
    },
}

/// Result type for the idcr library.
pub type Result<T> = std::result::Result<T, IdcrError>;
