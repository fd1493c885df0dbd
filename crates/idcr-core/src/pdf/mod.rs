//! PDF rasterization module.

mod extractor;

pub use extractor::PdfExtractor;

use crate::error::PdfError;
use image::DynamicImage;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Trait for PDF processing implementations.
pub trait PdfProcessor {
    /// Load a PDF from bytes.
    fn load(&mut self, data: &[u8]) -> Result<()>;

    /// Get the number of pages in the PDF.
    fn page_count(&self) -> u32;

    /// Render a page (1-indexed) as a raster image.
    fn render_page(&self, page: u32) -> Result<DynamicImage>;

    /// Extract embedded images from a page.
    fn extract_images(&self, page: u32) -> Result<Vec<DynamicImage>>;
}

/// Load `data` and render its first page.
pub fn first_page_image(data: &[u8]) -> Result<DynamicImage> {
    let mut extractor = PdfExtractor::new();
    extractor.load(data)?;
    extractor.render_page(1)
}
