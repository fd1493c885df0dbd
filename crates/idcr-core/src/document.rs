//! Input file classification and decoding.

use std::path::Path;

use image::DynamicImage;
use tracing::debug;

use crate::error::Result;
use crate::pdf;

/// Kind of input document, decided from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Image,
    Pdf,
}

impl SourceKind {
    const IMAGE_EXTENSIONS: [&'static str; 6] = ["jpg", "jpeg", "png", "bmp", "tif", "tiff"];

    /// Classify by extension, case-insensitively. `None` means unsupported.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let ext = Path::new(file_name)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        if ext == "pdf" {
            Some(SourceKind::Pdf)
        } else if Self::IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(SourceKind::Image)
        } else {
            None
        }
    }
}

/// Decode `data` into a full-page image.
///
/// PDFs yield the raster of their first page.
pub fn load_image_bytes(kind: SourceKind, data: &[u8]) -> Result<DynamicImage> {
    let image = match kind {
        SourceKind::Image => image::load_from_memory(data)?,
        SourceKind::Pdf => pdf::first_page_image(data)?,
    };
    debug!("Decoded {:?} source: {}x{}", kind, image.width(), image.height());
    Ok(image)
}
