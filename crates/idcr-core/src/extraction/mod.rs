//! Field extraction: region OCR, month correction and date normalization.

pub mod dates;
pub mod extractor;
pub mod fuzzy;
pub mod patterns;

pub use dates::{DateNormalizer, MONTHS, correct_month, normalize_date};
pub use extractor::{DocumentExtractor, DocumentExtractorBuilder};
