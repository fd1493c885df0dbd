//! OCR adapter, preprocessing variants and ensemble voting.

mod ensemble;
mod mock;
mod preprocessing;
#[cfg(feature = "native")]
mod pure_engine;

pub use ensemble::{EnsembleVoter, VotedLine};
pub use mock::MockRecognizer;
pub use preprocessing::{
    GaussianNormalize, MedianNormalize, Variant, VariantImage, VariantRegistry, gaussian_sigma,
    pad,
};

#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;

use std::sync::Arc;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;

/// One recognized text line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    /// Vertical position of the line's anchor point, used for ordering.
    pub anchor_y: f32,

    /// Recognized text.
    pub text: String,

    /// Recognition confidence (0.0 - 1.0).
    pub confidence: f32,
}

impl TextLine {
    pub fn new(anchor_y: f32, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            anchor_y,
            text: text.into(),
            confidence,
        }
    }
}

/// Abstraction over an OCR backend.
///
/// Implementations return the lines found in `image` in any order; callers
/// sort by [`TextLine::anchor_y`].
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<TextLine>, OcrError>;
}

impl<R: TextRecognizer + ?Sized> TextRecognizer for Box<R> {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<TextLine>, OcrError> {
        (**self).recognize(image)
    }
}

impl<R: TextRecognizer + ?Sized> TextRecognizer for Arc<R> {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<TextLine>, OcrError> {
        (**self).recognize(image)
    }
}

impl<R: TextRecognizer + ?Sized> TextRecognizer for &R {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<TextLine>, OcrError> {
        (**self).recognize(image)
    }
}
