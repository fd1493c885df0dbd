use std::sync::atomic::{AtomicUsize, Ordering};

use image::DynamicImage;

use crate::error::OcrError;

use super::{TextLine, TextRecognizer};

/// Returns pre-set lines, useful for testing the pipeline without models.
pub struct MockRecognizer {
    responses: Vec<Result<Vec<TextLine>, String>>,
    calls: AtomicUsize,
}

impl MockRecognizer {
    /// Same lines for every call.
    pub fn fixed(lines: Vec<TextLine>) -> Self {
        Self::sequence(vec![lines])
    }

    /// One response per call, cycling when exhausted.
    pub fn sequence(responses: Vec<Vec<TextLine>>) -> Self {
        Self {
            responses: responses.into_iter().map(Ok).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Successes and failures per call, cycling when exhausted.
    pub fn scripted(responses: Vec<Result<Vec<TextLine>, String>>) -> Self {
        Self {
            responses,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call fails.
    pub fn failing() -> Self {
        Self::scripted(vec![Err("mock failure".to_string())])
    }

    /// Number of `recognize` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextRecognizer for MockRecognizer {
    fn recognize(&self, _image: &DynamicImage) -> Result<Vec<TextLine>, OcrError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.responses.is_empty() {
            return Ok(Vec::new());
        }
        match &self.responses[n % self.responses.len()] {
            Ok(lines) => Ok(lines.clone()),
            Err(msg) => Err(OcrError::Recognition(msg.clone())),
        }
    }
}
