//! Line-level voting across preprocessing variants.

use std::cmp::Ordering;

use serde::Serialize;
use tracing::{debug, warn};

use super::{TextLine, TextRecognizer, VariantImage};

/// The winning reading of one line position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VotedLine {
    pub text: String,
    pub confidence: f32,
    /// Name of the variant that produced the winning reading.
    pub variant: String,
}

/// Runs the recognizer on every variant and keeps the most confident
/// reading of each line.
pub struct EnsembleVoter<'a, R: ?Sized> {
    recognizer: &'a R,
}

impl<'a, R: TextRecognizer + ?Sized> EnsembleVoter<'a, R> {
    pub fn new(recognizer: &'a R) -> Self {
        Self { recognizer }
    }

    /// Vote and join the winning lines with `\n`.
    pub fn vote(&self, variants: &[VariantImage]) -> String {
        self.vote_lines(variants)
            .into_iter()
            .map(|line| line.text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Vote line by line.
    ///
    /// Each variant's lines are sorted top to bottom and aligned by index.
    /// Only indices present in every successful variant are voted on. On a
    /// confidence tie the earlier variant wins. A variant whose recognition
    /// fails is skipped.
    pub fn vote_lines(&self, variants: &[VariantImage]) -> Vec<VotedLine> {
        let mut readings: Vec<(&str, Vec<TextLine>)> = Vec::with_capacity(variants.len());
        for variant in variants {
            match self.recognizer.recognize(&variant.image) {
                Ok(mut lines) => {
                    lines.sort_by(|a, b| {
                        a.anchor_y
                            .partial_cmp(&b.anchor_y)
                            .unwrap_or(Ordering::Equal)
                    });
                    debug!("Variant {} read {} lines", variant.name, lines.len());
                    readings.push((variant.name.as_str(), lines));
                }
                Err(e) => warn!("OCR failed on variant {}: {}", variant.name, e),
            }
        }

        let Some(count) = readings.iter().map(|(_, lines)| lines.len()).min() else {
            return Vec::new();
        };

        (0..count)
            .map(|i| {
                let (name, lines) = readings
                    .iter()
                    .skip(1)
                    .fold(&readings[0], |best, candidate| {
                        if candidate.1[i].confidence > best.1[i].confidence {
                            candidate
                        } else {
                            best
                        }
                    });
                VotedLine {
                    text: lines[i].text.clone(),
                    confidence: lines[i].confidence,
                    variant: name.to_string(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::MockRecognizer;
    use image::DynamicImage;
    use pretty_assertions::assert_eq;

    fn variants(names: &[&str]) -> Vec<VariantImage> {
        names
            .iter()
            .map(|n| VariantImage {
                name: n.to_string(),
                image: DynamicImage::new_luma8(4, 4),
            })
            .collect()
    }

    #[test]
    fn picks_most_confident_line_per_index() {
        let ocr = MockRecognizer::sequence(vec![
            vec![
                TextLine::new(50.0, "JLN MERAH", 0.70),
                TextLine::new(10.0, "N0 12", 0.95),
            ],
            vec![
                TextLine::new(11.0, "NO 12", 0.90),
                TextLine::new(49.0, "JALAN MERAH", 0.88),
            ],
        ]);
        let voter = EnsembleVoter::new(&ocr);
        let lines = voter.vote_lines(&variants(&["gaussian", "median"]));

        assert_eq!(lines[0].text, "N0 12");
        assert_eq!(lines[0].variant, "gaussian");
        assert_eq!(lines[1].text, "JALAN MERAH");
        assert_eq!(lines[1].variant, "median");
    }

    #[test]
    fn joins_with_newlines() {
        let ocr = MockRecognizer::fixed(vec![
            TextLine::new(2.0, "second", 0.9),
            TextLine::new(1.0, "first", 0.9),
        ]);
        let text = EnsembleVoter::new(&ocr).vote(&variants(&["a", "b"]));
        assert_eq!(text, "first\nsecond");
    }

    #[test]
    fn tie_goes_to_earlier_variant() {
        let ocr = MockRecognizer::sequence(vec![
            vec![TextLine::new(0.0, "from a", 0.8)],
            vec![TextLine::new(0.0, "from b", 0.8)],
        ]);
        assert_eq!(EnsembleVoter::new(&ocr).vote(&variants(&["a", "b"])), "from a");
    }

    #[test]
    fn voting_stops_at_shortest_variant() {
        let ocr = MockRecognizer::sequence(vec![
            vec![TextLine::new(0.0, "one", 0.5), TextLine::new(1.0, "two", 0.5)],
            vec![TextLine::new(0.0, "ONE", 0.6)],
        ]);
        assert_eq!(EnsembleVoter::new(&ocr).vote(&variants(&["a", "b"])), "ONE");
    }

    #[test]
    fn empty_variant_yields_empty_text() {
        let ocr = MockRecognizer::sequence(vec![vec![TextLine::new(0.0, "x", 0.9)], vec![]]);
        assert_eq!(EnsembleVoter::new(&ocr).vote(&variants(&["a", "b"])), "");
    }

    #[test]
    fn failed_variant_is_skipped() {
        let ocr = MockRecognizer::scripted(vec![
            Err("boom".to_string()),
            Ok(vec![TextLine::new(0.0, "kept", 0.4)]),
        ]);
        assert_eq!(EnsembleVoter::new(&ocr).vote(&variants(&["a", "b"])), "kept");
    }

    #[test]
    fn all_variants_failing_yields_empty_text() {
        let ocr = MockRecognizer::failing();
        assert_eq!(EnsembleVoter::new(&ocr).vote(&variants(&["a", "b"])), "");
    }
}
