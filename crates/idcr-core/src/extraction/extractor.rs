//! Per-document field extraction.

use std::path::Path;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info, warn};

use crate::document::{SourceKind, load_image_bytes};
use crate::error::{IdcrError, Result};
use crate::models::config::{DateErrorPolicy, ExtractionConfig, IdcrConfig, PreprocessConfig};
use crate::models::fields::ExtractedFields;
use crate::ocr::{EnsembleVoter, TextRecognizer, VariantRegistry};
use crate::template::{DocumentTypes, RoiBox, TemplateCatalog, TemplateStore};

use super::dates::DateNormalizer;

/// Builder for DocumentExtractor.
pub struct DocumentExtractorBuilder<R> {
    catalog: TemplateCatalog,
    variants: Option<VariantRegistry>,
    config: ExtractionConfig,
    recognizer: Option<R>,
}

impl<R: TextRecognizer> DocumentExtractorBuilder<R> {
    pub fn new() -> Self {
        Self {
            catalog: TemplateCatalog::default(),
            variants: None,
            config: ExtractionConfig::default(),
            recognizer: None,
        }
    }

    /// Set the template catalog.
    pub fn with_catalog(mut self, catalog: TemplateCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Set the preprocessing variants.
    pub fn with_variants(mut self, variants: VariantRegistry) -> Self {
        self.variants = Some(variants);
        self
    }

    /// Set extraction configuration.
    pub fn with_config(mut self, config: ExtractionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the OCR backend.
    pub fn with_recognizer(mut self, recognizer: R) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    /// Build the extractor. A recognizer is required; variants default to
    /// the standard Gaussian/median pair.
    pub fn build(self) -> Result<DocumentExtractor<R>> {
        let recognizer = self
            .recognizer
            .ok_or_else(|| IdcrError::Config("no OCR recognizer configured".to_string()))?;
        let variants = match self.variants {
            Some(v) => v,
            None => VariantRegistry::from_config(&PreprocessConfig::default())?,
        };
        if variants.is_empty() {
            return Err(IdcrError::Config(
                "at least one preprocessing variant is required".to_string(),
            ));
        }

        Ok(DocumentExtractor {
            catalog: self.catalog,
            variants,
            dates: DateNormalizer::new(self.config.month_score_cutoff),
            config: self.config,
            recognizer,
        })
    }
}

impl<R: TextRecognizer> Default for DocumentExtractorBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts the configured fields from a document image.
///
/// Read-only after construction; share it behind an `Arc` for concurrent use.
pub struct DocumentExtractor<R> {
    catalog: TemplateCatalog,
    variants: VariantRegistry,
    config: ExtractionConfig,
    dates: DateNormalizer,
    recognizer: R,
}

impl<R: TextRecognizer> DocumentExtractor<R> {
    /// Create a new builder.
    pub fn builder() -> DocumentExtractorBuilder<R> {
        DocumentExtractorBuilder::new()
    }

    /// Assemble an extractor from the full configuration, reading the
    /// template store from `config.templates.path`.
    pub fn from_config(config: &IdcrConfig, recognizer: R) -> Result<Self> {
        let templates = TemplateStore::from_file(&config.templates.path)?;
        let catalog = TemplateCatalog::new(DocumentTypes::from(&config.documents), templates);

        Self::builder()
            .with_catalog(catalog)
            .with_variants(VariantRegistry::from_config(&config.preprocess)?)
            .with_config(config.extraction.clone())
            .with_recognizer(recognizer)
            .build()
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    /// Extract fields from an already decoded page image.
    ///
    /// `file_name` selects the document type. Fields without a template
    /// region are left out of the result.
    pub fn extract_image(&self, file_name: &str, image: &DynamicImage) -> Result<ExtractedFields> {
        let start = Instant::now();
        let (width, height) = image.dimensions();
        let voter = EnsembleVoter::new(&self.recognizer);
        let mut fields = ExtractedFields::new();

        for &key in &self.config.fields {
            let Some(roi) = self.catalog.resolve(file_name, key.as_str(), width, height) else {
                continue;
            };

            let roi = clamp(roi, width, height);
            let text = if roi.is_empty() {
                warn!("{} region of {} is empty: {:?}", key, file_name, roi);
                String::new()
            } else {
                let crop = image.crop_imm(roi.x1, roi.y1, roi.width(), roi.height());
                voter.vote(&self.variants.render(&crop))
            };
            debug!("{} read as {:?}", key, text);

            let value = if key.is_date() {
                match self.dates.normalize(&text) {
                    Ok(date) => date,
                    Err(e) => match self.config.date_error_policy {
                        DateErrorPolicy::Abort => return Err(e.into()),
                        DateErrorPolicy::Skip => {
                            warn!("Dropping {} of {}: {}", key, file_name, e);
                            continue;
                        }
                    },
                }
            } else {
                text
            };

            fields.insert(key, value);
        }

        info!(
            "Extracted {} fields from {} in {}ms",
            fields.len(),
            file_name,
            start.elapsed().as_millis()
        );
        Ok(fields)
    }

    /// Load a document from disk and extract its fields.
    ///
    /// Unsupported file types give an empty result.
    pub fn extract_file(&self, path: &Path) -> Result<ExtractedFields> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let Some(kind) = SourceKind::from_file_name(&file_name) else {
            warn!("Unsupported file type: {}", path.display());
            return Ok(ExtractedFields::new());
        };

        let data = std::fs::read(path)?;
        let image = load_image_bytes(kind, &data)?;
        self.extract_image(&file_name, &image)
    }

    /// Extract fields from an in-memory upload named `file_name`.
    pub fn extract_bytes(&self, file_name: &str, data: &[u8]) -> Result<ExtractedFields> {
        let Some(kind) = SourceKind::from_file_name(file_name) else {
            warn!("Unsupported file type: {}", file_name);
            return Ok(ExtractedFields::new());
        };

        let image = load_image_bytes(kind, data)?;
        self.extract_image(file_name, &image)
    }
}

fn clamp(roi: RoiBox, width: u32, height: u32) -> RoiBox {
    RoiBox {
        x1: roi.x1.min(width),
        y1: roi.y1.min(height),
        x2: roi.x2.min(width),
        y2: roi.y2.min(height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DateError;
    use crate::models::fields::FieldKey;
    use crate::ocr::{MockRecognizer, TextLine};
    use crate::template::PercentBox;
    use image::{GrayImage, Luma};
    use pretty_assertions::assert_eq;

    fn catalog(with_date: bool) -> TemplateCatalog {
        let mut store = TemplateStore::default();
        store
            .insert("X", "name", PercentBox { x1: 10.0, y1: 10.0, x2: 50.0, y2: 20.0 })
            .unwrap();
        if with_date {
            store
                .insert("X", "date", PercentBox { x1: 10.0, y1: 60.0, x2: 50.0, y2: 70.0 })
                .unwrap();
        }
        let mut documents = DocumentTypes::new();
        documents.insert("card.png", "X");
        TemplateCatalog::new(documents, store)
    }

    fn page() -> DynamicImage {
        let gray = GrayImage::from_fn(200, 100, |x, y| {
            if (30..90).contains(&x) && (12..18).contains(&y) {
                Luma([20])
            } else {
                Luma([230])
            }
        });
        DynamicImage::ImageLuma8(gray)
    }

    fn extractor(
        catalog: TemplateCatalog,
        recognizer: MockRecognizer,
        policy: DateErrorPolicy,
    ) -> DocumentExtractor<MockRecognizer> {
        let config = ExtractionConfig {
            date_error_policy: policy,
            ..ExtractionConfig::default()
        };
        DocumentExtractor::builder()
            .with_catalog(catalog)
            .with_config(config)
            .with_recognizer(recognizer)
            .build()
            .unwrap()
    }

    #[test]
    fn most_confident_variant_wins_verbatim() {
        let ocr = MockRecognizer::sequence(vec![
            vec![TextLine::new(3.0, "JOHN D0E", 0.61)],
            vec![TextLine::new(4.0, "JOHN DOE", 0.93)],
        ]);
        let ex = extractor(catalog(false), ocr, DateErrorPolicy::Abort);

        let fields = ex.extract_image("card.png", &page()).unwrap();
        assert_eq!(fields.iter().collect::<Vec<_>>(), vec![(FieldKey::Name, "JOHN DOE")]);
        assert_eq!(ex.recognizer().calls(), 2);
    }

    #[test]
    fn extraction_is_repeatable() {
        let ocr = MockRecognizer::fixed(vec![TextLine::new(0.0, "JANE ROE", 0.8)]);
        let ex = extractor(catalog(false), ocr, DateErrorPolicy::Abort);
        let first = ex.extract_image("card.png", &page()).unwrap();
        let second = ex.extract_image("card.png", &page()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_file_name_gives_empty_mapping() {
        let ex = extractor(catalog(true), MockRecognizer::failing(), DateErrorPolicy::Abort);
        let fields = ex.extract_image("passport.png", &page()).unwrap();
        assert!(fields.is_empty());
        assert_eq!(ex.recognizer().calls(), 0);
    }

    #[test]
    fn date_is_normalized() {
        let ocr = MockRecognizer::fixed(vec![TextLine::new(0.0, "14 Mac 1995", 0.9)]);
        let ex = extractor(catalog(true), ocr, DateErrorPolicy::Abort);
        let fields = ex.extract_image("card.png", &page()).unwrap();
        assert_eq!(fields.get(FieldKey::Date), Some("950314"));
        assert_eq!(fields.get(FieldKey::Name), Some("14 Mac 1995"));
    }

    #[test]
    fn malformed_date_aborts_the_call() {
        let ocr = MockRecognizer::fixed(vec![TextLine::new(0.0, "14 1995", 0.9)]);
        let ex = extractor(catalog(true), ocr, DateErrorPolicy::Abort);
        let err = ex.extract_image("card.png", &page()).unwrap_err();
        assert!(matches!(
            err,
            IdcrError::Date(DateError::TokenCount { found: 2, .. })
        ));
    }

    #[test]
    fn skip_policy_drops_only_the_date() {
        let ocr = MockRecognizer::fixed(vec![TextLine::new(0.0, "14 1995", 0.9)]);
        let ex = extractor(catalog(true), ocr, DateErrorPolicy::Skip);
        let fields = ex.extract_image("card.png", &page()).unwrap();
        assert_eq!(fields.get(FieldKey::Name), Some("14 1995"));
        assert!(!fields.contains(FieldKey::Date));
    }

    #[test]
    fn zero_area_region_reads_as_empty_text() {
        let mut store = TemplateStore::default();
        store
            .insert("X", "name", PercentBox { x1: 10.0, y1: 10.0, x2: 10.0, y2: 20.0 })
            .unwrap();
        let mut documents = DocumentTypes::new();
        documents.insert("card.png", "X");
        let ocr = MockRecognizer::fixed(vec![TextLine::new(0.0, "never", 0.9)]);
        let ex = extractor(TemplateCatalog::new(documents, store), ocr, DateErrorPolicy::Abort);

        let fields = ex.extract_image("card.png", &page()).unwrap();
        assert_eq!(fields.get(FieldKey::Name), Some(""));
        assert_eq!(ex.recognizer().calls(), 0);
    }

    #[test]
    fn unsupported_upload_gives_empty_mapping() {
        let ocr = MockRecognizer::fixed(vec![TextLine::new(0.0, "x", 0.9)]);
        let ex = extractor(catalog(false), ocr, DateErrorPolicy::Abort);
        let fields = ex.extract_bytes("card.txt", b"hello").unwrap();
        assert!(fields.is_empty());
    }

    #[test]
    fn extract_file_uses_file_name_component() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("card.png");
        page().save(&path).unwrap();

        let ocr = MockRecognizer::fixed(vec![TextLine::new(0.0, "JANE ROE", 0.8)]);
        let ex = extractor(catalog(false), ocr, DateErrorPolicy::Abort);
        let fields = ex.extract_file(&path).unwrap();
        assert_eq!(fields.get(FieldKey::Name), Some("JANE ROE"));
    }

    #[test]
    fn extract_file_on_missing_file_is_io_error() {
        let ocr = MockRecognizer::fixed(Vec::new());
        let ex = extractor(catalog(false), ocr, DateErrorPolicy::Abort);
        let err = ex.extract_file(Path::new("/nonexistent/card.png")).unwrap_err();
        assert!(matches!(err, IdcrError::Io(_)));
    }

    #[test]
    fn builder_requires_recognizer() {
        let result = DocumentExtractor::<MockRecognizer>::builder().build();
        assert!(matches!(result, Err(IdcrError::Config(_))));
    }

    #[test]
    fn from_config_reads_template_file() {
        let dir = tempfile::tempdir().unwrap();
        let templates = dir.path().join("templates.json");
        std::fs::write(
            &templates,
            r#"{"tm": {"name": {"bounding_box_percent": {"x1": 0, "y1": 0, "x2": 50, "y2": 50}}}}"#,
        )
        .unwrap();

        let mut config = IdcrConfig::default();
        config.templates.path = templates;
        let ex = DocumentExtractor::from_config(&config, MockRecognizer::fixed(Vec::new())).unwrap();
        assert_eq!(ex.catalog().document_type("TM.pdf"), Some("tm"));
    }
}
