//! Template store and region-of-interest resolution.
//!
//! Templates describe where each field sits on a document type, as
//! percentages of the page size:
//!
//! ```json
//! { "tm": { "name": { "bounding_box_percent": { "x1": 10, "y1": 10, "x2": 50, "y2": 20 } } } }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::TemplateError;
use crate::models::config::DocumentConfig;

/// Bounding box in percent of image width/height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl PercentBox {
    fn validate(&self) -> Result<(), String> {
        for (name, v) in [("x1", self.x1), ("y1", self.y1), ("x2", self.x2), ("y2", self.y2)] {
            if !(0.0..=100.0).contains(&v) {
                return Err(format!("{name}={v} is outside 0..=100"));
            }
        }
        if self.x1 > self.x2 {
            return Err(format!("x1={} is greater than x2={}", self.x1, self.x2));
        }
        if self.y1 > self.y2 {
            return Err(format!("y1={} is greater than y2={}", self.y1, self.y2));
        }
        Ok(())
    }

    /// Scale to pixel space, truncating toward zero.
    pub fn to_pixels(&self, width: u32, height: u32) -> RoiBox {
        let scale = |pct: f64, dim: u32| (pct * dim as f64 / 100.0) as u32;
        RoiBox {
            x1: scale(self.x1, width),
            y1: scale(self.y1, height),
            x2: scale(self.x2, width),
            y2: scale(self.y2, height),
        }
    }
}

/// One field entry of a template.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldTemplate {
    pub bounding_box_percent: PercentBox,
}

/// Pixel-space region of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoiBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl RoiBox {
    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// Document type -> field key -> template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateStore {
    documents: BTreeMap<String, BTreeMap<String, FieldTemplate>>,
}

impl TemplateStore {
    /// Load and validate a JSON template file.
    pub fn from_file(path: &Path) -> Result<Self, TemplateError> {
        let content = std::fs::read_to_string(path)?;
        let store = Self::from_json_str(&content)?;
        debug!(
            "Loaded {} document templates from {}",
            store.documents.len(),
            path.display()
        );
        Ok(store)
    }

    /// Parse and validate a JSON template document.
    pub fn from_json_str(json: &str) -> Result<Self, TemplateError> {
        let store: Self = serde_json::from_str(json)?;
        store.validate()?;
        Ok(store)
    }

    /// Add or replace one field template.
    pub fn insert(
        &mut self,
        document_type: impl Into<String>,
        field: impl Into<String>,
        bbox: PercentBox,
    ) -> Result<(), TemplateError> {
        let document_type = document_type.into();
        let field = field.into();
        bbox.validate().map_err(|reason| TemplateError::InvalidBox {
            document_type: document_type.clone(),
            field: field.clone(),
            reason,
        })?;
        self.documents
            .entry(document_type)
            .or_default()
            .insert(field, FieldTemplate { bounding_box_percent: bbox });
        Ok(())
    }

    fn validate(&self) -> Result<(), TemplateError> {
        for (document_type, fields) in &self.documents {
            for (field, template) in fields {
                template
                    .bounding_box_percent
                    .validate()
                    .map_err(|reason| TemplateError::InvalidBox {
                        document_type: document_type.clone(),
                        field: field.clone(),
                        reason,
                    })?;
            }
        }
        Ok(())
    }

    pub fn get(&self, document_type: &str, field: &str) -> Option<&PercentBox> {
        self.documents
            .get(document_type)?
            .get(field)
            .map(|t| &t.bounding_box_percent)
    }

    pub fn document_types(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    pub fn fields(&self, document_type: &str) -> impl Iterator<Item = &str> {
        self.documents
            .get(document_type)
            .into_iter()
            .flat_map(|fields| fields.keys().map(String::as_str))
    }
}

/// Exact, case-sensitive file name -> document type lookup.
#[derive(Debug, Clone, Default)]
pub struct DocumentTypes {
    by_file_name: HashMap<String, String>,
}

impl DocumentTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file_name: impl Into<String>, document_type: impl Into<String>) {
        self.by_file_name.insert(file_name.into(), document_type.into());
    }

    pub fn get(&self, file_name: &str) -> Option<&str> {
        self.by_file_name.get(file_name).map(String::as_str)
    }
}

impl From<&DocumentConfig> for DocumentTypes {
    fn from(config: &DocumentConfig) -> Self {
        let mut types = Self::new();
        for (file_name, document_type) in &config.0 {
            types.insert(file_name.clone(), document_type.clone());
        }
        types
    }
}

/// Templates plus the file name lookup; read-only once built.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    documents: DocumentTypes,
    templates: TemplateStore,
}

impl TemplateCatalog {
    pub fn new(documents: DocumentTypes, templates: TemplateStore) -> Self {
        Self { documents, templates }
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    pub fn document_type(&self, file_name: &str) -> Option<&str> {
        self.documents.get(file_name)
    }

    /// Resolve the pixel box of `field` for a document image.
    ///
    /// Returns `None` when the file name has no document type or the type
    /// has no template for the field. Both cases are logged and are never
    /// errors.
    pub fn resolve(&self, file_name: &str, field: &str, width: u32, height: u32) -> Option<RoiBox> {
        let Some(document_type) = self.documents.get(file_name) else {
            info!("{} is missing from the document type lookup", file_name);
            return None;
        };

        let Some(bbox) = self.templates.get(document_type, field) else {
            info!("{} is missing from the {} template", field, document_type);
            return None;
        };

        let roi = bbox.to_pixels(width, height);
        debug!("Resolved {}/{} to {:?}", document_type, field, roi);
        Some(roi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TEMPLATES: &str = r#"{
        "x": {
            "name": { "bounding_box_percent": { "x1": 10, "y1": 10, "x2": 50, "y2": 20 } },
            "date": { "bounding_box_percent": { "x1": 60, "y1": 70.5, "x2": 95, "y2": 80 } }
        },
        "y": {
            "address": { "bounding_box_percent": { "x1": 0, "y1": 0, "x2": 100, "y2": 100 } }
        }
    }"#;

    fn catalog() -> TemplateCatalog {
        let mut documents = DocumentTypes::new();
        documents.insert("card.jpg", "x");
        documents.insert("form.pdf", "y");
        TemplateCatalog::new(documents, TemplateStore::from_json_str(TEMPLATES).unwrap())
    }

    #[test]
    fn resolve_scales_and_truncates() {
        let roi = catalog().resolve("card.jpg", "name", 333, 201).unwrap();
        assert_eq!(roi, RoiBox { x1: 33, y1: 20, x2: 166, y2: 40 });
    }

    #[test]
    fn resolve_unknown_file_name_is_none() {
        assert_eq!(catalog().resolve("other.jpg", "name", 100, 100), None);
    }

    #[test]
    fn resolve_is_case_sensitive() {
        assert_eq!(catalog().resolve("CARD.jpg", "name", 100, 100), None);
    }

    #[test]
    fn resolve_missing_field_is_none() {
        assert_eq!(catalog().resolve("card.jpg", "address", 100, 100), None);
    }

    #[test]
    fn resolved_boxes_are_ordered_for_every_template() {
        let catalog = catalog();
        let store = catalog.templates();
        for document_type in store.document_types() {
            for field in store.fields(document_type) {
                for (w, h) in [(1, 1), (97, 13), (1240, 1754)] {
                    let roi = store.get(document_type, field).unwrap().to_pixels(w, h);
                    assert!(roi.x1 <= roi.x2, "{document_type}/{field} at {w}x{h}");
                    assert!(roi.y1 <= roi.y2, "{document_type}/{field} at {w}x{h}");
                    assert!(roi.x2 <= w && roi.y2 <= h);
                }
            }
        }
    }

    #[test]
    fn inverted_box_is_rejected() {
        let json = r#"{"x": {"name": {"bounding_box_percent": {"x1": 50, "y1": 10, "x2": 10, "y2": 20}}}}"#;
        let err = TemplateStore::from_json_str(json).unwrap_err();
        assert!(matches!(err, TemplateError::InvalidBox { ref field, .. } if field == "name"));
    }

    #[test]
    fn out_of_range_box_is_rejected() {
        let mut store = TemplateStore::default();
        let bbox = PercentBox { x1: 0.0, y1: 0.0, x2: 120.0, y2: 10.0 };
        assert!(store.insert("x", "name", bbox).is_err());
    }

    #[test]
    fn from_file_reads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.json");
        std::fs::write(&path, TEMPLATES).unwrap();

        let store = TemplateStore::from_file(&path).unwrap();
        assert_eq!(store.document_types().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(store.fields("x").collect::<Vec<_>>(), vec!["date", "name"]);
    }

    #[test]
    fn bundled_templates_cover_default_documents() {
        let store = TemplateStore::from_json_str(include_str!("../../../templates.json")).unwrap();
        for document_type in DocumentConfig::default().0.values() {
            let fields: Vec<_> = store.fields(document_type).collect();
            assert_eq!(fields, vec!["address", "date", "name"], "{document_type}");
        }
    }

    #[test]
    fn document_types_from_config() {
        let types = DocumentTypes::from(&DocumentConfig::default());
        assert_eq!(types.get("tnb_digital.jpg"), Some("tnb-online"));
        assert_eq!(types.get("tnb_digital.JPG"), None);
    }
}
