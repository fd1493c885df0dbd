//! Data models shared across the pipeline.

pub mod config;
pub mod fields;

pub use config::{DateErrorPolicy, IdcrConfig, VariantKind};
pub use fields::{ExtractedFields, FieldKey};
