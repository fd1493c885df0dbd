//! Field keys and the extracted-field mapping.

use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// A field that can be extracted from a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKey {
    Address,
    Name,
    Date,
}

impl FieldKey {
    /// Default processing order.
    pub const ALL: [FieldKey; 3] = [FieldKey::Address, FieldKey::Name, FieldKey::Date];

    /// Key used in template files and output.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKey::Address => "address",
            FieldKey::Name => "name",
            FieldKey::Date => "date",
        }
    }

    /// Whether the field goes through date normalization.
    pub fn is_date(self) -> bool {
        matches!(self, FieldKey::Date)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "address" => Ok(FieldKey::Address),
            "name" => Ok(FieldKey::Name),
            "date" => Ok(FieldKey::Date),
            other => Err(format!("unknown field key: '{other}'")),
        }
    }
}

/// Extracted values keyed by field, in the order they were produced.
///
/// Fields whose region could not be resolved are absent; there are no
/// empty placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    entries: Vec<(FieldKey, String)>,
}

impl ExtractedFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, key: FieldKey, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: FieldKey) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: FieldKey) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &str)> {
        self.entries.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

impl Serialize for ExtractedFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key.as_str(), value)?;
        }
        map.end()
    }
}
