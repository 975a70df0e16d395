//! The retrievable unit produced by the loaders.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Metadata key holding the record kind.
pub const TYPE_KEY: &str = "type";
/// Record kind for rows of tabular files.
pub const ROW_TYPE: &str = "row";
/// Record kind for whole-file documents.
pub const FILE_TYPE: &str = "file";

/// A scalar metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetadataValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Bool(b) => write!(f, "{}", b),
            MetadataValue::Int(i) => write!(f, "{}", i),
            MetadataValue::Float(x) => write!(f, "{}", x),
            MetadataValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Text(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::Text(s)
    }
}

impl From<i64> for MetadataValue {
    fn from(i: i64) -> Self {
        MetadataValue::Int(i)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

/// Text plus scalar metadata. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    id: String,
    text: String,
    metadata: BTreeMap<String, MetadataValue>,
    /// Metadata keys hidden from the text the language model sees.
    excluded_llm_metadata_keys: Vec<String>,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        metadata: BTreeMap<String, MetadataValue>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata,
            excluded_llm_metadata_keys: Vec::new(),
        }
    }

    /// Hide bookkeeping keys from the model-facing rendering.
    pub fn excluding_llm_keys(mut self, keys: &[&str]) -> Self {
        self.excluded_llm_metadata_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    /// Copy of this document with one more metadata entry.
    pub fn with_metadata(&self, key: &str, value: impl Into<MetadataValue>) -> Self {
        let mut doc = self.clone();
        doc.metadata.insert(key.to_string(), value.into());
        doc
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn metadata(&self) -> &BTreeMap<String, MetadataValue> {
        &self.metadata
    }

    pub fn excluded_llm_metadata_keys(&self) -> &[String] {
        &self.excluded_llm_metadata_keys
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.metadata.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(MetadataValue::as_str)
    }

    /// Whether this document is a row of a tabular source.
    pub fn is_row(&self) -> bool {
        self.get_str(TYPE_KEY) == Some(ROW_TYPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_detection() {
        let mut metadata = BTreeMap::new();
        metadata.insert(TYPE_KEY.to_string(), MetadataValue::from(ROW_TYPE));
        let row = Document::new("a#0", "Venue Name: Bar", metadata);
        assert!(row.is_row());

        let file = Document::new("notes.md", "text", BTreeMap::new());
        assert!(!file.is_row());
    }

    #[test]
    fn test_with_metadata_leaves_original_untouched() {
        let doc = Document::new("d", "text", BTreeMap::new());
        let tagged = doc.with_metadata("private", "false");
        assert!(doc.get("private").is_none());
        assert_eq!(tagged.get_str("private"), Some("false"));
    }

    #[test]
    fn test_metadata_value_json_shapes() {
        let values: Vec<MetadataValue> = serde_json::from_str(r#"[true, 3, 1.5, "x"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                MetadataValue::Bool(true),
                MetadataValue::Int(3),
                MetadataValue::Float(1.5),
                MetadataValue::Text("x".to_string())
            ]
        );
    }
}
