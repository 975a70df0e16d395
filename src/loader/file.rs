//! Generic file loading for non-tabular sources.

use super::document::{Document, MetadataValue, FILE_TYPE, TYPE_KEY};
use crate::error::{ConciergeError, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Extensions read directly as UTF-8 text.
const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "json", "html", "htm", "xml", "yaml", "yml", "rst", "log",
];

/// Check if path has a plain-text extension.
pub fn is_text_file(path: &Path) -> bool {
    extension(path)
        .map(|ext| TEXT_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Check if path is a tabular source.
pub fn is_csv_file(path: &Path) -> bool {
    extension(path).as_deref() == Some("csv")
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Read a text file into a single document identified by its path relative to `root`.
pub fn load_text_file(path: &Path, root: &Path) -> Result<Document> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8(bytes)
        .map_err(|e| ConciergeError::loader(path, format!("not valid UTF-8: {}", e)))?;
    Ok(file_document(path, root, text))
}

/// Wrap extracted text from any file in a document.
pub fn file_document(path: &Path, root: &Path, text: String) -> Document {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let stem = path
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    let mut metadata = BTreeMap::new();
    metadata.insert("file_name".to_string(), MetadataValue::from(file_name));
    metadata.insert(
        "file_path".to_string(),
        MetadataValue::from(relative.display().to_string()),
    );
    metadata.insert("src".to_string(), MetadataValue::from(stem));
    metadata.insert(TYPE_KEY.to_string(), MetadataValue::from(FILE_TYPE));

    Document::new(relative.display().to_string(), text, metadata)
        .excluding_llm_keys(&["src", TYPE_KEY, "file_path"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_extension_detection() {
        assert!(is_text_file(Path::new("a/policy.MD")));
        assert!(is_text_file(Path::new("notes.txt")));
        assert!(!is_text_file(Path::new("menu.pdf")));
        assert!(is_csv_file(Path::new("venues.CSV")));
        assert!(!is_csv_file(Path::new("noext")));
    }

    #[test]
    fn test_load_text_file_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("docs");
        std::fs::create_dir_all(&nested).unwrap();
        let path = nested.join("policy.md");
        std::fs::write(&path, "# Policy\nBe nice.").unwrap();

        let doc = load_text_file(&path, dir.path()).unwrap();
        assert_eq!(doc.id(), PathBuf::from("docs").join("policy.md").display().to_string());
        assert_eq!(doc.get_str("file_name"), Some("policy.md"));
        assert_eq!(doc.get_str(TYPE_KEY), Some(FILE_TYPE));
        assert!(!doc.is_row());
        assert!(doc.text().contains("Be nice."));
    }

    #[test]
    fn test_invalid_utf8_is_loader_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        let err = load_text_file(&path, dir.path()).unwrap_err();
        assert!(matches!(err, ConciergeError::Loader { .. }));
    }
}
