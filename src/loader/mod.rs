//! Document loading from the data directory.
//!
//! CSV files become one document per row; plain-text files become one
//! document each; anything else goes through the parsing service when it is
//! enabled and is skipped otherwise. A failure on any file aborts the load.

mod document;
mod file;
mod parse;
mod tabular;

pub use document::{Document, MetadataValue, FILE_TYPE, ROW_TYPE, TYPE_KEY};
pub use file::{file_document, is_csv_file, is_text_file, load_text_file};
pub use parse::ParseClient;
pub use tabular::{load_csv, rows_to_documents, EXTERNAL_ID_KEY};

use crate::config::{LoaderSettings, Settings};
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use walkdir::WalkDir;

/// Loads every supported file under a directory.
pub struct DocumentLoader {
    data_dir: PathBuf,
    parser: Option<ParseClient>,
}

impl DocumentLoader {
    /// Build a loader for the configured data directory.
    ///
    /// Fails before touching any file if the parse service is enabled without a key.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(settings.data_dir(), &settings.loader)
    }

    pub fn new(data_dir: PathBuf, settings: &LoaderSettings) -> Result<Self> {
        let parser = if settings.use_parse_service {
            Some(ParseClient::from_settings(settings)?)
        } else {
            None
        };
        Ok(Self { data_dir, parser })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load all documents, in path order.
    pub async fn load(&self) -> Result<Vec<Document>> {
        if !self.data_dir.exists() {
            warn!("Data directory {} does not exist", self.data_dir.display());
            return Ok(Vec::new());
        }

        let mut documents = Vec::new();
        let mut rows = 0usize;

        for path in self.files()? {
            let loaded = self.load_path(&path).await.inspect_err(|e| {
                error!("Error loading {}: {}", path.display(), e);
            })?;
            if let Some(first) = loaded.first() {
                if first.is_row() {
                    rows += loaded.len();
                }
            }
            documents.extend(loaded);
        }

        info!(
            "Loaded {} documents ({} table rows) from {}",
            documents.len(),
            rows,
            self.data_dir.display()
        );
        Ok(documents)
    }

    fn files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let walker = WalkDir::new(&self.data_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| self.data_dir.clone());
                crate::error::ConciergeError::loader(path, e)
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    async fn load_path(&self, path: &Path) -> Result<Vec<Document>> {
        if is_csv_file(path) {
            info!("Processing CSV file: {}", path.display());
            return load_csv(path);
        }

        if is_text_file(path) {
            return Ok(vec![load_text_file(path, &self.data_dir)?]);
        }

        match &self.parser {
            Some(parser) => {
                let text = parser.parse_file(path).await?;
                Ok(vec![file_document(path, &self.data_dir, text)])
            }
            None => {
                warn!("Skipping unsupported file {}", path.display());
                Ok(Vec::new())
            }
        }
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().map(|s| s.starts_with('.')).unwrap_or(false)
}

/// Load every document under the configured data directory.
pub async fn get_documents(settings: &Settings) -> Result<Vec<Document>> {
    DocumentLoader::from_settings(settings)?.load().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConciergeError;

    fn loader(dir: &Path) -> DocumentLoader {
        DocumentLoader::new(dir.to_path_buf(), &LoaderSettings::default()).unwrap()
    }

    #[tokio::test]
    async fn test_mixed_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("venues.csv"),
            "Venue Name,City,State\nA,X,SP\nB,Y,RJ\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("about.md"), "We host events.").unwrap();
        std::fs::write(dir.path().join("menu.pdf"), b"%PDF").unwrap();
        std::fs::write(dir.path().join(".hidden.txt"), "secret").unwrap();

        let docs = loader(dir.path()).load().await.unwrap();
        assert_eq!(docs.len(), 3);
        // Sorted by file name: about.md before venues.csv.
        assert_eq!(docs[0].id(), "about.md");
        assert!(docs[1].is_row() && docs[2].is_row());
    }

    #[tokio::test]
    async fn test_parse_service_without_key_fails_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "fine").unwrap();

        let mut settings = Settings::default();
        settings.loader.data_dir = dir.path().display().to_string();
        settings.loader.use_parse_service = true;
        settings.loader.parse_api_key = None;

        let err = get_documents(&settings).await.unwrap_err();
        assert!(matches!(err, ConciergeError::Config(_)));
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let docs = loader(&dir.path().join("nope")).load().await.unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_one_bad_file_fails_the_load() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "fine").unwrap();
        std::fs::write(dir.path().join("b.txt"), [0xffu8, 0xfe]).unwrap();

        let err = loader(dir.path()).load().await.unwrap_err();
        assert!(matches!(err, ConciergeError::Loader { .. }));
    }

    #[test]
    fn test_parse_service_without_key_fails_early() {
        let settings = LoaderSettings {
            use_parse_service: true,
            parse_api_key: None,
            ..LoaderSettings::default()
        };
        let result = DocumentLoader::new(PathBuf::from("data"), &settings);
        assert!(matches!(result, Err(ConciergeError::Config(_))));
    }
}
