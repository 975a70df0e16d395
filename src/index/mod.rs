//! Document indices: one persisted vector index per [`IndexType`].
//!
//! Each type lives in its own subdirectory of the storage base directory
//! (`base/general`, `base/venue`), holding a single `index.sqlite3`.
//! Loaded storage contexts are shared through a bounded TTL cache.

mod cache;
mod storage;
mod store;
mod vector;

pub use cache::{Clock, ManualClock, SystemClock, TtlCache};
pub use storage::{Node, StorageContext};
pub use store::{partition_documents, IndexStore};
pub use vector::{format_context, ScoredNode, VectorIndex, DEFAULT_TOP_K};

use crate::agent::CallbackManager;
use crate::error::ConciergeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File holding a persisted index inside its directory.
pub const INDEX_FILE: &str = "index.sqlite3";

/// Which corpus an index covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    /// Prose documents: policies, product info, anything that is not a table row.
    General,
    /// Venue table rows.
    Venue,
}

impl IndexType {
    pub const ALL: [IndexType; 2] = [IndexType::General, IndexType::Venue];

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexType::General => "general",
            IndexType::Venue => "venue",
        }
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexType {
    type Err = ConciergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "general" => Ok(IndexType::General),
            "venue" => Ok(IndexType::Venue),
            _ => Err(ConciergeError::InvalidInput(format!(
                "Invalid index type '{}'. Must be one of: general, venue",
                s
            ))),
        }
    }
}

/// Per-request options for opening an index.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub index_type: IndexType,
    pub callbacks: Option<CallbackManager>,
}

impl IndexConfig {
    pub fn new(index_type: IndexType) -> Self {
        Self {
            index_type,
            callbacks: None,
        }
    }

    pub fn with_callbacks(mut self, callbacks: CallbackManager) -> Self {
        self.callbacks = Some(callbacks);
        self
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::new(IndexType::General)
    }
}

/// Directory holding the index of the given type.
pub fn storage_path(base: &Path, index_type: IndexType) -> PathBuf {
    base.join(index_type.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_type_parsing() {
        assert_eq!("VENUE".parse::<IndexType>().unwrap(), IndexType::Venue);
        assert_eq!(" general ".parse::<IndexType>().unwrap(), IndexType::General);
        assert!(matches!(
            "menus".parse::<IndexType>(),
            Err(ConciergeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_index_type_serde() {
        assert_eq!(serde_json::to_string(&IndexType::Venue).unwrap(), "\"venue\"");
        let parsed: IndexType = serde_json::from_str("\"general\"").unwrap();
        assert_eq!(parsed, IndexType::General);
    }

    #[test]
    fn test_each_type_has_its_own_directory() {
        let base = Path::new("storage");
        assert_eq!(storage_path(base, IndexType::General), base.join("general"));
        assert_eq!(storage_path(base, IndexType::Venue), base.join("venue"));
        assert_ne!(
            storage_path(base, IndexType::General),
            storage_path(base, IndexType::Venue)
        );
    }
}
