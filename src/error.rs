//! Error types for Concierge.

use crate::services::http::UpstreamFailure;
use crate::services::reviews::VenueIdError;
use thiserror::Error;

/// Library-level error type for Concierge operations.
#[derive(Error, Debug)]
pub enum ConciergeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid venue ID: {0}")]
    InvalidVenueId(#[from] VenueIdError),

    #[error("{service} request failed: {failure}")]
    Upstream {
        service: &'static str,
        failure: UpstreamFailure,
    },

    #[error("Failed to load documents from {path}: {reason}")]
    Loader { path: String, reason: String },

    #[error("Index error: {0}")]
    Index(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Agent error: {0}")]
    Agent(String),
}

impl ConciergeError {
    /// Build a loader error for a specific file.
    pub fn loader(path: impl AsRef<std::path::Path>, reason: impl std::fmt::Display) -> Self {
        Self::Loader {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for Concierge operations.
pub type Result<T> = std::result::Result<T, ConciergeError>;
