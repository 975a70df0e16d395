//! Pre-flight checks before expensive operations.
//!
//! Validates that required keys and indices are available before starting
//! operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{ConciergeError, Result};
use crate::index::IndexType;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Building indices embeds every document.
    Generate,
    /// Answering needs the chat model; indices are optional.
    Ask,
    /// Listing tools needs nothing external.
    Tools,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Generate => {
            check_api_key()?;
            check_data_dir(settings)?;
        }
        Operation::Ask => {
            check_api_key()?;
        }
        Operation::Tools => {}
    }
    Ok(())
}

/// Index types that have not been generated yet.
pub fn missing_indices(settings: &Settings) -> Vec<IndexType> {
    let base = settings.storage_dir();
    IndexType::ALL
        .into_iter()
        .filter(|t| !crate::index::storage_path(&base, *t).exists())
        .collect()
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(ConciergeError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(ConciergeError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

fn check_data_dir(settings: &Settings) -> Result<()> {
    let dir = settings.data_dir();
    if dir.is_dir() {
        Ok(())
    } else {
        Err(ConciergeError::Config(format!(
            "Data directory {} does not exist. Set loader.data_dir or DATA_DIR.",
            dir.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_tools_no_requirements() {
        assert!(check(Operation::Tools, &Settings::default()).is_ok());
    }

    #[test]
    fn test_missing_data_dir_is_reported() {
        let mut settings = Settings::default();
        settings.loader.data_dir = "/nonexistent/concierge-data".to_string();
        assert!(check_data_dir(&settings).is_err());
    }

    #[test]
    fn test_missing_indices() {
        let storage = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.storage.base_dir = storage.path().display().to_string();
        assert_eq!(missing_indices(&settings).len(), 2);

        std::fs::create_dir_all(storage.path().join("venue")).unwrap();
        assert_eq!(missing_indices(&settings), vec![IndexType::General]);
    }
}
