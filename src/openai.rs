//! OpenAI client configuration with sensible defaults.

use crate::error::{ConciergeError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Create an OpenAI client with a custom timeout.
///
/// Credentials come from `OPENAI_API_KEY` (and `OPENAI_BASE_URL` if set).
pub fn create_client_with_timeout(timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ConciergeError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let mut config = OpenAIConfig::default();
    if let Ok(base) = std::env::var("OPENAI_BASE_URL") {
        if !base.trim().is_empty() {
            config = config.with_api_base(base);
        }
    }

    Ok(Client::with_config(config).with_http_client(http_client))
}
