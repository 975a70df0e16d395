//! Configuration settings for Concierge.

use crate::index::IndexType;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub storage: StorageSettings,
    pub retrieval: RetrievalSettings,
    pub embedding: EmbeddingSettings,
    pub llm: LlmSettings,
    pub services: ServiceSettings,
    pub loader: LoaderSettings,
    pub tools: ToolSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Index persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Base directory holding one subdirectory per index type.
    pub base_dir: String,
    /// Maximum number of storage contexts kept in memory.
    pub cache_capacity: usize,
    /// Seconds a loaded storage context stays cached.
    pub cache_ttl_seconds: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            base_dir: "storage".to_string(),
            cache_capacity: 20,
            cache_ttl_seconds: 300,
        }
    }
}

/// Chunking and retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of nodes returned per query. Zero means "use the index default".
    pub top_k: usize,
    /// Chunk size (tokens) for tabular venue content.
    pub venue_chunk_size: usize,
    /// Chunk size (tokens) for prose content.
    pub general_chunk_size: usize,
    /// Token overlap between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 4,
            venue_chunk_size: 4096,
            general_chunk_size: 1024,
            chunk_overlap: 20,
        }
    }
}

impl RetrievalSettings {
    /// Chunk size used when building an index of the given type.
    pub fn chunk_size(&self, index_type: IndexType) -> usize {
        match index_type {
            IndexType::Venue => self.venue_chunk_size,
            IndexType::General => self.general_chunk_size,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Chat model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Chat model driving the agent.
    pub model: String,
    /// Maximum model calls per user turn.
    pub max_iterations: usize,
    /// Overrides the built-in system prompt.
    pub system_prompt: Option<String>,
    /// Timeout for chat and embedding API calls.
    pub timeout_seconds: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_iterations: 15,
            system_prompt: None,
            timeout_seconds: 300,
        }
    }
}

/// Partner service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Timeout applied to every partner API call.
    pub timeout_seconds: u64,
    pub tripadvisor: TripAdvisorSettings,
    pub bing: BingSettings,
    pub venues: VenueApiSettings,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            tripadvisor: TripAdvisorSettings::default(),
            bing: BingSettings::default(),
            venues: VenueApiSettings::default(),
        }
    }
}

impl ServiceSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// TripAdvisor content API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TripAdvisorSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Review language requested from the API.
    pub language: String,
    /// Reviews fetched when the caller gives no limit.
    pub default_limit: u32,
}

impl Default for TripAdvisorSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.content.tripadvisor.com/api/v1".to_string(),
            api_key: None,
            language: "pt".to_string(),
            default_limit: 5,
        }
    }
}

/// Bing web search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BingSettings {
    pub endpoint: String,
    pub subscription_key: Option<String>,
    pub default_count: u32,
}

impl Default for BingSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.bing.microsoft.com/v7.0/search".to_string(),
            subscription_key: None,
            default_count: 3,
        }
    }
}

/// Venue management backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VenueApiSettings {
    pub base_url: String,
}

impl Default for VenueApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001/api/v1".to_string(),
        }
    }
}

/// Document loading settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    /// Directory scanned for source files.
    pub data_dir: String,
    /// Send non-text files to the document parsing service.
    pub use_parse_service: bool,
    pub parse_api_key: Option<String>,
    pub parse_base_url: String,
    /// Delay between job status polls.
    pub poll_interval_ms: u64,
    /// Status polls before a parse job is abandoned.
    pub max_poll_attempts: u32,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            use_parse_service: false,
            parse_api_key: None,
            parse_base_url: "https://api.cloud.llamaindex.ai/api/parsing".to_string(),
            poll_interval_ms: 2000,
            max_poll_attempts: 90,
        }
    }
}

/// Additional tool families appended after the built-in adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Names of optional tool families (currently: "venues").
    pub enabled: Vec<String>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            enabled: vec!["venues".to_string()],
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file plus the environment.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// Environment variables take precedence over the file.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Overlay values from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("STORAGE_DIR") {
            self.storage.base_dir = v;
        }
        if let Some(v) = var("DATA_DIR") {
            self.loader.data_dir = v;
        }
        if let Some(v) = var("TOP_K") {
            match v.parse() {
                Ok(k) => self.retrieval.top_k = k,
                Err(_) => warn!("Ignoring non-numeric TOP_K value: {}", v),
            }
        }
        if let Some(v) = var("SYSTEM_PROMPT") {
            self.llm.system_prompt = Some(v);
        }
        if let Some(v) = var("MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = var("EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Some(v) = var("EMBEDDING_DIM") {
            match v.parse() {
                Ok(d) => self.embedding.dimensions = d,
                Err(_) => warn!("Ignoring non-numeric EMBEDDING_DIM value: {}", v),
            }
        }
        if let Some(v) = var("TRIPADVISOR_API_KEY") {
            self.services.tripadvisor.api_key = Some(v);
        }
        if let Some(v) = var("BING_SEARCH_KEY") {
            self.services.bing.subscription_key = Some(v);
        }
        if let Some(v) = var("VENUE_API_URL") {
            self.services.venues.base_url = v;
        }
        if let Some(v) = var("LLAMA_CLOUD_API_KEY") {
            self.loader.parse_api_key = Some(v);
        }
        if let Some(v) = var("USE_LLAMA_PARSE") {
            self.loader.use_parse_service = matches!(v.to_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ConciergeError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("concierge")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded storage base directory.
    pub fn storage_dir(&self) -> PathBuf {
        Self::expand_path(&self.storage.base_dir)
    }

    /// Get the expanded source data directory.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.loader.data_dir)
    }

    /// Whether an optional tool family is switched on.
    pub fn tool_enabled(&self, family: &str) -> bool {
        self.tools.enabled.iter().any(|t| t.eq_ignore_ascii_case(family))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("STORAGE_DIR", "/srv/idx"),
            ("TOP_K", "7"),
            ("TRIPADVISOR_API_KEY", "ta-key"),
            ("BING_SEARCH_KEY", ""),
            ("USE_LLAMA_PARSE", "true"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        settings.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(settings.storage.base_dir, "/srv/idx");
        assert_eq!(settings.retrieval.top_k, 7);
        assert_eq!(settings.services.tripadvisor.api_key.as_deref(), Some("ta-key"));
        // Empty values count as unset.
        assert!(settings.services.bing.subscription_key.is_none());
        assert!(settings.loader.use_parse_service);
    }

    #[test]
    fn test_bad_top_k_is_ignored() {
        let mut settings = Settings::default();
        settings.apply_env(|k| (k == "TOP_K").then(|| "many".to_string()));
        assert_eq!(settings.retrieval.top_k, 4);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [retrieval]
            top_k = 2

            [services.tripadvisor]
            language = "en"
            "#,
        )
        .unwrap();

        assert_eq!(settings.retrieval.top_k, 2);
        assert_eq!(settings.retrieval.venue_chunk_size, 4096);
        assert_eq!(settings.services.tripadvisor.language, "en");
        assert_eq!(settings.services.bing.default_count, 3);
        assert_eq!(settings.retrieval.chunk_size(IndexType::Venue), 4096);
        assert_eq!(settings.retrieval.chunk_size(IndexType::General), 1024);
    }
}
