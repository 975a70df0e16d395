//! Configuration module for Concierge.
//!
//! Handles loading settings (file + environment) and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AgentPrompts, Prompts};
pub use settings::{
    BingSettings, EmbeddingSettings, GeneralSettings, LlmSettings, LoaderSettings,
    PromptSettings, RetrievalSettings, ServiceSettings, Settings, StorageSettings, ToolSettings,
    TripAdvisorSettings, VenueApiSettings,
};
