//! Concierge - a retrieval-augmented venue assistant
//!
//! Answers questions about venues by letting a tool-calling language model
//! route between document indices and partner services.
//!
//! # Overview
//!
//! Concierge allows you to:
//! - Build persisted vector indices from documents and venue tables
//! - Query those indices as tools from a chat agent
//! - Look up venues by occasion or name, browse menus and manage reservations
//! - Fetch TripAdvisor reviews and Bing web results
//! - Serve the agent over HTTP
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `loader` - Document loading (text files, CSV tables, parse service)
//! - `chunking` - Sentence-aware chunking
//! - `embedding` - Embedding generation
//! - `index` - Persisted vector indices with a TTL cache
//! - `services` - REST clients for the venue API, reviews and web search
//! - `tools` - Tool trait, registry and the concrete tools
//! - `agent` - Chat backends and the tool-calling loop
//! - `engine` - Assembles the agent from settings
//!
//! # Example
//!
//! ```rust,no_run
//! use concierge::config::Settings;
//! use concierge::engine::{get_chat_engine, EngineParams};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let agent = get_chat_engine(&settings, EngineParams::default(), Vec::new())?;
//!
//!     let response = agent.run("Somewhere quiet for a birthday dinner?").await?;
//!     println!("{}", response.content);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod index;
pub mod loader;
pub mod openai;
pub mod services;
pub mod tools;

#[cfg(test)]
mod testing;

pub use error::{ConciergeError, Result};
