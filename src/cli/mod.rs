//! CLI module for Concierge.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use crate::index::IndexType;
use clap::{Parser, Subcommand};

/// Concierge - a venue assistant over your documents and partner services
///
/// Builds document indices offline and answers questions with an agent that
/// routes between the indices, venue search, menus, reservations, reviews and
/// web search.
#[derive(Parser, Debug)]
#[command(name = "concierge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build indices from the data directory
    ///
    /// Without a type, table rows go to the venue index and everything else
    /// to the general index.
    Generate {
        /// Put every document into this index (general or venue)
        index_type: Option<IndexType>,
    },

    /// Ask a single question
    Ask {
        /// The question to ask
        question: String,

        /// Chat model to use
        #[arg(short, long)]
        model: Option<String>,

        /// Passages retrieved per index query
        #[arg(short = 'k', long, env = "TOP_K")]
        top_k: Option<usize>,
    },

    /// Start an interactive chat session
    Chat {
        /// Chat model to use
        #[arg(short, long)]
        model: Option<String>,

        /// Passages retrieved per index query
        #[arg(short = 'k', long, env = "TOP_K")]
        top_k: Option<usize>,
    },

    /// List the tools the agent can use
    Tools {
        /// Also print the assembled system prompt
        #[arg(long)]
        prompt: bool,
    },

    /// Check API keys, storage and configuration
    Doctor,

    /// Start the HTTP chat API
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_parses_index_type() {
        let cli = Cli::parse_from(["concierge", "generate", "venue"]);
        match cli.command {
            Commands::Generate { index_type } => assert_eq!(index_type, Some(IndexType::Venue)),
            other => panic!("Expected generate, got {:?}", other),
        }

        assert!(Cli::try_parse_from(["concierge", "generate", "menus"]).is_err());
    }
}
