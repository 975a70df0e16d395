//! Tools command: list what the agent can call.

use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::embedding::OpenAIEmbedder;
use crate::engine::{build_tools, system_prompt};
use crate::index::IndexStore;
use crate::tools::ToolCategory;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// Run the tools command.
pub fn run_tools(settings: Settings, show_prompt: bool) -> Result<()> {
    let timeout = Duration::from_secs(settings.llm.timeout_seconds);
    // Constructed only to open the indices; nothing is embedded here.
    let embedder = Arc::new(OpenAIEmbedder::from_settings(&settings.embedding, timeout)?);
    let store = IndexStore::from_settings(&settings, embedder);

    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;
    let tools = build_tools(&settings, &store, settings.retrieval.top_k, &Default::default())?
        .with_description_overrides(prompts.tools.clone());

    Output::header(&format!("Tools ({})", tools.len()));
    for category in ToolCategory::ALL {
        let definitions: Vec<_> = tools
            .definitions()
            .into_iter()
            .filter(|d| d.category == category)
            .collect();
        if definitions.is_empty() {
            continue;
        }

        println!("\n{}", Output::title_style().apply_to(category.label()));
        for definition in definitions {
            Output::list_item(&format!(
                "{} {}",
                Output::title_style().apply_to(&definition.name),
                Output::dim_style().apply_to(first_line(&definition.description))
            ));
        }
    }

    if show_prompt {
        Output::header(&format!("System prompt ({})", settings.llm.model));
        println!("{}", system_prompt(&settings, &prompts, &tools));
    }
    Ok(())
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default().trim()
}
