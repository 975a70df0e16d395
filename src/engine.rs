//! Assembles the conversational agent from settings.
//!
//! Order of tools: index query tools (venue, general; absent indices are
//! skipped), web search, then the venue family (reviews plus the venue API
//! tools, which share one resolution registry).

use crate::agent::{Agent, CallbackManager, ChatBackend, EventHandler, OpenAIBackend, TracingHandler};
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::Result;
use crate::index::{IndexConfig, IndexStore, IndexType};
use crate::services::{ReviewsClient, VenueApiClient, VenueResolutions, WebSearchClient};
use crate::tools::{venue_tools, QueryTool, ReviewsTool, ToolRegistry, WebSearchTool};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Optional tool family with the venue backend tools.
pub const VENUES_FAMILY: &str = "venues";

/// Per-request overrides.
#[derive(Debug, Clone, Default)]
pub struct EngineParams {
    pub top_k: Option<usize>,
    pub model: Option<String>,
}

/// Build the agent with OpenAI chat and embedding backends.
pub fn get_chat_engine(
    settings: &Settings,
    params: EngineParams,
    event_handlers: Vec<Arc<dyn EventHandler>>,
) -> Result<Agent> {
    let model = params.model.clone().unwrap_or_else(|| settings.llm.model.clone());
    let timeout = Duration::from_secs(settings.llm.timeout_seconds);

    let backend = Arc::new(OpenAIBackend::new(&model, timeout)?);
    let embedder = Arc::new(OpenAIEmbedder::from_settings(&settings.embedding, timeout)?);
    assemble_agent(settings, &params, backend, embedder, event_handlers)
}

/// Build the agent around the given backends.
pub fn assemble_agent(
    settings: &Settings,
    params: &EngineParams,
    backend: Arc<dyn ChatBackend>,
    embedder: Arc<dyn Embedder>,
    event_handlers: Vec<Arc<dyn EventHandler>>,
) -> Result<Agent> {
    let mut callbacks = CallbackManager::new(event_handlers);
    callbacks.add_handler(Arc::new(TracingHandler));

    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;

    let store = IndexStore::from_settings(settings, embedder);
    let top_k = params.top_k.unwrap_or(settings.retrieval.top_k);
    let tools = build_tools(settings, &store, top_k, &callbacks)?
        .with_description_overrides(prompts.tools.clone());

    let system_prompt = system_prompt(settings, &prompts, &tools);
    info!(
        "Assembled agent with {} tools on model {}",
        tools.len(),
        backend.model()
    );

    Ok(Agent::new(backend, tools)
        .with_system_prompt(&system_prompt)
        .with_max_iterations(settings.llm.max_iterations)
        .with_callbacks(callbacks))
}

/// Collect every available tool in routing order.
pub fn build_tools(
    settings: &Settings,
    store: &IndexStore,
    top_k: usize,
    callbacks: &CallbackManager,
) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    for index_type in [IndexType::Venue, IndexType::General] {
        let config = IndexConfig::new(index_type).with_callbacks(callbacks.clone());
        match store.get_index(&config)? {
            Some(index) => registry.register(Arc::new(QueryTool::new(index, top_k)))?,
            None => warn!(
                "No {} index in {}; run `concierge generate` to build it",
                index_type,
                store.base_dir().display()
            ),
        }
    }

    let timeout = settings.services.timeout();
    registry.register(Arc::new(WebSearchTool::new(WebSearchClient::new(
        &settings.services.bing,
        timeout,
    )?)))?;

    // Reviews only accept venues resolved by the name search, so both come together.
    if settings.tool_enabled(VENUES_FAMILY) {
        let resolutions = VenueResolutions::new();
        registry.register(Arc::new(ReviewsTool::new(
            ReviewsClient::new(&settings.services.tripadvisor, timeout)?,
            resolutions.clone(),
        )))?;
        let client = VenueApiClient::new(&settings.services.venues, timeout, resolutions)?;
        registry.extend(venue_tools(Arc::new(client)))?;
    }

    for family in &settings.tools.enabled {
        if !family.eq_ignore_ascii_case(VENUES_FAMILY) {
            warn!("Unknown tool family '{}' in configuration", family);
        }
    }

    Ok(registry)
}

/// Configured or default prompt, followed by the routing table.
pub fn system_prompt(settings: &Settings, prompts: &Prompts, tools: &ToolRegistry) -> String {
    let template = settings
        .llm
        .system_prompt
        .as_deref()
        .unwrap_or(&prompts.agent.system);
    let mut prompt = prompts.render_with_custom(template, &HashMap::new());

    let routing = tools.routing_table();
    if !routing.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(&routing);
    }
    prompt
}
