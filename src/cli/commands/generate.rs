//! Generate command: build indices from the data directory.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::embedding::OpenAIEmbedder;
use crate::index::{IndexStore, IndexType};
use crate::loader::DocumentLoader;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// Run the generate command.
pub async fn run_generate(index_type: Option<IndexType>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Generate, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'concierge doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let timeout = Duration::from_secs(settings.llm.timeout_seconds);
    let embedder = Arc::new(OpenAIEmbedder::from_settings(&settings.embedding, timeout)?);
    let store = IndexStore::from_settings(&settings, embedder);
    let loader = DocumentLoader::from_settings(&settings)?;

    Output::info(&format!("Loading documents from {}", loader.data_dir().display()));
    let spinner = Output::spinner("Embedding documents...");

    match store.generate_datasource(&loader, index_type).await {
        Ok(built) => {
            spinner.finish_and_clear();
            if built.is_empty() {
                Output::warning("No documents found; nothing was indexed.");
            }
            for (index_type, nodes) in built {
                Output::success(&format!(
                    "Built {} index with {} nodes in {}",
                    index_type,
                    nodes,
                    store.path_for(index_type).display()
                ));
            }
            Ok(())
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to build indices: {}", e));
            Err(e.into())
        }
    }
}
