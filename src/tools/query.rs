//! Index-backed query tools.

use super::{parse_args, Tool, ToolCategory, ToolDefinition, ToolOutput};
use crate::error::Result;
use crate::index::{format_context, IndexType, VectorIndex};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

const VENUE_DESCRIPTION: &str = "Use this tool for general questions about venues, bars, and restaurants. \
It is best for broad queries about multiple venues or discovering new places: location (city, state, address), \
features such as outdoor seating or beer types served, ratings, opening hours, promotions and special offers, \
accessibility, and TripAdvisor information. \
For a specific venue, reviews or reservations, use search_venues_by_name to get its TripAdvisor ID instead.";

const GENERAL_DESCRIPTION: &str = "Use this tool to query general documentation and information. \
This includes any non-venue content such as company policies, general documentation, \
product information and other business documents. Do not use this tool for venue-specific queries.";

#[derive(Deserialize)]
struct QueryArgs {
    #[serde(alias = "query")]
    input: String,
}

/// Retrieves passages from one index; the agent writes the answer.
pub struct QueryTool {
    index: VectorIndex,
    top_k: usize,
}

impl QueryTool {
    pub fn new(index: VectorIndex, top_k: usize) -> Self {
        Self { index, top_k }
    }

    pub fn name_for(index_type: IndexType) -> &'static str {
        match index_type {
            IndexType::General => "general_query",
            IndexType::Venue => "venue_query",
        }
    }
}

#[async_trait]
impl Tool for QueryTool {
    fn definition(&self) -> ToolDefinition {
        let description = match self.index.index_type() {
            IndexType::General => GENERAL_DESCRIPTION,
            IndexType::Venue => VENUE_DESCRIPTION,
        };
        ToolDefinition {
            name: Self::name_for(self.index.index_type()).to_string(),
            description: description.to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "input": {
                        "type": "string",
                        "description": "A full natural-language question to look up"
                    }
                },
                "required": ["input"]
            }),
            category: ToolCategory::Knowledge,
        }
    }

    async fn invoke(&self, arguments: Value) -> Result<ToolOutput> {
        let name = Self::name_for(self.index.index_type());
        let args: QueryArgs = parse_args(name, arguments)?;

        let nodes = self.index.retrieve(&args.input, self.top_k).await?;
        info!("{} retrieved {} passages", name, nodes.len());
        Ok(ToolOutput::Success(format_context(&nodes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedder;
    use crate::error::ConciergeError;
    use crate::index::{Node, StorageContext};
    use crate::testing::KeywordEmbedder;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    async fn tool(index_type: IndexType, texts: &[&str], top_k: usize) -> QueryTool {
        let embedder = Arc::new(KeywordEmbedder::new(64));
        let mut nodes = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            nodes.push(Node {
                id: format!("doc:{}", i),
                doc_id: "doc".to_string(),
                text: text.to_string(),
                metadata: BTreeMap::new(),
                excluded_llm_metadata_keys: Vec::new(),
                embedding: embedder.embed(text).await.unwrap(),
            });
        }
        let context = Arc::new(StorageContext::new(index_type, "keyword", 64, nodes));
        QueryTool::new(VectorIndex::new(index_type, context, embedder, None), top_k)
    }

    #[tokio::test]
    async fn test_query_returns_best_passages() {
        let tool = tool(
            IndexType::General,
            &["refund policy allows refunds within seven days", "parking is free on weekends"],
            1,
        )
        .await;

        assert_eq!(tool.definition().name, "general_query");
        let output = tool.invoke(json!({ "input": "what is the refund policy" })).await.unwrap();
        let text = output.render();
        assert!(text.contains("refund policy"));
        assert!(!text.contains("parking"));
    }

    #[tokio::test]
    async fn test_query_accepts_query_alias_and_rejects_missing_input() {
        let tool = tool(IndexType::Venue, &["Boteco has outdoor seating"], 0).await;
        assert_eq!(tool.definition().name, "venue_query");

        let output = tool.invoke(json!({ "query": "outdoor seating" })).await.unwrap();
        assert!(output.is_success());

        let err = tool.invoke(json!({})).await.unwrap_err();
        assert!(matches!(err, ConciergeError::InvalidInput(_)));
    }
}
