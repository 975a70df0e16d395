//! Web search fallback tool.

use super::{parse_args, Tool, ToolCategory, ToolDefinition, ToolOutput};
use crate::error::Result;
use crate::services::WebSearchClient;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    count: Option<u32>,
}

pub struct WebSearchTool {
    client: WebSearchClient,
}

impl WebSearchTool {
    pub fn new(client: WebSearchClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "bing_search".to_string(),
            description: "Search Bing for information about a topic when the answer cannot be found \
                in the existing knowledge base."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query"
                    },
                    "count": {
                        "type": "integer",
                        "description": "Number of results to return (default: 3)"
                    }
                },
                "required": ["query"]
            }),
            category: ToolCategory::WebSearch,
        }
    }

    async fn invoke(&self, arguments: Value) -> Result<ToolOutput> {
        let args: SearchArgs = parse_args("bing_search", arguments)?;
        let result = self.client.search(&args.query, args.count).await;
        ToolOutput::from_service(result, |results| Ok(results.to_markdown()))
    }
}
