//! Tools exposed to the agent.
//!
//! Every capability (index queries, partner services) implements [`Tool`] and
//! is collected in one [`ToolRegistry`], which is the single place tool calls
//! are dispatched from. Each definition carries a [`ToolCategory`]; the
//! registry renders the routing guidance appended to the system prompt from
//! those categories.

mod query;
mod reviews;
mod search;
mod venues;

pub use query::QueryTool;
pub use reviews::ReviewsTool;
pub use search::WebSearchTool;
pub use venues::{venue_tools, VenueOperation, VenueTool};

use crate::error::{ConciergeError, Result};
use crate::services::FailureKind;
use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// What a tool is for; drives the routing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Knowledge,
    VenueLookup,
    Reviews,
    Menu,
    Reservations,
    WebSearch,
}

impl ToolCategory {
    pub const ALL: [ToolCategory; 6] = [
        ToolCategory::Knowledge,
        ToolCategory::VenueLookup,
        ToolCategory::Reviews,
        ToolCategory::Menu,
        ToolCategory::Reservations,
        ToolCategory::WebSearch,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ToolCategory::Knowledge => "Knowledge bases",
            ToolCategory::VenueLookup => "Venue lookup",
            ToolCategory::Reviews => "Reviews",
            ToolCategory::Menu => "Menus",
            ToolCategory::Reservations => "Reservations",
            ToolCategory::WebSearch => "Web search",
        }
    }

    fn guidance(&self) -> &'static str {
        match self {
            ToolCategory::Knowledge => "answer from indexed documents; venue_query for venues, general_query for everything else",
            ToolCategory::VenueLookup => "find venues; search_venues_by_name turns a venue name into its TripAdvisor ID and must come before any tool that takes an ID",
            ToolCategory::Reviews => "guest reviews for a venue whose ID came from search_venues_by_name",
            ToolCategory::Menu => "dishes, categories and prices for a venue ID",
            ToolCategory::Reservations => "create, look up, change or cancel a booking",
            ToolCategory::WebSearch => "only when the knowledge bases have no answer",
        }
    }
}

/// Agent-facing contract of a tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub category: ToolCategory,
}

impl ToolDefinition {
    /// Function-tool form for the chat completions API.
    pub fn to_openai(&self) -> ChatCompletionTool {
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: self.name.clone(),
                description: Some(self.description.clone()),
                parameters: Some(self.input_schema.clone()),
                strict: None,
            },
        }
    }
}

/// Why a tool returned an error-shaped result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolFailure {
    Upstream(FailureKind),
    /// A well-formed venue ID that no name search has returned.
    UnresolvedVenue,
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolFailure::Upstream(kind) => write!(f, "{}", kind),
            ToolFailure::UnresolvedVenue => write!(f, "unresolved_venue"),
        }
    }
}

/// Result of a tool call as the model sees it.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Success(String),
    Failure { kind: ToolFailure, message: String },
}

impl ToolOutput {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutput::Success(_))
    }

    /// Text fed back to the model.
    pub fn render(&self) -> String {
        match self {
            ToolOutput::Success(text) => text.clone(),
            ToolOutput::Failure { kind, message } => format!("Error ({}): {}", kind, message),
        }
    }

    /// Convert an adapter result, turning upstream failures into data.
    ///
    /// Configuration and validation errors stay errors.
    pub fn from_service<T>(
        result: Result<T>,
        render: impl FnOnce(T) -> Result<String>,
    ) -> Result<ToolOutput> {
        match result {
            Ok(value) => Ok(ToolOutput::Success(render(value)?)),
            Err(ConciergeError::Upstream { service, failure }) => {
                error!(service, kind = %failure.kind, "{}", failure.message);
                Ok(ToolOutput::Failure {
                    kind: ToolFailure::Upstream(failure.kind),
                    message: failure.message,
                })
            }
            Err(e) => Err(e),
        }
    }
}

/// A capability the agent can call.
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn invoke(&self, arguments: Value) -> Result<ToolOutput>;
}

/// Deserialize tool arguments, reporting problems as invalid input.
pub(crate) fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T> {
    serde_json::from_value(arguments)
        .map_err(|e| ConciergeError::InvalidInput(format!("Invalid arguments for {}: {}", tool, e)))
}

/// Pretty JSON for structured results.
pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Ordered set of tools with unique names.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    descriptions: HashMap<String, String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace tool descriptions by name.
    pub fn with_description_overrides(mut self, descriptions: HashMap<String, String>) -> Self {
        self.descriptions = descriptions;
        self
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.definition().name;
        if self.get(&name).is_some() {
            return Err(ConciergeError::Config(format!("Duplicate tool name: {}", name)));
        }
        debug!("Registered tool {}", name);
        self.tools.push(tool);
        Ok(())
    }

    pub fn extend(&mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Result<()> {
        for tool in tools {
            self.register(tool)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.definition().name == name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.definition().name).collect()
    }

    /// Definitions in registration order, with description overrides applied.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|tool| {
                let mut definition = tool.definition();
                if let Some(description) = self.descriptions.get(&definition.name) {
                    definition.description = description.clone();
                }
                definition
            })
            .collect()
    }

    pub fn to_openai_tools(&self) -> Vec<ChatCompletionTool> {
        self.definitions().iter().map(ToolDefinition::to_openai).collect()
    }

    /// Invoke a tool by name with raw JSON arguments.
    pub async fn dispatch(&self, name: &str, arguments: &str) -> Result<ToolOutput> {
        let tool = self
            .get(name)
            .ok_or_else(|| ConciergeError::Agent(format!("Unknown tool: {}", name)))?;

        let arguments: Value = if arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(arguments)
                .map_err(|e| ConciergeError::InvalidInput(format!("Invalid tool arguments: {}", e)))?
        };

        tool.invoke(arguments).await
    }

    /// Routing guidance for the registered tools, grouped by category.
    pub fn routing_table(&self) -> String {
        let definitions = self.definitions();
        let mut lines = vec!["Available tools by purpose:".to_string()];

        for category in ToolCategory::ALL {
            let names: Vec<&str> = definitions
                .iter()
                .filter(|d| d.category == category)
                .map(|d| d.name.as_str())
                .collect();
            if names.is_empty() {
                continue;
            }
            lines.push(format!(
                "- {} ({}): {}",
                category.label(),
                names.join(", "),
                category.guidance()
            ));
        }

        if lines.len() == 1 {
            return String::new();
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::UpstreamFailure;
    use serde_json::json;

    struct Echo {
        name: &'static str,
        category: ToolCategory,
    }

    #[async_trait]
    impl Tool for Echo {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: self.name.to_string(),
                description: format!("Echo from {}", self.name),
                input_schema: json!({ "type": "object", "properties": {} }),
                category: self.category,
            }
        }

        async fn invoke(&self, arguments: Value) -> Result<ToolOutput> {
            Ok(ToolOutput::Success(arguments.to_string()))
        }
    }

    fn echo(name: &'static str, category: ToolCategory) -> Arc<dyn Tool> {
        Arc::new(Echo { name, category })
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(echo("a", ToolCategory::Knowledge)).unwrap();
        let err = registry.register(echo("a", ToolCategory::Menu)).unwrap_err();
        assert!(err.to_string().contains("Duplicate tool name: a"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch() {
        let mut registry = ToolRegistry::new();
        registry.register(echo("a", ToolCategory::Knowledge)).unwrap();

        let output = registry.dispatch("a", r#"{"x": 1}"#).await.unwrap();
        assert_eq!(output, ToolOutput::Success(r#"{"x":1}"#.to_string()));

        let output = registry.dispatch("a", "").await.unwrap();
        assert_eq!(output.render(), "{}");

        assert!(matches!(registry.dispatch("missing", "{}").await, Err(ConciergeError::Agent(_))));
        assert!(matches!(registry.dispatch("a", "{oops").await, Err(ConciergeError::InvalidInput(_))));
    }

    #[test]
    fn test_definitions_keep_order_and_overrides() {
        let mut registry = ToolRegistry::new().with_description_overrides(HashMap::from([(
            "b".to_string(),
            "Custom".to_string(),
        )]));
        registry
            .extend([echo("b", ToolCategory::WebSearch), echo("a", ToolCategory::Knowledge)])
            .unwrap();

        assert_eq!(registry.names(), vec!["b", "a"]);
        let definitions = registry.definitions();
        assert_eq!(definitions[0].description, "Custom");
        assert_eq!(definitions[1].description, "Echo from a");

        let openai = registry.to_openai_tools();
        assert_eq!(openai[0].function.name, "b");
        assert_eq!(openai[0].function.description.as_deref(), Some("Custom"));
    }

    #[test]
    fn test_routing_table_follows_categories() {
        let mut registry = ToolRegistry::new();
        assert_eq!(registry.routing_table(), "");

        registry
            .extend([
                echo("bing_search", ToolCategory::WebSearch),
                echo("search_venues_by_name", ToolCategory::VenueLookup),
                echo("general_query", ToolCategory::Knowledge),
            ])
            .unwrap();

        let table = registry.routing_table();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("- Knowledge bases (general_query)"));
        assert!(lines[2].starts_with("- Venue lookup (search_venues_by_name)"));
        assert!(lines[3].starts_with("- Web search (bing_search)"));
        assert!(!table.contains("Reservations"));
    }

    #[test]
    fn test_from_service_splits_upstream_from_other_errors() {
        let upstream: Result<u32> = Err(ConciergeError::Upstream {
            service: "Bing",
            failure: UpstreamFailure::from_status("Bing", reqwest::StatusCode::TOO_MANY_REQUESTS, "x"),
        });
        let output = ToolOutput::from_service(upstream, |n| Ok(n.to_string())).unwrap();
        assert!(!output.is_success());
        assert!(output.render().starts_with("Error (rate_limited): Rate limit exceeded"));

        let config: Result<u32> = Err(ConciergeError::Config("no key".to_string()));
        assert!(ToolOutput::from_service(config, |n| Ok(n.to_string())).is_err());

        let ok = ToolOutput::from_service(Ok(3u32), |n| Ok(n.to_string())).unwrap();
        assert_eq!(ok, ToolOutput::Success("3".to_string()));
    }
}
