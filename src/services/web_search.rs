//! Bing web search adapter.

use super::http::ServiceClient;
use crate::config::BingSettings;
use crate::error::{ConciergeError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

const SERVICE: &str = "Bing";

/// Results of one web search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSearchResults {
    pub query: String,
    /// `"{page name}: {snippet}"` lines.
    pub results: Vec<String>,
}

impl WebSearchResults {
    pub fn to_markdown(&self) -> String {
        if self.results.is_empty() {
            return format!("No web results found for \"{}\".", self.query);
        }
        self.results
            .iter()
            .map(|r| format!("- {}", r))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    web_pages: Option<WebPages>,
}

#[derive(Debug, Default, Deserialize)]
struct WebPages {
    #[serde(default)]
    value: Vec<WebPage>,
}

#[derive(Debug, Deserialize)]
struct WebPage {
    name: String,
    #[serde(default)]
    snippet: String,
}

/// Client for the Bing Web Search API.
pub struct WebSearchClient {
    client: ServiceClient,
    endpoint: String,
    subscription_key: Option<String>,
    default_count: u32,
}

impl WebSearchClient {
    pub fn new(settings: &BingSettings, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: ServiceClient::new(SERVICE, timeout)?,
            endpoint: super::normalize_base_url(&settings.endpoint)?,
            subscription_key: settings.subscription_key.clone(),
            default_count: settings.default_count,
        })
    }

    /// Search the web; `count` defaults to the configured result count.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, count: Option<u32>) -> Result<WebSearchResults> {
        let key = self.subscription_key.as_deref().ok_or_else(|| {
            ConciergeError::Config("BING_SEARCH_KEY environment variable is not set".to_string())
        })?;
        if query.trim().is_empty() {
            return Err(ConciergeError::InvalidInput("Search query must not be empty".to_string()));
        }

        let count = count.unwrap_or(self.default_count).to_string();
        let request = self
            .client
            .http()
            .get(&self.endpoint)
            .header("Ocp-Apim-Subscription-Key", key)
            .query(&[
                ("q", query),
                ("count", count.as_str()),
                ("textDecorations", "true"),
                ("textFormat", "HTML"),
            ]);

        let response: SearchResponse = self.client.send_json(request, "Search results").await?;
        let results = response
            .web_pages
            .unwrap_or_default()
            .value
            .into_iter()
            .map(|page| format!("{}: {}", page.name, page.snippet))
            .collect();

        Ok(WebSearchResults {
            query: query.to_string(),
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::http::FailureKind;
    use crate::testing::MockServer;
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn client(endpoint: String, key: Option<&str>) -> WebSearchClient {
        let settings = BingSettings {
            endpoint,
            subscription_key: key.map(String::from),
            default_count: 3,
        };
        WebSearchClient::new(&settings, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_search_sends_key_and_params() {
        let router = Router::new().route(
            "/search",
            get(|headers: HeaderMap, Query(params): Query<HashMap<String, String>>| async move {
                let key = headers
                    .get("Ocp-Apim-Subscription-Key")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                Json::<Value>(json!({
                    "webPages": { "value": [
                        { "name": format!("key={}", key), "snippet": format!("count={}", params["count"]) },
                        { "name": "Second", "snippet": params["textFormat"].clone() }
                    ]}
                }))
            }),
        );
        let server = MockServer::start(router).await;

        let results = client(server.url("/search"), Some("secret"))
            .search("best feijoada in Sao Paulo", None)
            .await
            .unwrap();

        assert_eq!(results.results, vec!["key=secret: count=3", "Second: HTML"]);
    }

    #[tokio::test]
    async fn test_no_web_pages_is_empty() {
        let server = MockServer::json(json!({ "_type": "SearchResponse" })).await;
        let results = client(server.base_url(), Some("k")).search("x", Some(1)).await.unwrap();
        assert!(results.results.is_empty());
        assert!(results.to_markdown().starts_with("No web results"));
    }

    #[tokio::test]
    async fn test_missing_key_and_upstream_failure() {
        let server = MockServer::status(StatusCode::FORBIDDEN).await;

        let err = client(server.base_url(), None).search("x", None).await.unwrap_err();
        assert!(matches!(err, ConciergeError::Config(_)));
        assert_eq!(server.hits(), 0);

        match client(server.base_url(), Some("k")).search("x", None).await.unwrap_err() {
            ConciergeError::Upstream { failure, .. } => assert_eq!(failure.kind, FailureKind::Unauthorized),
            other => panic!("Expected upstream error, got {:?}", other),
        }
    }
}
