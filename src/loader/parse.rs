//! Client for the hosted document parsing service (LlamaParse REST API).
//!
//! Used for binary formats (PDF, DOCX, slides, ...) when enabled. The flow is
//! upload, poll the job until it finishes, then fetch the markdown result.

use crate::config::LoaderSettings;
use crate::error::{ConciergeError, Result};
use crate::services::http::ServiceClient;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

const SERVICE: &str = "LlamaParse";
const UPLOAD_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Deserialize)]
struct JobCreated {
    id: String,
}

#[derive(Debug, Deserialize)]
struct JobStatus {
    status: String,
}

#[derive(Debug, Deserialize)]
struct MarkdownResult {
    markdown: String,
}

/// Parsing service client.
pub struct ParseClient {
    client: ServiceClient,
    base_url: String,
    api_key: String,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl ParseClient {
    /// Build a client from loader settings.
    ///
    /// Fails with a configuration error when the API key is missing.
    pub fn from_settings(settings: &LoaderSettings) -> Result<Self> {
        let api_key = settings.parse_api_key.clone().ok_or_else(|| {
            ConciergeError::Config(
                "LLAMA_CLOUD_API_KEY is not set. Set it in your environment or disable the \
                 parse service (USE_LLAMA_PARSE=false)."
                    .to_string(),
            )
        })?;

        Ok(Self {
            client: ServiceClient::new(SERVICE, Duration::from_secs(UPLOAD_TIMEOUT_SECS))?,
            base_url: settings.parse_base_url.trim_end_matches('/').to_string(),
            api_key,
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
            max_poll_attempts: settings.max_poll_attempts,
        })
    }

    /// Parse one file to markdown.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn parse_file(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document")
            .to_string();

        let form = Form::new()
            .text("language", "en")
            .part("file", Part::bytes(bytes).file_name(file_name.clone()));

        let job: JobCreated = self
            .client
            .send_json(
                self.client
                    .http()
                    .post(format!("{}/upload", self.base_url))
                    .bearer_auth(&self.api_key)
                    .multipart(form),
                &file_name,
            )
            .await?;

        info!("Submitted {} to {} as job {}", file_name, SERVICE, job.id);
        self.wait_for(&job.id).await?;

        let result: MarkdownResult = self
            .client
            .send_json(
                self.client
                    .http()
                    .get(format!("{}/job/{}/result/markdown", self.base_url, job.id))
                    .bearer_auth(&self.api_key),
                &format!("Parse job {}", job.id),
            )
            .await?;

        Ok(result.markdown)
    }

    async fn wait_for(&self, job_id: &str) -> Result<()> {
        for attempt in 1..=self.max_poll_attempts {
            let status: JobStatus = self
                .client
                .send_json(
                    self.client
                        .http()
                        .get(format!("{}/job/{}", self.base_url, job_id))
                        .bearer_auth(&self.api_key),
                    &format!("Parse job {}", job_id),
                )
                .await?;

            debug!("Parse job {} status {} (attempt {})", job_id, status.status, attempt);

            match status.status.to_uppercase().as_str() {
                "SUCCESS" => return Ok(()),
                "ERROR" | "CANCELED" | "CANCELLED" => {
                    return Err(ConciergeError::Index(format!(
                        "Parse job {} ended with status {}",
                        job_id, status.status
                    )))
                }
                _ => tokio::time::sleep(self.poll_interval).await,
            }
        }

        Err(ConciergeError::Index(format!(
            "Parse job {} did not finish after {} polls",
            job_id, self.max_poll_attempts
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockServer;
    use axum::extract::Path as UrlPath;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    fn settings(base_url: String) -> LoaderSettings {
        LoaderSettings {
            use_parse_service: true,
            parse_api_key: Some("llx-test".to_string()),
            parse_base_url: base_url,
            poll_interval_ms: 1,
            max_poll_attempts: 3,
            ..LoaderSettings::default()
        }
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let settings = LoaderSettings {
            use_parse_service: true,
            parse_api_key: None,
            ..LoaderSettings::default()
        };
        let err = ParseClient::from_settings(&settings).err().unwrap();
        assert!(matches!(err, ConciergeError::Config(_)));
    }

    #[tokio::test]
    async fn test_parse_file_round_trip() {
        let router = Router::new()
            .route("/upload", post(|| async { Json(json!({ "id": "job-1", "status": "PENDING" })) }))
            .route(
                "/job/{id}",
                get(|UrlPath(id): UrlPath<String>| async move {
                    Json(json!({ "id": id, "status": "SUCCESS" }))
                }),
            )
            .route(
                "/job/{id}/result/markdown",
                get(|| async { Json(json!({ "markdown": "# Menu\nCoxinha" })) }),
            );
        let server = MockServer::start(router).await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("menu.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let client = ParseClient::from_settings(&settings(server.base_url())).unwrap();
        let markdown = client.parse_file(&path).await.unwrap();
        assert!(markdown.contains("Coxinha"));
    }

    #[tokio::test]
    async fn test_failed_job_is_error() {
        let router = Router::new()
            .route("/upload", post(|| async { Json(json!({ "id": "job-2" })) }))
            .route("/job/{id}", get(|| async { Json(json!({ "status": "ERROR" })) }));
        let server = MockServer::start(router).await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.pptx");
        std::fs::write(&path, b"PK").unwrap();

        let client = ParseClient::from_settings(&settings(server.base_url())).unwrap();
        assert!(client.parse_file(&path).await.is_err());
    }
}
