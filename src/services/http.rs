//! Shared HTTP plumbing for the partner service adapters.
//!
//! Every adapter makes exactly one attempt per call. Non-2xx statuses and
//! transport failures are classified into an [`UpstreamFailure`] carrying a
//! human-readable message the agent can reason about.

use crate::error::{ConciergeError, Result};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error};

/// Cause of a failed upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Unauthorized,
    NotFound,
    RateLimited,
    Status(u16),
    Transport,
    Decode,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Unauthorized => write!(f, "unauthorized"),
            FailureKind::NotFound => write!(f, "not_found"),
            FailureKind::RateLimited => write!(f, "rate_limited"),
            FailureKind::Status(code) => write!(f, "http_{}", code),
            FailureKind::Transport => write!(f, "transport"),
            FailureKind::Decode => write!(f, "decode"),
        }
    }
}

/// A classified upstream failure with a message fit for the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl UpstreamFailure {
    /// Classify a non-success HTTP status.
    ///
    /// `subject` names the thing that was requested (e.g. "Location ID 123456")
    /// and only shows up in not-found messages.
    pub fn from_status(service: &str, status: StatusCode, subject: &str) -> Self {
        let (kind, message) = match status.as_u16() {
            401 | 403 => (
                FailureKind::Unauthorized,
                format!("Invalid {} API key. Please check your API key.", service),
            ),
            404 => (
                FailureKind::NotFound,
                format!("{} not found on {}.", subject, service),
            ),
            429 => (
                FailureKind::RateLimited,
                format!("Rate limit exceeded for {}. Please try again later.", service),
            ),
            code => (
                FailureKind::Status(code),
                format!("{} returned HTTP {}.", service, code),
            ),
        };
        Self { kind, message }
    }

    /// Wrap a connection, timeout, or body failure.
    pub fn transport(service: &str, err: &reqwest::Error) -> Self {
        Self {
            kind: FailureKind::Transport,
            message: format!("Could not reach {}: {}", service, err),
        }
    }

    /// Wrap a response body that did not have the expected shape.
    pub fn decode(service: &str, err: impl fmt::Display) -> Self {
        Self {
            kind: FailureKind::Decode,
            message: format!("Unexpected response from {}: {}", service, err),
        }
    }
}

impl fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// HTTP client bound to one partner service.
#[derive(Clone)]
pub struct ServiceClient {
    service: &'static str,
    http: reqwest::Client,
}

impl ServiceClient {
    /// Create a client with a bounded request timeout.
    pub fn new(service: &'static str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConciergeError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { service, http })
    }

    /// Service name used in messages and logs.
    pub fn service(&self) -> &'static str {
        self.service
    }

    /// Underlying reqwest client for building requests.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Send a request and decode a JSON body.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        subject: &str,
    ) -> Result<T> {
        let response = self.send(request, subject).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.fail(UpstreamFailure::transport(self.service, &e)))?;

        serde_json::from_slice(&bytes).map_err(|e| self.fail(UpstreamFailure::decode(self.service, e)))
    }

    /// Send a request whose body is ignored.
    pub async fn send_empty(&self, request: RequestBuilder, subject: &str) -> Result<()> {
        self.send(request, subject).await.map(|_| ())
    }

    async fn send(&self, request: RequestBuilder, subject: &str) -> Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| self.fail(UpstreamFailure::transport(self.service, &e)))?;

        let status = response.status();
        debug!(service = self.service, %status, "Upstream responded");

        if !status.is_success() {
            return Err(self.fail(UpstreamFailure::from_status(self.service, status, subject)));
        }

        Ok(response)
    }

    fn fail(&self, failure: UpstreamFailure) -> ConciergeError {
        error!(service = self.service, kind = %failure.kind, "{}", failure.message);
        ConciergeError::Upstream {
            service: self.service,
            failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockServer;
    use axum::http::StatusCode as AxumStatus;

    #[test]
    fn test_classify_known_statuses() {
        let unauthorized = UpstreamFailure::from_status("TripAdvisor", StatusCode::UNAUTHORIZED, "x");
        assert_eq!(unauthorized.kind, FailureKind::Unauthorized);
        assert!(unauthorized.message.contains("API key"));

        let missing = UpstreamFailure::from_status("TripAdvisor", StatusCode::NOT_FOUND, "Location ID 12345");
        assert_eq!(missing.kind, FailureKind::NotFound);
        assert_eq!(missing.message, "Location ID 12345 not found on TripAdvisor.");

        let limited = UpstreamFailure::from_status("Bing", StatusCode::TOO_MANY_REQUESTS, "x");
        assert_eq!(limited.kind, FailureKind::RateLimited);
        assert!(limited.message.starts_with("Rate limit exceeded"));

        let other = UpstreamFailure::from_status("Bing", StatusCode::BAD_GATEWAY, "x");
        assert_eq!(other.kind, FailureKind::Status(502));
    }

    #[tokio::test]
    async fn test_send_json_classifies_rate_limit() {
        let server = MockServer::status(AxumStatus::TOO_MANY_REQUESTS).await;
        let client = ServiceClient::new("Test", Duration::from_secs(5)).unwrap();

        let err = client
            .send_json::<serde_json::Value>(client.http().get(server.url("/anything")), "thing")
            .await
            .unwrap_err();

        match err {
            ConciergeError::Upstream { failure, .. } => {
                assert_eq!(failure.kind, FailureKind::RateLimited)
            }
            other => panic!("Expected upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_failure_is_wrapped() {
        let client = ServiceClient::new("Test", Duration::from_secs(2)).unwrap();
        // Port 9 (discard) on loopback is not listening in test environments.
        let err = client
            .send_empty(client.http().get("http://127.0.0.1:9/"), "thing")
            .await
            .unwrap_err();

        match err {
            ConciergeError::Upstream { failure, .. } => {
                assert_eq!(failure.kind, FailureKind::Transport)
            }
            other => panic!("Expected upstream error, got {:?}", other),
        }
    }
}
