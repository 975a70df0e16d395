//! Test helpers: an in-process HTTP server standing in for partner APIs.

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A local axum server bound to an ephemeral port.
pub struct MockServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl MockServer {
    /// Serve the given router, counting every request that reaches it.
    pub async fn start(router: Router) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        let app = router.layer(middleware::from_fn(move |req: Request, next: Next| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                next.run(req).await
            }
        }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock server address");

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, hits, handle }
    }

    /// Answer every request with the given status.
    pub async fn status(code: StatusCode) -> Self {
        Self::start(Router::new().fallback(move || async move {
            (code, Json(json!({ "error": "mock" })))
        }))
        .await
    }

    /// Answer every request with 200 and the given JSON body.
    pub async fn json(body: Value) -> Self {
        Self::start(Router::new().fallback(move || {
            let body = body.clone();
            async move { Json(body) }
        }))
        .await
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Number of requests received so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Records every event it sees.
#[derive(Default)]
pub struct RecordingHandler {
    events: std::sync::Mutex<Vec<crate::agent::AgentEvent>>,
}

impl RecordingHandler {
    pub fn events(&self) -> Vec<crate::agent::AgentEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl crate::agent::EventHandler for RecordingHandler {
    fn on_event(&self, event: &crate::agent::AgentEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Deterministic bag-of-words embedder: each word lights up one hashed bucket.
pub struct KeywordEmbedder {
    dimensions: usize,
    pub calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            calls: AtomicUsize::new(0),
        }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0; self.dimensions];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let bucket = word
                .to_lowercase()
                .bytes()
                .fold(0usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize));
            v[bucket % self.dimensions] += 1.0;
        }
        v
    }
}

#[async_trait::async_trait]
impl crate::embedding::Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> crate::error::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> crate::error::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        "keyword"
    }
}
