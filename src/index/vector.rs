//! Similarity search over a loaded storage context.

use super::{IndexType, Node, StorageContext};
use crate::agent::{AgentEvent, CallbackManager};
use crate::embedding::{cosine_similarity, Embedder};
use crate::error::Result;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Nodes returned when no explicit top-k is configured.
pub const DEFAULT_TOP_K: usize = 2;

/// A node with its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredNode {
    pub node: Node,
    pub score: f32,
}

/// Queryable view over one index.
#[derive(Clone)]
pub struct VectorIndex {
    index_type: IndexType,
    context: Arc<StorageContext>,
    embedder: Arc<dyn Embedder>,
    callbacks: Option<CallbackManager>,
}

impl VectorIndex {
    pub fn new(
        index_type: IndexType,
        context: Arc<StorageContext>,
        embedder: Arc<dyn Embedder>,
        callbacks: Option<CallbackManager>,
    ) -> Self {
        Self {
            index_type,
            context,
            embedder,
            callbacks,
        }
    }

    pub fn index_type(&self) -> IndexType {
        self.index_type
    }

    pub fn context(&self) -> &Arc<StorageContext> {
        &self.context
    }

    pub fn len(&self) -> usize {
        self.context.len()
    }

    pub fn is_empty(&self) -> bool {
        self.context.is_empty()
    }

    /// Top `top_k` nodes by cosine similarity, best first.
    ///
    /// A `top_k` of zero falls back to [`DEFAULT_TOP_K`].
    #[instrument(skip(self), fields(index = %self.index_type))]
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<ScoredNode>> {
        let top_k = if top_k == 0 { DEFAULT_TOP_K } else { top_k };
        let query_embedding = self.embedder.embed(query).await?;

        let mut scored: Vec<ScoredNode> = self
            .context
            .nodes
            .iter()
            .map(|node| ScoredNode {
                score: cosine_similarity(&query_embedding, &node.embedding),
                node: node.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);

        debug!("Retrieved {} nodes", scored.len());
        if let Some(callbacks) = &self.callbacks {
            callbacks.emit(AgentEvent::Retrieve {
                index_type: self.index_type,
                query: query.to_string(),
                nodes: scored.len(),
            });
        }
        Ok(scored)
    }
}

/// Render retrieved nodes as numbered context passages.
pub fn format_context(nodes: &[ScoredNode]) -> String {
    if nodes.is_empty() {
        return "No relevant information found in the index.".to_string();
    }

    nodes
        .iter()
        .enumerate()
        .map(|(i, scored)| {
            format!(
                "[{}] (score {:.2})\n{}",
                i + 1,
                scored.score,
                scored.node.llm_text()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{KeywordEmbedder, RecordingHandler};
    use std::collections::BTreeMap;

    async fn index(texts: &[&str], callbacks: Option<CallbackManager>) -> VectorIndex {
        let embedder = Arc::new(KeywordEmbedder::new(64));
        let mut nodes = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            nodes.push(Node {
                id: format!("n{}", i),
                doc_id: format!("d{}", i),
                text: text.to_string(),
                metadata: BTreeMap::new(),
                excluded_llm_metadata_keys: Vec::new(),
                embedding: embedder.embed(text).await.unwrap(),
            });
        }
        let context = Arc::new(StorageContext::new(IndexType::Venue, "kw", 64, nodes));
        VectorIndex::new(IndexType::Venue, context, embedder, callbacks)
    }

    #[tokio::test]
    async fn test_retrieve_ranks_by_similarity() {
        let index = index(
            &[
                "Sunday brunch with eggs",
                "Draft beer on tap in Recife",
                "Live samba and draft beer",
            ],
            None,
        )
        .await;

        let results = index.retrieve("draft beer", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.node.text.contains("beer")));
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_zero_top_k_uses_default() {
        let index = index(&["a", "b", "c", "d"], None).await;
        let results = index.retrieve("a", 0).await.unwrap();
        assert_eq!(results.len(), DEFAULT_TOP_K);
    }

    #[tokio::test]
    async fn test_retrieve_emits_event() {
        let handler = Arc::new(RecordingHandler::default());
        let callbacks = CallbackManager::new(vec![handler.clone()]);
        let index = index(&["brunch"], Some(callbacks)).await;

        index.retrieve("brunch", 4).await.unwrap();
        assert_eq!(
            handler.events(),
            vec![AgentEvent::Retrieve {
                index_type: IndexType::Venue,
                query: "brunch".to_string(),
                nodes: 1
            }]
        );
    }

    #[test]
    fn test_format_context_empty() {
        assert!(format_context(&[]).contains("No relevant information"));
    }
}
