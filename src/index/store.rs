//! Building and opening the per-type indices.

use super::{storage_path, IndexConfig, IndexType, Node, StorageContext, TtlCache, VectorIndex};
use crate::chunking::SentenceSplitter;
use crate::config::{RetrievalSettings, Settings};
use crate::embedding::Embedder;
use crate::error::{ConciergeError, Result};
use crate::loader::{Document, DocumentLoader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Texts sent per embedding request while building.
const EMBED_BATCH: usize = 64;

/// Owns the storage layout and the storage-context cache.
pub struct IndexStore {
    base_dir: PathBuf,
    embedder: Arc<dyn Embedder>,
    retrieval: RetrievalSettings,
    cache: TtlCache<PathBuf, Arc<StorageContext>>,
}

impl IndexStore {
    /// Store rooted at `base_dir` with a 20-entry, five-minute cache.
    pub fn new(base_dir: PathBuf, embedder: Arc<dyn Embedder>, retrieval: RetrievalSettings) -> Self {
        Self {
            base_dir,
            embedder,
            retrieval,
            cache: TtlCache::new(20, Duration::from_secs(300)),
        }
    }

    pub fn from_settings(settings: &Settings, embedder: Arc<dyn Embedder>) -> Self {
        Self::new(settings.storage_dir(), embedder, settings.retrieval.clone()).with_cache(TtlCache::new(
            settings.storage.cache_capacity,
            Duration::from_secs(settings.storage.cache_ttl_seconds),
        ))
    }

    /// Replace the storage-context cache.
    pub fn with_cache(mut self, cache: TtlCache<PathBuf, Arc<StorageContext>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn path_for(&self, index_type: IndexType) -> PathBuf {
        storage_path(&self.base_dir, index_type)
    }

    /// Whether an index of this type has been built.
    pub fn exists(&self, index_type: IndexType) -> bool {
        self.path_for(index_type).exists()
    }

    /// Open the index for `config.index_type`, or `None` if it was never built.
    #[instrument(skip(self, config), fields(index = %config.index_type))]
    pub fn get_index(&self, config: &IndexConfig) -> Result<Option<VectorIndex>> {
        let dir = self.path_for(config.index_type);
        if !dir.exists() {
            return Ok(None);
        }

        info!("Loading {} index from {}", config.index_type, dir.display());
        let context = self.storage_context(&dir)?;
        Ok(Some(VectorIndex::new(
            config.index_type,
            context,
            self.embedder.clone(),
            config.callbacks.clone(),
        )))
    }

    /// Cached storage context for `dir`, loading it on a miss or after expiry.
    pub fn storage_context(&self, dir: &Path) -> Result<Arc<StorageContext>> {
        let key = dir.to_path_buf();
        if let Some(context) = self.cache.get(&key) {
            return Ok(context);
        }

        let context = Arc::new(StorageContext::load(dir)?);
        self.cache.insert(key, context.clone());
        Ok(context)
    }

    /// Build and persist an index of `index_type` over `documents`.
    ///
    /// Returns the number of nodes written. Only this type's directory is touched.
    #[instrument(skip(self, documents), fields(documents = documents.len()))]
    pub async fn generate_index(&self, documents: &[Document], index_type: IndexType) -> Result<usize> {
        let dir = self.path_for(index_type);
        info!("Creating new {} index", index_type);

        // Marks the documents public for metadata filtering.
        let tagged: Vec<Document> = documents
            .iter()
            .map(|d| d.with_metadata("private", "false"))
            .collect();

        let splitter = SentenceSplitter::new(
            self.retrieval.chunk_size(index_type),
            self.retrieval.chunk_overlap,
        )?;
        let chunks = splitter.split_documents(&tagged);
        if chunks.is_empty() {
            warn!("No content to index for {}", index_type);
        }

        let mut nodes = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH) {
            let texts: Vec<String> = batch.iter().map(|c| c.llm_text()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(ConciergeError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }
            nodes.extend(
                batch
                    .iter()
                    .cloned()
                    .zip(embeddings)
                    .map(|(chunk, embedding)| Node::from_chunk(chunk, embedding)),
            );
            info!("Embedded {}/{} chunks", nodes.len(), chunks.len());
        }

        let count = nodes.len();
        let context = StorageContext::new(
            index_type,
            self.embedder.model(),
            self.embedder.dimensions(),
            nodes,
        );
        // A cached context for this directory stays in use until its TTL runs out.
        context.persist(&dir)?;

        info!(
            "Finished creating {} index ({} nodes). Stored in {}",
            index_type,
            count,
            dir.display()
        );
        Ok(count)
    }

    /// Load documents and build indices.
    ///
    /// With an explicit type, every document goes into that index. Otherwise
    /// table rows build the venue index and the rest the general index; empty
    /// partitions are skipped.
    pub async fn generate_datasource(
        &self,
        loader: &DocumentLoader,
        index_type: Option<IndexType>,
    ) -> Result<Vec<(IndexType, usize)>> {
        let documents = loader.load().await?;

        let mut built = Vec::new();
        match index_type {
            Some(index_type) => {
                let count = self.generate_index(&documents, index_type).await?;
                built.push((index_type, count));
            }
            None => {
                let (venue, general) = partition_documents(documents);
                if !venue.is_empty() {
                    let count = self.generate_index(&venue, IndexType::Venue).await?;
                    built.push((IndexType::Venue, count));
                }
                if !general.is_empty() {
                    let count = self.generate_index(&general, IndexType::General).await?;
                    built.push((IndexType::General, count));
                }
            }
        }
        Ok(built)
    }
}

/// Split documents into (venue rows, everything else).
pub fn partition_documents(documents: Vec<Document>) -> (Vec<Document>, Vec<Document>) {
    documents.into_iter().partition(Document::is_row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoaderSettings;
    use crate::index::ManualClock;
    use crate::loader::rows_to_documents;
    use crate::testing::KeywordEmbedder;
    use std::collections::BTreeMap;

    fn store(base: &Path) -> (IndexStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let store = IndexStore::new(
            base.to_path_buf(),
            Arc::new(KeywordEmbedder::new(32)),
            RetrievalSettings::default(),
        )
        .with_cache(TtlCache::with_clock(20, Duration::from_secs(300), clock.clone()));
        (store, clock)
    }

    fn mixed_documents() -> Vec<Document> {
        let mut docs = rows_to_documents(
            "Venue Name,City\nBoteco,Recife\nBar Azul,Natal\n".as_bytes(),
            "venues",
        )
        .unwrap();
        docs.push(Document::new("policy.md", "Refunds within 7 days.", BTreeMap::new()));
        docs
    }

    #[test]
    fn test_absent_index_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = store(dir.path());
        assert!(store.get_index(&IndexConfig::new(IndexType::Venue)).unwrap().is_none());
        assert!(store.get_index(&IndexConfig::new(IndexType::General)).unwrap().is_none());
    }

    #[test]
    fn test_partition_is_disjoint_and_complete() {
        let docs = mixed_documents();
        let total = docs.len();
        let (venue, general) = partition_documents(docs);

        assert_eq!(venue.len() + general.len(), total);
        assert!(venue.iter().all(Document::is_row));
        assert!(general.iter().all(|d| !d.is_row()));
        assert!(venue.iter().all(|v| general.iter().all(|g| g.id() != v.id())));
    }

    #[tokio::test]
    async fn test_generate_touches_only_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = store(dir.path());

        let count = store.generate_index(&mixed_documents(), IndexType::General).await.unwrap();
        assert_eq!(count, 3);
        assert!(store.exists(IndexType::General));
        assert!(!store.exists(IndexType::Venue));

        let index = store
            .get_index(&IndexConfig::new(IndexType::General))
            .unwrap()
            .unwrap();
        assert_eq!(index.len(), 3);
        let private = index.context().nodes[0].metadata.get("private");
        assert_eq!(private.and_then(|v| v.as_str()), Some("false"));
    }

    #[tokio::test]
    async fn test_cache_hit_returns_same_context_until_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let (store, clock) = store(dir.path());
        store.generate_index(&mixed_documents(), IndexType::Venue).await.unwrap();
        let path = store.path_for(IndexType::Venue);

        let first = store.storage_context(&path).unwrap();
        let second = store.storage_context(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        clock.advance(Duration::from_secs(301));
        let reloaded = store.storage_context(&path).unwrap();
        assert!(!Arc::ptr_eq(&first, &reloaded));
        assert_eq!(reloaded.len(), first.len());
    }

    #[tokio::test]
    async fn test_rebuild_is_picked_up_only_after_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let (store, clock) = store(dir.path());
        store.generate_index(&mixed_documents(), IndexType::General).await.unwrap();
        let path = store.path_for(IndexType::General);
        let before = store.storage_context(&path).unwrap();

        let docs = vec![Document::new("only.md", "Just one.", BTreeMap::new())];
        store.generate_index(&docs, IndexType::General).await.unwrap();

        let within_ttl = store.storage_context(&path).unwrap();
        assert!(Arc::ptr_eq(&before, &within_ttl));
        assert_eq!(within_ttl.len(), 3);

        clock.advance(Duration::from_secs(301));
        let after = store.storage_context(&path).unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.len(), 1);
    }

    #[tokio::test]
    async fn test_generate_datasource_splits_rows_from_prose() {
        let data = tempfile::tempdir().unwrap();
        std::fs::write(data.path().join("venues.csv"), "Venue Name\nBoteco\nBar Azul\n").unwrap();
        std::fs::write(data.path().join("about.txt"), "We organise events.").unwrap();

        let storage = tempfile::tempdir().unwrap();
        let (store, _) = store(storage.path());
        let loader = DocumentLoader::new(data.path().to_path_buf(), &LoaderSettings::default()).unwrap();

        let built = store.generate_datasource(&loader, None).await.unwrap();
        assert_eq!(built, vec![(IndexType::Venue, 2), (IndexType::General, 1)]);
    }

    #[tokio::test]
    async fn test_generate_datasource_explicit_type_takes_everything() {
        let data = tempfile::tempdir().unwrap();
        std::fs::write(data.path().join("venues.csv"), "Venue Name\nBoteco\n").unwrap();
        std::fs::write(data.path().join("about.txt"), "We organise events.").unwrap();

        let storage = tempfile::tempdir().unwrap();
        let (store, _) = store(storage.path());
        let loader = DocumentLoader::new(data.path().to_path_buf(), &LoaderSettings::default()).unwrap();

        let built = store
            .generate_datasource(&loader, Some(IndexType::Venue))
            .await
            .unwrap();
        assert_eq!(built, vec![(IndexType::Venue, 2)]);
        assert!(!store.exists(IndexType::General));
    }
}
