//! Persisted index state: embedded nodes in a SQLite file per index directory.

use super::{IndexType, INDEX_FILE};
use crate::chunking::{render_llm_text, Chunk};
use crate::error::{ConciergeError, Result};
use crate::loader::MetadataValue;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS index_meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS nodes (
        id TEXT PRIMARY KEY,
        doc_id TEXT NOT NULL,
        position INTEGER NOT NULL,
        text TEXT NOT NULL,
        metadata_json TEXT NOT NULL,
        excluded_keys_json TEXT NOT NULL,
        embedding BLOB NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_nodes_doc_id ON nodes(doc_id);
"#;

/// An embedded chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub doc_id: String,
    pub text: String,
    pub metadata: BTreeMap<String, MetadataValue>,
    pub excluded_llm_metadata_keys: Vec<String>,
    pub embedding: Vec<f32>,
}

impl Node {
    pub fn from_chunk(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self {
            id: chunk.id(),
            doc_id: chunk.doc_id,
            text: chunk.text,
            metadata: chunk.metadata,
            excluded_llm_metadata_keys: chunk.excluded_llm_metadata_keys,
            embedding,
        }
    }

    /// Text shown to the model, with bookkeeping metadata left out.
    pub fn llm_text(&self) -> String {
        render_llm_text(&self.text, &self.metadata, &self.excluded_llm_metadata_keys)
    }
}

/// Everything loaded from one index directory.
#[derive(Debug, Clone)]
pub struct StorageContext {
    pub index_type: IndexType,
    pub embedding_model: String,
    pub dimensions: usize,
    pub created_at: DateTime<Utc>,
    pub nodes: Vec<Node>,
}

impl StorageContext {
    pub fn new(index_type: IndexType, embedding_model: &str, dimensions: usize, nodes: Vec<Node>) -> Self {
        Self {
            index_type,
            embedding_model: embedding_model.to_string(),
            dimensions,
            created_at: Utc::now(),
            nodes,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Write this context into `dir`, replacing whatever was there.
    #[instrument(skip(self), fields(nodes = self.nodes.len()))]
    pub fn persist(&self, dir: &Path) -> Result<()> {
        if dir.exists() {
            std::fs::remove_dir_all(dir)?;
        }
        std::fs::create_dir_all(dir)?;

        let path = dir.join(INDEX_FILE);
        let mut conn = Connection::open(&path)?;
        conn.execute_batch(SCHEMA)?;

        let tx = conn.transaction()?;
        {
            let mut meta = tx.prepare("INSERT INTO index_meta (key, value) VALUES (?1, ?2)")?;
            meta.execute(params!["index_type", self.index_type.to_string()])?;
            meta.execute(params!["embedding_model", self.embedding_model])?;
            meta.execute(params!["dimensions", self.dimensions.to_string()])?;
            meta.execute(params!["created_at", self.created_at.to_rfc3339()])?;

            let mut insert = tx.prepare(
                r#"
                INSERT OR REPLACE INTO nodes
                (id, doc_id, position, text, metadata_json, excluded_keys_json, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            for (position, node) in self.nodes.iter().enumerate() {
                insert.execute(params![
                    node.id,
                    node.doc_id,
                    position as i64,
                    node.text,
                    serde_json::to_string(&node.metadata)?,
                    serde_json::to_string(&node.excluded_llm_metadata_keys)?,
                    embedding_to_bytes(&node.embedding),
                ])?;
            }
        }
        tx.commit()?;

        info!("Persisted {} nodes to {}", self.nodes.len(), path.display());
        Ok(())
    }

    /// Load the context stored in `dir`.
    #[instrument]
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(INDEX_FILE);
        if !path.exists() {
            return Err(ConciergeError::Index(format!(
                "No {} in {}. Run `concierge generate` first.",
                INDEX_FILE,
                dir.display()
            )));
        }

        let conn = Connection::open(&path)?;
        let meta = |key: &str| -> Result<Option<String>> {
            Ok(conn
                .query_row("SELECT value FROM index_meta WHERE key = ?1", [key], |row| row.get(0))
                .optional()?)
        };

        let index_type: IndexType = meta("index_type")?
            .ok_or_else(|| ConciergeError::Index(format!("{} has no index type", path.display())))?
            .parse()?;
        let embedding_model = meta("embedding_model")?.unwrap_or_default();
        let dimensions = meta("dimensions")?
            .and_then(|d| d.parse().ok())
            .unwrap_or_default();
        let created_at = meta("created_at")?
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let mut stmt = conn.prepare(
            "SELECT id, doc_id, text, metadata_json, excluded_keys_json, embedding \
             FROM nodes ORDER BY position",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Vec<u8>>(5)?,
            ))
        })?;

        let mut nodes = Vec::new();
        for row in rows {
            let (id, doc_id, text, metadata_json, excluded_json, embedding) = row?;
            nodes.push(Node {
                id,
                doc_id,
                text,
                metadata: serde_json::from_str(&metadata_json)?,
                excluded_llm_metadata_keys: serde_json::from_str(&excluded_json)?,
                embedding: bytes_to_embedding(&embedding),
            });
        }

        debug!("Loaded {} nodes from {}", nodes.len(), path.display());
        Ok(Self {
            index_type,
            embedding_model,
            dimensions,
            created_at,
            nodes,
        })
    }
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, embedding: Vec<f32>) -> Node {
        let mut metadata = BTreeMap::new();
        metadata.insert("private".to_string(), MetadataValue::from("false"));
        metadata.insert("idx".to_string(), MetadataValue::Int(3));
        Node {
            id: id.to_string(),
            doc_id: "venues#3".to_string(),
            text: "Venue Name: Boteco".to_string(),
            metadata,
            excluded_llm_metadata_keys: vec!["idx".to_string()],
            embedding,
        }
    }

    #[test]
    fn test_persist_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("venue");
        let context = StorageContext::new(
            IndexType::Venue,
            "text-embedding-3-small",
            3,
            vec![node("b", vec![0.1, 0.2, 0.3]), node("a", vec![1.0, 0.0, -1.5])],
        );
        context.persist(&target).unwrap();

        let loaded = StorageContext::load(&target).unwrap();
        assert_eq!(loaded.index_type, IndexType::Venue);
        assert_eq!(loaded.dimensions, 3);
        assert_eq!(loaded.nodes, context.nodes);
    }

    #[test]
    fn test_persist_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("general");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("stale.json"), "{}").unwrap();

        StorageContext::new(IndexType::General, "m", 1, vec![node("a", vec![1.0])])
            .persist(&target)
            .unwrap();

        assert!(!target.join("stale.json").exists());
        assert!(target.join(INDEX_FILE).exists());
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(StorageContext::load(dir.path()).is_err());
    }

    #[test]
    fn test_llm_text_skips_excluded_keys() {
        let text = node("a", vec![]).llm_text();
        assert!(text.contains("private: false"));
        assert!(!text.contains("idx"));
    }
}
