//! Sentence-aware chunking of documents into indexable nodes.
//!
//! Sizes are measured in whitespace-separated tokens, which tracks model
//! tokens closely enough for bounding chunk size.

use crate::error::{ConciergeError, Result};
use crate::loader::{Document, MetadataValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// A piece of a document, carrying the document's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// ID of the source document.
    pub doc_id: String,
    /// Position of this chunk within its document.
    pub order: usize,
    /// Text content of this chunk.
    pub text: String,
    pub metadata: BTreeMap<String, MetadataValue>,
    /// Metadata keys left out of the model-facing text.
    pub excluded_llm_metadata_keys: Vec<String>,
}

impl Chunk {
    /// Stable node ID.
    pub fn id(&self) -> String {
        format!("{}:{}", self.doc_id, self.order)
    }

    /// Text as the model sees it: visible metadata, a blank line, then content.
    pub fn llm_text(&self) -> String {
        render_llm_text(&self.text, &self.metadata, &self.excluded_llm_metadata_keys)
    }
}

/// Prefix `text` with the metadata entries not listed in `excluded`.
pub fn render_llm_text(
    text: &str,
    metadata: &BTreeMap<String, MetadataValue>,
    excluded: &[String],
) -> String {
    let header: Vec<String> = metadata
        .iter()
        .filter(|(key, _)| !excluded.iter().any(|k| k == *key))
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect();

    if header.is_empty() {
        text.to_string()
    } else {
        format!("{}\n\n{}", header.join("\n"), text)
    }
}

/// Splits text on sentence and line boundaries, packing whole sentences into
/// chunks of at most `chunk_size` tokens with `chunk_overlap` tokens carried
/// over between consecutive chunks.
#[derive(Debug, Clone)]
pub struct SentenceSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl SentenceSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(ConciergeError::Config("Chunk size must be positive".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(ConciergeError::Config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Split every document, in order.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = documents.iter().flat_map(|d| self.split(d)).collect();
        debug!(
            "Split {} documents into {} chunks (size {}, overlap {})",
            documents.len(),
            chunks.len(),
            self.chunk_size,
            self.chunk_overlap
        );
        chunks
    }

    /// Split one document. Blank documents produce no chunks.
    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        self.split_text(document.text())
            .into_iter()
            .enumerate()
            .map(|(order, text)| Chunk {
                doc_id: document.id().to_string(),
                order,
                text,
                metadata: document.metadata().clone(),
                excluded_llm_metadata_keys: document.excluded_llm_metadata_keys().to_vec(),
            })
            .collect()
    }

    /// Split raw text into chunk strings.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let units: Vec<(String, usize)> = split_sentences(text)
            .into_iter()
            .flat_map(|s| self.fit(s))
            .collect();

        let mut chunks = Vec::new();
        let mut current: Vec<(String, usize)> = Vec::new();
        let mut tokens = 0;

        for (unit, count) in units {
            if tokens + count > self.chunk_size && !current.is_empty() {
                chunks.push(join(&current));

                // Carry trailing sentences into the next chunk as overlap.
                let mut kept = 0;
                let mut start = current.len();
                while start > 0 && kept + current[start - 1].1 <= self.chunk_overlap {
                    start -= 1;
                    kept += current[start].1;
                }
                current.drain(..start);
                tokens = kept;

                while tokens + count > self.chunk_size && !current.is_empty() {
                    tokens -= current.remove(0).1;
                }
            }
            current.push((unit, count));
            tokens += count;
        }

        if !current.is_empty() {
            chunks.push(join(&current));
        }
        chunks
    }

    /// Break a sentence longer than the chunk size into word windows.
    fn fit(&self, sentence: &str) -> Vec<(String, usize)> {
        let count = token_count(sentence);
        if count <= self.chunk_size {
            return vec![(sentence.to_string(), count)];
        }

        let words: Vec<&str> = sentence.split_whitespace().collect();
        words
            .chunks(self.chunk_size)
            .map(|w| (format!("{} ", w.join(" ")), w.len()))
            .collect()
    }
}

fn token_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn join(units: &[(String, usize)]) -> String {
    units
        .iter()
        .map(|(s, _)| s.as_str())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Split after sentence-ending punctuation followed by whitespace, and at line
/// breaks. Each piece keeps its trailing whitespace.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let boundary = match c {
            '\n' => true,
            '.' | '!' | '?' => chars.peek().map(|&(_, n)| n.is_whitespace()).unwrap_or(true),
            _ => false,
        };
        if !boundary {
            continue;
        }

        let mut end = i + c.len_utf8();
        while let Some(&(j, n)) = chars.peek() {
            if !n.is_whitespace() {
                break;
            }
            end = j + n.len_utf8();
            chars.next();
        }

        if !text[start..end].trim().is_empty() {
            sentences.push(&text[start..end]);
        }
        start = end;
    }

    if !text[start..].trim().is_empty() {
        sentences.push(&text[start..]);
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        let mut metadata = BTreeMap::new();
        metadata.insert("src".to_string(), MetadataValue::from("venues"));
        metadata.insert("city".to_string(), MetadataValue::from("Recife"));
        Document::new("venues#0", text, metadata).excluding_llm_keys(&["src"])
    }

    #[test]
    fn test_short_document_is_one_chunk() {
        let splitter = SentenceSplitter::new(1024, 20).unwrap();
        let chunks = splitter.split(&doc("Venue Name: Bar\nCity: Recife\nGreat caipirinhas."));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].order, 0);
        assert_eq!(chunks[0].id(), "venues#0:0");
        assert_eq!(chunks[0].metadata.get("city"), Some(&MetadataValue::from("Recife")));
    }

    #[test]
    fn test_blank_document_has_no_chunks() {
        let splitter = SentenceSplitter::new(16, 2).unwrap();
        assert!(splitter.split(&doc("  \n ")).is_empty());
    }

    #[test]
    fn test_chunks_respect_size_and_overlap() {
        let splitter = SentenceSplitter::new(8, 3).unwrap();
        let text = "One two three. Four five six. Seven eight nine. Ten eleven twelve.";
        let chunks = splitter.split_text(text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(token_count(chunk) <= 8, "chunk too large: {}", chunk);
        }
        // The last sentence of a chunk opens the next one.
        assert!(chunks[0].ends_with("Four five six."));
        assert!(chunks[1].starts_with("Four five six."));
    }

    #[test]
    fn test_long_sentence_is_windowed() {
        let splitter = SentenceSplitter::new(4, 1).unwrap();
        let chunks = splitter.split_text("a b c d e f g h i j");
        assert!(chunks.iter().all(|c| token_count(c) <= 4));
        assert_eq!(chunks.join(" ").split_whitespace().count(), 10);
    }

    #[test]
    fn test_llm_text_hides_excluded_keys() {
        let splitter = SentenceSplitter::new(64, 4).unwrap();
        let chunk = &splitter.split(&doc("Nice place."))[0];
        let text = chunk.llm_text();
        assert!(text.starts_with("city: Recife"));
        assert!(!text.contains("src:"));
        assert!(text.ends_with("Nice place."));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        assert!(SentenceSplitter::new(10, 10).is_err());
        assert!(SentenceSplitter::new(0, 0).is_err());
    }

    #[test]
    fn test_rows_split_on_lines() {
        let sentences = split_sentences("Venue Name: A\nCity: B\n");
        assert_eq!(sentences, vec!["Venue Name: A\n", "City: B\n"]);
    }
}
