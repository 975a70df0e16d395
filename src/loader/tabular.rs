//! Tabular (CSV) loading: one document per row.

use super::document::{Document, MetadataValue, ROW_TYPE, TYPE_KEY};
use crate::error::Result;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Columns promoted into metadata.
const KEY_COLUMNS: &[&str] = &["Venue Name", "City", "State"];

/// Column names recognised as the reviews-provider location ID.
const ID_COLUMNS: &[&str] = &["tripadvisor id", "tripadvisor_id", "tripadvisor location id"];

/// Metadata key for a surfaced external ID.
pub const EXTERNAL_ID_KEY: &str = "tripadvisor_id";

const MAX_KEY_LEN: usize = 10;
const MAX_VALUE_LEN: usize = 100;

/// Load a CSV file from disk.
pub fn load_csv(path: &Path) -> Result<Vec<Document>> {
    let source = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table")
        .to_string();
    let file = std::fs::File::open(path)?;
    rows_to_documents(file, &source)
}

/// Turn CSV rows into documents tagged `type = "row"` with a strictly increasing `idx`.
pub fn rows_to_documents(reader: impl Read, source: &str) -> Result<Vec<Document>> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let mut documents = Vec::new();
    for (idx, record) in csv_reader.records().enumerate() {
        let record = record?;

        let mut metadata = BTreeMap::new();
        metadata.insert("src".to_string(), MetadataValue::from(source));
        metadata.insert("idx".to_string(), MetadataValue::Int(idx as i64));
        metadata.insert(TYPE_KEY.to_string(), MetadataValue::from(ROW_TYPE));

        let mut lines = Vec::with_capacity(headers.len() + 3);
        let mut external_id = None;
        let mut venue_name = None;

        for (i, column) in headers.iter().enumerate() {
            let value = record.get(i).unwrap_or("").trim();
            lines.push(format!("{}: {}", column, value));

            if KEY_COLUMNS.contains(&column) {
                metadata.insert(metadata_key(column), MetadataValue::from(truncate(value, MAX_VALUE_LEN)));
                if column == "Venue Name" && !value.is_empty() {
                    venue_name = Some(value.to_string());
                }
            }

            if is_id_column(column) && !value.is_empty() {
                external_id = Some(value.to_string());
            }
        }

        if let Some(id) = &external_id {
            metadata.insert(EXTERNAL_ID_KEY.to_string(), MetadataValue::from(id.as_str()));
            lines.extend(id_phrasings(id, venue_name.as_deref()));
        }

        documents.push(
            Document::new(format!("{}#{}", source, idx), lines.join("\n"), metadata)
                .excluding_llm_keys(&["idx", "src", TYPE_KEY]),
        );
    }

    debug!("Loaded {} rows from {}", documents.len(), source);
    Ok(documents)
}

fn is_id_column(column: &str) -> bool {
    let normalized = column.trim().to_lowercase();
    ID_COLUMNS.contains(&normalized.as_str())
}

/// Repeat the ID in several phrasings so lookups by ID retrieve the row.
fn id_phrasings(id: &str, venue_name: Option<&str>) -> Vec<String> {
    let mut lines = vec![
        format!("TripAdvisor ID: {}", id),
        format!("TripAdvisor location ID: {}", id),
        format!("tripadvisor_id={}", id),
    ];
    if let Some(name) = venue_name {
        lines.push(format!("The TripAdvisor ID of {} is {}", name, id));
    }
    lines
}

fn metadata_key(column: &str) -> String {
    column
        .to_lowercase()
        .replace(' ', "_")
        .chars()
        .take(MAX_KEY_LEN)
        .collect()
}

fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}
