//! Adapters for the partner REST services.
//!
//! Each adapter validates its inputs before any network call, makes a single
//! attempt with a bounded timeout, and reports non-2xx statuses and transport
//! failures as classified [`http::UpstreamFailure`]s.

pub mod http;
pub mod menu;
pub mod reviews;
pub mod venues;
pub mod web_search;

pub use http::{FailureKind, ServiceClient, UpstreamFailure};
pub use menu::{Dish, Menu, MenuSection};
pub use reviews::{format_reviews_markdown, ReviewData, ReviewsClient, ReviewsResponse, TripAdvisorId, VenueIdError};
pub use venues::{
    MenuItem, MenuItemQuery, MenuStats, OccasionType, PriceAggregation, ReservationRequest,
    ReservationResponse, ReservationUpdate, ResolvedVenue, VenueApiClient, VenueResolutions,
    VenueSearchResult,
};
pub use web_search::{WebSearchClient, WebSearchResults};

use crate::error::{ConciergeError, Result};
use serde::{Deserialize, Deserializer};
use url::Url;

/// Validate a configured base URL and strip any trailing slash.
pub(crate) fn normalize_base_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConciergeError::Config(format!("Invalid service URL '{}': {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConciergeError::Config(format!(
            "Service URL '{}' must use http or https",
            raw
        )));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Accept an identifier sent either as a JSON string or a JSON number.
pub(crate) fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(i) => i.to_string(),
        Raw::Float(f) => format!("{}", f),
    })
}

/// Like [`string_or_number`], for optional fields.
pub(crate) fn opt_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "string_or_number")] String);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(s)| s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("http://localhost:8001/api/v1/").unwrap(),
            "http://localhost:8001/api/v1"
        );
        assert!(matches!(normalize_base_url("not a url"), Err(ConciergeError::Config(_))));
        assert!(normalize_base_url("ftp://example.com").is_err());
    }

    #[test]
    fn test_string_or_number() {
        #[derive(Deserialize)]
        struct Row {
            #[serde(deserialize_with = "string_or_number")]
            id: String,
            #[serde(default, deserialize_with = "opt_string_or_number")]
            other: Option<String>,
        }

        let row: Row = serde_json::from_str(r#"{"id": 1234567, "other": "x"}"#).unwrap();
        assert_eq!(row.id, "1234567");
        assert_eq!(row.other.as_deref(), Some("x"));

        let row: Row = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        assert!(row.other.is_none());
    }
}
