//! TripAdvisor reviews adapter.

use super::http::ServiceClient;
use super::venues::ResolvedVenue;
use crate::config::TripAdvisorSettings;
use crate::error::{ConciergeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};

const SERVICE: &str = "TripAdvisor";

/// Why a string is not a TripAdvisor location ID.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VenueIdError {
    #[error(
        "Invalid TripAdvisor ID format. Expected a numeric ID, got: '{0}'. \
         You must first use the search_venues_by_name tool to get the correct TripAdvisor ID."
    )]
    NotNumeric(String),

    #[error(
        "Invalid TripAdvisor ID length. Expected 5-10 digits, got: {digits} digits. \
         Street numbers and other numeric values are not valid TripAdvisor IDs. \
         Use the search_venues_by_name tool to get the correct TripAdvisor ID."
    )]
    BadLength { digits: usize },
}

/// A well-formed TripAdvisor location ID: 5 to 10 ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TripAdvisorId(String);

impl TripAdvisorId {
    pub const MIN_DIGITS: usize = 5;
    pub const MAX_DIGITS: usize = 10;

    pub fn parse(raw: &str) -> std::result::Result<Self, VenueIdError> {
        let id = raw.trim();
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(VenueIdError::NotNumeric(raw.to_string()));
        }
        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&id.len()) {
            return Err(VenueIdError::BadLength { digits: id.len() });
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TripAdvisorId {
    type Err = VenueIdError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TripAdvisorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TripAdvisorId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = super::string_or_number(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// One review as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewData {
    pub rating: u8,
    pub title: String,
    pub text: String,
    pub published_date: String,
    pub username: String,
    pub language: String,
}

/// Reviews for one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewsResponse {
    pub location_id: String,
    pub reviews: Vec<ReviewData>,
    pub average_rating: f64,
    pub total_reviews: usize,
}

#[derive(Debug, Deserialize)]
struct RawReviews {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawReview {
    /// Missing ratings count as 0; whole-number floats are accepted.
    #[serde(default)]
    rating: f64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    published_date: String,
    #[serde(default)]
    user: Option<RawUser>,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    #[serde(default)]
    username: Option<String>,
}

impl From<RawReview> for ReviewData {
    fn from(raw: RawReview) -> Self {
        Self {
            rating: raw.rating.clamp(0.0, 5.0).round() as u8,
            title: raw.title,
            text: raw.text,
            published_date: raw.published_date,
            username: raw
                .user
                .and_then(|u| u.username)
                .unwrap_or_else(|| "Anonymous".to_string()),
            language: raw.language.unwrap_or_else(|| "en".to_string()),
        }
    }
}

/// Client for the TripAdvisor content API.
pub struct ReviewsClient {
    client: ServiceClient,
    base_url: String,
    api_key: Option<String>,
    language: String,
    default_limit: u32,
}

impl ReviewsClient {
    pub fn new(settings: &TripAdvisorSettings, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: ServiceClient::new(SERVICE, timeout)?,
            base_url: super::normalize_base_url(&settings.base_url)?,
            api_key: settings.api_key.clone(),
            language: settings.language.clone(),
            default_limit: settings.default_limit,
        })
    }

    pub fn default_limit(&self) -> u32 {
        self.default_limit
    }

    /// Fetch reviews for a venue resolved through the name search.
    pub async fn get_reviews(&self, venue: &ResolvedVenue, limit: Option<u32>) -> Result<ReviewsResponse> {
        info!("Fetching TripAdvisor reviews for {} ({})", venue.name(), venue.id());
        self.fetch(venue.id(), limit.unwrap_or(self.default_limit)).await
    }

    #[instrument(skip(self), fields(location_id = %id))]
    async fn fetch(&self, id: &TripAdvisorId, limit: u32) -> Result<ReviewsResponse> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ConciergeError::Config("TRIPADVISOR_API_KEY environment variable is not set".to_string())
        })?;

        let limit = limit.to_string();
        let request = self
            .client
            .http()
            .get(format!("{}/location/{}/reviews", self.base_url, id))
            .header("accept", "application/json")
            .query(&[
                ("key", api_key),
                ("limit", limit.as_str()),
                ("language", self.language.as_str()),
            ]);

        let raw: RawReviews = self
            .client
            .send_json(request, &format!("Location ID {}", id))
            .await?;

        let reviews: Vec<ReviewData> = raw
            .data
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<RawReview>(value) {
                Ok(review) => Some(review.into()),
                Err(e) => {
                    warn!("Skipping malformed review: {}", e);
                    None
                }
            })
            .collect();

        Ok(summarize(id.as_str(), reviews))
    }
}

fn summarize(location_id: &str, reviews: Vec<ReviewData>) -> ReviewsResponse {
    let average = if reviews.is_empty() {
        0.0
    } else {
        let total: u32 = reviews.iter().map(|r| r.rating as u32).sum();
        total as f64 / reviews.len() as f64
    };

    ReviewsResponse {
        location_id: location_id.to_string(),
        total_reviews: reviews.len(),
        average_rating: (average * 10.0).round() / 10.0,
        reviews,
    }
}

/// Render reviews as markdown.
pub fn format_reviews_markdown(response: &ReviewsResponse) -> String {
    let mut sections = Vec::new();

    let stars = "⭐".repeat(response.average_rating.round() as usize);
    if stars.is_empty() {
        sections.push("### TripAdvisor Reviews\n".to_string());
    } else {
        sections.push(format!("### TripAdvisor Reviews {}\n", stars));
    }
    sections.push(format!("Average Rating: {}/5", response.average_rating));
    sections.push(format!("Total Reviews: {}\n", response.total_reviews));

    if response.reviews.is_empty() {
        sections.push("No reviews found for this location.".to_string());
    }

    for review in &response.reviews {
        sections.push(format!("#### {} {}", review.title, "⭐".repeat(review.rating as usize)));
        sections.push(format!("*by {} on {}*\n", review.username, review.published_date));
        sections.push(format!("{}\n", review.text));
    }

    sections.join("\n")
}
