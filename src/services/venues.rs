//! Venue management backend: venue search, menus and reservations.
//!
//! Venues are keyed by their TripAdvisor location ID. Name searches also
//! populate a [`VenueResolutions`] registry; a [`ResolvedVenue`] can only be
//! obtained from it, which is what gates the reviews lookup.

use super::http::ServiceClient;
use super::reviews::TripAdvisorId;
use super::{opt_string_or_number, string_or_number};
use crate::config::VenueApiSettings;
use crate::error::{ConciergeError, Result};
use chrono::{NaiveDate, NaiveTime};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

const SERVICE: &str = "Venue API";

pub const MAX_PARTY_SIZE: u32 = 50;
pub const DEFAULT_MENU_LIMIT: u32 = 100;

/// Kinds of outing a venue can suit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OccasionType {
    SpecialOccasion,
    DinnerOut,
    DateNight,
    ChilledDrink,
    QuickBeer,
    AfterWork,
    FamilyGetTogether,
    GirlsNight,
    BigNightOut,
    LargeGroups,
    Brunch,
    FootballGetTogether,
}

impl OccasionType {
    pub const ALL: [OccasionType; 12] = [
        OccasionType::SpecialOccasion,
        OccasionType::DinnerOut,
        OccasionType::DateNight,
        OccasionType::ChilledDrink,
        OccasionType::QuickBeer,
        OccasionType::AfterWork,
        OccasionType::FamilyGetTogether,
        OccasionType::GirlsNight,
        OccasionType::BigNightOut,
        OccasionType::LargeGroups,
        OccasionType::Brunch,
        OccasionType::FootballGetTogether,
    ];

    /// Value used by the backend.
    pub fn value(&self) -> &'static str {
        match self {
            OccasionType::SpecialOccasion => "Special Occasion",
            OccasionType::DinnerOut => "Dinner Out",
            OccasionType::DateNight => "Date Night / Romantic",
            OccasionType::ChilledDrink => "Chilled Drink",
            OccasionType::QuickBeer => "Quick Beer",
            OccasionType::AfterWork => "After Work",
            OccasionType::FamilyGetTogether => "Family get together",
            OccasionType::GirlsNight => "Girls Night",
            OccasionType::BigNightOut => "Big Night Out",
            OccasionType::LargeGroups => "Large Groups",
            OccasionType::Brunch => "Brunch",
            OccasionType::FootballGetTogether => "Football Get-Together",
        }
    }

    /// Constant-style name, e.g. `DATE_NIGHT`.
    pub fn name(&self) -> &'static str {
        match self {
            OccasionType::SpecialOccasion => "SPECIAL_OCCASION",
            OccasionType::DinnerOut => "DINNER_OUT",
            OccasionType::DateNight => "DATE_NIGHT",
            OccasionType::ChilledDrink => "CHILLED_DRINK",
            OccasionType::QuickBeer => "QUICK_BEER",
            OccasionType::AfterWork => "AFTER_WORK",
            OccasionType::FamilyGetTogether => "FAMILY_GET_TOGETHER",
            OccasionType::GirlsNight => "GIRLS_NIGHT",
            OccasionType::BigNightOut => "BIG_NIGHT_OUT",
            OccasionType::LargeGroups => "LARGE_GROUPS",
            OccasionType::Brunch => "BRUNCH",
            OccasionType::FootballGetTogether => "FOOTBALL_GET_TOGETHER",
        }
    }

    /// "NAME: 'value'" for every occasion, comma separated.
    pub fn options() -> String {
        Self::ALL
            .iter()
            .map(|o| format!("{}: '{}'", o.name(), o.value()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for OccasionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

impl FromStr for OccasionType {
    type Err = ConciergeError;

    /// Match the backend value first, then the constant name.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .iter()
            .find(|o| o.value() == s)
            .or_else(|| Self::ALL.iter().find(|o| o.name() == s))
            .copied()
            .ok_or_else(|| {
                ConciergeError::InvalidInput(format!(
                    "Invalid occasion type: {}. Must be one of: {}",
                    s,
                    Self::options()
                ))
            })
    }
}

impl Serialize for OccasionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.value())
    }
}

impl<'de> Deserialize<'de> for OccasionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A venue as returned by the search endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueSearchResult {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub tripadvisor_id: Option<String>,
    #[serde(alias = "venue_name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A venue whose TripAdvisor ID came back from a name search.
///
/// Only this module can create one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVenue {
    id: TripAdvisorId,
    name: String,
}

impl ResolvedVenue {
    pub fn id(&self) -> &TripAdvisorId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Venues resolved by name searches during a session.
#[derive(Debug, Clone, Default)]
pub struct VenueResolutions {
    inner: Arc<RwLock<HashMap<TripAdvisorId, ResolvedVenue>>>,
}

impl VenueResolutions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, id: &TripAdvisorId) -> Option<ResolvedVenue> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record every result carrying a well-formed ID.
    fn record(&self, results: &[VenueSearchResult]) -> usize {
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let mut recorded = 0;
        for result in results {
            let Some(raw) = result.tripadvisor_id.as_deref() else {
                continue;
            };
            match TripAdvisorId::parse(raw) {
                Ok(id) => {
                    map.insert(
                        id.clone(),
                        ResolvedVenue {
                            id,
                            name: result.name.clone(),
                        },
                    );
                    recorded += 1;
                }
                Err(e) => debug!("Not recording {}: {}", result.name, e),
            }
        }
        recorded
    }
}

/// A menu item from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    #[serde(default, deserialize_with = "opt_string_or_number", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number", skip_serializing_if = "Option::is_none")]
    pub tripadvisor_id: Option<String>,
    #[serde(alias = "name")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Filters for the menu item search.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItemQuery {
    pub query: Option<String>,
    pub tripadvisor_id: Option<TripAdvisorId>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub tags: Vec<String>,
    pub skip: u32,
    pub limit: u32,
}

impl Default for MenuItemQuery {
    fn default() -> Self {
        Self {
            query: None,
            tripadvisor_id: None,
            category: None,
            min_price: None,
            max_price: None,
            tags: Vec::new(),
            skip: 0,
            limit: DEFAULT_MENU_LIMIT,
        }
    }
}

impl MenuItemQuery {
    pub fn validate(&self) -> Result<()> {
        for price in [self.min_price, self.max_price].into_iter().flatten() {
            if !price.is_finite() || price < 0.0 {
                return Err(ConciergeError::InvalidInput(format!(
                    "Prices must be non-negative numbers, got {}",
                    price
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(ConciergeError::InvalidInput(format!(
                    "min_price ({}) is greater than max_price ({})",
                    min, max
                )));
            }
        }
        Ok(())
    }

    /// Query-string pairs; tags repeat.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(q) = &self.query {
            pairs.push(("query", q.clone()));
        }
        if let Some(id) = &self.tripadvisor_id {
            pairs.push(("tripadvisor_id", id.to_string()));
        }
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        if let Some(min) = self.min_price {
            pairs.push(("min_price", min.to_string()));
        }
        if let Some(max) = self.max_price {
            pairs.push(("max_price", max.to_string()));
        }
        for tag in &self.tags {
            pairs.push(("tags", tag.clone()));
        }
        pairs.push(("skip", self.skip.to_string()));
        pairs.push(("limit", self.limit.to_string()));
        pairs
    }
}

/// Summary statistics about a venue's menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_items: Option<u64>,
    #[serde(default, alias = "categories", skip_serializing_if = "BTreeMap::is_empty")]
    pub items_per_category: BTreeMap<String, u64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Price spread within one menu category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAggregation {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub avg_price: Option<f64>,
}

/// A reservation to create. Validated on construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReservationRequest {
    tripadvisor_id: TripAdvisorId,
    customer_name: String,
    party_size: u32,
    date: String,
    time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    special_requests: Option<String>,
}

impl ReservationRequest {
    pub fn new(
        tripadvisor_id: &str,
        customer_name: &str,
        party_size: u32,
        date: &str,
        time: &str,
    ) -> Result<Self> {
        let tripadvisor_id = TripAdvisorId::parse(tripadvisor_id)?;
        let customer_name = customer_name.trim();
        if customer_name.is_empty() {
            return Err(ConciergeError::InvalidInput("Customer name is required".to_string()));
        }
        validate_party_size(party_size)?;
        validate_date(date)?;
        validate_time(time)?;

        Ok(Self {
            tripadvisor_id,
            customer_name: customer_name.to_string(),
            party_size,
            date: date.to_string(),
            time: time.to_string(),
            contact: None,
            special_requests: None,
        })
    }

    pub fn with_contact(mut self, contact: Option<String>) -> Self {
        self.contact = contact.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn with_special_requests(mut self, requests: Option<String>) -> Self {
        self.special_requests = requests.filter(|r| !r.trim().is_empty());
        self
    }

    pub fn tripadvisor_id(&self) -> &TripAdvisorId {
        &self.tripadvisor_id
    }

    pub fn party_size(&self) -> u32 {
        self.party_size
    }
}

/// Changes to an existing reservation. At least one field must be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReservationUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
}

impl ReservationUpdate {
    pub fn validate(&self) -> Result<()> {
        if self.party_size.is_none()
            && self.date.is_none()
            && self.time.is_none()
            && self.special_requests.is_none()
        {
            return Err(ConciergeError::InvalidInput(
                "Nothing to update: give a new party size, date, time or special requests".to_string(),
            ));
        }
        if let Some(size) = self.party_size {
            validate_party_size(size)?;
        }
        if let Some(date) = &self.date {
            validate_date(date)?;
        }
        if let Some(time) = &self.time {
            validate_time(time)?;
        }
        Ok(())
    }
}

/// A reservation as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationResponse {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "opt_string_or_number", skip_serializing_if = "Option::is_none")]
    pub tripadvisor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn validate_party_size(size: u32) -> Result<()> {
    if size == 0 || size > MAX_PARTY_SIZE {
        return Err(ConciergeError::InvalidInput(format!(
            "Party size must be between 1 and {}, got {}",
            MAX_PARTY_SIZE, size
        )));
    }
    Ok(())
}

fn validate_date(date: &str) -> Result<()> {
    if date.len() != 10 || NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
        return Err(ConciergeError::InvalidInput(format!(
            "Invalid date '{}'. Use YYYY-MM-DD",
            date
        )));
    }
    Ok(())
}

fn validate_time(time: &str) -> Result<()> {
    if time.len() != 5 || NaiveTime::parse_from_str(time, "%H:%M").is_err() {
        return Err(ConciergeError::InvalidInput(format!(
            "Invalid time '{}'. Use 24-hour HH:MM",
            time
        )));
    }
    Ok(())
}

fn validate_reservation_id(raw: &str) -> Result<&str> {
    let id = raw.trim();
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(ConciergeError::InvalidInput(format!(
            "Invalid reservation ID '{}'",
            raw
        )));
    }
    Ok(id)
}

/// Client for the venue management backend.
pub struct VenueApiClient {
    client: ServiceClient,
    base_url: Url,
    resolutions: VenueResolutions,
}

impl VenueApiClient {
    pub fn new(settings: &VenueApiSettings, timeout: Duration, resolutions: VenueResolutions) -> Result<Self> {
        let base = super::normalize_base_url(&settings.base_url)?;
        let base_url = Url::parse(&base)
            .map_err(|e| ConciergeError::Config(format!("Invalid venue API URL: {}", e)))?;

        Ok(Self {
            client: ServiceClient::new(SERVICE, timeout)?,
            base_url,
            resolutions,
        })
    }

    pub fn resolutions(&self) -> &VenueResolutions {
        &self.resolutions
    }

    /// Build an endpoint URL; each segment is percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ConciergeError::Config(format!("Venue API URL {} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<&impl Serialize>,
        subject: &str,
    ) -> Result<T> {
        let url = self.endpoint(segments)?;
        let mut request = self
            .client
            .http()
            .request(method, url)
            .header("accept", "application/json")
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.client.send_json(request, subject).await
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str], query: &[(&str, String)], subject: &str) -> Result<T> {
        self.call(Method::GET, segments, query, None::<&()>, subject).await
    }

    #[instrument(skip(self))]
    pub async fn search_by_occasion(&self, occasion: OccasionType) -> Result<Vec<VenueSearchResult>> {
        self.get(
            &["venues", "search", "by-occasion", occasion.value()],
            &[],
            &format!("Venues for occasion '{}'", occasion),
        )
        .await
    }

    /// Search venues by name and remember every venue it resolves.
    #[instrument(skip(self))]
    pub async fn search_by_name(&self, name: &str) -> Result<Vec<VenueSearchResult>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ConciergeError::InvalidInput("Venue name must not be empty".to_string()));
        }

        let results: Vec<VenueSearchResult> = self
            .get(
                &["venues", "search", "by-name"],
                &[("name", name.to_string())],
                &format!("Venue '{}'", name),
            )
            .await?;

        let recorded = self.resolutions.record(&results);
        info!("Name search for '{}' returned {} venues ({} resolved)", name, results.len(), recorded);
        Ok(results)
    }

    /// Suggested occasions for a venue; values outside the known set are dropped.
    pub async fn occasion_suggestions(&self, id: &TripAdvisorId) -> Result<Vec<OccasionType>> {
        let raw: Vec<String> = self
            .get(
                &["venues", id.as_str(), "occasion-suggestions"],
                &[],
                &format!("Venue {}", id),
            )
            .await?;

        Ok(raw
            .into_iter()
            .filter_map(|s| match s.parse() {
                Ok(occasion) => Some(occasion),
                Err(_) => {
                    warn!("Ignoring unknown occasion '{}' for venue {}", s, id);
                    None
                }
            })
            .collect())
    }

    pub async fn venue_menu(
        &self,
        id: &TripAdvisorId,
        category: Option<&str>,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<MenuItem>> {
        let mut query = Vec::new();
        if let Some(category) = category {
            query.push(("category", category.to_string()));
        }
        query.push(("skip", skip.to_string()));
        query.push(("limit", limit.to_string()));

        self.get(&["menu-items", "venue", id.as_str()], &query, &format!("Menu for venue {}", id))
            .await
    }

    pub async fn search_menu_items(&self, query: &MenuItemQuery) -> Result<Vec<MenuItem>> {
        query.validate()?;
        self.get(&["menu-items", "search", ""], &query.to_pairs(), "Menu items")
            .await
    }

    pub async fn menu_stats(&self, id: &TripAdvisorId) -> Result<MenuStats> {
        self.get(&["menu-items", "stats", id.as_str()], &[], &format!("Menu stats for venue {}", id))
            .await
    }

    pub async fn price_aggregations(&self, id: &TripAdvisorId) -> Result<BTreeMap<String, PriceAggregation>> {
        self.get(
            &["menu-items", "categories", id.as_str()],
            &[],
            &format!("Menu categories for venue {}", id),
        )
        .await
    }

    #[instrument(skip(self, request), fields(venue = %request.tripadvisor_id()))]
    pub async fn create_reservation(&self, request: &ReservationRequest) -> Result<ReservationResponse> {
        let reservation: ReservationResponse = self
            .call(
                Method::POST,
                &["reservations", ""],
                &[],
                Some(request),
                &format!("Venue {}", request.tripadvisor_id()),
            )
            .await?;
        info!("Created reservation {}", reservation.id);
        Ok(reservation)
    }

    pub async fn get_reservation(&self, reservation_id: &str) -> Result<ReservationResponse> {
        let id = validate_reservation_id(reservation_id)?;
        self.get(&["reservations", id], &[], &format!("Reservation {}", id))
            .await
    }

    pub async fn update_reservation(
        &self,
        reservation_id: &str,
        update: &ReservationUpdate,
    ) -> Result<ReservationResponse> {
        let id = validate_reservation_id(reservation_id)?;
        update.validate()?;
        self.call(
            Method::PUT,
            &["reservations", id],
            &[],
            Some(update),
            &format!("Reservation {}", id),
        )
        .await
    }

    pub async fn cancel_reservation(&self, reservation_id: &str) -> Result<()> {
        let id = validate_reservation_id(reservation_id)?;
        let url = self.endpoint(&["reservations", id])?;
        let request = self
            .client
            .http()
            .delete(url)
            .header("accept", "application/json");
        self.client
            .send_empty(request, &format!("Reservation {}", id))
            .await?;
        info!("Cancelled reservation {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::http::FailureKind;
    use crate::testing::MockServer;
    use axum::extract::{Path, RawQuery};
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    fn client(server: &MockServer) -> VenueApiClient {
        let settings = VenueApiSettings {
            base_url: server.url("/api/v1"),
        };
        VenueApiClient::new(&settings, Duration::from_secs(5), VenueResolutions::new()).unwrap()
    }

    #[test]
    fn test_occasion_parsing() {
        assert_eq!("Date Night / Romantic".parse::<OccasionType>().unwrap(), OccasionType::DateNight);
        assert_eq!("FOOTBALL_GET_TOGETHER".parse::<OccasionType>().unwrap(), OccasionType::FootballGetTogether);
        assert_eq!(OccasionType::ALL.len(), 12);

        let err = "Rooftop".parse::<OccasionType>().unwrap_err().to_string();
        assert!(err.contains("Invalid occasion type: Rooftop"));
        assert!(err.contains("BRUNCH: 'Brunch'"));
    }

    #[test]
    fn test_reservation_validation() {
        assert!(ReservationRequest::new("1234567", "Ana", 4, "2025-03-14", "20:30").is_ok());

        let cases = [
            ("Vista Jardins", "Ana", 4, "2025-03-14", "20:30"),
            ("1234567", " ", 4, "2025-03-14", "20:30"),
            ("1234567", "Ana", 0, "2025-03-14", "20:30"),
            ("1234567", "Ana", 51, "2025-03-14", "20:30"),
            ("1234567", "Ana", 4, "14/03/2025", "20:30"),
            ("1234567", "Ana", 4, "2025-02-30", "20:30"),
            ("1234567", "Ana", 4, "2025-03-14", "8pm"),
            ("1234567", "Ana", 4, "2025-03-14", "24:00"),
        ];
        for (id, name, size, date, time) in cases {
            assert!(
                ReservationRequest::new(id, name, size, date, time).is_err(),
                "accepted {:?}",
                (id, name, size, date, time)
            );
        }

        assert!(matches!(
            ReservationRequest::new("12", "Ana", 2, "2025-03-14", "20:30"),
            Err(ConciergeError::InvalidVenueId(_))
        ));
    }

    #[test]
    fn test_update_needs_a_change() {
        assert!(ReservationUpdate::default().validate().is_err());
        let update = ReservationUpdate {
            party_size: Some(6),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({ "party_size": 6 }));
    }

    #[tokio::test]
    async fn test_search_by_name_records_resolutions() {
        let router = Router::new().route(
            "/api/v1/venues/search/by-name",
            get(|RawQuery(query): RawQuery| async move {
                assert_eq!(query.as_deref(), Some("name=Vista+Jardins"));
                Json(json!([
                    { "tripadvisor_id": 1234567, "name": "Vista Jardins", "city": "Sao Paulo" },
                    { "tripadvisor_id": null, "name": "Vista Mar" },
                    { "tripadvisor_id": "12", "name": "Broken" }
                ]))
            }),
        );
        let server = MockServer::start(router).await;
        let client = client(&server);

        let results = client.search_by_name("Vista Jardins").await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(client.resolutions().len(), 1);

        let id = TripAdvisorId::parse("1234567").unwrap();
        let venue = client.resolutions().lookup(&id).unwrap();
        assert_eq!(venue.name(), "Vista Jardins");
    }

    #[tokio::test]
    async fn test_occasion_path_is_encoded() {
        let router = Router::new().route(
            "/api/v1/venues/search/by-occasion/{occasion}",
            get(|Path(occasion): Path<String>| async move {
                Json(json!([{ "tripadvisor_id": "7654321", "name": occasion }]))
            }),
        );
        let server = MockServer::start(router).await;

        let results = client(&server).search_by_occasion(OccasionType::DateNight).await.unwrap();
        assert_eq!(results[0].name, "Date Night / Romantic");
    }

    #[tokio::test]
    async fn test_unknown_suggestions_are_dropped() {
        let server = MockServer::json(json!(["Brunch", "Karaoke", "After Work"])).await;
        let id = TripAdvisorId::parse("1234567").unwrap();
        let suggestions = client(&server).occasion_suggestions(&id).await.unwrap();
        assert_eq!(suggestions, vec![OccasionType::Brunch, OccasionType::AfterWork]);
    }

    #[tokio::test]
    async fn test_menu_search_repeats_tags() {
        let router = Router::new().route(
            "/api/v1/menu-items/search/",
            get(|RawQuery(query): RawQuery| async move {
                Json(json!([{ "title": query.unwrap_or_default(), "price": 12.5 }]))
            }),
        );
        let server = MockServer::start(router).await;

        let query = MenuItemQuery {
            query: Some("moqueca".to_string()),
            tags: vec!["vegan".to_string(), "spicy".to_string()],
            max_price: Some(80.0),
            ..Default::default()
        };
        let items = client(&server).search_menu_items(&query).await.unwrap();
        assert_eq!(
            items[0].title,
            "query=moqueca&max_price=80&tags=vegan&tags=spicy&skip=0&limit=100"
        );
    }

    #[tokio::test]
    async fn test_invalid_price_range_makes_no_request() {
        let server = MockServer::json(json!([])).await;
        let query = MenuItemQuery {
            min_price: Some(50.0),
            max_price: Some(10.0),
            ..Default::default()
        };
        assert!(client(&server).search_menu_items(&query).await.is_err());
        assert_eq!(server.hits(), 0);
    }

    #[tokio::test]
    async fn test_reservation_lifecycle() {
        let router = Router::new()
            .route(
                "/api/v1/reservations/",
                post(|Json(body): Json<Value>| async move {
                    Json(json!({ "id": 42, "status": "confirmed", "party_size": body["party_size"] }))
                }),
            )
            .route(
                "/api/v1/reservations/{id}",
                get(|Path(id): Path<String>| async move { Json(json!({ "id": id, "status": "confirmed" })) })
                    .put(|Path(id): Path<String>, Json(body): Json<Value>| async move {
                        Json(json!({ "id": id, "time": body["time"] }))
                    })
                    .delete(|| async { StatusCode::NO_CONTENT }),
            );
        let server = MockServer::start(router).await;
        let client = client(&server);

        let request = ReservationRequest::new("1234567", "Ana", 4, "2025-03-14", "20:30").unwrap();
        let created = client.create_reservation(&request).await.unwrap();
        assert_eq!(created.id, "42");
        assert_eq!(created.party_size, Some(4));

        let fetched = client.get_reservation("42").await.unwrap();
        assert_eq!(fetched.status.as_deref(), Some("confirmed"));

        let update = ReservationUpdate {
            time: Some("21:00".to_string()),
            ..Default::default()
        };
        let updated = client.update_reservation("42", &update).await.unwrap();
        assert_eq!(updated.time.as_deref(), Some("21:00"));

        client.cancel_reservation("42").await.unwrap();
        assert!(client.get_reservation("../admin").await.is_err());
        assert_eq!(server.hits(), 4);
    }

    #[tokio::test]
    async fn test_missing_reservation_is_not_found() {
        let server = MockServer::status(StatusCode::NOT_FOUND).await;
        match client(&server).get_reservation("99").await.unwrap_err() {
            ConciergeError::Upstream { failure, .. } => {
                assert_eq!(failure.kind, FailureKind::NotFound);
                assert_eq!(failure.message, "Reservation 99 not found on Venue API.");
            }
            other => panic!("Expected upstream error, got {:?}", other),
        }
    }
}
