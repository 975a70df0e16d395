//! Venue backend tools: search, menus and reservations.

use super::{parse_args, to_json, Tool, ToolCategory, ToolDefinition, ToolOutput};
use crate::error::Result;
use crate::services::{
    Menu, MenuItemQuery, OccasionType, ReservationRequest, ReservationUpdate, TripAdvisorId,
    VenueApiClient,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// One operation of the venue backend exposed as a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VenueOperation {
    SearchByName,
    SearchByOccasion,
    OccasionSuggestions,
    VenueMenu,
    SearchMenuItems,
    MenuStats,
    PriceAggregations,
    MakeReservation,
    GetReservation,
    UpdateReservation,
    CancelReservation,
}

impl VenueOperation {
    pub const ALL: [VenueOperation; 11] = [
        VenueOperation::SearchByName,
        VenueOperation::SearchByOccasion,
        VenueOperation::OccasionSuggestions,
        VenueOperation::VenueMenu,
        VenueOperation::SearchMenuItems,
        VenueOperation::MenuStats,
        VenueOperation::PriceAggregations,
        VenueOperation::MakeReservation,
        VenueOperation::GetReservation,
        VenueOperation::UpdateReservation,
        VenueOperation::CancelReservation,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            VenueOperation::SearchByName => "search_venues_by_name",
            VenueOperation::SearchByOccasion => "search_venues_by_occasion",
            VenueOperation::OccasionSuggestions => "get_occasion_suggestions",
            VenueOperation::VenueMenu => "get_venue_menu",
            VenueOperation::SearchMenuItems => "search_menu_items",
            VenueOperation::MenuStats => "get_menu_stats",
            VenueOperation::PriceAggregations => "get_price_aggregations",
            VenueOperation::MakeReservation => "make_reservation",
            VenueOperation::GetReservation => "get_reservation",
            VenueOperation::UpdateReservation => "update_reservation",
            VenueOperation::CancelReservation => "cancel_reservation",
        }
    }

    fn category(&self) -> ToolCategory {
        match self {
            VenueOperation::SearchByName
            | VenueOperation::SearchByOccasion
            | VenueOperation::OccasionSuggestions => ToolCategory::VenueLookup,
            VenueOperation::VenueMenu
            | VenueOperation::SearchMenuItems
            | VenueOperation::MenuStats
            | VenueOperation::PriceAggregations => ToolCategory::Menu,
            VenueOperation::MakeReservation
            | VenueOperation::GetReservation
            | VenueOperation::UpdateReservation
            | VenueOperation::CancelReservation => ToolCategory::Reservations,
        }
    }

    fn description(&self) -> String {
        match self {
            VenueOperation::SearchByName => "Find a specific venue by name and get its numeric TripAdvisor ID. \
                Always call this before get_tripadvisor_reviews, menu tools or make_reservation."
                .to_string(),
            VenueOperation::SearchByOccasion => format!(
                "Search for venues that suit an occasion. occasion_type must be one of: {}.",
                OccasionType::ALL
                    .iter()
                    .map(|o| format!("\"{}\"", o.value()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            VenueOperation::OccasionSuggestions => {
                "Get the occasions a venue is suggested for, by TripAdvisor ID.".to_string()
            }
            VenueOperation::VenueMenu => "Get the menu of a venue by TripAdvisor ID, grouped by category. \
                Optionally filter by category and page with skip (default 0) and limit (default 100)."
                .to_string(),
            VenueOperation::SearchMenuItems => "Search menu items across venues. Filters: text query over \
                title and description, TripAdvisor ID, category, price range and tags."
                .to_string(),
            VenueOperation::MenuStats => "Get statistics about a venue's menu: total items, items per \
                category, price ranges and common tags."
                .to_string(),
            VenueOperation::PriceAggregations => {
                "Get minimum, maximum and average price per menu category for a venue.".to_string()
            }
            VenueOperation::MakeReservation => "Book a table. Needs the venue's TripAdvisor ID from \
                search_venues_by_name, the guest name, party size (1-50), date (YYYY-MM-DD) and time (HH:MM)."
                .to_string(),
            VenueOperation::GetReservation => "Look up a reservation by its ID.".to_string(),
            VenueOperation::UpdateReservation => "Change the party size, date, time or special requests \
                of an existing reservation."
                .to_string(),
            VenueOperation::CancelReservation => "Cancel a reservation by its ID.".to_string(),
        }
    }

    fn input_schema(&self) -> Value {
        let id = json!({ "type": "string", "description": "Numeric TripAdvisor ID of the venue" });
        let reservation_id = json!({ "type": "string", "description": "Reservation ID" });

        match self {
            VenueOperation::SearchByName => json!({
                "type": "object",
                "properties": { "name": { "type": "string", "description": "Venue name" } },
                "required": ["name"]
            }),
            VenueOperation::SearchByOccasion => json!({
                "type": "object",
                "properties": {
                    "occasion_type": {
                        "type": "string",
                        "enum": OccasionType::ALL.iter().map(|o| o.value()).collect::<Vec<_>>()
                    }
                },
                "required": ["occasion_type"]
            }),
            VenueOperation::OccasionSuggestions
            | VenueOperation::MenuStats
            | VenueOperation::PriceAggregations => json!({
                "type": "object",
                "properties": { "tripadvisor_id": id },
                "required": ["tripadvisor_id"]
            }),
            VenueOperation::VenueMenu => json!({
                "type": "object",
                "properties": {
                    "tripadvisor_id": id,
                    "category": { "type": "string" },
                    "skip": { "type": "integer", "default": 0 },
                    "limit": { "type": "integer", "default": 100 }
                },
                "required": ["tripadvisor_id"]
            }),
            VenueOperation::SearchMenuItems => json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Text search in title and description" },
                    "tripadvisor_id": id,
                    "category": { "type": "string" },
                    "min_price": { "type": "number" },
                    "max_price": { "type": "number" },
                    "tags": { "type": "array", "items": { "type": "string" } },
                    "skip": { "type": "integer", "default": 0 },
                    "limit": { "type": "integer", "default": 100 }
                }
            }),
            VenueOperation::MakeReservation => json!({
                "type": "object",
                "properties": {
                    "tripadvisor_id": id,
                    "customer_name": { "type": "string" },
                    "party_size": { "type": "integer", "minimum": 1, "maximum": 50 },
                    "date": { "type": "string", "description": "YYYY-MM-DD" },
                    "time": { "type": "string", "description": "HH:MM, 24-hour" },
                    "contact": { "type": "string", "description": "Phone or email" },
                    "special_requests": { "type": "string" }
                },
                "required": ["tripadvisor_id", "customer_name", "party_size", "date", "time"]
            }),
            VenueOperation::GetReservation | VenueOperation::CancelReservation => json!({
                "type": "object",
                "properties": { "reservation_id": reservation_id },
                "required": ["reservation_id"]
            }),
            VenueOperation::UpdateReservation => json!({
                "type": "object",
                "properties": {
                    "reservation_id": reservation_id,
                    "party_size": { "type": "integer", "minimum": 1, "maximum": 50 },
                    "date": { "type": "string", "description": "YYYY-MM-DD" },
                    "time": { "type": "string", "description": "HH:MM, 24-hour" },
                    "special_requests": { "type": "string" }
                },
                "required": ["reservation_id"]
            }),
        }
    }
}

#[derive(Deserialize)]
struct NameArgs {
    name: String,
}

#[derive(Deserialize)]
struct OccasionArgs {
    occasion_type: String,
}

#[derive(Deserialize)]
struct VenueArgs {
    #[serde(deserialize_with = "crate::services::string_or_number")]
    tripadvisor_id: String,
}

#[derive(Deserialize)]
struct MenuArgs {
    #[serde(deserialize_with = "crate::services::string_or_number")]
    tripadvisor_id: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    skip: Option<u32>,
    #[serde(default)]
    limit: Option<u32>,
}

#[derive(Deserialize)]
struct MenuSearchArgs {
    #[serde(default)]
    query: Option<String>,
    #[serde(default, deserialize_with = "crate::services::opt_string_or_number")]
    tripadvisor_id: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    min_price: Option<f64>,
    #[serde(default)]
    max_price: Option<f64>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    skip: Option<u32>,
    #[serde(default)]
    limit: Option<u32>,
}

#[derive(Deserialize)]
struct ReservationArgs {
    #[serde(deserialize_with = "crate::services::string_or_number")]
    tripadvisor_id: String,
    customer_name: String,
    party_size: u32,
    date: String,
    time: String,
    #[serde(default)]
    contact: Option<String>,
    #[serde(default)]
    special_requests: Option<String>,
}

#[derive(Deserialize)]
struct ReservationIdArgs {
    #[serde(deserialize_with = "crate::services::string_or_number")]
    reservation_id: String,
}

#[derive(Deserialize)]
struct UpdateArgs {
    #[serde(deserialize_with = "crate::services::string_or_number")]
    reservation_id: String,
    #[serde(flatten)]
    update: UpdateFields,
}

#[derive(Deserialize)]
struct UpdateFields {
    #[serde(default)]
    party_size: Option<u32>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    special_requests: Option<String>,
}

pub struct VenueTool {
    operation: VenueOperation,
    client: Arc<VenueApiClient>,
}

impl VenueTool {
    pub fn new(operation: VenueOperation, client: Arc<VenueApiClient>) -> Self {
        Self { operation, client }
    }

    async fn run(&self, arguments: Value) -> Result<ToolOutput> {
        let name = self.operation.name();
        let client = &self.client;

        match self.operation {
            VenueOperation::SearchByName => {
                let args: NameArgs = parse_args(name, arguments)?;
                let result = client.search_by_name(&args.name).await;
                ToolOutput::from_service(result, |venues| {
                    if venues.is_empty() {
                        return Ok(format!("No venues found matching \"{}\".", args.name.trim()));
                    }
                    to_json(&venues)
                })
            }
            VenueOperation::SearchByOccasion => {
                let args: OccasionArgs = parse_args(name, arguments)?;
                let occasion: OccasionType = args.occasion_type.parse()?;
                let result = client.search_by_occasion(occasion).await;
                ToolOutput::from_service(result, |venues| {
                    if venues.is_empty() {
                        return Ok(format!("No venues found for occasion \"{}\".", occasion));
                    }
                    to_json(&venues)
                })
            }
            VenueOperation::OccasionSuggestions => {
                let args: VenueArgs = parse_args(name, arguments)?;
                let id = TripAdvisorId::parse(&args.tripadvisor_id)?;
                let result = client.occasion_suggestions(&id).await;
                ToolOutput::from_service(result, |occasions| {
                    if occasions.is_empty() {
                        return Ok(format!("No occasion suggestions for venue {}.", id));
                    }
                    Ok(occasions.iter().map(|o| format!("- {}", o)).collect::<Vec<_>>().join("\n"))
                })
            }
            VenueOperation::VenueMenu => {
                let args: MenuArgs = parse_args(name, arguments)?;
                let id = TripAdvisorId::parse(&args.tripadvisor_id)?;
                let result = client
                    .venue_menu(
                        &id,
                        args.category.as_deref(),
                        args.skip.unwrap_or(0),
                        args.limit.unwrap_or(crate::services::venues::DEFAULT_MENU_LIMIT),
                    )
                    .await;
                let title = client
                    .resolutions()
                    .lookup(&id)
                    .map(|venue| venue.name().to_string())
                    .unwrap_or_else(|| format!("Venue {}", id));
                ToolOutput::from_service(result, |items| Ok(Menu::from_items(&title, &items, None)?.to_markdown()))
            }
            VenueOperation::SearchMenuItems => {
                let args: MenuSearchArgs = parse_args(name, arguments)?;
                let query = MenuItemQuery {
                    query: args.query.filter(|q| !q.trim().is_empty()),
                    tripadvisor_id: args.tripadvisor_id.as_deref().map(TripAdvisorId::parse).transpose()?,
                    category: args.category,
                    min_price: args.min_price,
                    max_price: args.max_price,
                    tags: args.tags,
                    skip: args.skip.unwrap_or(0),
                    limit: args.limit.unwrap_or(crate::services::venues::DEFAULT_MENU_LIMIT),
                };
                let result = client.search_menu_items(&query).await;
                ToolOutput::from_service(result, |items| {
                    if items.is_empty() {
                        return Ok("No menu items matched.".to_string());
                    }
                    to_json(&items)
                })
            }
            VenueOperation::MenuStats => {
                let args: VenueArgs = parse_args(name, arguments)?;
                let id = TripAdvisorId::parse(&args.tripadvisor_id)?;
                let result = client.menu_stats(&id).await;
                ToolOutput::from_service(result, |stats| to_json(&stats))
            }
            VenueOperation::PriceAggregations => {
                let args: VenueArgs = parse_args(name, arguments)?;
                let id = TripAdvisorId::parse(&args.tripadvisor_id)?;
                let result = client.price_aggregations(&id).await;
                ToolOutput::from_service(result, |prices| to_json(&prices))
            }
            VenueOperation::MakeReservation => {
                let args: ReservationArgs = parse_args(name, arguments)?;
                let request = ReservationRequest::new(
                    &args.tripadvisor_id,
                    &args.customer_name,
                    args.party_size,
                    &args.date,
                    &args.time,
                )?
                .with_contact(args.contact)
                .with_special_requests(args.special_requests);
                let result = client.create_reservation(&request).await;
                ToolOutput::from_service(result, |reservation| {
                    Ok(format!("Reservation created.\n{}", to_json(&reservation)?))
                })
            }
            VenueOperation::GetReservation => {
                let args: ReservationIdArgs = parse_args(name, arguments)?;
                let result = client.get_reservation(&args.reservation_id).await;
                ToolOutput::from_service(result, |reservation| to_json(&reservation))
            }
            VenueOperation::UpdateReservation => {
                let args: UpdateArgs = parse_args(name, arguments)?;
                let update = ReservationUpdate {
                    party_size: args.update.party_size,
                    date: args.update.date,
                    time: args.update.time,
                    special_requests: args.update.special_requests,
                };
                let result = client.update_reservation(&args.reservation_id, &update).await;
                ToolOutput::from_service(result, |reservation| {
                    Ok(format!("Reservation updated.\n{}", to_json(&reservation)?))
                })
            }
            VenueOperation::CancelReservation => {
                let args: ReservationIdArgs = parse_args(name, arguments)?;
                let result = client.cancel_reservation(&args.reservation_id).await;
                ToolOutput::from_service(result, |()| {
                    Ok(format!("Reservation {} cancelled.", args.reservation_id.trim()))
                })
            }
        }
    }
}

#[async_trait]
impl Tool for VenueTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.operation.name().to_string(),
            description: self.operation.description(),
            input_schema: self.operation.input_schema(),
            category: self.operation.category(),
        }
    }

    async fn invoke(&self, arguments: Value) -> Result<ToolOutput> {
        self.run(arguments).await
    }
}

/// Every venue operation as a tool sharing one client.
pub fn venue_tools(client: Arc<VenueApiClient>) -> Vec<Arc<dyn Tool>> {
    VenueOperation::ALL
        .iter()
        .map(|&operation| Arc::new(VenueTool::new(operation, client.clone())) as Arc<dyn Tool>)
        .collect()
}
