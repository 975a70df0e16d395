//! TripAdvisor reviews, gated on a prior name search.

use super::{parse_args, Tool, ToolCategory, ToolDefinition, ToolFailure, ToolOutput};
use crate::error::Result;
use crate::services::{format_reviews_markdown, ReviewsClient, TripAdvisorId, VenueResolutions};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

const DESCRIPTION: &str = "Get TripAdvisor reviews for a venue.

IMPORTANT: Do NOT use this tool directly with a venue name!
1. FIRST use the search_venues_by_name tool to get the venue's TripAdvisor ID
2. ONLY use the numeric TripAdvisor ID returned by search_venues_by_name

WRONG: get_tripadvisor_reviews(\"Vista Jardins\")
RIGHT: search_venues_by_name(\"Vista Jardins\"), then get_tripadvisor_reviews(\"123456\")";

#[derive(Deserialize)]
struct ReviewsArgs {
    #[serde(deserialize_with = "crate::services::string_or_number")]
    tripadvisor_id: String,
    #[serde(default)]
    limit: Option<u32>,
}

pub struct ReviewsTool {
    client: ReviewsClient,
    resolutions: VenueResolutions,
}

impl ReviewsTool {
    pub fn new(client: ReviewsClient, resolutions: VenueResolutions) -> Self {
        Self { client, resolutions }
    }
}

#[async_trait]
impl Tool for ReviewsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_tripadvisor_reviews".to_string(),
            description: DESCRIPTION.to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "tripadvisor_id": {
                        "type": "string",
                        "description": "The numeric TripAdvisor ID returned by search_venues_by_name"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of reviews (default: 5)"
                    }
                },
                "required": ["tripadvisor_id"]
            }),
            category: ToolCategory::Reviews,
        }
    }

    async fn invoke(&self, arguments: Value) -> Result<ToolOutput> {
        let args: ReviewsArgs = parse_args("get_tripadvisor_reviews", arguments)?;
        let id = TripAdvisorId::parse(&args.tripadvisor_id)?;

        let Some(venue) = self.resolutions.lookup(&id) else {
            warn!("Reviews requested for unresolved venue ID {}", id);
            return Ok(ToolOutput::Failure {
                kind: ToolFailure::UnresolvedVenue,
                message: format!(
                    "TripAdvisor ID {} has not been returned by a venue search in this conversation. \
                    Call search_venues_by_name with the venue's name first and use the ID it returns.",
                    id
                ),
            });
        };

        let result = self.client.get_reviews(&venue, args.limit).await;
        ToolOutput::from_service(result, |reviews| Ok(format_reviews_markdown(&reviews)))
    }
}
