use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::str::FromStr;
use std::time::Instant;
use utoipa::ToSchema;

use crate::codec::cursor;
use crate::error::{AppError, Result};
use crate::metrics::feed as feed_metrics;
use crate::models::{FeedPage, ScoredItem};
use crate::services::{FeedRequest, FeedService};

pub struct FeedHandlerState {
    pub feed_service: FeedService,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FeedItemResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub lat: f64,
    pub lng: f64,
    pub published_at: DateTime<Utc>,
    #[schema(value_type = Object)]
    pub attributes: serde_json::Value,
    pub score: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FeedResponse {
    pub items: Vec<FeedItemResponse>,
    /// Opaque token for the next page; empty on the last page
    pub next_cursor: String,
}

impl From<ScoredItem> for FeedItemResponse {
    fn from(scored: ScoredItem) -> Self {
        let item = scored.item;
        Self {
            id: item.id.to_string(),
            content_type: item.content_type,
            lat: item.location.lat(),
            lng: item.location.lng(),
            published_at: item.published_at,
            attributes: item.attributes,
            score: scored.score,
        }
    }
}

impl FeedResponse {
    fn from_page(page: FeedPage) -> Result<Self> {
        let next_cursor = match &page.next_cursor {
            Some(c) => cursor::encode(c).map_err(|e| AppError::Internal(e.to_string()))?,
            None => String::new(),
        };

        Ok(Self {
            items: page.items.into_iter().map(FeedItemResponse::from).collect(),
            next_cursor,
        })
    }
}

/// Read feed parameters from raw query pairs so `types` can repeat.
pub fn parse_feed_request(pairs: &[(String, String)]) -> Result<FeedRequest> {
    let first = |key: &str| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
    };

    let lat = required::<f64>(first("lat"), "lat")?;
    let lng = required::<f64>(first("lng"), "lng")?;
    let radius_meters = required::<i64>(first("radius_meters"), "radius_meters")?;

    // An unparseable limit falls back to the default page size
    let limit = first("limit").and_then(|v| v.parse::<i64>().ok());

    let types = pairs
        .iter()
        .filter(|(k, _)| k == "types")
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();

    Ok(FeedRequest {
        lat,
        lng,
        radius_meters,
        types,
        limit,
        cursor: first("cursor").map(str::to_string),
    })
}

fn required<T: FromStr>(raw: Option<&str>, name: &str) -> Result<T> {
    let raw = raw
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{name} is required")))?;
    raw.parse()
        .map_err(|_| AppError::Validation(format!("invalid {name}: {raw:?}")))
}

/// Ranked feed around a point
#[utoipa::path(
    get,
    path = "/feed",
    tag = "feed",
    params(
        ("lat" = f64, Query, description = "Latitude in degrees"),
        ("lng" = f64, Query, description = "Longitude in degrees"),
        ("radius_meters" = i64, Query, description = "Search radius, > 0"),
        ("types" = Option<Vec<String>>, Query, description = "Repeatable content type filter"),
        ("limit" = Option<i64>, Query, description = "Page size, default 20, max 50"),
        ("cursor" = Option<String>, Query, description = "Opaque next_cursor of the previous page"),
    ),
    responses(
        (status = 200, description = "One page of ranked items", body = FeedResponse),
        (status = 400, description = "Invalid parameters or cursor"),
        (status = 500, description = "Store failure")
    )
)]
pub async fn get_feed(
    query: web::Query<Vec<(String, String)>>,
    state: web::Data<FeedHandlerState>,
) -> Result<HttpResponse> {
    let start = Instant::now();
    let result = serve_feed(&query, &state).await;

    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) => feed_metrics::outcome_label(e),
    };
    feed_metrics::record_feed_request(outcome, start.elapsed());

    let response = result?;
    feed_metrics::record_page_size(response.items.len());
    Ok(HttpResponse::Ok().json(response))
}

async fn serve_feed(pairs: &[(String, String)], state: &FeedHandlerState) -> Result<FeedResponse> {
    let request = parse_feed_request(pairs)?;
    let page = state.feed_service.get_feed(request).await?;
    FeedResponse::from_page(page)
}
