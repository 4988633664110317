use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::metrics::feed as feed_metrics;
use crate::services::ingestion::DEFAULT_BASE_SCORE;
use crate::services::{IngestionService, NewContent};

pub struct IngestionHandlerState {
    pub ingestion_service: IngestionService,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateContentRequest {
    /// Producer-side id; replays with the same value are no-ops
    pub external_id: Option<String>,
    #[serde(rename = "type")]
    pub content_type: String,
    pub lat: f64,
    pub lng: f64,
    /// RFC3339 timestamp
    pub published_at: String,
    #[schema(value_type = Option<Object>)]
    pub attributes: Option<serde_json::Value>,
    pub base_score: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateContentResponse {
    pub id: Uuid,
    pub duplicate: bool,
}

impl CreateContentRequest {
    fn into_new_content(self) -> Result<NewContent> {
        let published_at = DateTime::parse_from_rfc3339(self.published_at.trim())
            .map_err(|e| {
                AppError::Validation(format!(
                    "invalid published_at {:?}: {e}",
                    self.published_at
                ))
            })?
            .with_timezone(&Utc);

        Ok(NewContent {
            external_id: self.external_id,
            content_type: self.content_type,
            lat: self.lat,
            lng: self.lng,
            published_at,
            attributes: self
                .attributes
                .filter(|v| !v.is_null())
                .unwrap_or_else(|| serde_json::json!({})),
            base_score: self.base_score.unwrap_or(DEFAULT_BASE_SCORE),
        })
    }
}

/// Ingest one content item
#[utoipa::path(
    post,
    path = "/ingestion",
    tag = "ingestion",
    request_body = CreateContentRequest,
    responses(
        (status = 201, description = "Item created", body = CreateContentResponse),
        (status = 200, description = "Replay of an existing external_id", body = CreateContentResponse),
        (status = 400, description = "Invalid body"),
        (status = 500, description = "Store failure")
    )
)]
pub async fn create_content(
    payload: web::Json<CreateContentRequest>,
    state: web::Data<IngestionHandlerState>,
) -> Result<HttpResponse> {
    let result = match payload.into_inner().into_new_content() {
        Ok(content) => state.ingestion_service.ingest(content).await,
        Err(e) => Err(e),
    };

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            feed_metrics::record_ingestion(feed_metrics::outcome_label(&e));
            return Err(e);
        }
    };

    let body = CreateContentResponse {
        id: outcome.id(),
        duplicate: outcome.is_duplicate(),
    };
    if outcome.is_duplicate() {
        feed_metrics::record_ingestion("duplicate");
        Ok(HttpResponse::Ok().json(body))
    } else {
        feed_metrics::record_ingestion("created");
        Ok(HttpResponse::Created().json(body))
    }
}

/// JSON body errors become 400s with the standard error body
pub fn json_error_handler(
    err: actix_web::error::JsonPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    AppError::Validation(format!("invalid request body: {err}")).into()
}
