/// Content ingestion
///
/// Assigns identity and creation time, then stores the item idempotently on
/// its external id.
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::db::ContentStore;
use crate::error::{AppError, Result};
use crate::models::{ContentItem, GeoPoint, InsertOutcome};

pub const DEFAULT_BASE_SCORE: f64 = 1.0;

/// Longest accepted content type label
const MAX_TYPE_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct NewContent {
    pub external_id: Option<String>,
    pub content_type: String,
    pub lat: f64,
    pub lng: f64,
    pub published_at: DateTime<Utc>,
    pub attributes: serde_json::Value,
    pub base_score: f64,
}

pub struct IngestionService {
    store: Arc<dyn ContentStore>,
}

impl IngestionService {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    pub async fn ingest(&self, content: NewContent) -> Result<InsertOutcome> {
        self.ingest_at(content, Utc::now()).await
    }

    pub async fn ingest_at(&self, content: NewContent, now: DateTime<Utc>) -> Result<InsertOutcome> {
        let item = validate(content, now)?;
        let outcome = self.store.insert_content(&item).await?;

        info!(
            id = %outcome.id(),
            content_type = %item.content_type,
            duplicate = outcome.is_duplicate(),
            "Content ingested"
        );
        Ok(outcome)
    }
}

fn validate(content: NewContent, now: DateTime<Utc>) -> Result<ContentItem> {
    let content_type = content.content_type.trim().to_string();
    if content_type.is_empty() {
        return Err(AppError::Validation("type must not be empty".to_string()));
    }
    if content_type.len() > MAX_TYPE_LEN {
        return Err(AppError::Validation(format!(
            "type must be at most {MAX_TYPE_LEN} bytes"
        )));
    }

    let location = GeoPoint::new(content.lat, content.lng).map_err(AppError::Validation)?;

    if !content.base_score.is_finite() || content.base_score < 0.0 {
        return Err(AppError::Validation(format!(
            "base_score must be a finite number >= 0, got {}",
            content.base_score
        )));
    }

    let external_id = content
        .external_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());

    Ok(ContentItem {
        id: Uuid::now_v7(),
        external_id,
        content_type,
        location,
        published_at: content.published_at,
        created_at: now,
        attributes: content.attributes,
        base_score: content.base_score,
    })
}
