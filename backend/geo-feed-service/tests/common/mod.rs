//! Shared fixtures: an app wired to the in-memory store.
#![allow(dead_code)]

use actix_web::web;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use geo_feed_service::db::{ContentStore, FeedStore, InMemoryStore};
use geo_feed_service::handlers::{FeedHandlerState, HealthState, IngestionHandlerState};
use geo_feed_service::models::{ContentItem, GeoPoint};
use geo_feed_service::services::{FeedService, IngestionService};

/// Times Square
pub const ORIGIN_LAT: f64 = 40.758;
pub const ORIGIN_LNG: f64 = -73.9855;

pub struct TestState {
    pub store: Arc<InMemoryStore>,
    pub feed: web::Data<FeedHandlerState>,
    pub ingestion: web::Data<IngestionHandlerState>,
    pub health: web::Data<HealthState>,
}

pub fn test_state() -> TestState {
    let store = Arc::new(InMemoryStore::new());
    let feed_store: Arc<dyn FeedStore> = store.clone();
    let content_store: Arc<dyn ContentStore> = store.clone();

    TestState {
        feed: web::Data::new(FeedHandlerState {
            feed_service: FeedService::new(feed_store.clone()),
        }),
        ingestion: web::Data::new(IngestionHandlerState {
            ingestion_service: IngestionService::new(content_store),
        }),
        health: web::Data::new(HealthState { store: feed_store }),
        store,
    }
}

/// Build an app over `$state` with every route registered.
#[macro_export]
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($state.feed.clone())
                .app_data($state.ingestion.clone())
                .app_data($state.health.clone())
                .configure(geo_feed_service::handlers::configure),
        )
        .await
    };
}

/// Item `north_meters` north of the origin, published at `published_at`.
pub fn item_north(
    id: u128,
    north_meters: f64,
    content_type: &str,
    published_at: DateTime<Utc>,
) -> ContentItem {
    // ~111,195 m per degree of latitude on the mean sphere
    let lat = ORIGIN_LAT + north_meters / 111_195.08;
    ContentItem {
        id: Uuid::from_u128(id),
        external_id: None,
        content_type: content_type.to_string(),
        location: GeoPoint::new(lat, ORIGIN_LNG).expect("valid fixture point"),
        published_at,
        created_at: Utc::now(),
        attributes: serde_json::json!({ "title": format!("item {id}") }),
        base_score: 1.0,
    }
}

/// A publish time a few minutes in the past, so scores are well above zero.
pub fn recently() -> DateTime<Utc> {
    Utc::now() - Duration::minutes(5)
}

pub async fn seed(store: &InMemoryStore, items: &[ContentItem]) {
    for item in items {
        store.insert_content(item).await.expect("seed item");
    }
}

pub fn feed_uri(radius_meters: i64, extra: &str) -> String {
    format!(
        "/feed?lat={ORIGIN_LAT}&lng={ORIGIN_LNG}&radius_meters={radius_meters}{extra}"
    )
}
