use actix_web::web;

pub mod feed;
pub mod health;
pub mod ingestion;

pub use feed::{get_feed, FeedHandlerState};
pub use health::HealthState;
pub use ingestion::{create_content, IngestionHandlerState};

/// Register every public route. Handler state is supplied by the caller as
/// `web::Data` for `FeedHandlerState`, `IngestionHandlerState` and `HealthState`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(ingestion::json_error_handler))
        .route("/feed", web::get().to(feed::get_feed))
        .route("/ingestion", web::post().to(ingestion::create_content))
        .route("/health", web::get().to(health::health))
        .route("/health/live", web::get().to(health::liveness_check))
        .route("/health/ready", web::get().to(health::readiness_check))
        .route("/metrics", web::get().to(crate::metrics::serve_metrics))
        .route("/api/v1/openapi.json", web::get().to(crate::openapi::openapi_json));
}
