//! OpenAPI documentation for the geo feed service

use actix_web::HttpResponse;
use utoipa::OpenApi;

use crate::handlers::{feed, ingestion};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Geo Feed Service API",
        version = "1.0.0",
        description = "Location-aware ranked feed with opaque cursor pagination, plus idempotent content ingestion.",
        license(name = "MIT")
    ),
    paths(feed::get_feed, ingestion::create_content),
    components(schemas(
        feed::FeedResponse,
        feed::FeedItemResponse,
        ingestion::CreateContentRequest,
        ingestion::CreateContentResponse,
    )),
    tags(
        (name = "feed", description = "Ranked items around a point"),
        (name = "ingestion", description = "Content writes"),
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> actix_web::Result<HttpResponse> {
    let body = ApiDoc::openapi().to_json().map_err(|e| {
        tracing::error!("OpenAPI serialization failed: {}", e);
        actix_web::error::ErrorInternalServerError("OpenAPI serialization error")
    })?;

    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .body(body))
}
