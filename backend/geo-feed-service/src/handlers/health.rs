use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::db::FeedStore;

pub struct HealthState {
    pub store: Arc<dyn FeedStore>,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "lowercase")]
enum ComponentStatus {
    Healthy,
    Unhealthy,
}

#[derive(Serialize)]
struct ComponentCheck {
    status: ComponentStatus,
    message: String,
    latency_ms: u64,
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    status: ComponentStatus,
    checks: HashMap<String, ComponentCheck>,
    timestamp: String,
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().content_type("text/plain").body("ok")
}

pub async fn liveness_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"alive": true}))
}

pub async fn readiness_check(state: web::Data<HealthState>) -> HttpResponse {
    let start = Instant::now();
    let result = state.store.ping().await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let (ready, check) = match result {
        Ok(()) => (
            true,
            ComponentCheck {
                status: ComponentStatus::Healthy,
                message: "Store reachable".to_string(),
                latency_ms,
            },
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                false,
                ComponentCheck {
                    status: ComponentStatus::Unhealthy,
                    message: "Store unreachable".to_string(),
                    latency_ms,
                },
            )
        }
    };

    let status = check.status.clone();
    let mut checks = HashMap::new();
    checks.insert("store".to_string(), check);

    let response = ReadinessResponse {
        ready,
        status,
        checks,
        timestamp: Utc::now().to_rfc3339(),
    };

    if ready {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}
