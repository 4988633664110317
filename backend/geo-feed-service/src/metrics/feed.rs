use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter_vec, Histogram,
    HistogramVec, IntCounterVec,
};
use std::time::Duration;

use crate::error::AppError;

lazy_static! {
    /// Feed request latency by outcome (ok, invalid, error).
    pub static ref FEED_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "geo_feed_request_duration_seconds",
        "Feed request duration segmented by outcome",
        &["outcome"]
    )
    .expect("failed to register geo_feed_request_duration_seconds");

    pub static ref FEED_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "geo_feed_requests_total",
        "Total feed requests segmented by outcome",
        &["outcome"]
    )
    .expect("failed to register geo_feed_requests_total");

    /// Items per served page.
    pub static ref FEED_PAGE_ITEMS: Histogram = register_histogram!(
        "geo_feed_page_items",
        "Number of items returned per feed page",
        vec![0.0, 1.0, 5.0, 10.0, 20.0, 30.0, 40.0, 50.0]
    )
    .expect("failed to register geo_feed_page_items");

    /// Ingestion attempts by result (created, duplicate, invalid, error).
    pub static ref INGESTION_TOTAL: IntCounterVec = register_int_counter_vec!(
        "geo_ingestion_total",
        "Content ingestion attempts segmented by result",
        &["result"]
    )
    .expect("failed to register geo_ingestion_total");
}

/// Outcome label for a failed request
pub fn outcome_label(err: &AppError) -> &'static str {
    match err {
        AppError::Validation(_) | AppError::InvalidCursor(_) => "invalid",
        _ => "error",
    }
}

pub fn record_feed_request(outcome: &str, elapsed: Duration) {
    FEED_REQUEST_DURATION_SECONDS
        .with_label_values(&[outcome])
        .observe(elapsed.as_secs_f64());
    FEED_REQUESTS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_page_size(items: usize) {
    FEED_PAGE_ITEMS.observe(items as f64);
}

pub fn record_ingestion(result: &str) {
    INGESTION_TOTAL.with_label_values(&[result]).inc();
}
