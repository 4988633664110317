//! Pool instrumentation: connection gauges and acquire latency.

use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge_vec, HistogramVec,
    IntCounterVec, IntGaugeVec,
};
use sqlx::{pool::PoolConnection, PgPool, Postgres};
use std::time::Instant;
use tracing::warn;

lazy_static::lazy_static! {
    static ref PG_POOL_CONNECTIONS: IntGaugeVec = register_int_gauge_vec!(
        "pg_pool_connections",
        "Connections held by the pool (idle, in_use, max)",
        &["service", "state"]
    ).expect("pg_pool_connections registers once");

    static ref PG_POOL_ACQUIRE_SECONDS: HistogramVec = register_histogram_vec!(
        "pg_pool_acquire_seconds",
        "Wait for a pooled connection",
        &["service"],
        vec![0.0005, 0.002, 0.01, 0.05, 0.25, 1.0, 5.0]
    ).expect("pg_pool_acquire_seconds registers once");

    static ref PG_POOL_ACQUIRE_FAILURES: IntCounterVec = register_int_counter_vec!(
        "pg_pool_acquire_failures_total",
        "Failed connection acquisitions by reason",
        &["service", "reason"]
    ).expect("pg_pool_acquire_failures_total registers once");
}

/// Snapshot the pool into the connection gauges.
pub(crate) fn update_pool_metrics(pool: &PgPool, service: &str) {
    let idle = pool.num_idle() as i64;
    let held = pool.size() as i64;
    let max = pool.options().get_max_connections() as i64;

    for (state, value) in [("idle", idle), ("in_use", held - idle), ("max", max)] {
        PG_POOL_CONNECTIONS
            .with_label_values(&[service, state])
            .set(value);
    }
}

/// `pool.acquire()`, timed and labelled with `service`.
pub async fn acquire_with_metrics(
    pool: &PgPool,
    service: &str,
) -> Result<PoolConnection<Postgres>, sqlx::Error> {
    let started = Instant::now();
    let acquired = pool.acquire().await;

    PG_POOL_ACQUIRE_SECONDS
        .with_label_values(&[service])
        .observe(started.elapsed().as_secs_f64());

    if let Err(e) = &acquired {
        let reason = failure_reason(e);
        PG_POOL_ACQUIRE_FAILURES
            .with_label_values(&[service, reason])
            .inc();
        warn!(service, reason, error = %e, "Connection acquire failed");
    }

    acquired
}

fn failure_reason(err: &sqlx::Error) -> &'static str {
    match err {
        sqlx::Error::PoolTimedOut => "timeout",
        sqlx::Error::PoolClosed => "closed",
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) => "network",
        _ => "other",
    }
}
