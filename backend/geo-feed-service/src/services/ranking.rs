//! Relevance score and the feed's total order.
//!
//! ```text
//! score = base_score * (1 / (1 + distance_m / 1000)) * exp(-seconds_since_published / 3600)
//! ```
//!
//! Order: score DESC, published_at DESC, id DESC. The SQL rendering in
//! `planner` must agree with every function here.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;

use crate::models::Cursor;

/// Distance at which the distance factor halves
pub const DISTANCE_SCALE_METERS: f64 = 1000.0;

/// e-folding time of the recency decay
pub const DECAY_SECONDS: f64 = 3600.0;

/// Natural log of the smallest score kept; anything below is flushed to 0.
///
/// PostgreSQL raises on float8 underflow, so the SQL rendering must never
/// evaluate a product that would round to zero.
pub const SCORE_FLOOR_LN: f64 = -690.0;

/// Seconds elapsed since publication, clamped at zero for future items.
pub fn seconds_since_published(published_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - published_at)
        .to_std()
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0)
}

pub fn distance_factor(distance_meters: f64) -> f64 {
    1.0 / (1.0 + distance_meters / DISTANCE_SCALE_METERS)
}

pub fn decay_exponent(published_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    -seconds_since_published(published_at, now) / DECAY_SECONDS
}

/// Relevance of an item at `now`.
pub fn score(
    base_score: f64,
    distance_meters: f64,
    published_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> f64 {
    let exponent = decay_exponent(published_at, now);
    let factor = distance_factor(distance_meters);

    if base_score <= 0.0 || exponent < SCORE_FLOOR_LN {
        return 0.0;
    }
    if base_score.ln() + factor.ln() + exponent < SCORE_FLOOR_LN {
        return 0.0;
    }

    base_score * factor * exponent.exp()
}

/// Feed order: `Less` when `a` is ranked before `b`.
pub fn compare_rank(a: &Cursor, b: &Cursor) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.published_at.cmp(&a.published_at))
        .then_with(|| b.id.cmp(&a.id))
}

/// Keyset resumption predicate: is `key` the cursor row or ranked below it?
///
/// Equivalent to `score < s0 OR (score = s0 AND published_at < p0)
/// OR (score = s0 AND published_at = p0 AND id <= i0)`. The cursor names the
/// first row the previous page did not serve, so that row stays eligible
/// whether or not its score decayed in between.
pub fn resumes_from(key: &Cursor, cursor: &Cursor) -> bool {
    compare_rank(key, cursor) != Ordering::Less
}
