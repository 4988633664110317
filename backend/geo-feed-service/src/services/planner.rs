//! Feed query planning.
//!
//! A [`FeedQuery`] describes one page fetch: the candidate filter, the rank
//! order and the keyset resumption point. It renders to PostGIS SQL for the
//! database store and evaluates in memory for the fake store; both renderings
//! share the constants and predicates in [`super::ranking`].

use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use super::ranking::{self, DECAY_SECONDS, DISTANCE_SCALE_METERS, SCORE_FLOOR_LN};
use crate::codec::geometry;
use crate::models::{ContentItem, Cursor, FeedRow, GeoPoint};

/// Content type restriction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeFilter {
    /// No restriction
    Any,
    OneOf(Vec<String>),
}

impl TypeFilter {
    /// Build a filter from request values. Blank values are ignored and an
    /// empty set means "any type".
    pub fn from_requested<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut wanted: Vec<String> = Vec::new();
        for t in types {
            let t = t.into();
            if !t.is_empty() && !wanted.contains(&t) {
                wanted.push(t);
            }
        }

        if wanted.is_empty() {
            Self::Any
        } else {
            Self::OneOf(wanted)
        }
    }

    pub fn matches(&self, content_type: &str) -> bool {
        match self {
            Self::Any => true,
            Self::OneOf(types) => types.iter().any(|t| t == content_type),
        }
    }
}

/// One planned page fetch
#[derive(Debug, Clone, PartialEq)]
pub struct FeedQuery {
    pub origin: GeoPoint,
    pub radius_meters: f64,
    pub types: TypeFilter,
    /// Resume at this sort key (the first row not yet served)
    pub after: Option<Cursor>,
    /// Page size plus one overfetched row
    pub fetch_limit: usize,
    /// Scoring clock
    pub now: DateTime<Utc>,
}

/// Plan a page of `page_limit` items. The store is asked for one extra row so
/// the caller can tell whether another page exists.
pub fn plan(
    origin: GeoPoint,
    radius_meters: f64,
    types: TypeFilter,
    page_limit: usize,
    after: Option<Cursor>,
    now: DateTime<Utc>,
) -> FeedQuery {
    FeedQuery {
        origin,
        radius_meters,
        types,
        after,
        fetch_limit: page_limit + 1,
        now,
    }
}

impl FeedQuery {
    pub fn page_limit(&self) -> usize {
        self.fetch_limit.saturating_sub(1)
    }

    /// Render as a PostGIS query returning [`FeedRow`]s.
    ///
    /// Distances are geodesic (`geography`). Every value is a bind parameter.
    pub fn to_sql(&self) -> QueryBuilder<'static, Postgres> {
        let mut builder = QueryBuilder::new("WITH origin AS (SELECT ST_SetSRID(ST_MakePoint(");
        builder
            .push_bind(self.origin.lng())
            .push(", ")
            .push_bind(self.origin.lat())
            .push(
                "), 4326)::geography AS geog), \
                 candidates AS (\
                 SELECT c.id, c.external_id, c.type AS content_type, \
                 ST_AsBinary(c.location::geometry) AS location_wkb, \
                 c.published_at, c.created_at, c.attributes, c.base_score, \
                 ST_Distance(c.location, origin.geog) AS distance_meters \
                 FROM geo_content c CROSS JOIN origin \
                 WHERE ST_DWithin(c.location, origin.geog, ",
            )
            .push_bind(self.radius_meters)
            .push(")");

        if let TypeFilter::OneOf(types) = &self.types {
            builder.push(" AND c.type = ANY(").push_bind(types.clone()).push(")");
        }

        builder
            .push(
                "), factors AS (\
                 SELECT candidates.*, \
                 1.0::float8 / (1.0::float8 + distance_meters / ",
            )
            .push(format!("{DISTANCE_SCALE_METERS:?}"))
            .push(
                "::float8) AS distance_factor, \
                 -GREATEST(0.0::float8, EXTRACT(EPOCH FROM (",
            )
            .push_bind(self.now)
            .push("::timestamptz - published_at))::float8) / ")
            .push(format!("{DECAY_SECONDS:?}"))
            .push("::float8 AS decay_exponent FROM candidates), scored AS (SELECT factors.*, CASE")
            .push(" WHEN base_score <= 0 THEN 0.0::float8")
            .push(format!(
                " WHEN decay_exponent < {SCORE_FLOOR_LN:?} THEN 0.0::float8 \
                 WHEN ln(base_score) + ln(distance_factor) + decay_exponent < {SCORE_FLOOR_LN:?} \
                 THEN 0.0::float8"
            ))
            .push(
                " ELSE base_score * distance_factor * exp(decay_exponent) END AS score \
                 FROM factors) \
                 SELECT id, external_id, content_type, location_wkb, published_at, created_at, \
                 attributes, base_score, distance_meters, score FROM scored",
            );

        if let Some(cursor) = &self.after {
            builder
                .push(" WHERE (score < ")
                .push_bind(cursor.score)
                .push(" OR (score = ")
                .push_bind(cursor.score)
                .push(" AND published_at < ")
                .push_bind(cursor.published_at)
                .push(") OR (score = ")
                .push_bind(cursor.score)
                .push(" AND published_at = ")
                .push_bind(cursor.published_at)
                .push(" AND id <= ")
                .push_bind(cursor.id)
                .push("))");
        }

        builder
            .push(" ORDER BY score DESC, published_at DESC, id DESC LIMIT ")
            .push_bind(i64::try_from(self.fetch_limit).unwrap_or(i64::MAX));

        builder
    }

    /// Evaluate against candidates paired with their distance from the
    /// origin in meters.
    pub fn evaluate<I>(&self, candidates: I) -> Vec<FeedRow>
    where
        I: IntoIterator<Item = (ContentItem, f64)>,
    {
        let mut rows: Vec<FeedRow> = candidates
            .into_iter()
            .filter(|(item, distance)| {
                *distance <= self.radius_meters && self.types.matches(&item.content_type)
            })
            .map(|(item, distance)| {
                let score =
                    ranking::score(item.base_score, distance, item.published_at, self.now);
                FeedRow {
                    id: item.id,
                    external_id: item.external_id,
                    content_type: item.content_type,
                    location_wkb: geometry::encode(&item.location),
                    published_at: item.published_at,
                    created_at: item.created_at,
                    attributes: item.attributes,
                    base_score: item.base_score,
                    distance_meters: distance,
                    score,
                }
            })
            .filter(|row| match &self.after {
                Some(cursor) => ranking::resumes_from(&row.sort_key(), cursor),
                None => true,
            })
            .collect();

        rows.sort_by(|a, b| ranking::compare_rank(&a.sort_key(), &b.sort_key()));
        rows.truncate(self.fetch_limit);
        rows
    }
}
