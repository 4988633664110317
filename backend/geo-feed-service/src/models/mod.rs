/// Domain types for the geo feed
///
/// Coordinates are WGS84 degrees. Every timestamp is UTC.
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Location data point (WGS84)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    lat: f64,
    lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Result<Self, String> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(format!("invalid latitude {lat}: must be between -90 and 90"));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(format!(
                "invalid longitude {lng}: must be between -180 and 180"
            ));
        }

        Ok(Self { lat, lng })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }
}

/// A previously ingested feed item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentItem {
    /// UUIDv7, ordered by creation time
    pub id: Uuid,
    /// Producer-side dedup key
    pub external_id: Option<String>,
    #[serde(rename = "type")]
    pub content_type: String,
    pub location: GeoPoint,
    /// Visibility time
    pub published_at: DateTime<Utc>,
    /// Ingestion time
    pub created_at: DateTime<Utc>,
    pub attributes: serde_json::Value,
    /// Caller-assigned prior, finite and >= 0
    pub base_score: f64,
}

/// Exact sort key of a ranked item: `(score, published_at, id)`.
///
/// Issued to clients as the opaque pagination cursor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    pub score: f64,
    pub published_at: DateTime<Utc>,
    pub id: Uuid,
}

/// Content item ranked against a feed request
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredItem {
    pub item: ContentItem,
    pub distance_meters: f64,
    pub score: f64,
}

impl ScoredItem {
    pub fn sort_key(&self) -> Cursor {
        Cursor {
            score: self.score,
            published_at: self.item.published_at,
            id: self.item.id,
        }
    }
}

/// Candidate row as returned by a feed store.
///
/// The location is still in binary geometry form; the assembler decodes it.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct FeedRow {
    pub id: Uuid,
    pub external_id: Option<String>,
    pub content_type: String,
    pub location_wkb: Vec<u8>,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub attributes: serde_json::Value,
    pub base_score: f64,
    pub distance_meters: f64,
    pub score: f64,
}

impl FeedRow {
    pub fn sort_key(&self) -> Cursor {
        Cursor {
            score: self.score,
            published_at: self.published_at,
            id: self.id,
        }
    }
}

/// One page of the ranked feed
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage {
    /// Descending rank order
    pub items: Vec<ScoredItem>,
    /// Absent iff no further page existed at request time
    pub next_cursor: Option<Cursor>,
}

/// Result of an idempotent insert keyed on `external_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Created(Uuid),
    /// An item with the same external id already existed
    Duplicate(Uuid),
}

impl InsertOutcome {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Created(id) | Self::Duplicate(id) => *id,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}
