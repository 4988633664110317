//! Opaque keyset pagination token.
//!
//! Wire format: base64url (no padding) of
//! `{"score": f64, "published_at": RFC3339, "id": base64(16 raw bytes)}`.

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine as _,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::Cursor;

#[derive(Debug, Error)]
pub enum CursorError {
    #[error("invalid cursor encoding")]
    Encoding(#[from] base64::DecodeError),

    #[error("invalid cursor payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("invalid cursor id: expected 16 bytes, got {0}")]
    IdLength(usize),

    #[error("cursor score must be finite, got {0}")]
    NonFiniteScore(f64),
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct CursorPayload {
    score: f64,
    published_at: DateTime<Utc>,
    #[serde(with = "raw_id")]
    id: Vec<u8>,
}

/// Encode a cursor for the wire.
pub fn encode(cursor: &Cursor) -> Result<String, CursorError> {
    if !cursor.score.is_finite() {
        return Err(CursorError::NonFiniteScore(cursor.score));
    }

    let payload = CursorPayload {
        score: cursor.score,
        published_at: cursor.published_at,
        id: cursor.id.as_bytes().to_vec(),
    };
    let raw = serde_json::to_vec(&payload)?;

    Ok(URL_SAFE_NO_PAD.encode(raw))
}

/// Decode a wire cursor. The empty string means "first page".
pub fn decode(encoded: &str) -> Result<Option<Cursor>, CursorError> {
    if encoded.is_empty() {
        return Ok(None);
    }

    let raw = URL_SAFE_NO_PAD.decode(encoded)?;
    let payload: CursorPayload = serde_json::from_slice(&raw)?;

    let id = Uuid::from_slice(&payload.id).map_err(|_| CursorError::IdLength(payload.id.len()))?;
    if !payload.score.is_finite() {
        return Err(CursorError::NonFiniteScore(payload.score));
    }

    Ok(Some(Cursor {
        score: payload.score,
        published_at: payload.published_at,
        id,
    }))
}

mod raw_id {
    use super::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
