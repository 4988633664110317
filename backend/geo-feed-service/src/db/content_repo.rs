/// PostGIS-backed content writes
use sqlx::PgPool;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

use super::{ContentStore, StoreError};
use crate::codec::geometry;
use crate::models::{ContentItem, InsertOutcome};

#[derive(Clone)]
pub struct PgContentRepo {
    pool: PgPool,
    write_timeout: Duration,
}

impl PgContentRepo {
    pub fn new(pool: PgPool, write_timeout: Duration) -> Self {
        Self {
            pool,
            write_timeout,
        }
    }

    async fn insert(&self, item: &ContentItem) -> Result<InsertOutcome, StoreError> {
        let inserted: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO geo_content
                (id, external_id, type, location, published_at, created_at, attributes, base_score)
            VALUES ($1, $2, $3, ST_GeomFromEWKB($4)::geography, $5, $6, $7, $8)
            ON CONFLICT (external_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(item.id)
        .bind(&item.external_id)
        .bind(&item.content_type)
        .bind(geometry::encode(&item.location))
        .bind(item.published_at)
        .bind(item.created_at)
        .bind(&item.attributes)
        .bind(item.base_score)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(id) = inserted {
            return Ok(InsertOutcome::Created(id));
        }

        // Conflicts only happen on external_id, so it is present here.
        let existing: Uuid =
            sqlx::query_scalar("SELECT id FROM geo_content WHERE external_id = $1")
                .bind(&item.external_id)
                .fetch_one(&self.pool)
                .await?;

        info!(
            external_id = ?item.external_id,
            existing_id = %existing,
            "Ingestion replay, keeping existing item"
        );
        Ok(InsertOutcome::Duplicate(existing))
    }
}

#[async_trait::async_trait]
impl ContentStore for PgContentRepo {
    async fn insert_content(&self, item: &ContentItem) -> Result<InsertOutcome, StoreError> {
        tokio::time::timeout(self.write_timeout, self.insert(item))
            .await
            .map_err(|_| {
                error!(id = %item.id, "Content insert exceeded deadline");
                StoreError::Timeout(self.write_timeout)
            })?
    }
}
