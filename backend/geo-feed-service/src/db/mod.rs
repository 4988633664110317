/// Persistence for geo content
///
/// The ranking core only sees the [`FeedStore`] and [`ContentStore`] traits.
/// `PgFeedRepo` / `PgContentRepo` talk to PostGIS, `InMemoryStore` backs tests.
use sqlx::migrate::Migrator;
use std::time::Duration;
use thiserror::Error;

use crate::models::{ContentItem, FeedRow, InsertOutcome};
use crate::services::planner::FeedQuery;

pub mod content_repo;
pub mod feed_repo;
pub mod memory;

pub use content_repo::PgContentRepo;
pub use feed_repo::PgFeedRepo;
pub use memory::InMemoryStore;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store query timed out after {0:?}")]
    Timeout(Duration),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Read side: ranked candidates for a planned query
#[async_trait::async_trait]
pub trait FeedStore: Send + Sync {
    /// Rows in rank order, at most `query.fetch_limit` of them
    async fn fetch_ranked(&self, query: &FeedQuery) -> Result<Vec<FeedRow>, StoreError>;

    /// Cheap liveness check for readiness probes
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Write side: idempotent inserts keyed on `external_id`
#[async_trait::async_trait]
pub trait ContentStore: Send + Sync {
    async fn insert_content(&self, item: &ContentItem) -> Result<InsertOutcome, StoreError>;
}
