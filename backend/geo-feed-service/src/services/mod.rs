//! Service layer for geo-feed-service
//!
//! - ranking: score formula and the feed's total order
//! - planner: turns a request into a store query (SQL or in-memory)
//! - feed: page assembly and cursor handling
//! - ingestion: validated, idempotent content writes

pub mod feed;
pub mod ingestion;
pub mod planner;
pub mod ranking;

pub use feed::{FeedRequest, FeedService};
pub use ingestion::{IngestionService, NewContent};
