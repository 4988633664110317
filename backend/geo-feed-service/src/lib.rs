pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod openapi;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};

/// Name used for pool metrics and log fields
pub const SERVICE_NAME: &str = "geo-feed-service";
