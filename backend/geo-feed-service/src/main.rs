use actix_web::{middleware::Logger, web, App, HttpServer};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use db_pool::{create_pool, DbConfig};
use geo_feed_service::db::{self, ContentStore, FeedStore, PgContentRepo, PgFeedRepo};
use geo_feed_service::handlers::{self, FeedHandlerState, HealthState, IngestionHandlerState};
use geo_feed_service::services::{FeedService, IngestionService};
use geo_feed_service::{Config, SERVICE_NAME};

#[actix_web::main]
async fn main() -> io::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true),
        )
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!(env = %config.app.env, "Starting {}", SERVICE_NAME);

    let mut db_cfg = match DbConfig::from_env(SERVICE_NAME) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Invalid database pool configuration: {}", e);
            std::process::exit(1);
        }
    };
    config.apply_to_pool(&mut db_cfg);
    db_cfg.log_config();

    let pool = match create_pool(db_cfg).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to create database pool: {}", e);
            std::process::exit(1);
        }
    };

    if config.database.run_migrations {
        if let Err(e) = db::MIGRATOR.run(&pool).await {
            error!("Database migrations failed: {}", e);
            std::process::exit(1);
        }
        info!("Database migrations completed");
    }

    let feed_store: Arc<dyn FeedStore> =
        Arc::new(PgFeedRepo::new(pool.clone(), config.feed.query_timeout));
    let content_store: Arc<dyn ContentStore> =
        Arc::new(PgContentRepo::new(pool.clone(), config.ingestion.timeout));

    let feed_state = web::Data::new(FeedHandlerState {
        feed_service: FeedService::new(feed_store.clone()),
    });
    let ingestion_state = web::Data::new(IngestionHandlerState {
        ingestion_service: IngestionService::new(content_store),
    });
    let health_state = web::Data::new(HealthState { store: feed_store });

    let (host, port) = config.bind_address();
    info!("Listening on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(feed_state.clone())
            .app_data(ingestion_state.clone())
            .app_data(health_state.clone())
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(handlers::configure)
    })
    .client_request_timeout(Duration::from_secs(15))
    .keep_alive(Duration::from_secs(60))
    .shutdown_timeout(10)
    .workers(config.app.workers)
    .bind((host.as_str(), port))?
    .run()
    .await?;

    pool.close().await;
    info!("{} stopped", SERVICE_NAME);
    Ok(())
}
