//! Basic example showing how to use sea-orm-tracelog.
//!
//! Run with: cargo run --example basic

use std::time::Duration;

use sea_orm::{ConnectionTrait, Database};
use sea_orm_tracelog::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install the subscriber first: the logger captures it at construction
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,sea_orm_tracelog=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/test".into());

    tracing::info!("Connecting to database...");

    let db = Database::connect(&database_url).await?;

    // Option 1: Slow and failed queries only, default 200ms threshold
    // let traced_db = db.with_tracing()?;

    // Option 2: Log every query, with a tighter threshold
    let mut logger = TracingLogger::from_default(true)?;
    logger.slow_threshold = Duration::from_millis(50);
    let traced_db = db.with_query_logger(logger);

    // Option 3: Development preset through the config builder
    // let logger = LoggerConfig::development()
    //     .with_dispatch(tracing::dispatcher::get_default(Clone::clone))
    //     .build()?;

    // Reported at DEBUG
    traced_db.execute_unprepared("SELECT 1").await?;

    // Reported at WARN as a slow query
    traced_db.execute_unprepared("SELECT pg_sleep(0.1)").await?;

    // Reported at ERROR with the database error, then returned
    if let Err(err) = traced_db.execute_unprepared("SELECT * FROM missing_table").await {
        tracing::info!(error = %err, "Error was logged by the query logger too");
    }

    Ok(())
}
