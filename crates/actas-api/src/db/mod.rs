//! # Database Persistence Layer
//!
//! PostgreSQL persistence via SQLx. The layer is optional: with
//! `DATABASE_URL` unset the service runs on the in-memory store, which is
//! suitable for development and tests but loses state on restart.

pub mod store;

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

pub use store::PgStore;

/// Connect and apply embedded migrations.
///
/// Returns `None` when `url` is `None`.
pub async fn init_pool(url: Option<&str>) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = url else {
        tracing::warn!("DATABASE_URL not set, running in-memory only; state will not survive restarts");
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await?;
    tracing::info!("connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database migrations applied");

    Ok(Some(pool))
}
