//! # actas-api — Binary Entry Point
//!
//! Reads configuration from the environment, picks the store (PostgreSQL
//! when `DATABASE_URL` is set, in-memory otherwise) and serves the API.

use std::sync::Arc;

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;

use actas_api::config::AppConfig;
use actas_api::db::{self, PgStore};
use actas_api::state::AppState;
use actas_state::{InMemoryStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("reading environment")?;
    init_tracing(config.log_json);

    let institution = config
        .load_institution()
        .context("loading institution config")?;
    tracing::info!(
        actors = institution.actors.len(),
        known_areas = institution.catalog().areas().len(),
        "institution config loaded"
    );
    if config.auth_token.is_none() {
        tracing::warn!("AUTH_TOKEN not set, authentication disabled; every caller acts as the system administrator");
    }

    let pool = db::init_pool(config.database_url.as_deref())
        .await
        .context("initializing database")?;
    let store: Arc<dyn Store> = match pool {
        Some(pool) => Arc::new(PgStore::new(pool)),
        None => Arc::new(InMemoryStore::new()),
    };

    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .context("installing Prometheus recorder")?;

    let port = config.port;
    let state = AppState::new(config, &institution, store).with_prometheus(prometheus);
    let app = actas_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "actas API listening");

    axum::serve(listener, app).await.context("serving HTTP")?;
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
