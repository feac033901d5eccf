//! # actas-api — HTTP Service for Certificate Requests
//!
//! Exposes the lifecycle engine over Axum.
//!
//! ## API Surface
//!
//! | Prefix                      | Module                     |
//! |-----------------------------|----------------------------|
//! | `/v1/requests/*`            | [`routes::requests`]       |
//! | `/v1/academic-batches/*`    | [`routes::batches`]        |
//! | `/v1/payments/*`            | [`routes::payments`]       |
//! | `/v1/certificates/*`        | [`routes::certificates`]   |
//! | `/openapi.json`             | [`openapi`]                |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```
//!
//! Health probes and `/metrics` sit outside the auth layer.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    app_with_metrics(state, ApiMetrics::new())
}

/// As [`app`], sharing the given request counters.
pub fn app_with_metrics(state: AppState, metrics: ApiMetrics) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };

    let api = Router::new()
        .merge(routes::requests::router())
        .merge(routes::batches::router())
        .merge(routes::payments::router())
        .merge(routes::certificates::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(metrics));

    let probes = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(render_metrics));

    Router::new().merge(probes).merge(api).with_state(state)
}

async fn liveness() -> &'static str {
    "ok"
}

async fn readiness() -> &'static str {
    "ready"
}

/// Prometheus text exposition. 404 when no recorder is installed.
async fn render_metrics(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .prometheus
        .as_ref()
        .map(|handle| handle.render())
        .ok_or(StatusCode::NOT_FOUND)
}
