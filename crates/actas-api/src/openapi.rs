//! # OpenAPI Specification Assembly
//!
//! Collects every utoipa-documented route into one OpenAPI 3.1 document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Actas API",
        version = "0.1.0",
        description = "Lifecycle service for historical academic certificate requests: registration, archive search, payment, digitization, validation, signature and delivery."
    ),
    paths(
        crate::routes::requests::create_request,
        crate::routes::requests::get_request,
        crate::routes::requests::apply_event,
        crate::routes::requests::get_history,
        crate::routes::requests::get_aging,
        crate::routes::batches::validate_batch,
        crate::routes::batches::store_batch,
        crate::routes::payments::record_payment,
        crate::routes::certificates::get_certificate,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::requests::CreateRequestBody,
        crate::routes::requests::RequestResponse,
        crate::routes::requests::HistoryResponse,
        crate::routes::requests::ChainIntegrityBody,
        crate::routes::requests::AgingResponse,
        crate::routes::batches::ValidateBatchRequest,
        crate::routes::batches::StoreBatchRequest,
        crate::routes::batches::BatchReportResponse,
        crate::routes::payments::RecordPaymentRequest,
        crate::routes::payments::PaymentResponse,
        crate::routes::certificates::CertificateResponse,
    )),
    modifiers(&SecurityAddon),
    security(("bearer" = [])),
    tags(
        (name = "requests", description = "Certificate request lifecycle"),
        (name = "academic-batches", description = "Digitized academic data"),
        (name = "payments", description = "Payment outcomes"),
        (name = "certificates", description = "Certificate verification"),
    )
)]
pub struct ApiDoc;

/// Registers the `{actor_id}:{secret}` bearer scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("{actor_id}:{secret}")
                    .build(),
            ),
        );
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
