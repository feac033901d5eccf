//! Certificate lookup by verification code.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use actas_state::certificate::is_verification_code;
use actas_state::Certificate;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CertificateResponse {
    pub id: Uuid,
    pub request_id: Uuid,
    pub verification_code: String,
    pub status: String,
    pub signed_by: Uuid,
    pub emitted_at: String,
}

impl From<Certificate> for CertificateResponse {
    fn from(cert: Certificate) -> Self {
        Self {
            id: *cert.id.as_uuid(),
            request_id: *cert.request_id.as_uuid(),
            verification_code: cert.verification_code,
            status: cert.status.as_str().to_string(),
            signed_by: *cert.signed_by.as_uuid(),
            emitted_at: cert.emitted_at.to_iso8601(),
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/certificates/{code}", get(get_certificate))
}

/// GET /v1/certificates/{code} — Verify an issued certificate.
///
/// Any authenticated caller may verify a code; no capability is required.
#[utoipa::path(
    get,
    path = "/v1/certificates/{code}",
    params(("code" = String, Path, description = "Verification code, e.g. `ABC1234`")),
    responses(
        (status = 200, description = "Certificate found", body = CertificateResponse),
        (status = 400, description = "Malformed code", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown code", body = crate::error::ErrorBody),
    ),
    tag = "certificates"
)]
pub(crate) async fn get_certificate(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    Path(code): Path<String>,
) -> Result<Json<CertificateResponse>, AppError> {
    let code = code.trim().to_ascii_uppercase();
    if !is_verification_code(&code) {
        return Err(AppError::BadRequest(format!(
            "malformed verification code: {code:?}"
        )));
    }
    let certificate = state.engine.certificate_by_code(&code).await?;
    Ok(Json(certificate.into()))
}
