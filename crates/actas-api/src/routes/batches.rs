//! # Academic Batch Endpoints
//!
//! Speculative validation, and registration of digitized batches by the
//! capture step so that later transitions can reference them by id.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use actas_core::{BatchId, Capability};
use actas_validation::{AcademicDataBatch, AreaCatalog, KnownArea, StudentRow, ValidationReport};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::routes::require_capability;
use crate::state::AppState;

/// Body of `POST /v1/academic-batches/validate`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateBatchRequest {
    #[schema(value_type = Object)]
    pub batch: AcademicDataBatch,
    /// Overrides the institution's catalog for this call only.
    #[serde(default)]
    #[schema(value_type = Option<Vec<Object>>)]
    pub known_areas: Option<Vec<KnownArea>>,
}

/// Body of `PUT /v1/academic-batches/{id}`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StoreBatchRequest {
    #[schema(value_type = Vec<Object>)]
    pub students: Vec<StudentRow>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchReportResponse {
    pub batch_id: Uuid,
    #[schema(value_type = Object)]
    pub report: ValidationReport,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/academic-batches/validate", post(validate_batch))
        .route("/v1/academic-batches/{id}", put(store_batch))
}

/// POST /v1/academic-batches/validate — Validate without side effects.
///
/// Always 200: an invalid batch is a successful validation whose report
/// says `valid: false`.
#[utoipa::path(
    post,
    path = "/v1/academic-batches/validate",
    request_body = ValidateBatchRequest,
    responses(
        (status = 200, description = "Validation report", body = BatchReportResponse),
        (status = 400, description = "Malformed batch", body = crate::error::ErrorBody),
    ),
    tag = "academic-batches"
)]
pub(crate) async fn validate_batch(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<ValidateBatchRequest>, JsonRejection>,
) -> Result<Json<BatchReportResponse>, AppError> {
    require_capability(&state, &caller, Capability::SOLICITUDES_PROCESAR)?;
    let body = extract_json(body)?;
    let catalog = body.known_areas.map(AreaCatalog::new);
    let report = state
        .engine
        .validate_academic_batch(&body.batch, catalog.as_ref());
    Ok(Json(BatchReportResponse {
        batch_id: *body.batch.id.as_uuid(),
        report,
    }))
}

/// PUT /v1/academic-batches/{id} — Register a digitized batch.
///
/// The batch is stored even when invalid; the report is returned so the
/// capture step can fix it before a transition uses it.
#[utoipa::path(
    put,
    path = "/v1/academic-batches/{id}",
    params(("id" = Uuid, Path, description = "Batch ID")),
    request_body = StoreBatchRequest,
    responses(
        (status = 200, description = "Batch stored", body = BatchReportResponse),
        (status = 403, description = "Caller cannot register batches", body = crate::error::ErrorBody),
    ),
    tag = "academic-batches"
)]
pub(crate) async fn store_batch(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<StoreBatchRequest>, JsonRejection>,
) -> Result<Json<BatchReportResponse>, AppError> {
    require_capability(&state, &caller, Capability::SOLICITUDES_PROCESAR)?;
    let body = extract_json(body)?;
    let batch = AcademicDataBatch {
        id: BatchId::from_uuid(id),
        students: body.students,
    };
    let report = state.engine.submit_batch(batch).await?;
    Ok(Json(BatchReportResponse {
        batch_id: id,
        report,
    }))
}
