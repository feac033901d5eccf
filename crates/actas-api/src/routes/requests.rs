//! # Request Endpoints
//!
//! Registration, transition commands and read models for certificate
//! requests.

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use actas_core::{Capability, CitizenId, RequestId, StudentId, Timestamp};
use actas_state::{
    verify_chain, ApplicantContext, AuditEntry, EventKind, NewRequest, Priority, Request,
    RequestView, TransitionPayload,
};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, optional_json, Validate};
use crate::routes::require_capability;
use crate::state::AppState;

// ── DTOs ────────────────────────────────────────────────────────────

/// Body of `POST /v1/requests`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRequestBody {
    pub citizen_id: Uuid,
    pub student_id: Uuid,
    /// Where and when the student studied.
    #[schema(value_type = Object)]
    pub applicant_context: ApplicantContext,
    /// `NORMAL`, `URGENT` or `VERY_URGENT`. Defaults to `NORMAL`.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub priority: Option<Priority>,
}

impl Validate for CreateRequestBody {
    fn validate(&self) -> Result<(), String> {
        if self.citizen_id.is_nil() || self.student_id.is_nil() {
            return Err("citizen_id and student_id must not be nil".into());
        }
        self.applicant_context.validate()
    }
}

/// A request plus the events the caller may fire next.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RequestResponse {
    #[schema(value_type = Object)]
    pub request: Request,
    #[schema(value_type = Vec<String>)]
    pub allowed_events: Vec<EventKind>,
}

impl From<RequestView> for RequestResponse {
    fn from(view: RequestView) -> Self {
        Self {
            request: view.request,
            allowed_events: view.allowed_events,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChainIntegrityBody {
    pub total_entries: usize,
    pub broken_links: usize,
    pub tampered_entries: usize,
    pub chain_valid: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryResponse {
    #[schema(value_type = Vec<Object>)]
    pub entries: Vec<AuditEntry>,
    pub integrity: ChainIntegrityBody,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AgingResponse {
    pub assigned_at: String,
    pub days_since_assignment: i64,
    pub suggested_priority: String,
}

// ── Router ──────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/requests", post(create_request))
        .route("/v1/requests/{id}", get(get_request))
        .route("/v1/requests/{id}/events/{event}", post(apply_event))
        .route("/v1/requests/{id}/history", get(get_history))
        .route("/v1/requests/{id}/aging", get(get_aging))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/requests — Register a new request in `REGISTRADA`.
#[utoipa::path(
    post,
    path = "/v1/requests",
    request_body = CreateRequestBody,
    responses(
        (status = 201, description = "Request registered", body = RequestResponse),
        (status = 400, description = "Invalid applicant context", body = crate::error::ErrorBody),
        (status = 403, description = "Caller cannot create requests", body = crate::error::ErrorBody),
    ),
    tag = "requests"
)]
pub(crate) async fn create_request(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateRequestBody>, JsonRejection>,
) -> Result<(StatusCode, Json<RequestResponse>), AppError> {
    require_capability(&state, &caller, Capability::SOLICITUDES_CREAR)?;
    let body = extract_validated_json(body)?;

    let request = state
        .engine
        .create_request(
            NewRequest {
                citizen_id: CitizenId::from_uuid(body.citizen_id),
                student_id: StudentId::from_uuid(body.student_id),
                applicant_context: body.applicant_context,
                priority: body.priority,
            },
            caller.actor,
        )
        .await?;
    let view = state.engine.get_request(request.id, caller.actor).await?;

    Ok((StatusCode::CREATED, Json(view.into())))
}

/// GET /v1/requests/{id} — Fetch a request and the caller's next events.
#[utoipa::path(
    get,
    path = "/v1/requests/{id}",
    params(("id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request found", body = RequestResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "requests"
)]
pub(crate) async fn get_request(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<RequestResponse>, AppError> {
    require_capability(&state, &caller, Capability::SOLICITUDES_VER)?;
    let view = state
        .engine
        .get_request(RequestId::from_uuid(id), caller.actor)
        .await?;
    Ok(Json(view.into()))
}

/// POST /v1/requests/{id}/events/{event} — Fire a lifecycle event.
///
/// The body is the event payload; it may be omitted for events that need
/// none. Authorization is decided by the engine against the event's
/// required capability.
#[utoipa::path(
    post,
    path = "/v1/requests/{id}/events/{event}",
    params(
        ("id" = Uuid, Path, description = "Request ID"),
        ("event" = String, Path, description = "Event name, e.g. `derivar`, `actaEncontrada`"),
    ),
    request_body(content = Option<Object>, description = "Optional transition payload", content_type = "application/json"),
    responses(
        (status = 200, description = "Transition committed", body = RequestResponse),
        (status = 400, description = "Guard or validation failure", body = crate::error::ErrorBody),
        (status = 403, description = "Caller lacks the event's capability", body = crate::error::ErrorBody),
        (status = 404, description = "Request not found", body = crate::error::ErrorBody),
        (status = 409, description = "Conflict with the current status", body = crate::error::ErrorBody),
    ),
    tag = "requests"
)]
pub(crate) async fn apply_event(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((id, event)): Path<(Uuid, String)>,
    body: Bytes,
) -> Result<Json<RequestResponse>, AppError> {
    let event: EventKind = event.parse().map_err(AppError::BadRequest)?;
    let payload: TransitionPayload = optional_json(&body)?;
    let id = RequestId::from_uuid(id);

    let request = state
        .engine
        .apply_event(id, event, caller.actor, payload)
        .await?;
    Ok(Json(state.engine.view(request, caller.actor).into()))
}

/// GET /v1/requests/{id}/history — Audit trail with chain verification.
#[utoipa::path(
    get,
    path = "/v1/requests/{id}/history",
    params(("id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Audit trail, oldest first", body = HistoryResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "requests"
)]
pub(crate) async fn get_history(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<HistoryResponse>, AppError> {
    require_capability(&state, &caller, Capability::SOLICITUDES_VER)?;
    let entries = state.engine.history(RequestId::from_uuid(id)).await?;
    let integrity = verify_chain(&entries);
    if !integrity.chain_valid {
        tracing::error!(
            request_id = %id,
            broken_links = integrity.broken_links,
            tampered_entries = integrity.tampered_entries,
            "audit chain failed verification"
        );
    }
    Ok(Json(HistoryResponse {
        entries,
        integrity: ChainIntegrityBody {
            total_entries: integrity.total_entries,
            broken_links: integrity.broken_links,
            tampered_entries: integrity.tampered_entries,
            chain_valid: integrity.chain_valid,
        },
    }))
}

/// GET /v1/requests/{id}/aging — Days since assignment and implied priority.
#[utoipa::path(
    get,
    path = "/v1/requests/{id}/aging",
    params(("id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Aging metric", body = AgingResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "requests"
)]
pub(crate) async fn get_aging(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<AgingResponse>, AppError> {
    require_capability(&state, &caller, Capability::SOLICITUDES_VER)?;
    let aging = state
        .engine
        .aging(RequestId::from_uuid(id), Timestamp::now())
        .await?;
    Ok(Json(AgingResponse {
        assigned_at: aging.assigned_at.to_iso8601(),
        days_since_assignment: aging.days_since_assignment,
        suggested_priority: aging.suggested_priority.as_str().to_string(),
    }))
}
