//! # Payment Endpoint
//!
//! The payment subsystem pushes payment outcomes here. The lifecycle only
//! reads them when `pagoValidado` or `pagoRechazado` fires.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::put;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use actas_core::{Capability, PaymentId, RequestId, Timestamp};
use actas_state::{Payment, PaymentMethod, PaymentStatus};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::require_capability;
use crate::state::AppState;

/// Body of `PUT /v1/payments/{id}`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordPaymentRequest {
    pub request_id: Uuid,
    pub amount_cents: i64,
    /// `CASH`, `BANK_DEPOSIT`, `DIGITAL_WALLET` or `CARD`.
    pub method: String,
    /// `PENDING`, `SUBMITTED`, `VALIDATED` or `REJECTED`.
    pub status: String,
}

impl Validate for RecordPaymentRequest {
    fn validate(&self) -> Result<(), String> {
        if self.amount_cents < 0 {
            return Err("amount_cents must not be negative".into());
        }
        self.method.parse::<PaymentMethod>()?;
        self.status.parse::<PaymentStatus>()?;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub request_id: Uuid,
    pub amount_cents: i64,
    pub method: String,
    pub status: String,
    pub updated_at: String,
}

impl From<&Payment> for PaymentResponse {
    fn from(payment: &Payment) -> Self {
        Self {
            id: *payment.id.as_uuid(),
            request_id: *payment.request_id.as_uuid(),
            amount_cents: payment.amount_cents,
            method: payment.method.as_str().to_string(),
            status: payment.status.as_str().to_string(),
            updated_at: payment.updated_at.to_iso8601(),
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/payments/{id}", put(record_payment))
}

/// PUT /v1/payments/{id} — Record or update a payment outcome.
#[utoipa::path(
    put,
    path = "/v1/payments/{id}",
    params(("id" = Uuid, Path, description = "Payment ID")),
    request_body = RecordPaymentRequest,
    responses(
        (status = 200, description = "Payment recorded", body = PaymentResponse),
        (status = 400, description = "Invalid payment", body = crate::error::ErrorBody),
        (status = 404, description = "Request not found", body = crate::error::ErrorBody),
    ),
    tag = "payments"
)]
pub(crate) async fn record_payment(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<RecordPaymentRequest>, JsonRejection>,
) -> Result<Json<PaymentResponse>, AppError> {
    require_capability(&state, &caller, Capability::SOLICITUDES_VALIDAR_PAGO)?;
    let body = extract_validated_json(body)?;

    let payment = Payment {
        id: PaymentId::from_uuid(id),
        request_id: RequestId::from_uuid(body.request_id),
        amount_cents: body.amount_cents,
        method: body.method.parse().map_err(AppError::BadRequest)?,
        status: body.status.parse().map_err(AppError::BadRequest)?,
        updated_at: Timestamp::now(),
    };
    state.engine.record_payment(payment.clone()).await?;
    Ok(Json(PaymentResponse::from(&payment)))
}
