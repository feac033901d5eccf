//! # Lifecycle Engine
//!
//! Applies guarded transitions to requests. Every command follows the same
//! pipeline:
//!
//! ```text
//! load ─▶ terminal? ─▶ table lookup ─▶ gate ─▶ guard ─▶ build next + audit ─▶ CAS commit
//! ```
//!
//! Nothing is written until the commit. The commit is a compare-and-set on
//! `(status, version)`, so of two callers racing from the same read, one
//! wins and the other gets [`EngineError::StateConflict`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use actas_core::{
    ActorCapabilities, ActorId, AuthorizationGate, Capability, CapabilityRegistry, PaymentId,
    RequestId, Timestamp, TrackingCode,
};
use actas_validation::{
    validate_batch, AcademicDataBatch, AreaCatalog, ValidationConfig, ValidationReport,
};

use crate::aging::{aging, Aging};
use crate::audit::{AuditDraft, AuditEntry};
use crate::certificate::{generate_verification_code, Certificate};
use crate::error::{EngineError, GuardViolation, RepositoryError};
use crate::payload::TransitionPayload;
use crate::payment::{Payment, PaymentStatus};
use crate::repository::{Store, TransitionCommit};
use crate::request::{DeliveryRecord, NewRequest, ObservationRecord, Request};
use crate::status::{events_from, transition, EventKind, RequestStatus};

/// Minimum trimmed length, in characters, of a not-found reason.
pub const MIN_NOT_FOUND_REASON_CHARS: usize = 10;

/// Attempts at drawing an unused verification code before giving up.
pub const VERIFICATION_CODE_ATTEMPTS: usize = 5;

/// A request as seen by one actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestView {
    pub request: Request,
    /// Events valid from the current status that this actor may fire.
    pub allowed_events: Vec<EventKind>,
}

/// The request lifecycle engine.
#[derive(Clone)]
pub struct LifecycleEngine {
    store: Arc<dyn Store>,
    registry: Arc<dyn CapabilityRegistry>,
    catalog: AreaCatalog,
    validation: ValidationConfig,
}

impl std::fmt::Debug for LifecycleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleEngine")
            .field("catalog", &self.catalog.areas().len())
            .field("validation", &self.validation)
            .finish_non_exhaustive()
    }
}

impl LifecycleEngine {
    pub fn new(store: Arc<dyn Store>, registry: Arc<dyn CapabilityRegistry>) -> Self {
        Self {
            store,
            registry,
            catalog: AreaCatalog::standard(),
            validation: ValidationConfig::default(),
        }
    }

    /// Replace the institution's known areas.
    pub fn with_catalog(mut self, catalog: AreaCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_validation_config(mut self, config: ValidationConfig) -> Self {
        self.validation = config;
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn catalog(&self) -> &AreaCatalog {
        &self.catalog
    }

    /// Resolve an actor. Unknown actors hold nothing.
    pub fn capabilities(&self, actor: &ActorId) -> ActorCapabilities {
        self.registry
            .resolve(actor)
            .unwrap_or_else(|| ActorCapabilities::unknown(*actor))
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Register a new request in `REGISTRADA`.
    pub async fn create_request(
        &self,
        input: NewRequest,
        created_by: ActorId,
    ) -> Result<Request, EngineError> {
        input
            .applicant_context
            .validate()
            .map_err(EngineError::InvalidInput)?;

        let now = Timestamp::now();
        let sequence = self.store.next_sequence(now.year()).await?;
        let request = Request::register(input, TrackingCode::new(now.year(), sequence), now);

        let mut summary = Map::new();
        summary.insert(
            "tracking_code".into(),
            Value::String(request.tracking_code.to_string()),
        );
        let audit = AuditDraft {
            request_id: request.id,
            from_state: None,
            to_state: request.status,
            event: None,
            actor_id: created_by,
            timestamp: now,
            payload_summary: Value::Object(summary),
        };
        self.store.insert(&request, audit).await?;

        tracing::info!(
            request_id = %request.id,
            tracking_code = %request.tracking_code,
            actor = %created_by,
            "request registered"
        );
        metrics::counter!("actas_requests_created_total").increment(1);
        Ok(request)
    }

    /// Fire `event` on a request on behalf of `actor`.
    pub async fn apply_event(
        &self,
        request_id: RequestId,
        event: EventKind,
        actor: ActorId,
        payload: TransitionPayload,
    ) -> Result<Request, EngineError> {
        let result = self.try_apply(request_id, event, actor, payload).await;
        metrics::counter!(
            "actas_transitions_total",
            "event" => event.as_str(),
            "outcome" => outcome_label(&result)
        )
        .increment(1);
        result
    }

    async fn try_apply(
        &self,
        request_id: RequestId,
        event: EventKind,
        actor: ActorId,
        payload: TransitionPayload,
    ) -> Result<Request, EngineError> {
        let current = self
            .store
            .find(&request_id)
            .await?
            .ok_or_else(|| EngineError::not_found("request", request_id))?;

        if current.status.is_terminal() {
            return Err(EngineError::AlreadyInTerminalState {
                status: current.status,
            });
        }
        let target = transition(current.status, event).ok_or(EngineError::EventNotAllowed {
            event,
            status: current.status,
        })?;

        let required = event.required_capability();
        let resolved = self.capabilities(&actor);
        if !AuthorizationGate::allow(&resolved.capabilities, required) {
            tracing::warn!(
                request_id = %request_id,
                event = %event,
                actor = %actor,
                required = %required,
                "transition denied"
            );
            return Err(EngineError::Authorization { actor, required });
        }

        let now = Timestamp::now();
        let mut next = current.clone();
        let mut summary = payload.summary(event);
        let certificate = self
            .guard(event, &mut next, &payload, actor, now, &mut summary)
            .await?;
        if target != RequestStatus::Observado {
            next.observation = None;
        }
        next.status = target;
        next.version = current.version + 1;
        next.updated_at = now;

        let commit = TransitionCommit {
            expected_status: current.status,
            expected_version: current.version,
            audit: AuditDraft {
                request_id,
                from_state: Some(current.status),
                to_state: target,
                event: Some(event),
                actor_id: actor,
                timestamp: now,
                payload_summary: Value::Object(summary),
            },
            request: next.clone(),
            certificate,
        };

        match self.store.commit(commit).await {
            Ok(entry) => {
                tracing::info!(
                    request_id = %request_id,
                    event = %event,
                    from = %current.status,
                    to = %target,
                    actor = %actor,
                    audit_sequence = entry.sequence,
                    "transition committed"
                );
                Ok(next)
            }
            Err(RepositoryError::Conflict { .. }) => {
                tracing::warn!(
                    request_id = %request_id,
                    event = %event,
                    expected = %current.status,
                    "transition lost a concurrent update"
                );
                Err(EngineError::StateConflict {
                    request_id,
                    expected: current.status,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Evaluate `event`'s guard and apply its side effects to `next`.
    /// Returns the certificate `firmar` issues.
    async fn guard(
        &self,
        event: EventKind,
        next: &mut Request,
        payload: &TransitionPayload,
        actor: ActorId,
        now: Timestamp,
        summary: &mut Map<String, Value>,
    ) -> Result<Option<Certificate>, EngineError> {
        match event {
            EventKind::Derivar => {
                if let Some(editor) = payload.editor_id {
                    let resolved = self
                        .registry
                        .resolve(&editor)
                        .ok_or_else(|| EngineError::not_found("editor", editor))?;
                    if !AuthorizationGate::allow(
                        &resolved.capabilities,
                        Capability::SOLICITUDES_BUSCAR,
                    ) {
                        return Err(GuardViolation::EditorNotAssignable { editor }.into());
                    }
                }
                next.editor_id = payload.editor_id;
            }
            EventKind::IniciarBusqueda => {
                // A pooled request belongs to whoever starts the search.
                if next.editor_id.is_none() {
                    next.editor_id = Some(actor);
                    summary.insert("editor_id".into(), Value::String(actor.to_string()));
                }
            }
            EventKind::ActaEncontrada => {
                let location = TransitionPayload::text(&payload.location_note)
                    .ok_or(GuardViolation::LocationNoteMissing)?;
                next.archive_location = Some(location.to_string());
            }
            EventKind::ActaNoEncontrada => {
                let reason = TransitionPayload::text(&payload.reason).unwrap_or_default();
                let actual = reason.chars().count();
                if actual < MIN_NOT_FOUND_REASON_CHARS {
                    return Err(GuardViolation::ReasonTooShort {
                        min: MIN_NOT_FOUND_REASON_CHARS,
                        actual,
                    }
                    .into());
                }
                next.closing_reason = Some(reason.to_string());
            }
            EventKind::PagoValidado | EventKind::PagoRechazado => {
                let payment = self.linked_payment(next, payload).await?;
                let expected = if event == EventKind::PagoValidado {
                    PaymentStatus::Validated
                } else {
                    PaymentStatus::Rejected
                };
                if payment.status != expected {
                    return Err(GuardViolation::PaymentStatus {
                        expected,
                        actual: payment.status,
                    }
                    .into());
                }
                summary.insert("payment_id".into(), Value::String(payment.id.to_string()));
                summary.insert("amount_cents".into(), Value::from(payment.amount_cents));
                // A rejected payment is unlinked so the citizen can pay again.
                next.payment_id = (expected == PaymentStatus::Validated).then_some(payment.id);
            }
            EventKind::DatosDigitalizados | EventKind::CorregirYReenviar => {
                let batch_id = payload
                    .batch_id
                    .or(next.batch_id)
                    .ok_or(GuardViolation::BatchNotLinked)?;
                let batch = self
                    .store
                    .batch(&batch_id)
                    .await?
                    .ok_or_else(|| EngineError::not_found("academic batch", batch_id))?;
                let report = self.validate_academic_batch(&batch, None);
                if !report.valid {
                    return Err(EngineError::Validation(Box::new(report)));
                }
                summary.insert("batch_id".into(), Value::String(batch_id.to_string()));
                summary.insert(
                    "quality_score".into(),
                    Value::String(format!("{:.2}", report.quality_score)),
                );
                summary.insert("warnings".into(), Value::from(report.warnings.len()));
                next.batch_id = Some(batch_id);
            }
            EventKind::Observar => {
                let text = TransitionPayload::text(&payload.observation_text)
                    .ok_or(GuardViolation::ObservationTextMissing)?;
                next.observation = Some(ObservationRecord {
                    text: text.to_string(),
                    observed_fields: payload.fields.clone(),
                    observed_by: actor,
                    observed_at: now,
                });
            }
            EventKind::Firmar => {
                let batch_id = next.batch_id.ok_or(GuardViolation::CertificateDraftMissing)?;
                if self.store.batch(&batch_id).await?.is_none() {
                    return Err(GuardViolation::CertificateDraftMissing.into());
                }
                let code = self.unused_verification_code().await?;
                let certificate = Certificate::issue(next.id, code, actor, now);
                summary.insert(
                    "verification_code".into(),
                    Value::String(certificate.verification_code.clone()),
                );
                summary.insert(
                    "certificate_id".into(),
                    Value::String(certificate.id.to_string()),
                );
                next.certificate_id = Some(certificate.id);
                return Ok(Some(certificate));
            }
            EventKind::Entregar => {
                let receiver = TransitionPayload::text(&payload.receiving_party_id)
                    .ok_or(GuardViolation::ReceivingPartyMissing)?;
                next.delivery = Some(DeliveryRecord {
                    receiving_party_id: receiver.to_string(),
                    channel: payload.delivery_channel.unwrap_or_default(),
                    delivered_at: now,
                });
            }
            EventKind::Rechazar => {
                let reason =
                    TransitionPayload::text(&payload.reason).ok_or(GuardViolation::ReasonMissing)?;
                next.closing_reason = Some(reason.to_string());
            }
            EventKind::Cancelar => {
                next.closing_reason = TransitionPayload::text(&payload.reason).map(str::to_string);
            }
            EventKind::EnviarAValidacion | EventKind::Aprobar => {}
        }
        Ok(None)
    }

    async fn linked_payment(
        &self,
        request: &Request,
        payload: &TransitionPayload,
    ) -> Result<Payment, EngineError> {
        let payment_id: PaymentId = payload
            .payment_id
            .or(request.payment_id)
            .ok_or(GuardViolation::PaymentNotLinked)?;
        let payment = self
            .store
            .payment(&payment_id)
            .await?
            .ok_or_else(|| EngineError::not_found("payment", payment_id))?;
        if payment.request_id != request.id {
            return Err(GuardViolation::PaymentNotForRequest.into());
        }
        Ok(payment)
    }

    async fn unused_verification_code(&self) -> Result<String, EngineError> {
        for _ in 0..VERIFICATION_CODE_ATTEMPTS {
            let code = generate_verification_code(&mut rand::thread_rng());
            if self.store.certificate_by_code(&code).await?.is_none() {
                return Ok(code);
            }
        }
        Err(RepositoryError::Duplicate(format!(
            "no unused verification code after {VERIFICATION_CODE_ATTEMPTS} attempts"
        ))
        .into())
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// The request plus the events `actor` may fire next.
    pub async fn get_request(
        &self,
        request_id: RequestId,
        actor: ActorId,
    ) -> Result<RequestView, EngineError> {
        let request = self.load(request_id).await?;
        Ok(self.view(request, actor))
    }

    /// View an already-loaded request as `actor`.
    pub fn view(&self, request: Request, actor: ActorId) -> RequestView {
        let resolved = self.capabilities(&actor);
        let allowed_events = AuthorizationGate::permitted(
            &resolved.capabilities,
            events_from(request.status)
                .into_iter()
                .map(|event| (event, event.required_capability())),
        );
        RequestView {
            request,
            allowed_events,
        }
    }

    /// Validate a batch without touching any request.
    pub fn validate_academic_batch(
        &self,
        batch: &AcademicDataBatch,
        known_areas: Option<&AreaCatalog>,
    ) -> ValidationReport {
        let report = validate_batch(batch, known_areas.unwrap_or(&self.catalog), &self.validation);
        metrics::counter!(
            "actas_batch_validations_total",
            "valid" => if report.valid { "true" } else { "false" }
        )
        .increment(1);
        report
    }

    /// The request's audit chain, oldest first.
    pub async fn history(&self, request_id: RequestId) -> Result<Vec<AuditEntry>, EngineError> {
        self.load(request_id).await?;
        Ok(self.store.history(&request_id).await?)
    }

    /// SLA aging of a request at `now`.
    pub async fn aging(&self, request_id: RequestId, now: Timestamp) -> Result<Aging, EngineError> {
        let request = self.load(request_id).await?;
        let history = self.store.history(&request_id).await?;
        Ok(aging(&request, &history, now))
    }

    // ── Collaborator inputs ──────────────────────────────────────────

    /// Store a digitized batch and return its validation report. Invalid
    /// batches are stored too; they are rejected when an event uses them.
    pub async fn submit_batch(
        &self,
        batch: AcademicDataBatch,
    ) -> Result<ValidationReport, EngineError> {
        let report = self.validate_academic_batch(&batch, None);
        tracing::info!(
            batch_id = %batch.id,
            valid = report.valid,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "academic batch submitted"
        );
        self.store.store_batch(batch).await?;
        Ok(report)
    }

    /// Record a payment outcome pushed by the payment subsystem.
    pub async fn record_payment(&self, payment: Payment) -> Result<(), EngineError> {
        if payment.amount_cents < 0 {
            return Err(EngineError::InvalidInput(
                "amount_cents must not be negative".into(),
            ));
        }
        self.load(payment.request_id).await?;
        tracing::info!(
            payment_id = %payment.id,
            request_id = %payment.request_id,
            status = %payment.status,
            "payment recorded"
        );
        self.store.record_payment(payment).await?;
        Ok(())
    }

    pub async fn certificate_by_code(&self, code: &str) -> Result<Certificate, EngineError> {
        self.store
            .certificate_by_code(code)
            .await?
            .ok_or_else(|| EngineError::not_found("certificate", code))
    }

    async fn load(&self, request_id: RequestId) -> Result<Request, EngineError> {
        self.store
            .find(&request_id)
            .await?
            .ok_or_else(|| EngineError::not_found("request", request_id))
    }
}

fn outcome_label(result: &Result<Request, EngineError>) -> &'static str {
    match result {
        Ok(_) => "accepted",
        Err(EngineError::Authorization { .. }) => "denied",
        Err(EngineError::Guard(_)) => "guard_failed",
        Err(EngineError::Validation(_)) => "invalid_batch",
        Err(EngineError::StateConflict { .. }) => "conflict",
        Err(EngineError::AlreadyInTerminalState { .. }) => "terminal",
        Err(EngineError::EventNotAllowed { .. }) => "not_allowed",
        Err(EngineError::NotFound { .. }) => "not_found",
        Err(EngineError::InvalidInput(_)) => "invalid_input",
        Err(EngineError::Repository(_)) => "error",
    }
}
