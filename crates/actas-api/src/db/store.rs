//! PostgreSQL implementation of the repository traits.
//!
//! A transition commit is one transaction: the conditional `UPDATE` on
//! `(id, status, version)` both checks and takes the row lock, so the
//! audit append that follows sees a stable chain tail.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use actas_core::{
    ActorId, BatchId, CertificateId, CitizenId, PaymentId, RequestId, StudentId, Timestamp,
    TrackingCode,
};
use actas_state::{
    AcademicBatchSource, AuditDraft, AuditEntry, Certificate, CertificateRegistry, EventKind,
    Payment, PaymentLedger, RepositoryError, Request, RequestRepository, RequestStatus,
    TransitionCommit,
};
use actas_validation::{AcademicDataBatch, StudentRow};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn storage(err: sqlx::Error) -> RepositoryError {
    match err.as_database_error() {
        Some(db) if db.is_unique_violation() => RepositoryError::Duplicate(db.message().to_string()),
        _ => RepositoryError::Storage(err.to_string()),
    }
}

fn corrupt(err: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Corrupt(err.to_string())
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, RepositoryError> {
    serde_json::to_value(value).map_err(|e| RepositoryError::Storage(e.to_string()))
}

fn from_json<T: DeserializeOwned>(value: Value) -> Result<T, RepositoryError> {
    serde_json::from_value(value).map_err(corrupt)
}

fn to_json_opt<T: Serialize>(value: &Option<T>) -> Result<Option<Value>, RepositoryError> {
    value.as_ref().map(to_json).transpose()
}

fn from_json_opt<T: DeserializeOwned>(value: Option<Value>) -> Result<Option<T>, RepositoryError> {
    value.map(from_json).transpose()
}

// ── Rows ────────────────────────────────────────────────────────────

const REQUEST_COLUMNS: &str = "id, tracking_code, status, version, citizen_id, student_id, \
     editor_id, payment_id, batch_id, certificate_id, priority, applicant_context, \
     observation, archive_location, closing_reason, delivery, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct RequestRow {
    id: Uuid,
    tracking_code: String,
    status: String,
    version: i64,
    citizen_id: Uuid,
    student_id: Uuid,
    editor_id: Option<Uuid>,
    payment_id: Option<Uuid>,
    batch_id: Option<Uuid>,
    certificate_id: Option<Uuid>,
    priority: String,
    applicant_context: Value,
    observation: Option<Value>,
    archive_location: Option<String>,
    closing_reason: Option<String>,
    delivery: Option<Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RequestRow {
    fn into_request(self) -> Result<Request, RepositoryError> {
        Ok(Request {
            id: RequestId::from_uuid(self.id),
            tracking_code: TrackingCode::parse(&self.tracking_code).map_err(corrupt)?,
            status: self.status.parse().map_err(corrupt)?,
            version: self.version,
            citizen_id: CitizenId::from_uuid(self.citizen_id),
            student_id: StudentId::from_uuid(self.student_id),
            editor_id: self.editor_id.map(ActorId::from_uuid),
            payment_id: self.payment_id.map(PaymentId::from_uuid),
            batch_id: self.batch_id.map(BatchId::from_uuid),
            certificate_id: self.certificate_id.map(CertificateId::from_uuid),
            priority: self.priority.parse().map_err(corrupt)?,
            applicant_context: from_json(self.applicant_context)?,
            observation: from_json_opt(self.observation)?,
            archive_location: self.archive_location,
            closing_reason: self.closing_reason,
            delivery: from_json_opt(self.delivery)?,
            created_at: Timestamp::from_utc(self.created_at),
            updated_at: Timestamp::from_utc(self.updated_at),
        })
    }
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    request_id: Uuid,
    sequence: i64,
    from_state: Option<String>,
    to_state: String,
    event: Option<String>,
    actor_id: Uuid,
    occurred_at: DateTime<Utc>,
    payload_summary: Value,
    previous_hash: String,
    entry_hash: String,
}

impl AuditRow {
    fn into_entry(self) -> Result<AuditEntry, RepositoryError> {
        Ok(AuditEntry {
            id: self.id,
            request_id: RequestId::from_uuid(self.request_id),
            sequence: self.sequence,
            from_state: self
                .from_state
                .map(|s| s.parse::<RequestStatus>())
                .transpose()
                .map_err(corrupt)?,
            to_state: self.to_state.parse().map_err(corrupt)?,
            event: self
                .event
                .map(|s| s.parse::<EventKind>())
                .transpose()
                .map_err(corrupt)?,
            actor_id: ActorId::from_uuid(self.actor_id),
            timestamp: Timestamp::from_utc(self.occurred_at),
            payload_summary: self.payload_summary,
            previous_hash: self.previous_hash,
            entry_hash: self.entry_hash,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    request_id: Uuid,
    amount_cents: i64,
    method: String,
    status: String,
    updated_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_payment(self) -> Result<Payment, RepositoryError> {
        Ok(Payment {
            id: PaymentId::from_uuid(self.id),
            request_id: RequestId::from_uuid(self.request_id),
            amount_cents: self.amount_cents,
            method: self.method.parse().map_err(corrupt)?,
            status: self.status.parse().map_err(corrupt)?,
            updated_at: Timestamp::from_utc(self.updated_at),
        })
    }
}

#[derive(sqlx::FromRow)]
struct CertificateRow {
    id: Uuid,
    request_id: Uuid,
    verification_code: String,
    status: String,
    signed_by: Uuid,
    emitted_at: DateTime<Utc>,
}

impl CertificateRow {
    fn into_certificate(self) -> Result<Certificate, RepositoryError> {
        Ok(Certificate {
            id: CertificateId::from_uuid(self.id),
            request_id: RequestId::from_uuid(self.request_id),
            verification_code: self.verification_code,
            status: self.status.parse().map_err(corrupt)?,
            signed_by: ActorId::from_uuid(self.signed_by),
            emitted_at: Timestamp::from_utc(self.emitted_at),
        })
    }
}

// ── Transaction helpers ─────────────────────────────────────────────

/// Seal `draft` after the request's current chain tail and insert it.
async fn append_audit(
    tx: &mut Transaction<'_, Postgres>,
    draft: AuditDraft,
) -> Result<AuditEntry, RepositoryError> {
    let tail: Option<(i64, String)> = sqlx::query_as(
        "SELECT sequence, entry_hash FROM audit_entries
         WHERE request_id = $1 ORDER BY sequence DESC LIMIT 1",
    )
    .bind(draft.request_id.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(storage)?;

    let entry = match &tail {
        Some((sequence, hash)) => draft.seal(sequence + 1, Some(hash.as_str())),
        None => draft.seal(1, None),
    };

    sqlx::query(
        "INSERT INTO audit_entries
            (id, request_id, sequence, from_state, to_state, event, actor_id,
             occurred_at, payload_summary, previous_hash, entry_hash)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(entry.id)
    .bind(entry.request_id.as_uuid())
    .bind(entry.sequence)
    .bind(entry.from_state.map(|s| s.as_str()))
    .bind(entry.to_state.as_str())
    .bind(entry.event.map(|e| e.as_str()))
    .bind(entry.actor_id.as_uuid())
    .bind(entry.timestamp.as_datetime())
    .bind(&entry.payload_summary)
    .bind(&entry.previous_hash)
    .bind(&entry.entry_hash)
    .execute(&mut **tx)
    .await
    .map_err(storage)?;

    Ok(entry)
}

#[async_trait]
impl RequestRepository for PgStore {
    async fn insert(
        &self,
        request: &Request,
        audit: AuditDraft,
    ) -> Result<AuditEntry, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        sqlx::query(&format!(
            "INSERT INTO requests ({REQUEST_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)"
        ))
        .bind(request.id.as_uuid())
        .bind(request.tracking_code.as_str())
        .bind(request.status.as_str())
        .bind(request.version)
        .bind(request.citizen_id.as_uuid())
        .bind(request.student_id.as_uuid())
        .bind(request.editor_id.map(|id| id.0))
        .bind(request.payment_id.map(|id| id.0))
        .bind(request.batch_id.map(|id| id.0))
        .bind(request.certificate_id.map(|id| id.0))
        .bind(request.priority.as_str())
        .bind(to_json(&request.applicant_context)?)
        .bind(to_json_opt(&request.observation)?)
        .bind(&request.archive_location)
        .bind(&request.closing_reason)
        .bind(to_json_opt(&request.delivery)?)
        .bind(request.created_at.as_datetime())
        .bind(request.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        let entry = append_audit(&mut tx, audit).await?;
        tx.commit().await.map_err(storage)?;
        Ok(entry)
    }

    async fn next_sequence(&self, year: i32) -> Result<u32, RepositoryError> {
        let (value,): (i32,) = sqlx::query_as(
            "INSERT INTO tracking_sequences (year, last_value) VALUES ($1, 1)
             ON CONFLICT (year) DO UPDATE SET last_value = tracking_sequences.last_value + 1
             RETURNING last_value",
        )
        .bind(year)
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;
        u32::try_from(value).map_err(corrupt)
    }

    async fn find(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError> {
        let row = sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        row.map(RequestRow::into_request).transpose()
    }

    async fn commit(&self, commit: TransitionCommit) -> Result<AuditEntry, RepositoryError> {
        let request = &commit.request;
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let updated = sqlx::query(
            "UPDATE requests SET
                status = $4, version = $5, editor_id = $6, payment_id = $7, batch_id = $8,
                certificate_id = $9, priority = $10, observation = $11,
                archive_location = $12, closing_reason = $13, delivery = $14, updated_at = $15
             WHERE id = $1 AND status = $2 AND version = $3",
        )
        .bind(request.id.as_uuid())
        .bind(commit.expected_status.as_str())
        .bind(commit.expected_version)
        .bind(request.status.as_str())
        .bind(request.version)
        .bind(request.editor_id.map(|id| id.0))
        .bind(request.payment_id.map(|id| id.0))
        .bind(request.batch_id.map(|id| id.0))
        .bind(request.certificate_id.map(|id| id.0))
        .bind(request.priority.as_str())
        .bind(to_json_opt(&request.observation)?)
        .bind(&request.archive_location)
        .bind(&request.closing_reason)
        .bind(to_json_opt(&request.delivery)?)
        .bind(request.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        if updated.rows_affected() == 0 {
            let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM requests WHERE id = $1")
                .bind(request.id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(storage)?;
            return Err(match exists {
                Some(_) => RepositoryError::Conflict {
                    request_id: request.id,
                },
                None => RepositoryError::NotFound {
                    kind: "request",
                    id: request.id.to_string(),
                },
            });
        }

        if let Some(cert) = &commit.certificate {
            sqlx::query(
                "INSERT INTO certificates
                    (id, request_id, verification_code, status, signed_by, emitted_at)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(cert.id.as_uuid())
            .bind(cert.request_id.as_uuid())
            .bind(&cert.verification_code)
            .bind(cert.status.as_str())
            .bind(cert.signed_by.as_uuid())
            .bind(cert.emitted_at.as_datetime())
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        }

        let entry = append_audit(&mut tx, commit.audit).await?;
        tx.commit().await.map_err(storage)?;
        Ok(entry)
    }

    async fn history(&self, id: &RequestId) -> Result<Vec<AuditEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, AuditRow>(
            "SELECT id, request_id, sequence, from_state, to_state, event, actor_id,
                    occurred_at, payload_summary, previous_hash, entry_hash
             FROM audit_entries WHERE request_id = $1 ORDER BY sequence",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        rows.into_iter().map(AuditRow::into_entry).collect()
    }
}

#[async_trait]
impl PaymentLedger for PgStore {
    async fn payment(&self, id: &PaymentId) -> Result<Option<Payment>, RepositoryError> {
        let row = sqlx::query_as::<_, PaymentRow>(
            "SELECT id, request_id, amount_cents, method, status, updated_at
             FROM payments WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        row.map(PaymentRow::into_payment).transpose()
    }

    async fn record_payment(&self, payment: Payment) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO payments (id, request_id, amount_cents, method, status, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (id) DO UPDATE SET
                request_id = EXCLUDED.request_id,
                amount_cents = EXCLUDED.amount_cents,
                method = EXCLUDED.method,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at",
        )
        .bind(payment.id.as_uuid())
        .bind(payment.request_id.as_uuid())
        .bind(payment.amount_cents)
        .bind(payment.method.as_str())
        .bind(payment.status.as_str())
        .bind(payment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }
}

#[async_trait]
impl AcademicBatchSource for PgStore {
    async fn batch(&self, id: &BatchId) -> Result<Option<AcademicDataBatch>, RepositoryError> {
        let row: Option<(Value,)> =
            sqlx::query_as("SELECT students FROM academic_batches WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(storage)?;
        row.map(|(students,)| {
            Ok(AcademicDataBatch {
                id: *id,
                students: from_json::<Vec<StudentRow>>(students)?,
            })
        })
        .transpose()
    }

    async fn store_batch(&self, batch: AcademicDataBatch) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO academic_batches (id, students) VALUES ($1, $2)
             ON CONFLICT (id) DO UPDATE SET students = EXCLUDED.students, stored_at = now()",
        )
        .bind(batch.id.as_uuid())
        .bind(to_json(&batch.students)?)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }
}

#[async_trait]
impl CertificateRegistry for PgStore {
    async fn certificate(&self, id: &CertificateId) -> Result<Option<Certificate>, RepositoryError> {
        let row = sqlx::query_as::<_, CertificateRow>(
            "SELECT id, request_id, verification_code, status, signed_by, emitted_at
             FROM certificates WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        row.map(CertificateRow::into_certificate).transpose()
    }

    async fn certificate_by_code(&self, code: &str) -> Result<Option<Certificate>, RepositoryError> {
        let row = sqlx::query_as::<_, CertificateRow>(
            "SELECT id, request_id, verification_code, status, signed_by, emitted_at
             FROM certificates WHERE verification_code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        row.map(CertificateRow::into_certificate).transpose()
    }
}
