//! # Repository Interfaces
//!
//! The engine reaches storage only through these traits. Each trait is
//! object-safe and `Send + Sync` so a single store can be shared across
//! handlers behind an `Arc`.
//!
//! [`RequestRepository::commit`] is the compare-and-set. An implementation
//! must apply the request update, the audit append and the optional
//! certificate insert atomically, and must fail with
//! [`RepositoryError::Conflict`] when the stored `(status, version)` no
//! longer matches the expected pair.

use async_trait::async_trait;

use actas_core::{BatchId, CertificateId, PaymentId, RequestId};
use actas_validation::AcademicDataBatch;

use crate::audit::{AuditDraft, AuditEntry};
use crate::certificate::Certificate;
use crate::error::RepositoryError;
use crate::payment::Payment;
use crate::request::Request;
use crate::status::RequestStatus;

/// A prepared transition, ready to be committed.
#[derive(Debug, Clone)]
pub struct TransitionCommit {
    pub expected_status: RequestStatus,
    pub expected_version: i64,
    /// The full next aggregate, version already bumped.
    pub request: Request,
    pub audit: AuditDraft,
    pub certificate: Option<Certificate>,
}

#[async_trait]
pub trait RequestRepository: Send + Sync {
    /// Store a freshly registered request with its first audit entry.
    async fn insert(&self, request: &Request, audit: AuditDraft)
        -> Result<AuditEntry, RepositoryError>;

    /// Next tracking sequence for `year`, starting at 1.
    async fn next_sequence(&self, year: i32) -> Result<u32, RepositoryError>;

    async fn find(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError>;

    /// Compare-and-set the request and append its audit entry.
    async fn commit(&self, commit: TransitionCommit) -> Result<AuditEntry, RepositoryError>;

    /// The request's audit chain, oldest first.
    async fn history(&self, id: &RequestId) -> Result<Vec<AuditEntry>, RepositoryError>;
}

/// Read access to payment outcomes, plus the write path the payment
/// subsystem uses to push them.
#[async_trait]
pub trait PaymentLedger: Send + Sync {
    async fn payment(&self, id: &PaymentId) -> Result<Option<Payment>, RepositoryError>;

    /// Insert or replace.
    async fn record_payment(&self, payment: Payment) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait AcademicBatchSource: Send + Sync {
    async fn batch(&self, id: &BatchId) -> Result<Option<AcademicDataBatch>, RepositoryError>;

    /// Insert or replace.
    async fn store_batch(&self, batch: AcademicDataBatch) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait CertificateRegistry: Send + Sync {
    async fn certificate(&self, id: &CertificateId)
        -> Result<Option<Certificate>, RepositoryError>;

    async fn certificate_by_code(&self, code: &str)
        -> Result<Option<Certificate>, RepositoryError>;
}

/// Every storage concern the engine needs, in one object.
pub trait Store: RequestRepository + PaymentLedger + AcademicBatchSource + CertificateRegistry {}

impl<T> Store for T where
    T: RequestRepository + PaymentLedger + AcademicBatchSource + CertificateRegistry
{
}
