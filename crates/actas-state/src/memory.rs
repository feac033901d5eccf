//! # In-Memory Store
//!
//! Default backing store, used in tests and when no database is
//! configured. All tables sit behind one `parking_lot::RwLock`, so a
//! commit's status check, request write, audit append and certificate
//! insert happen under a single write guard. The lock is never held
//! across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use actas_core::{BatchId, CertificateId, PaymentId, RequestId};
use actas_validation::AcademicDataBatch;

use crate::audit::{AuditDraft, AuditEntry};
use crate::certificate::Certificate;
use crate::error::RepositoryError;
use crate::payment::Payment;
use crate::repository::{
    AcademicBatchSource, CertificateRegistry, PaymentLedger, RequestRepository, TransitionCommit,
};
use crate::request::Request;

#[derive(Debug, Default)]
struct Tables {
    requests: HashMap<RequestId, Request>,
    audit: HashMap<RequestId, Vec<AuditEntry>>,
    sequences: HashMap<i32, u32>,
    payments: HashMap<PaymentId, Payment>,
    batches: HashMap<BatchId, AcademicDataBatch>,
    certificates: HashMap<CertificateId, Certificate>,
    certificate_codes: HashMap<String, CertificateId>,
}

impl Tables {
    fn append_audit(&mut self, draft: AuditDraft) -> AuditEntry {
        let chain = self.audit.entry(draft.request_id).or_default();
        let previous = chain.last().map(|e| e.entry_hash.as_str());
        let entry = draft.seal(chain.len() as i64 + 1, previous);
        chain.push(entry.clone());
        entry
    }
}

/// Shared in-memory implementation of every repository trait.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored requests.
    pub fn request_count(&self) -> usize {
        self.tables.read().requests.len()
    }
}

#[async_trait]
impl RequestRepository for InMemoryStore {
    async fn insert(
        &self,
        request: &Request,
        audit: AuditDraft,
    ) -> Result<AuditEntry, RepositoryError> {
        let mut tables = self.tables.write();
        if tables.requests.contains_key(&request.id) {
            return Err(RepositoryError::Duplicate(format!("request {}", request.id)));
        }
        if tables
            .requests
            .values()
            .any(|r| r.tracking_code == request.tracking_code)
        {
            return Err(RepositoryError::Duplicate(format!(
                "tracking code {}",
                request.tracking_code
            )));
        }
        tables.requests.insert(request.id, request.clone());
        Ok(tables.append_audit(audit))
    }

    async fn next_sequence(&self, year: i32) -> Result<u32, RepositoryError> {
        let mut tables = self.tables.write();
        let seq = tables.sequences.entry(year).or_insert(0);
        *seq += 1;
        Ok(*seq)
    }

    async fn find(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError> {
        Ok(self.tables.read().requests.get(id).cloned())
    }

    async fn commit(&self, commit: TransitionCommit) -> Result<AuditEntry, RepositoryError> {
        let mut tables = self.tables.write();
        let request_id = commit.request.id;

        let current = tables
            .requests
            .get(&request_id)
            .ok_or_else(|| RepositoryError::NotFound {
                kind: "request",
                id: request_id.to_string(),
            })?;
        if current.status != commit.expected_status || current.version != commit.expected_version
        {
            return Err(RepositoryError::Conflict { request_id });
        }

        if let Some(cert) = &commit.certificate {
            if tables.certificate_codes.contains_key(&cert.verification_code) {
                return Err(RepositoryError::Duplicate(format!(
                    "verification code {}",
                    cert.verification_code
                )));
            }
        }

        // All checks passed; nothing below can fail.
        tables.requests.insert(request_id, commit.request);
        if let Some(cert) = commit.certificate {
            tables
                .certificate_codes
                .insert(cert.verification_code.clone(), cert.id);
            tables.certificates.insert(cert.id, cert);
        }
        Ok(tables.append_audit(commit.audit))
    }

    async fn history(&self, id: &RequestId) -> Result<Vec<AuditEntry>, RepositoryError> {
        Ok(self.tables.read().audit.get(id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl PaymentLedger for InMemoryStore {
    async fn payment(&self, id: &PaymentId) -> Result<Option<Payment>, RepositoryError> {
        Ok(self.tables.read().payments.get(id).cloned())
    }

    async fn record_payment(&self, payment: Payment) -> Result<(), RepositoryError> {
        self.tables.write().payments.insert(payment.id, payment);
        Ok(())
    }
}

#[async_trait]
impl AcademicBatchSource for InMemoryStore {
    async fn batch(&self, id: &BatchId) -> Result<Option<AcademicDataBatch>, RepositoryError> {
        Ok(self.tables.read().batches.get(id).cloned())
    }

    async fn store_batch(&self, batch: AcademicDataBatch) -> Result<(), RepositoryError> {
        self.tables.write().batches.insert(batch.id, batch);
        Ok(())
    }
}

#[async_trait]
impl CertificateRegistry for InMemoryStore {
    async fn certificate(
        &self,
        id: &CertificateId,
    ) -> Result<Option<Certificate>, RepositoryError> {
        Ok(self.tables.read().certificates.get(id).cloned())
    }

    async fn certificate_by_code(
        &self,
        code: &str,
    ) -> Result<Option<Certificate>, RepositoryError> {
        let tables = self.tables.read();
        Ok(tables
            .certificate_codes
            .get(code)
            .and_then(|id| tables.certificates.get(id))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::verify_chain;
    use crate::request::fixtures::new_request;
    use crate::status::{EventKind, RequestStatus};
    use actas_core::{ActorId, Timestamp, TrackingCode};
    use serde_json::json;

    fn registered() -> (Request, AuditDraft) {
        let now = Timestamp::now();
        let request = Request::register(new_request(), TrackingCode::new(2026, 1), now);
        let draft = AuditDraft {
            request_id: request.id,
            from_state: None,
            to_state: RequestStatus::Registrada,
            event: None,
            actor_id: ActorId::SYSTEM,
            timestamp: now,
            payload_summary: json!({}),
        };
        (request, draft)
    }

    fn derivar(request: &Request) -> TransitionCommit {
        let mut next = request.clone();
        next.status = RequestStatus::DerivadoAEditor;
        next.version += 1;
        TransitionCommit {
            expected_status: request.status,
            expected_version: request.version,
            audit: AuditDraft {
                request_id: request.id,
                from_state: Some(request.status),
                to_state: next.status,
                event: Some(EventKind::Derivar),
                actor_id: ActorId::new(),
                timestamp: Timestamp::now(),
                payload_summary: json!({}),
            },
            request: next,
            certificate: None,
        }
    }

    #[tokio::test]
    async fn test_sequences_are_per_year() {
        let store = InMemoryStore::new();
        assert_eq!(store.next_sequence(2026).await.unwrap(), 1);
        assert_eq!(store.next_sequence(2026).await.unwrap(), 2);
        assert_eq!(store.next_sequence(2027).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_commit_appends_chained_audit() {
        let store = InMemoryStore::new();
        let (request, draft) = registered();
        store.insert(&request, draft).await.unwrap();

        let entry = store.commit(derivar(&request)).await.unwrap();
        assert_eq!(entry.sequence, 2);

        let history = store.history(&request.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(verify_chain(&history).chain_valid);
        let stored = store.find(&request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::DerivadoAEditor);
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn test_stale_commit_conflicts_without_writing() {
        let store = InMemoryStore::new();
        let (request, draft) = registered();
        store.insert(&request, draft).await.unwrap();

        store.commit(derivar(&request)).await.unwrap();
        let err = store.commit(derivar(&request)).await.unwrap_err();
        assert_eq!(err, RepositoryError::Conflict { request_id: request.id });
        assert_eq!(store.history(&request.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = InMemoryStore::new();
        let (request, draft) = registered();
        store.insert(&request, draft.clone()).await.unwrap();
        assert!(matches!(
            store.insert(&request, draft).await,
            Err(RepositoryError::Duplicate(_))
        ));
        assert_eq!(store.request_count(), 1);
    }

    #[tokio::test]
    async fn test_certificate_lookup_by_code() {
        let store = InMemoryStore::new();
        let (request, draft) = registered();
        store.insert(&request, draft).await.unwrap();

        let mut commit = derivar(&request);
        let cert = Certificate::issue(request.id, "ABC1234".into(), ActorId::new(), Timestamp::now());
        commit.certificate = Some(cert.clone());
        store.commit(commit).await.unwrap();

        assert_eq!(store.certificate_by_code("ABC1234").await.unwrap(), Some(cert.clone()));
        assert_eq!(store.certificate(&cert.id).await.unwrap(), Some(cert));
        assert_eq!(store.certificate_by_code("ZZZ0000").await.unwrap(), None);
    }
}
