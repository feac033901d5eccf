//! # actas-state — Request Lifecycle Engine
//!
//! Governs a certificate request from registration to delivery.
//!
//! ## Modules
//!
//! - [`status`]: the fourteen states, fifteen events and the transition table.
//! - [`request`]: the `Request` aggregate and its typed side records.
//! - [`engine`]: [`LifecycleEngine`], which gates, guards and commits
//!   transitions.
//! - [`audit`]: the per-request SHA-256 hash chain.
//! - [`repository`] / [`memory`]: storage traits and the in-memory store.
//! - [`aging`]: read-only SLA aging.
//! - [`legacy`]: import of free-text remarks from the previous system.
//!
//! ## Invariants
//!
//! - A request changes status only through [`LifecycleEngine::apply_event`].
//! - Every committed transition appends exactly one audit entry in the same
//!   commit; a failed commit writes neither.
//! - Terminal states accept no further events.

pub mod aging;
pub mod audit;
pub mod certificate;
pub mod engine;
pub mod error;
pub mod legacy;
pub mod memory;
pub mod payload;
pub mod payment;
pub mod repository;
pub mod request;
pub mod status;

pub use aging::Aging;
pub use audit::{verify_chain, AuditDraft, AuditEntry, ChainIntegrity, GENESIS_HASH};
pub use certificate::{Certificate, CertificateStatus};
pub use engine::{LifecycleEngine, RequestView};
pub use error::{EngineError, GuardViolation, RepositoryError};
pub use legacy::{parse_remarks, LegacyRemarks};
pub use memory::InMemoryStore;
pub use payload::TransitionPayload;
pub use payment::{Payment, PaymentMethod, PaymentStatus};
pub use repository::{
    AcademicBatchSource, CertificateRegistry, PaymentLedger, RequestRepository, Store,
    TransitionCommit,
};
pub use request::{
    ApplicantContext, DeliveryChannel, DeliveryRecord, EducationLevel, Guardian, NewRequest,
    ObservationRecord, Priority, Request,
};
pub use status::{events_from, transition, EventKind, RequestStatus};
