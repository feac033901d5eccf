//! # Engine Errors
//!
//! | Variant                  | Retry?                               |
//! |--------------------------|--------------------------------------|
//! | `Authorization`          | never; surfaced to the actor         |
//! | `Guard`                  | after the condition is met           |
//! | `Validation`             | after the batch is corrected         |
//! | `StateConflict`          | yes, after re-reading the request    |
//! | `AlreadyInTerminalState` | never                                |
//! | `EventNotAllowed`        | never from this status               |
//! | `NotFound`               | never                                |
//! | `Repository`             | storage-dependent                    |

use thiserror::Error;

use actas_core::{ActorId, Capability, RequestId};
use actas_validation::ValidationReport;

use crate::payment::PaymentStatus;
use crate::status::{EventKind, RequestStatus};

/// A business precondition an event's guard found unmet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardViolation {
    #[error("editor {editor} cannot be assigned: not a registered archive searcher")]
    EditorNotAssignable { editor: ActorId },

    #[error("physical location note is required")]
    LocationNoteMissing,

    #[error("reason must have at least {min} characters, got {actual}")]
    ReasonTooShort { min: usize, actual: usize },

    #[error("a reason is required")]
    ReasonMissing,

    #[error("no payment is linked to this request")]
    PaymentNotLinked,

    #[error("payment does not belong to this request")]
    PaymentNotForRequest,

    #[error("payment status is {actual}, expected {expected}")]
    PaymentStatus {
        expected: PaymentStatus,
        actual: PaymentStatus,
    },

    #[error("no academic data batch is linked to this request")]
    BatchNotLinked,

    #[error("observation text is required")]
    ObservationTextMissing,

    #[error("no certificate draft: the request has no approved academic data")]
    CertificateDraftMissing,

    #[error("receiving party id is required")]
    ReceivingPartyMissing,
}

impl GuardViolation {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EditorNotAssignable { .. } => "EDITOR_NOT_ASSIGNABLE",
            Self::LocationNoteMissing => "LOCATION_NOTE_MISSING",
            Self::ReasonTooShort { .. } => "REASON_TOO_SHORT",
            Self::ReasonMissing => "REASON_MISSING",
            Self::PaymentNotLinked => "PAYMENT_NOT_LINKED",
            Self::PaymentNotForRequest => "PAYMENT_NOT_FOR_REQUEST",
            Self::PaymentStatus { .. } => "PAYMENT_STATUS",
            Self::BatchNotLinked => "BATCH_NOT_LINKED",
            Self::ObservationTextMissing => "OBSERVATION_TEXT_MISSING",
            Self::CertificateDraftMissing => "CERTIFICATE_DRAFT_MISSING",
            Self::ReceivingPartyMissing => "RECEIVING_PARTY_MISSING",
        }
    }
}

/// Storage-layer failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Compare-and-set lost: the stored status/version moved.
    #[error("request {request_id} was modified concurrently")]
    Conflict { request_id: RequestId },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("duplicate {0}")]
    Duplicate(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("stored data is corrupt: {0}")]
    Corrupt(String),
}

/// Failure of an engine command.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("actor {actor} lacks capability {required}")]
    Authorization { actor: ActorId, required: Capability },

    #[error("guard violation: {0}")]
    Guard(#[from] GuardViolation),

    #[error("academic data batch is invalid: {}", .0.summary())]
    Validation(Box<ValidationReport>),

    #[error("request {request_id} changed while {expected} was being processed; re-read and retry")]
    StateConflict {
        request_id: RequestId,
        expected: RequestStatus,
    },

    #[error("request is already in terminal state {status}")]
    AlreadyInTerminalState { status: RequestStatus },

    #[error("event {event} is not allowed from {status}")]
    EventNotAllowed {
        event: EventKind,
        status: RequestStatus,
    },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl EngineError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl From<RepositoryError> for EngineError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { kind, id } => Self::NotFound { kind, id },
            other => Self::Repository(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_codes_are_distinct() {
        let all = [
            GuardViolation::EditorNotAssignable {
                editor: ActorId::new(),
            },
            GuardViolation::LocationNoteMissing,
            GuardViolation::ReasonTooShort { min: 10, actual: 9 },
            GuardViolation::ReasonMissing,
            GuardViolation::PaymentNotLinked,
            GuardViolation::PaymentNotForRequest,
            GuardViolation::PaymentStatus {
                expected: PaymentStatus::Validated,
                actual: PaymentStatus::Pending,
            },
            GuardViolation::BatchNotLinked,
            GuardViolation::ObservationTextMissing,
            GuardViolation::CertificateDraftMissing,
            GuardViolation::ReceivingPartyMissing,
        ];
        let codes: std::collections::HashSet<_> = all.iter().map(|g| g.code()).collect();
        assert_eq!(codes.len(), all.len());
    }

    #[test]
    fn test_reason_too_short_message() {
        let err = EngineError::from(GuardViolation::ReasonTooShort { min: 10, actual: 9 });
        assert_eq!(
            err.to_string(),
            "guard violation: reason must have at least 10 characters, got 9"
        );
    }

    #[test]
    fn test_repository_not_found_lifts() {
        let err = EngineError::from(RepositoryError::NotFound {
            kind: "payment",
            id: "x".into(),
        });
        assert!(matches!(err, EngineError::NotFound { kind: "payment", .. }));
    }
}
