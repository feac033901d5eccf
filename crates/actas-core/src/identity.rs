//! # Identity Newtypes
//!
//! UUID-backed identifiers for every aggregate and actor the engine touches,
//! plus the human-readable [`TrackingCode`] handed to citizens.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| CoreError::InvalidIdentifier {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a certificate request (the lifecycle aggregate).
    RequestId,
    "request id"
);
uuid_id!(
    /// Identifier of the citizen who filed a request.
    CitizenId,
    "citizen id"
);
uuid_id!(
    /// Identifier of the student whose historical record is sought.
    StudentId,
    "student id"
);
uuid_id!(
    /// Identifier of a staff member or system principal.
    ActorId,
    "actor id"
);
uuid_id!(
    /// Identifier of a payment owned by the payment subsystem.
    PaymentId,
    "payment id"
);
uuid_id!(
    /// Identifier of a digitized academic data batch.
    BatchId,
    "batch id"
);
uuid_id!(
    /// Identifier of an issued certificate.
    CertificateId,
    "certificate id"
);

impl ActorId {
    /// The nil actor used when authentication is disabled.
    pub const SYSTEM: ActorId = ActorId(Uuid::nil());

    /// Whether this is the built-in system principal.
    pub fn is_system(&self) -> bool {
        self.0.is_nil()
    }
}

// ─── Tracking Code ──────────────────────────────────────────────────────

/// Human-readable request code of the form `S-{YYYY}-{NNNNNN}`.
///
/// Issued once at creation and never changed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackingCode(String);

impl TrackingCode {
    /// Build the code for the `sequence`-th request of `year`.
    pub fn new(year: i32, sequence: u32) -> Self {
        Self(format!("S-{year:04}-{sequence:06}"))
    }

    /// Parse and validate an existing code.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::InvalidIdentifier {
            kind: "tracking code",
            value: s.to_string(),
        };
        let mut parts = s.split('-');
        let (Some("S"), Some(year), Some(seq), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        let digits = |p: &str, len: usize| p.len() == len && p.bytes().all(|b| b.is_ascii_digit());
        if !digits(year, 4) || seq.len() < 6 || !digits(seq, seq.len()) {
            return Err(invalid());
        }
        Ok(Self(s.to_string()))
    }

    /// The calendar year encoded in the code.
    pub fn year(&self) -> Option<i32> {
        self.0.get(2..6).and_then(|y| y.parse().ok())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TrackingCode {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TrackingCode> for String {
    fn from(code: TrackingCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
    }

    #[test]
    fn test_id_serializes_as_bare_uuid() {
        let id = PaymentId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
        let back: PaymentId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_id_from_str_rejects_garbage() {
        let err = "not-a-uuid".parse::<RequestId>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidIdentifier { kind: "request id", .. }));
    }

    #[test]
    fn test_system_actor_is_nil() {
        assert!(ActorId::SYSTEM.is_system());
        assert!(!ActorId::new().is_system());
    }

    #[test]
    fn test_tracking_code_format() {
        let code = TrackingCode::new(2025, 42);
        assert_eq!(code.as_str(), "S-2025-000042");
        assert_eq!(code.year(), Some(2025));
    }

    #[test]
    fn test_tracking_code_parse() {
        assert!(TrackingCode::parse("S-2024-000001").is_ok());
        assert!(TrackingCode::parse("S-2024-1234567").is_ok());
        assert!(TrackingCode::parse("X-2024-000001").is_err());
        assert!(TrackingCode::parse("S-24-000001").is_err());
        assert!(TrackingCode::parse("S-2024-00001").is_err());
        assert!(TrackingCode::parse("S-2024-000001-9").is_err());
    }

    #[test]
    fn test_tracking_code_serde_validates() {
        let ok: Result<TrackingCode, _> = serde_json::from_str("\"S-2026-000007\"");
        assert!(ok.is_ok());
        let bad: Result<TrackingCode, _> = serde_json::from_str("\"S-2026-7\"");
        assert!(bad.is_err());
    }
}
