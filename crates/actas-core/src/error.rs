//! # Error Types
//!
//! Errors raised while constructing core values. Engine-level failures
//! (authorization, guards, conflicts) live in `actas-state`.

use thiserror::Error;

/// Error constructing or parsing a foundational value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// An identifier string did not parse.
    #[error("invalid {kind}: {value:?}")]
    InvalidIdentifier { kind: &'static str, value: String },

    /// A timestamp was malformed or not UTC.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// A permission code is not part of the catalog.
    #[error("unknown capability: {0}")]
    UnknownCapability(String),

    /// A role code is not part of the catalog.
    #[error("unknown role: {0}")]
    UnknownRole(String),
}
