//! # actas-core — Foundational Types for the Certificate Engine
//!
//! Leaf crate of the `actas` workspace. Every other crate depends on it;
//! it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype identifiers.** `RequestId`, `ActorId`, `PaymentId`, `BatchId`
//!    and friends wrap a UUID so a payment id can never be passed where a
//!    request id is expected.
//!
//! 2. **Capabilities, not roles.** Roles are resolved once into a flat
//!    [`CapabilitySet`]. The [`gate`] only ever sees permission codes, so the
//!    role catalog can change without touching transition logic.
//!
//! 3. **UTC-only timestamps.** [`Timestamp`] is truncated to seconds so audit
//!    hashes are stable across serialization round trips.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `actas-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod capability;
pub mod error;
pub mod gate;
pub mod identity;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use capability::{
    ActorCapabilities, ActorProfile, Capability, CapabilityRegistry, CapabilitySet, Role,
    StaticCapabilityRegistry,
};
pub use error::CoreError;
pub use gate::AuthorizationGate;
pub use identity::{
    ActorId, BatchId, CertificateId, CitizenId, PaymentId, RequestId, StudentId, TrackingCode,
};
pub use temporal::Timestamp;
