//! # Audit Trail — Per-Request Hash Chain
//!
//! Every accepted transition, and the initial registration, appends one
//! entry. Entries chain by SHA-256: each entry commits to the previous
//! entry's hash, so editing or dropping a past entry breaks every later
//! link.
//!
//! The engine builds an [`AuditDraft`]; the repository seals it inside the
//! same commit as the status change, because only the repository knows the
//! previous hash at commit time.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use actas_core::{ActorId, RequestId, Timestamp};

use crate::status::{EventKind, RequestStatus};

/// Previous-hash value of the first entry in a chain.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// An audit entry before it has been placed in a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditDraft {
    pub request_id: RequestId,
    /// `None` for the registration entry.
    pub from_state: Option<RequestStatus>,
    pub to_state: RequestStatus,
    /// `None` for the registration entry.
    pub event: Option<EventKind>,
    pub actor_id: ActorId,
    pub timestamp: Timestamp,
    pub payload_summary: Value,
}

impl AuditDraft {
    /// Place the draft after `previous_hash` (or at the chain start).
    pub fn seal(self, sequence: i64, previous_hash: Option<&str>) -> AuditEntry {
        let mut entry = AuditEntry {
            id: Uuid::new_v4(),
            request_id: self.request_id,
            sequence,
            from_state: self.from_state,
            to_state: self.to_state,
            event: self.event,
            actor_id: self.actor_id,
            timestamp: self.timestamp,
            payload_summary: self.payload_summary,
            previous_hash: previous_hash.unwrap_or(GENESIS_HASH).to_string(),
            entry_hash: String::new(),
        };
        entry.entry_hash = entry.compute_hash();
        entry
    }
}

/// A sealed, immutable audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub request_id: RequestId,
    /// Position in the request's chain, starting at 1.
    pub sequence: i64,
    pub from_state: Option<RequestStatus>,
    pub to_state: RequestStatus,
    pub event: Option<EventKind>,
    pub actor_id: ActorId,
    pub timestamp: Timestamp,
    pub payload_summary: Value,
    pub previous_hash: String,
    pub entry_hash: String,
}

impl AuditEntry {
    /// `SHA-256(previous_hash || canonical JSON of the entry body)`.
    pub fn compute_hash(&self) -> String {
        let mut input = self.previous_hash.clone();
        input.push_str(&self.canonical_body());
        sha256_hex(&input)
    }

    /// Content fields as compact JSON with sorted keys. `id` and the hashes
    /// are excluded; timestamps are rendered at second precision so the
    /// body survives a database round trip.
    pub fn canonical_body(&self) -> String {
        // serde_json maps are key-sorted at every depth.
        json!({
            "request_id": self.request_id.to_string(),
            "sequence": self.sequence,
            "from_state": self.from_state.map(|s| s.as_str()),
            "to_state": self.to_state.as_str(),
            "event": self.event.map(|e| e.as_str()),
            "actor_id": self.actor_id.to_string(),
            "timestamp": self.timestamp.to_iso8601(),
            "payload_summary": self.payload_summary,
        })
        .to_string()
    }
}

/// Outcome of verifying a request's chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainIntegrity {
    pub total_entries: usize,
    /// Entries whose `previous_hash` does not match their predecessor.
    pub broken_links: usize,
    /// Entries whose stored hash does not match their content.
    pub tampered_entries: usize,
    pub chain_valid: bool,
}

/// Verify hash continuity and per-entry integrity of an ordered chain.
pub fn verify_chain(entries: &[AuditEntry]) -> ChainIntegrity {
    let mut broken_links = 0;
    let mut tampered_entries = 0;
    let mut last_hash: &str = GENESIS_HASH;

    for entry in entries {
        if entry.previous_hash != last_hash {
            broken_links += 1;
        }
        if entry.compute_hash() != entry.entry_hash {
            tampered_entries += 1;
        }
        last_hash = entry.entry_hash.as_str();
    }

    ChainIntegrity {
        total_entries: entries.len(),
        broken_links,
        tampered_entries,
        chain_valid: broken_links == 0 && tampered_entries == 0,
    }
}

pub(crate) fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
