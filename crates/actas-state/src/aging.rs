//! # SLA Aging
//!
//! Read-only derived metric: how long a request has sat since it was
//! handed to the archive search team, and the priority that age implies.
//! Nothing here writes to the request.

use serde::{Deserialize, Serialize};

use actas_core::Timestamp;

use crate::audit::AuditEntry;
use crate::request::{Priority, Request};
use crate::status::EventKind;

/// Days after which a request is at least `URGENT`.
pub const URGENT_AFTER_DAYS: i64 = 3;
/// Days after which a request is `VERY_URGENT`.
pub const VERY_URGENT_AFTER_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aging {
    pub assigned_at: Timestamp,
    pub days_since_assignment: i64,
    pub suggested_priority: Priority,
}

/// Priority implied by `days` in the queue.
pub fn suggested_priority(days: i64) -> Priority {
    if days > VERY_URGENT_AFTER_DAYS {
        Priority::VeryUrgent
    } else if days > URGENT_AFTER_DAYS {
        Priority::Urgent
    } else {
        Priority::Normal
    }
}

/// Age `request` at `now`. The assignment instant is the latest `derivar`
/// in `history`, or the creation time before any assignment.
pub fn aging(request: &Request, history: &[AuditEntry], now: Timestamp) -> Aging {
    let assigned_at = history
        .iter()
        .rev()
        .find(|entry| entry.event == Some(EventKind::Derivar))
        .map(|entry| entry.timestamp)
        .unwrap_or(request.created_at);
    let days = assigned_at.whole_days_until(&now);

    Aging {
        assigned_at,
        days_since_assignment: days,
        suggested_priority: suggested_priority(days),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditDraft;
    use crate::request::fixtures::new_request;
    use crate::status::RequestStatus;
    use actas_core::{ActorId, TrackingCode};

    #[test]
    fn test_thresholds_are_strict() {
        assert_eq!(suggested_priority(0), Priority::Normal);
        assert_eq!(suggested_priority(3), Priority::Normal);
        assert_eq!(suggested_priority(4), Priority::Urgent);
        assert_eq!(suggested_priority(7), Priority::Urgent);
        assert_eq!(suggested_priority(8), Priority::VeryUrgent);
    }

    #[test]
    fn test_unassigned_ages_from_creation() {
        let created = Timestamp::parse("2026-03-01T08:00:00Z").unwrap();
        let request = Request::register(new_request(), TrackingCode::new(2026, 1), created);
        let result = aging(&request, &[], created.plus_days(5));
        assert_eq!(result.assigned_at, created);
        assert_eq!(result.days_since_assignment, 5);
        assert_eq!(result.suggested_priority, Priority::Urgent);
    }

    #[test]
    fn test_assignment_comes_from_derivar_entry() {
        let created = Timestamp::parse("2026-03-01T08:00:00Z").unwrap();
        let request = Request::register(new_request(), TrackingCode::new(2026, 1), created);
        let derived_at = created.plus_days(6);
        let entry = AuditDraft {
            request_id: request.id,
            from_state: Some(RequestStatus::Registrada),
            to_state: RequestStatus::DerivadoAEditor,
            event: Some(EventKind::Derivar),
            actor_id: ActorId::new(),
            timestamp: derived_at,
            payload_summary: serde_json::json!({}),
        }
        .seal(2, None);

        let result = aging(&request, &[entry], created.plus_days(8));
        assert_eq!(result.assigned_at, derived_at);
        assert_eq!(result.days_since_assignment, 2);
        assert_eq!(result.suggested_priority, Priority::Normal);
    }
}
