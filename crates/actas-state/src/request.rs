//! # Request Aggregate
//!
//! The aggregate root governed by the lifecycle engine. References to other
//! aggregates are held by id only. Past statuses are not stored here; they
//! live in the audit trail.

use serde::{Deserialize, Serialize};

use actas_core::{
    ActorId, BatchId, CertificateId, CitizenId, PaymentId, RequestId, StudentId, Timestamp,
    TrackingCode,
};

use crate::status::RequestStatus;

/// Queue priority. Informational; never consulted by transition logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    #[default]
    Normal,
    Urgent,
    VeryUrgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Urgent => "URGENT",
            Self::VeryUrgent => "VERY_URGENT",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NORMAL" => Ok(Self::Normal),
            "URGENT" => Ok(Self::Urgent),
            "VERY_URGENT" => Ok(Self::VeryUrgent),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

// ─── Applicant Context ───────────────────────────────────────────────

/// School level of the sought record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EducationLevel {
    Primaria,
    Secundaria,
}

/// Earliest and latest school years covered by the paper archive.
pub const FIRST_ARCHIVED_YEAR: u16 = 1985;
pub const LAST_ARCHIVED_YEAR: u16 = 2012;

/// Person filing on the student's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guardian {
    pub full_name: String,
    pub national_id: String,
    pub relationship: String,
}

/// Where and when the student studied, as declared by the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantContext {
    pub department: String,
    pub province: String,
    pub district: String,
    pub school_name: String,
    pub last_year_attended: u16,
    pub level: EducationLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardian: Option<Guardian>,
}

impl ApplicantContext {
    /// Check declared data against what the archive can hold.
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("department", &self.department),
            ("province", &self.province),
            ("district", &self.district),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{field} must not be empty"));
            }
        }
        if self.school_name.trim().chars().count() < 3 {
            return Err("school_name must have at least 3 characters".to_string());
        }
        if !(FIRST_ARCHIVED_YEAR..=LAST_ARCHIVED_YEAR).contains(&self.last_year_attended) {
            return Err(format!(
                "last_year_attended must be between {FIRST_ARCHIVED_YEAR} and {LAST_ARCHIVED_YEAR}"
            ));
        }
        if let Some(guardian) = &self.guardian {
            if guardian.full_name.trim().is_empty() {
                return Err("guardian.full_name must not be empty".to_string());
            }
            if !is_national_id(&guardian.national_id) {
                return Err("guardian.national_id must be 8 digits".to_string());
            }
            if guardian.relationship.trim().is_empty() {
                return Err("guardian.relationship must not be empty".to_string());
            }
        }
        Ok(())
    }
}

/// Eight-digit national identity document number.
pub fn is_national_id(value: &str) -> bool {
    value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit())
}

// ─── Typed side records ──────────────────────────────────────────────

/// Feedback issued by the validating authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub text: String,
    #[serde(default)]
    pub observed_fields: Vec<String>,
    pub observed_by: ActorId,
    pub observed_at: Timestamp,
}

/// How the certificate reached the recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryChannel {
    #[default]
    InPerson,
    Digital,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub receiving_party_id: String,
    pub channel: DeliveryChannel,
    pub delivered_at: Timestamp,
}

// ─── Request ─────────────────────────────────────────────────────────

/// Input to `create_request`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRequest {
    pub citizen_id: CitizenId,
    pub student_id: StudentId,
    pub applicant_context: ApplicantContext,
    #[serde(default)]
    pub priority: Option<Priority>,
}

/// A citizen's certificate application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub tracking_code: TrackingCode,
    pub status: RequestStatus,
    /// Bumped on every committed transition; part of the compare-and-set key.
    pub version: i64,
    pub citizen_id: CitizenId,
    pub student_id: StudentId,
    pub editor_id: Option<ActorId>,
    pub payment_id: Option<PaymentId>,
    pub batch_id: Option<BatchId>,
    pub certificate_id: Option<CertificateId>,
    pub priority: Priority,
    pub applicant_context: ApplicantContext,
    pub observation: Option<ObservationRecord>,
    pub archive_location: Option<String>,
    pub closing_reason: Option<String>,
    pub delivery: Option<DeliveryRecord>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Request {
    /// A freshly registered request.
    pub fn register(input: NewRequest, tracking_code: TrackingCode, now: Timestamp) -> Self {
        Self {
            id: RequestId::new(),
            tracking_code,
            status: RequestStatus::Registrada,
            version: 0,
            citizen_id: input.citizen_id,
            student_id: input.student_id,
            editor_id: None,
            payment_id: None,
            batch_id: None,
            certificate_id: None,
            priority: input.priority.unwrap_or_default(),
            applicant_context: input.applicant_context,
            observation: None,
            archive_location: None,
            closing_reason: None,
            delivery: None,
            created_at: now,
            updated_at: now,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_register_starts_clean() {
        let now = Timestamp::now();
        let req = Request::register(new_request(), TrackingCode::new(2026, 1), now);
        assert_eq!(req.status, RequestStatus::Registrada);
        assert_eq!(req.version, 0);
        assert_eq!(req.priority, Priority::Normal);
        assert!(req.observation.is_none());
        assert_eq!(req.created_at, req.updated_at);
    }

    #[test]
    fn test_context_year_bounds() {
        let mut ctx = context();
        assert!(ctx.validate().is_ok());
        ctx.last_year_attended = 1984;
        assert!(ctx.validate().is_err());
        ctx.last_year_attended = 2012;
        assert!(ctx.validate().is_ok());
        ctx.last_year_attended = 2013;
        assert!(ctx.validate().is_err());
    }

    #[test]
    fn test_context_requires_location_and_school() {
        let mut ctx = context();
        ctx.district = " ".into();
        assert_eq!(ctx.validate().unwrap_err(), "district must not be empty");
        let mut ctx = context();
        ctx.school_name = "IE".into();
        assert!(ctx.validate().is_err());
    }

    #[test]
    fn test_guardian_national_id() {
        let mut ctx = context();
        ctx.guardian = Some(Guardian {
            full_name: "Rosa Quispe".into(),
            national_id: "1234567".into(),
            relationship: "MADRE".into(),
        });
        assert!(ctx.validate().is_err());
        if let Some(g) = ctx.guardian.as_mut() {
            g.national_id = "12345678".into();
        }
        assert!(ctx.validate().is_ok());
    }

    #[test]
    fn test_priority_wire_names() {
        assert_eq!(
            serde_json::to_string(&Priority::VeryUrgent).unwrap(),
            "\"VERY_URGENT\""
        );
        assert_eq!("URGENT".parse::<Priority>().unwrap(), Priority::Urgent);
    }
}
