//! # Certificate
//!
//! Created only as a side effect of `firmar`, in the same commit as the
//! transition. Citizens and third parties look certificates up by their
//! verification code.

use rand::Rng;
use serde::{Deserialize, Serialize};

use actas_core::{ActorId, CertificateId, RequestId, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateStatus {
    Draft,
    Issued,
    Annulled,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Issued => "ISSUED",
            Self::Annulled => "ANNULLED",
        }
    }
}

impl std::str::FromStr for CertificateStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(Self::Draft),
            "ISSUED" => Ok(Self::Issued),
            "ANNULLED" => Ok(Self::Annulled),
            other => Err(format!("unknown certificate status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: CertificateId,
    pub request_id: RequestId,
    /// Three uppercase letters followed by four digits, e.g. `QWE1234`.
    pub verification_code: String,
    pub status: CertificateStatus,
    pub signed_by: ActorId,
    pub emitted_at: Timestamp,
}

impl Certificate {
    pub fn issue(
        request_id: RequestId,
        verification_code: String,
        signed_by: ActorId,
        now: Timestamp,
    ) -> Self {
        Self {
            id: CertificateId::new(),
            request_id,
            verification_code,
            status: CertificateStatus::Issued,
            signed_by,
            emitted_at: now,
        }
    }
}

/// Draw a fresh verification code.
pub fn generate_verification_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut code = String::with_capacity(7);
    for _ in 0..3 {
        code.push(char::from(rng.gen_range(b'A'..=b'Z')));
    }
    for _ in 0..4 {
        code.push(char::from(rng.gen_range(b'0'..=b'9')));
    }
    code
}

pub fn is_verification_code(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.len() == 7
        && bytes[..3].iter().all(u8::is_ascii_uppercase)
        && bytes[3..].iter().all(u8::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_are_well_formed() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let code = generate_verification_code(&mut rng);
            assert!(is_verification_code(&code), "{code}");
        }
    }

    #[test]
    fn test_code_shape_check() {
        assert!(is_verification_code("ABC1234"));
        assert!(!is_verification_code("abc1234"));
        assert!(!is_verification_code("AB12345"));
        assert!(!is_verification_code("ABC123"));
    }

    #[test]
    fn test_issue_sets_issued() {
        let cert = Certificate::issue(
            RequestId::new(),
            "XYZ0001".into(),
            ActorId::new(),
            Timestamp::now(),
        );
        assert_eq!(cert.status, CertificateStatus::Issued);
    }
}
