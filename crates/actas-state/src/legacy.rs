//! # Legacy Remarks Import
//!
//! Rows migrated from the previous system carry a single free-text
//! remarks column. Some rows hold a JSON document with the applicant's
//! academic data, guardian and archive-search outcome; older rows hold
//! plain prose. [`parse_remarks`] reads both and never fails: anything
//! that is not a recognizable JSON object is kept verbatim as prose.

use serde::Deserialize;

use crate::request::{ApplicantContext, EducationLevel, Guardian};

/// What a legacy remarks column turned out to contain.
#[derive(Debug, Clone, PartialEq)]
pub enum LegacyRemarks {
    Empty,
    Prose(String),
    Structured(LegacyRecord),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LegacyRecord {
    #[serde(rename = "datosAcademicos", default)]
    pub academic: Option<LegacyAcademic>,
    #[serde(rename = "datosApoderado", default)]
    pub guardian: Option<LegacyGuardian>,
    #[serde(rename = "busquedaActa", default)]
    pub search: Option<LegacySearch>,
    #[serde(rename = "motivoSolicitud", default)]
    pub purpose: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LegacyAcademic {
    #[serde(rename = "departamento")]
    pub department: Option<String>,
    #[serde(rename = "provincia")]
    pub province: Option<String>,
    #[serde(rename = "distrito")]
    pub district: Option<String>,
    #[serde(rename = "nombreColegio")]
    pub school_name: Option<String>,
    #[serde(rename = "ultimoAnioCursado")]
    pub last_year_attended: Option<u16>,
    #[serde(rename = "nivel")]
    pub level: Option<EducationLevel>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LegacyGuardian {
    #[serde(rename = "numeroDocumento", default)]
    pub document_number: Option<String>,
    #[serde(rename = "nombres", default)]
    pub given_names: Option<String>,
    #[serde(rename = "apellidoPaterno", default)]
    pub paternal_surname: Option<String>,
    #[serde(rename = "apellidoMaterno", default)]
    pub maternal_surname: Option<String>,
    #[serde(rename = "relacionConEstudiante", default)]
    pub relationship: Option<String>,
}

impl LegacyGuardian {
    pub fn full_name(&self) -> String {
        [&self.given_names, &self.paternal_surname, &self.maternal_surname]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LegacySearch {
    /// `ENCONTRADA` or `NO_ENCONTRADA`.
    #[serde(rename = "resultado", default)]
    pub outcome: Option<String>,
    #[serde(rename = "ubicacionFisica", default)]
    pub location: Option<String>,
    #[serde(rename = "motivoNoEncontrada", default)]
    pub reason: Option<String>,
}

impl LegacySearch {
    pub fn found(&self) -> Option<bool> {
        match self.outcome.as_deref() {
            Some("ENCONTRADA") => Some(true),
            Some("NO_ENCONTRADA") => Some(false),
            _ => None,
        }
    }
}

impl LegacyRecord {
    /// Rebuild a typed applicant context when every required field survived.
    pub fn applicant_context(&self) -> Option<ApplicantContext> {
        let academic = self.academic.as_ref()?;
        let guardian = self.guardian.as_ref().and_then(|g| {
            Some(Guardian {
                full_name: g.full_name(),
                national_id: g.document_number.clone()?,
                relationship: g.relationship.clone()?,
            })
        });
        let context = ApplicantContext {
            department: academic.department.clone()?,
            province: academic.province.clone()?,
            district: academic.district.clone()?,
            school_name: academic.school_name.clone()?,
            last_year_attended: academic.last_year_attended?,
            level: academic.level?,
            purpose: self.purpose.clone(),
            guardian,
        };
        context.validate().ok().map(|()| context)
    }
}

/// Classify a legacy remarks value.
pub fn parse_remarks(text: &str) -> LegacyRemarks {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return LegacyRemarks::Empty;
    }
    if trimmed.starts_with('{') {
        if let Ok(record) = serde_json::from_str::<LegacyRecord>(trimmed) {
            if record != LegacyRecord::default() {
                return LegacyRemarks::Structured(record);
            }
        }
    }
    LegacyRemarks::Prose(trimmed.to_string())
}
