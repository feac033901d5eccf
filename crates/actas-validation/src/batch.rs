//! # Academic Data Batch
//!
//! The digitized content of one acta: an ordered list of student rows, each
//! carrying `(area, note)` pairs as read from the paper record.

use serde::{Deserialize, Serialize};

use actas_core::BatchId;

/// A digitized acta produced by the upstream capture step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademicDataBatch {
    #[serde(default)]
    pub id: BatchId,
    pub students: Vec<StudentRow>,
}

/// One student line of the acta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRow {
    /// Row number as printed on the document.
    pub sequence: u32,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub national_id: Option<String>,
    #[serde(default)]
    pub notes: Vec<NoteEntry>,
}

impl StudentRow {
    /// Whether a non-blank national id was captured.
    pub fn has_national_id(&self) -> bool {
        self.national_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }
}

/// A single `(area label, note)` cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEntry {
    /// Subject-area label as detected on the document.
    pub area: String,
    #[serde(default)]
    pub value: NoteValue,
}

/// Value of a note cell.
///
/// On the wire a note is a JSON number, a string, or `null`:
/// numbers are vigesimal notes, `"EXO"`/`"EXONERADO"` marks an exoneration,
/// any other string is a literal grade, and `null` is a blank cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Option<RawNote>", into = "Option<RawNote>")]
pub enum NoteValue {
    Numeric(f64),
    Literal(String),
    Exonerated,
    #[default]
    Missing,
}

/// Literal grades accepted on the competency scale.
pub const LITERAL_GRADES: [&str; 4] = ["AD", "A", "B", "C"];

const EXONERATED_MARKERS: [&str; 3] = ["EXO", "EXON", "EXONERADO"];

impl NoteValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawNote {
    Number(f64),
    Text(String),
}

impl From<Option<RawNote>> for NoteValue {
    fn from(raw: Option<RawNote>) -> Self {
        match raw {
            None => Self::Missing,
            Some(RawNote::Number(n)) => Self::Numeric(n),
            Some(RawNote::Text(text)) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    Self::Missing
                } else if EXONERATED_MARKERS
                    .iter()
                    .any(|m| trimmed.eq_ignore_ascii_case(m))
                {
                    Self::Exonerated
                } else {
                    Self::Literal(trimmed.to_string())
                }
            }
        }
    }
}

impl From<NoteValue> for Option<RawNote> {
    fn from(value: NoteValue) -> Self {
        match value {
            NoteValue::Numeric(n) => Some(RawNote::Number(n)),
            NoteValue::Literal(s) => Some(RawNote::Text(s)),
            NoteValue::Exonerated => Some(RawNote::Text("EXONERADO".to_string())),
            NoteValue::Missing => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> NoteValue {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_note_wire_forms() {
        assert_eq!(parse("14"), NoteValue::Numeric(14.0));
        assert_eq!(parse("12.5"), NoteValue::Numeric(12.5));
        assert_eq!(parse("null"), NoteValue::Missing);
        assert_eq!(parse("\"  \""), NoteValue::Missing);
        assert_eq!(parse("\"exo\""), NoteValue::Exonerated);
        assert_eq!(parse("\"EXONERADO\""), NoteValue::Exonerated);
        assert_eq!(parse("\" AD \""), NoteValue::Literal("AD".into()));
    }

    #[test]
    fn test_absent_value_is_missing() {
        let entry: NoteEntry = serde_json::from_str(r#"{"area": "MAT"}"#).unwrap();
        assert!(entry.value.is_missing());
    }

    #[test]
    fn test_batch_id_defaults_when_absent() {
        let batch: AcademicDataBatch =
            serde_json::from_str(r#"{"students": [{"sequence": 1, "full_name": "ANA"}]}"#)
                .unwrap();
        assert_eq!(batch.students.len(), 1);
        assert!(batch.students[0].notes.is_empty());
        assert!(!batch.students[0].has_national_id());
    }

    #[test]
    fn test_exonerated_serializes_as_marker() {
        let json = serde_json::to_string(&NoteValue::Exonerated).unwrap();
        assert_eq!(json, "\"EXONERADO\"");
        assert_eq!(serde_json::to_string(&NoteValue::Missing).unwrap(), "null");
    }
}
