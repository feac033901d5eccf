//! # Validation Report
//!
//! Structured outcome of validating one batch: blocking errors, advisory
//! warnings, counters, and the derived quality score.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Machine-readable issue kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    NoteOutOfRange,
    InvalidLiteral,
    UnmappedArea,
    NoNotes,
    DuplicateArea,
    MissingName,
    MissingNationalId,
    MissingNote,
    ApproximateAreaMatch,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoteOutOfRange => "NOTE_OUT_OF_RANGE",
            Self::InvalidLiteral => "INVALID_LITERAL",
            Self::UnmappedArea => "UNMAPPED_AREA",
            Self::NoNotes => "NO_NOTES",
            Self::DuplicateArea => "DUPLICATE_AREA",
            Self::MissingName => "MISSING_NAME",
            Self::MissingNationalId => "MISSING_NATIONAL_ID",
            Self::MissingNote => "MISSING_NOTE",
            Self::ApproximateAreaMatch => "APPROXIMATE_AREA_MATCH",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One error or warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: IssueCode,
    /// Row sequence number, when the issue belongs to a row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<u32>,
    /// Area label as detected, when the issue concerns an area.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ValidationIssue {
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            row: None,
            area: None,
            message: message.into(),
            suggestions: Vec::new(),
        }
    }

    pub fn at_row(mut self, row: u32) -> Self {
        self.row = Some(row);
        self
    }

    pub fn for_area(mut self, area: impl Into<String>) -> Self {
        self.area = Some(area.into());
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.code)?;
        if let Some(row) = self.row {
            write!(f, " row {row}")?;
        }
        if let Some(area) = &self.area {
            write!(f, " area {area:?}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Batch counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_students: usize,
    pub students_with_id: usize,
    pub total_notes: usize,
    pub missing_notes: usize,
    pub detected_areas: usize,
    pub mapped_areas: usize,
}

impl BatchStats {
    /// Weighted composite in `[0, 100]`, rounded to two decimals.
    ///
    /// 30% captured ids, 30% present notes, 40% mapped areas. A component
    /// whose denominator is zero contributes nothing.
    pub fn quality_score(&self) -> f64 {
        let id_part = weighted(30.0, self.students_with_id, self.total_students);
        let notes_part = weighted(
            30.0,
            self.total_notes.saturating_sub(self.missing_notes),
            self.total_notes,
        );
        let area_part = weighted(40.0, self.mapped_areas, self.detected_areas);
        ((id_part + notes_part + area_part) * 100.0).round() / 100.0
    }
}

fn weighted(weight: f64, numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        weight * numerator as f64 / denominator as f64
    }
}

/// Full outcome of validating a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// `true` iff `errors` is empty.
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub stats: BatchStats,
    /// Advisory only; never gates a transition.
    pub quality_score: f64,
    /// Detected labels that map to no known area, for manual remediation.
    pub unmapped_areas: Vec<String>,
    /// Detected label to resolved area code.
    pub area_mappings: BTreeMap<String, String>,
}

impl ValidationReport {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            stats: BatchStats::default(),
            quality_score: 0.0,
            unmapped_areas: Vec::new(),
            area_mappings: BTreeMap::new(),
        }
    }

    /// Add an error. Marks the report invalid.
    pub fn add_error(&mut self, issue: ValidationIssue) {
        self.valid = false;
        self.errors.push(issue);
    }

    /// Add a warning (does not affect validity).
    pub fn add_warning(&mut self, issue: ValidationIssue) {
        self.warnings.push(issue);
    }

    /// Count of errors with the given code.
    pub fn count(&self, code: IssueCode) -> usize {
        self.errors.iter().filter(|i| i.code == code).count()
    }

    pub fn warning_count(&self, code: IssueCode) -> usize {
        self.warnings.iter().filter(|i| i.code == code).count()
    }

    /// One-line summary for logs and error messages.
    pub fn summary(&self) -> String {
        format!(
            "{} error(s), {} warning(s), quality {:.2}",
            self.errors.len(),
            self.warnings.len(),
            self.quality_score
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_score_all_zero_denominators() {
        assert_eq!(BatchStats::default().quality_score(), 0.0);
    }

    #[test]
    fn test_quality_score_perfect() {
        let stats = BatchStats {
            total_students: 3,
            students_with_id: 3,
            total_notes: 30,
            missing_notes: 0,
            detected_areas: 10,
            mapped_areas: 10,
        };
        assert_eq!(stats.quality_score(), 100.0);
    }

    #[test]
    fn test_quality_score_weights() {
        let stats = BatchStats {
            total_students: 4,
            students_with_id: 2,
            total_notes: 10,
            missing_notes: 5,
            detected_areas: 4,
            mapped_areas: 1,
        };
        // 30 * 0.5 + 30 * 0.5 + 40 * 0.25
        assert_eq!(stats.quality_score(), 40.0);
    }

    #[test]
    fn test_zero_notes_zeroes_only_that_weight() {
        let stats = BatchStats {
            total_students: 1,
            students_with_id: 1,
            total_notes: 0,
            missing_notes: 0,
            detected_areas: 0,
            mapped_areas: 0,
        };
        assert_eq!(stats.quality_score(), 30.0);
    }

    #[test]
    fn test_add_error_invalidates() {
        let mut report = ValidationReport::ok();
        report.add_warning(ValidationIssue::new(IssueCode::MissingNote, "blank"));
        assert!(report.valid);
        report.add_error(ValidationIssue::new(IssueCode::NoNotes, "empty").at_row(3));
        assert!(!report.valid);
        assert_eq!(report.count(IssueCode::NoNotes), 1);
        assert_eq!(report.warning_count(IssueCode::MissingNote), 1);
    }

    #[test]
    fn test_issue_display() {
        let issue = ValidationIssue::new(IssueCode::NoteOutOfRange, "25 is outside 0-20")
            .at_row(1)
            .for_area("MAT");
        assert_eq!(
            issue.to_string(),
            "[NOTE_OUT_OF_RANGE] row 1 area \"MAT\": 25 is outside 0-20"
        );
    }

    #[test]
    fn test_issue_serialization_skips_empty() {
        let json = serde_json::to_value(ValidationIssue::new(IssueCode::NoNotes, "x")).unwrap();
        assert_eq!(json["code"], "NO_NOTES");
        assert!(json.get("row").is_none());
        assert!(json.get("suggestions").is_none());
    }
}
