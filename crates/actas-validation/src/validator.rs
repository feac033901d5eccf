//! # Batch Validator
//!
//! Applies the row, area and note rules to an [`AcademicDataBatch`].
//!
//! ## Rules
//!
//! Errors (block `valid`):
//! - numeric note outside `[0, 20]` or not finite
//! - literal grade outside `AD|A|B|C`
//! - area label with no known code, once per affected row
//! - row with no notes
//! - the same area twice on one row
//! - blank full name
//! - missing national id, only when `require_national_id` is set
//!
//! Warnings:
//! - missing national id (default)
//! - blank note cell
//! - area matched only approximately

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::areas::{normalize, AreaCatalog, AreaMatch};
use crate::batch::{AcademicDataBatch, NoteValue, LITERAL_GRADES};
use crate::report::{BatchStats, IssueCode, ValidationIssue, ValidationReport};

pub const NOTE_MIN: f64 = 0.0;
pub const NOTE_MAX: f64 = 20.0;

/// Institution-level validator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Escalate a missing national id from warning to error.
    #[serde(default)]
    pub require_national_id: bool,
    /// Minimum score (0–100) for an approximate area match.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: u8,
}

fn default_similarity_threshold() -> u8 {
    70
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            require_national_id: false,
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

/// Validate a batch against the institution's known areas.
pub fn validate_batch(
    batch: &AcademicDataBatch,
    catalog: &AreaCatalog,
    config: &ValidationConfig,
) -> ValidationReport {
    let mut report = ValidationReport::ok();
    let mut stats = BatchStats {
        total_students: batch.students.len(),
        ..BatchStats::default()
    };

    // Normalized label -> (first-seen label, match). One lookup per label.
    let mut resolved: BTreeMap<String, (String, AreaMatch)> = BTreeMap::new();
    let mut unmapped: BTreeSet<String> = BTreeSet::new();

    for row in &batch.students {
        if row.full_name.trim().is_empty() {
            report.add_error(
                ValidationIssue::new(IssueCode::MissingName, "student full name is blank")
                    .at_row(row.sequence),
            );
        }

        if row.has_national_id() {
            stats.students_with_id += 1;
        } else {
            let issue = ValidationIssue::new(
                IssueCode::MissingNationalId,
                "national id was not captured",
            )
            .at_row(row.sequence);
            if config.require_national_id {
                report.add_error(issue);
            } else {
                report.add_warning(issue);
            }
        }

        if row.notes.is_empty() {
            report.add_error(
                ValidationIssue::new(IssueCode::NoNotes, "row has no notes recorded")
                    .at_row(row.sequence),
            );
            continue;
        }

        let mut seen_on_row: HashSet<String> = HashSet::new();

        for note in &row.notes {
            stats.total_notes += 1;

            let key = normalize(&note.area);
            let (first_label, matched) = resolved.entry(key.clone()).or_insert_with(|| {
                let m = catalog.map(&note.area, config.similarity_threshold);
                if let AreaMatch::Approximate {
                    code,
                    score,
                    suggestions,
                } = &m
                {
                    report.add_warning(
                        ValidationIssue::new(
                            IssueCode::ApproximateAreaMatch,
                            format!("mapped to {code} with similarity {score}"),
                        )
                        .for_area(note.area.trim())
                        .with_suggestions(suggestions.clone()),
                    );
                }
                (note.area.trim().to_string(), m)
            });

            let dedup_key = match matched.code() {
                Some(code) => code.to_string(),
                None => {
                    unmapped.insert(first_label.clone());
                    let suggestions = match matched {
                        AreaMatch::Unmapped { suggestions } => suggestions.clone(),
                        _ => Vec::new(),
                    };
                    report.add_error(
                        ValidationIssue::new(
                            IssueCode::UnmappedArea,
                            "area does not match any known area code",
                        )
                        .at_row(row.sequence)
                        .for_area(note.area.trim())
                        .with_suggestions(suggestions),
                    );
                    key
                }
            };

            if !seen_on_row.insert(dedup_key) {
                report.add_error(
                    ValidationIssue::new(
                        IssueCode::DuplicateArea,
                        "area appears more than once for this student",
                    )
                    .at_row(row.sequence)
                    .for_area(note.area.trim()),
                );
            }

            check_value(&mut report, &mut stats, row.sequence, &note.area, &note.value);
        }
    }

    stats.detected_areas = resolved.len();
    stats.mapped_areas = resolved
        .values()
        .filter(|(_, m)| m.code().is_some())
        .count();

    report.area_mappings = resolved
        .into_values()
        .filter_map(|(label, m)| m.code().map(|code| (label, code.to_string())))
        .collect();
    report.unmapped_areas = unmapped.into_iter().collect();
    report.quality_score = stats.quality_score();
    report.stats = stats;

    tracing::debug!(
        batch_id = %batch.id,
        valid = report.valid,
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        quality = report.quality_score,
        "academic batch validated"
    );

    report
}

fn check_value(
    report: &mut ValidationReport,
    stats: &mut BatchStats,
    row: u32,
    area: &str,
    value: &NoteValue,
) {
    match value {
        NoteValue::Numeric(n) => {
            if !n.is_finite() || *n < NOTE_MIN || *n > NOTE_MAX {
                report.add_error(
                    ValidationIssue::new(
                        IssueCode::NoteOutOfRange,
                        format!("note {n} is outside {NOTE_MIN}-{NOTE_MAX}"),
                    )
                    .at_row(row)
                    .for_area(area.trim()),
                );
            }
        }
        NoteValue::Literal(grade) => {
            let upper = grade.trim().to_ascii_uppercase();
            if !LITERAL_GRADES.contains(&upper.as_str()) {
                report.add_error(
                    ValidationIssue::new(
                        IssueCode::InvalidLiteral,
                        format!("literal grade {grade:?} is not one of AD, A, B, C"),
                    )
                    .at_row(row)
                    .for_area(area.trim()),
                );
            }
        }
        NoteValue::Exonerated => {}
        NoteValue::Missing => {
            stats.missing_notes += 1;
            report.add_warning(
                ValidationIssue::new(IssueCode::MissingNote, "note cell is blank")
                    .at_row(row)
                    .for_area(area.trim()),
            );
        }
    }
}
