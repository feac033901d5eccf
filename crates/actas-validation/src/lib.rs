//! # actas-validation — Academic Data Quality Validator
//!
//! Decides whether a digitized batch of student records is acceptable
//! before the lifecycle engine lets it advance a request.
//!
//! ## Validation Layers
//!
//! 1. **Row identity**: full name present, national id captured (warning).
//! 2. **Area mapping**: every detected subject-area label resolves to a
//!    known institutional area code, exactly or approximately.
//! 3. **Note values**: numeric notes within 0–20, literal grades within the
//!    `AD|A|B|C` scale, exonerations accepted, blanks counted.
//! 4. **Row consistency**: at least one note per row, no area twice.
//!
//! The validator is a pure function of `(batch, catalog, config)`. It holds
//! no locks and can be re-run freely; identical inputs produce identical
//! reports, including issue order.

pub mod areas;
pub mod batch;
pub mod report;
pub mod validator;

pub use areas::{AreaCatalog, AreaMatch, KnownArea};
pub use batch::{AcademicDataBatch, NoteEntry, NoteValue, StudentRow};
pub use report::{BatchStats, IssueCode, ValidationIssue, ValidationReport};
pub use validator::{validate_batch, ValidationConfig};
