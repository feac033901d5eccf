//! # Validate Subcommand
//!
//! Runs the academic data validator on a batch file without touching any
//! request, for checking a digitization before it is uploaded.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use actas_validation::{
    validate_batch, AcademicDataBatch, AreaCatalog, KnownArea, ValidationConfig, ValidationReport,
};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// JSON file holding an academic data batch.
    pub batch: PathBuf,

    /// YAML or JSON list of `{code, name}` known areas. Defaults to the
    /// standard secondary-level catalog.
    #[arg(long)]
    pub areas: Option<PathBuf>,

    /// Treat a missing national id as an error instead of a warning.
    #[arg(long)]
    pub require_national_id: bool,

    /// Minimum score (0-100) for an approximate area match.
    #[arg(long, default_value_t = 70, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub similarity_threshold: u8,

    /// Print the full report as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &ValidateArgs) -> anyhow::Result<ValidationReport> {
    let text = std::fs::read_to_string(&args.batch)
        .with_context(|| format!("reading {}", args.batch.display()))?;
    let batch: AcademicDataBatch = serde_json::from_str(&text)
        .with_context(|| format!("parsing batch {}", args.batch.display()))?;

    let catalog = match &args.areas {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let areas: Vec<KnownArea> = serde_yaml::from_str(&text)
                .with_context(|| format!("parsing areas {}", path.display()))?;
            AreaCatalog::new(areas)
        }
        None => AreaCatalog::standard(),
    };
    let config = ValidationConfig {
        require_national_id: args.require_national_id,
        similarity_threshold: args.similarity_threshold,
    };

    tracing::debug!(
        students = batch.students.len(),
        areas = catalog.areas().len(),
        "validating batch"
    );
    Ok(validate_batch(&batch, &catalog, &config))
}

/// Human-readable report.
pub fn render(report: &ValidationReport) -> String {
    let mut out = String::new();
    let verdict = if report.valid { "VALID" } else { "INVALID" };
    let _ = writeln!(out, "{verdict}  quality {:.2}/100", report.quality_score);
    let _ = writeln!(
        out,
        "students {}  with id {}  notes {}  missing {}  areas {}/{} mapped",
        report.stats.total_students,
        report.stats.students_with_id,
        report.stats.total_notes,
        report.stats.missing_notes,
        report.stats.mapped_areas,
        report.stats.detected_areas,
    );
    for (label, issues) in [("error", &report.errors), ("warning", &report.warnings)] {
        for issue in issues {
            let _ = writeln!(out, "{label}: {issue}");
        }
    }
    if !report.unmapped_areas.is_empty() {
        let _ = writeln!(out, "unmapped: {}", report.unmapped_areas.join(", "));
    }
    out
}
