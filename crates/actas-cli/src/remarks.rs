//! # Remarks Subcommand
//!
//! Shows how a legacy remarks column will be read on import: empty,
//! prose kept verbatim, or a structured record from which an applicant
//! context may be rebuilt.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Args;

use actas_state::legacy::LegacyRecord;
use actas_state::{parse_remarks, LegacyRemarks};

#[derive(Args, Debug)]
pub struct RemarksArgs {
    /// Remarks text. Mutually exclusive with `--file`.
    pub text: Option<String>,

    /// Read the remarks from a file.
    #[arg(long, conflicts_with = "text")]
    pub file: Option<PathBuf>,
}

pub fn run(args: &RemarksArgs) -> anyhow::Result<String> {
    let text = match (&args.text, &args.file) {
        (Some(text), None) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        _ => bail!("pass the remarks text or --file"),
    };
    Ok(describe(&parse_remarks(&text)))
}

pub fn describe(remarks: &LegacyRemarks) -> String {
    match remarks {
        LegacyRemarks::Empty => "empty\n".to_string(),
        LegacyRemarks::Prose(text) => format!("prose: {text}\n"),
        LegacyRemarks::Structured(record) => describe_record(record),
    }
}

fn describe_record(record: &LegacyRecord) -> String {
    let mut out = String::from("structured\n");
    if let Some(academic) = &record.academic {
        let _ = writeln!(
            out,
            "  school: {} ({})",
            academic.school_name.as_deref().unwrap_or("?"),
            academic
                .last_year_attended
                .map(|y| y.to_string())
                .unwrap_or_else(|| "?".into())
        );
    }
    if let Some(guardian) = &record.guardian {
        let _ = writeln!(out, "  guardian: {}", guardian.full_name());
    }
    if let Some(search) = &record.search {
        let outcome = match search.found() {
            Some(true) => "found",
            Some(false) => "not found",
            None => "unknown",
        };
        let _ = writeln!(out, "  search: {outcome}");
    }
    let context = if record.applicant_context().is_some() {
        "complete"
    } else {
        "incomplete"
    };
    let _ = writeln!(out, "  applicant context: {context}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn prose_is_echoed() {
        let out = run(&RemarksArgs {
            text: Some("Derivado por ventanilla".into()),
            file: None,
        })
        .unwrap();
        assert_eq!(out, "prose: Derivado por ventanilla\n");
    }

    #[test]
    fn structured_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{"datosAcademicos": {"departamento": "Junin", "provincia": "Huancayo",
                "distrito": "Chilca", "nombreColegio": "IE Andres Caceres",
                "ultimoAnioCursado": 1990, "nivel": "PRIMARIA"},
                "busquedaActa": {"resultado": "NO_ENCONTRADA"}}"#,
        )
        .unwrap();
        let out = run(&RemarksArgs {
            text: None,
            file: Some(file.path().to_path_buf()),
        })
        .unwrap();
        assert!(out.starts_with("structured"));
        assert!(out.contains("IE Andres Caceres (1990)"));
        assert!(out.contains("search: not found"));
        assert!(out.contains("applicant context: complete"));
    }

    #[test]
    fn blank_is_empty() {
        assert_eq!(describe(&parse_remarks("  ")), "empty\n");
    }

    #[test]
    fn no_input_is_an_error() {
        assert!(run(&RemarksArgs {
            text: None,
            file: None
        })
        .is_err());
    }
}
