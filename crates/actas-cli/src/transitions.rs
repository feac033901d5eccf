//! # Transitions Subcommand
//!
//! Prints the lifecycle table: every event with its source states, target
//! and required capability.

use std::fmt::Write as _;

use anyhow::anyhow;
use clap::Args;

use actas_state::{events_from, EventKind, RequestStatus};

#[derive(Args, Debug)]
pub struct TransitionsArgs {
    /// Only list events that may fire from this status (e.g. `EN_BUSQUEDA`).
    #[arg(long)]
    pub from: Option<String>,
}

pub fn render(args: &TransitionsArgs) -> anyhow::Result<String> {
    let events: Vec<EventKind> = match &args.from {
        Some(raw) => {
            let status = raw
                .trim()
                .to_ascii_uppercase()
                .parse::<RequestStatus>()
                .map_err(|e| anyhow!(e))?;
            events_from(status)
        }
        None => EventKind::ALL.to_vec(),
    };

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<20} {:<32} {:<30} {}",
        "EVENT", "TARGET", "CAPABILITY", "FROM"
    );
    for event in events {
        let sources: Vec<&str> = event.sources().iter().map(|s| s.as_str()).collect();
        let _ = writeln!(
            out,
            "{:<20} {:<32} {:<30} {}",
            event.as_str(),
            event.target().as_str(),
            event.required_capability().code(),
            sources.join(",")
        );
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_table_lists_every_event() {
        let table = render(&TransitionsArgs { from: None }).unwrap();
        assert_eq!(table.lines().count(), 1 + EventKind::ALL.len());
        assert!(table.contains("pagoRechazado"));
    }

    #[test]
    fn filtered_by_status() {
        let table = render(&TransitionsArgs {
            from: Some("en_busqueda".into()),
        })
        .unwrap();
        let events: Vec<&str> = table
            .lines()
            .skip(1)
            .filter_map(|l| l.split_whitespace().next())
            .collect();
        assert_eq!(
            events,
            vec!["actaEncontrada", "actaNoEncontrada", "cancelar", "rechazar"]
        );
    }

    #[test]
    fn terminal_status_has_no_rows() {
        let table = render(&TransitionsArgs {
            from: Some("ENTREGADO".into()),
        })
        .unwrap();
        assert_eq!(table.lines().count(), 1);
    }

    #[test]
    fn unknown_status_is_an_error() {
        assert!(render(&TransitionsArgs {
            from: Some("LIMBO".into())
        })
        .is_err());
    }
}
