//! # actas CLI Entry Point

use std::process::ExitCode;

use clap::Parser;

/// Operator toolchain for the certificate request engine.
#[derive(Parser, Debug)]
#[command(name = "actas", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Validate a digitized academic batch offline.
    Validate(actas_cli::validate::ValidateArgs),
    /// Print the lifecycle transition table.
    Transitions(actas_cli::transitions::TransitionsArgs),
    /// Classify a legacy remarks value.
    Remarks(actas_cli::remarks::RemarksArgs),
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate(args) => {
            let report = actas_cli::validate::run(&args)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", actas_cli::validate::render(&report));
            }
            Ok(if report.valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Transitions(args) => {
            print!("{}", actas_cli::transitions::render(&args)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Remarks(args) => {
            print!("{}", actas_cli::remarks::run(&args)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
