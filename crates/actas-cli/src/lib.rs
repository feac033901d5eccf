//! # actas-cli — Operator Command-Line Interface
//!
//! ## Subcommands
//!
//! - `validate`: run the academic data validator on a batch file
//! - `transitions`: print the lifecycle transition table
//! - `remarks`: classify a legacy free-text remarks value
//!
//! Argument parsing lives in `main.rs`; the handlers here only call the
//! domain crates and format their results.

pub mod remarks;
pub mod transitions;
pub mod validate;
