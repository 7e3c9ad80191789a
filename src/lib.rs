//! `fund-rates` library crate.
//!
//! The binary (`fundrate`) is a thin wrapper around this library so that:
//!
//! - the table, lookup and metrics logic is testable without spawning processes
//! - the report pipeline is shared by the CLI and the TUI

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod metrics;
pub mod plot;
pub mod report;
pub mod table;
pub mod tui;
