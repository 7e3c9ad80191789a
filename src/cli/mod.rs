//! Command-line parsing for the funding-rate monitor.
//!
//! Argument parsing and command dispatch live here, away from the table and
//! metrics code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::domain::{DEFAULT_CUTOFF_HOUR, DEFAULT_PREAMBLE_ROWS};

pub mod picker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "fundrate", version, about = "Funding-rate monitor (OMO / DR007 / R007)")]
pub struct Cli {
    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the rate table for a date, optionally plot and export.
    Report(ReportArgs),
    /// Export the chart series (rows before the target date) as CSV.
    Series(SeriesArgs),
    /// Launch the interactive TUI.
    ///
    /// Uses the same pipeline as `fundrate report`, rendered with Ratatui.
    Tui(InputArgs),
}

/// Where the table comes from and how to read it.
#[derive(Debug, Parser, Clone)]
pub struct InputArgs {
    /// Workbook (.xlsx/.xls/.ods) or CSV file. Falls back to `FUNDRATE_FILE`.
    #[arg(short = 'f', long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Use a seeded synthetic workbook instead of a file.
    #[arg(long, conflicts_with = "file")]
    pub demo: bool,

    /// Random seed for `--demo`.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Target date (YYYY-MM-DD). Defaults to today, or yesterday before the cutoff hour.
    #[arg(short = 'd', long, value_name = "YYYY-MM-DD")]
    pub date: Option<NaiveDate>,

    /// Local hour before which the default target is yesterday.
    #[arg(long, default_value_t = DEFAULT_CUTOFF_HOUR, value_parser = clap::value_parser!(u32).range(0..=24))]
    pub cutoff_hour: u32,

    /// Leading rows to drop (header + metadata rows).
    #[arg(long, default_value_t = DEFAULT_PREAMBLE_ROWS)]
    pub skip_rows: usize,

    /// Fix the chart y-axis to 1.0..3.7 instead of autoscaling.
    #[arg(long)]
    pub fixed_y: bool,
}

/// Options for `fundrate report`.
#[derive(Debug, Parser, Clone)]
pub struct ReportArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Render an ASCII chart in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal chart.
    #[arg(long)]
    pub no_plot: bool,

    /// Chart width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Chart height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export the rate table to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the rate table to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,

    /// Write the rate table as Markdown.
    #[arg(long)]
    pub markdown: Option<PathBuf>,

    /// Export the chart series as CSV (same output as `fundrate series`).
    #[arg(long = "export-series")]
    pub export_series: Option<PathBuf>,
}

/// Options for `fundrate series`.
#[derive(Debug, Parser, Clone)]
pub struct SeriesArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Output CSV path.
    #[arg(short = 'o', long, value_name = "CSV")]
    pub output: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_flags_parse() {
        let cli = Cli::parse_from([
            "fundrate", "report", "-f", "rates.xlsx", "--date", "2023-04-28", "--no-plot", "--skip-rows", "4",
        ]);
        let Command::Report(args) = cli.command else {
            panic!("expected report");
        };
        assert_eq!(args.input.file, Some(PathBuf::from("rates.xlsx")));
        assert_eq!(args.input.date, NaiveDate::from_ymd_opt(2023, 4, 28));
        assert_eq!(args.input.skip_rows, 4);
        assert_eq!(args.input.cutoff_hour, 12);
        assert!(args.no_plot);
    }

    #[test]
    fn demo_conflicts_with_file() {
        let res = Cli::try_parse_from(["fundrate", "report", "--demo", "-f", "x.csv"]);
        assert!(res.is_err());
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::parse_from(["fundrate", "series", "--demo", "-o", "out.csv", "-v"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Series(_)));
    }

    #[test]
    fn bad_date_is_rejected() {
        assert!(Cli::try_parse_from(["fundrate", "report", "--date", "2023-02-30"]).is_err());
    }
}
