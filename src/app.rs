//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - resolves the input (flag, `FUNDRATE_FILE`, picker, or demo data)
//! - runs the report pipeline
//! - prints the rate table and chart
//! - writes optional exports

use std::io::IsTerminal;
use std::path::PathBuf;

use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, InputArgs, ReportArgs, SeriesArgs};
use crate::domain::{DEFAULT_Y_BOUNDS, InputSource, ReportConfig};
use crate::error::AppError;

pub mod pipeline;

/// Environment variable naming the default input file.
pub const INPUT_ENV: &str = "FUNDRATE_FILE";

/// Entry point for the `fundrate` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    // `fundrate` and `fundrate -f rates.xlsx` behave like `fundrate tui ...`.
    // Clap requires a subcommand name, so argv is rewritten before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    let tui = matches!(cli.command, Command::Tui(_));
    init_tracing(cli.verbose, tui);

    match cli.command {
        Command::Report(args) => handle_report(args),
        Command::Series(args) => handle_series(args),
        Command::Tui(args) => handle_tui(args),
    }
}

/// Log to stderr. `RUST_LOG` wins; otherwise `warn`, or `debug` with
/// `--verbose`. The TUI owns the terminal, so it stays quiet by default.
fn init_tracing(verbose: bool, tui: bool) {
    let default = match (verbose, tui) {
        (true, _) => "debug",
        (false, true) => "off",
        (false, false) => "warn",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_report(args: ReportArgs) -> Result<(), AppError> {
    let config = report_config_from_args(&args)?;
    let run = pipeline::run_report(&config, Local::now().naive_local())?;
    let report = &run.analysis.report;

    print!(
        "{}",
        crate::report::format_run_summary(report, &run.loaded.table, run.loaded.preamble_rows)
    );
    println!("{}", crate::report::format_metrics_table(report));

    if config.plot {
        let plot = crate::plot::render_ascii_chart(
            &run.analysis.chart,
            config.plot_width,
            config.plot_height,
            config.y_bounds,
        );
        println!("{plot}");
    }

    if let Some(path) = &config.export_csv {
        crate::io::export::write_report_csv(path, report)?;
        tracing::info!(path = %path.display(), "Wrote report CSV.");
    }
    if let Some(path) = &config.export_json {
        crate::io::export::write_report_json(path, report)?;
        tracing::info!(path = %path.display(), "Wrote report JSON.");
    }
    if let Some(path) = &config.export_markdown {
        crate::io::export::write_markdown(path, report)?;
        tracing::info!(path = %path.display(), "Wrote Markdown table.");
    }
    if let Some(path) = &config.export_series {
        crate::io::export::write_series_csv(path, &run.analysis.chart)?;
        tracing::info!(path = %path.display(), "Wrote series CSV.");
    }

    Ok(())
}

fn handle_series(args: SeriesArgs) -> Result<(), AppError> {
    let mut config = base_config(&args.input)?;
    config.plot = false;
    config.export_series = Some(args.output.clone());

    let run = pipeline::run_report(&config, Local::now().naive_local())?;
    if let Some(path) = &config.export_series {
        crate::io::export::write_series_csv(path, &run.analysis.chart)?;
    }

    let points: usize = run.analysis.chart.series.iter().map(|s| s.points.len()).sum();
    println!(
        "Wrote {points} point(s) for {} series before {} to {}",
        run.analysis.chart.series.len(),
        run.analysis.target_date,
        args.output.display()
    );
    Ok(())
}

fn handle_tui(args: InputArgs) -> Result<(), AppError> {
    let config = base_config(&args)?;
    crate::tui::run(config)
}

pub fn report_config_from_args(args: &ReportArgs) -> Result<ReportConfig, AppError> {
    let mut config = base_config(&args.input)?;
    config.plot = args.plot && !args.no_plot;
    config.plot_width = args.width;
    config.plot_height = args.height;
    config.export_csv = args.export.clone();
    config.export_json = args.export_json.clone();
    config.export_markdown = args.markdown.clone();
    config.export_series = args.export_series.clone();
    Ok(config)
}

fn base_config(args: &InputArgs) -> Result<ReportConfig, AppError> {
    Ok(ReportConfig {
        input: resolve_input(args, std::env::var_os(INPUT_ENV).map(PathBuf::from))?,
        target_date: args.date,
        cutoff_hour: args.cutoff_hour,
        preamble_rows: args.skip_rows,
        y_bounds: args.fixed_y.then_some(DEFAULT_Y_BOUNDS),
        ..ReportConfig::default()
    })
}

/// `--demo`, then `-f`, then the environment, then the interactive picker.
fn resolve_input(args: &InputArgs, env_file: Option<PathBuf>) -> Result<InputSource, AppError> {
    if args.demo {
        return Ok(InputSource::Demo { seed: args.seed });
    }
    if let Some(path) = args.file.as_deref() {
        return crate::cli::picker::validate_input_path(path).map(InputSource::File);
    }
    if let Some(path) = env_file {
        tracing::debug!(path = %path.display(), "Using input from {INPUT_ENV}.");
        return crate::cli::picker::validate_input_path(&path).map(InputSource::File);
    }
    if std::io::stdin().is_terminal() {
        return crate::cli::picker::prompt_for_input_path().map(InputSource::File);
    }
    Err(AppError::new(
        2,
        format!("No input given. Pass -f <file>, set {INPUT_ENV}, or use --demo."),
    ))
}

/// Rewrite argv so `fundrate` defaults to `fundrate tui`.
///
/// - `fundrate`                     -> `fundrate tui`
/// - `fundrate -f rates.xlsx ...`   -> `fundrate tui -f rates.xlsx ...`
/// - `fundrate --help/--version/-h` -> unchanged
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "report" | "series" | "tui");
    if is_subcommand {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
    }
    argv
}
