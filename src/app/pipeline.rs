//! Shared report pipeline used by the CLI and TUI front-ends.
//!
//! load (workbook, CSV or demo) -> preamble skip + date index -> rolling
//! means merged as derived columns -> target resolution -> metrics + chart
//!
//! The front-ends only differ in presentation (printing vs widgets).

use chrono::{NaiveDate, NaiveDateTime};

use crate::data::{SampleConfig, generate_workbook};
use crate::domain::{InputSource, ReportConfig, SheetLayout};
use crate::error::AppError;
use crate::io::ingest::{IngestedTable, load_table};
use crate::metrics::MetricsEngine;
use crate::report::{ChartData, FundRateReport, build_chart, build_report};
use crate::table::{DatedTable, reference_date};

/// A prepared table: preamble dropped, dates indexed, rolling columns filled.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub source: String,
    pub sheet: Option<String>,
    pub preamble_rows: usize,
    pub table: DatedTable,
}

/// Report and chart for one target date.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub target_date: NaiveDate,
    pub report: FundRateReport,
    pub chart: ChartData,
}

/// All computed outputs of a single `fundrate report` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub loaded: LoadedTable,
    pub analysis: Analysis,
}

/// Execute the full pipeline. `now` is local wall-clock time, used for the
/// default target date.
pub fn run_report(config: &ReportConfig, now: NaiveDateTime) -> Result<RunOutput, AppError> {
    let reference = reference_date(now, config.cutoff_hour);
    let loaded = load(config, reference)?;
    let target = resolve_target(&loaded.table, config.target_date, reference)?;
    let analysis = analyze(&loaded, target, &config.layout)?;
    Ok(RunOutput { loaded, analysis })
}

/// Read the configured input and prepare it for queries.
///
/// `reference` is the last day generated for `--demo` when no explicit
/// target date is given.
pub fn load(config: &ReportConfig, reference: NaiveDate) -> Result<LoadedTable, AppError> {
    let ingest = match &config.input {
        InputSource::File(path) => load_table(path)?,
        InputSource::Demo { seed } => {
            let end = config.target_date.unwrap_or(reference);
            let raw = generate_workbook(&SampleConfig::ending_at(end, *seed))?;
            IngestedTable {
                raw,
                source: format!("demo (seed {seed})"),
                sheet: None,
            }
        }
    };

    prepare(ingest, config.preamble_rows, &config.layout)
}

/// Skip the preamble, index dates, and merge the rolling-mean columns.
pub fn prepare(ingest: IngestedTable, preamble_rows: usize, layout: &SheetLayout) -> Result<LoadedTable, AppError> {
    let IngestedTable { raw, source, sheet } = ingest;

    let table = DatedTable::from_raw(raw, preamble_rows, layout.date_column);
    if table.index().is_empty() {
        return Err(AppError::new(
            3,
            format!(
                "No dated rows in column {} after skipping {preamble_rows} leading row(s).",
                layout.date_column
            ),
        ));
    }

    let derived = MetricsEngine::new(&table).rolling_means(&layout.rolling)?;
    let table = table.with_derived(&derived);

    Ok(LoadedTable {
        source,
        sheet,
        preamble_rows,
        table,
    })
}

/// Pick the row the report is about.
///
/// An explicit date must be indexed exactly. The implicit reference date
/// falls back to the most recent indexed day within the fallback window, so
/// weekend and holiday runs still report.
pub fn resolve_target(
    table: &DatedTable,
    explicit: Option<NaiveDate>,
    reference: NaiveDate,
) -> Result<NaiveDate, AppError> {
    if let Some(date) = explicit {
        let (matched, _) = table.resolve(date, true)?;
        return Ok(matched);
    }

    let (matched, _) = table.resolve(reference, false)?;
    if matched != reference {
        tracing::info!(%reference, %matched, "Reference date not in table; using previous indexed date.");
    }
    Ok(matched)
}

/// Build report metrics and chart series for an indexed target date.
pub fn analyze(loaded: &LoadedTable, target: NaiveDate, layout: &SheetLayout) -> Result<Analysis, AppError> {
    let report = build_report(&loaded.table, target, layout, &loaded.source);
    let chart = build_chart(&loaded.table, target, layout)?;
    tracing::debug!(
        %target,
        metrics_ok = report.successes().count(),
        metrics_failed = report.failures().count(),
        plotted_rows = chart.window.stop_row,
        "Analysis complete."
    );
    Ok(Analysis {
        target_date: target,
        report,
        chart,
    })
}
