//! Export report values and chart series.
//!
//! The exports are meant to be easy to consume in spreadsheets, document
//! templates, or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::ReportMetric;
use crate::error::AppError;
use crate::report::{ChartData, FundRateReport, fmt2, format_markdown};

/// JSON shape of an exported report.
#[derive(Debug, Serialize)]
struct ReportFile<'a> {
    tool: &'static str,
    target_date: NaiveDate,
    source: &'a str,
    metrics: Vec<&'a ReportMetric>,
    failures: Vec<FailureEntry>,
}

#[derive(Debug, Serialize)]
struct FailureEntry {
    column: String,
    label: String,
    error: String,
}

/// Write the metric table as CSV: one row per column, values at 2 decimals.
pub fn write_report_csv(path: &Path, report: &FundRateReport) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    writer
        .write_record(["target_date", "column", "label", "current", "delta_1d", "delta_1m", "delta_1y", "error"])
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    let date = report.target_date.to_string();
    for entry in &report.metrics {
        let column = entry.spec.column.to_string();
        let record: Vec<String> = match &entry.result {
            Ok(m) => vec![
                date.clone(),
                column,
                m.label.clone(),
                fmt2(m.current),
                fmt2(m.delta_day),
                fmt2(m.delta_month),
                fmt2(m.delta_year),
                String::new(),
            ],
            Err(e) => vec![
                date.clone(),
                column,
                entry.spec.label.clone(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                e.to_string(),
            ],
        };
        writer
            .write_record(&record)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

/// Write the report (unrounded values) as pretty JSON.
pub fn write_report_json(path: &Path, report: &FundRateReport) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create report JSON '{}': {e}", path.display())))?;

    let doc = ReportFile {
        tool: "fundrate",
        target_date: report.target_date,
        source: &report.source,
        metrics: report.successes().collect(),
        failures: report
            .failures()
            .map(|(spec, err)| FailureEntry {
                column: spec.column.to_string(),
                label: spec.label.clone(),
                error: err.to_string(),
            })
            .collect(),
    };

    serde_json::to_writer_pretty(file, &doc)
        .map_err(|e| AppError::new(2, format!("Failed to write report JSON: {e}")))?;
    Ok(())
}

/// Write the Markdown rate table.
pub fn write_markdown(path: &Path, report: &FundRateReport) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create Markdown '{}': {e}", path.display())))?;
    file.write_all(format_markdown(report).as_bytes())
        .map_err(|e| AppError::new(2, format!("Failed to write Markdown: {e}")))?;
    Ok(())
}

/// Write chart series in long format: `date,series,value`.
///
/// All rows before the target date are written; the display window bounds
/// are left to the consumer.
pub fn write_series_csv(path: &Path, chart: &ChartData) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create series CSV '{}': {e}", path.display())))?;

    writer
        .write_record(["date", "column", "series", "value"])
        .map_err(|e| AppError::new(2, format!("Failed to write series CSV header: {e}")))?;

    for series in &chart.series {
        let column = series.spec.column.to_string();
        for (date, value) in &series.points {
            writer
                .write_record([
                    date.to_string().as_str(),
                    column.as_str(),
                    series.spec.label.as_str(),
                    format!("{value:.4}").as_str(),
                ])
                .map_err(|e| AppError::new(2, format!("Failed to write series CSV row: {e}")))?;
        }
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush series CSV: {e}")))?;
    Ok(())
}
