//! Formatted terminal and document output.
//!
//! We keep formatting code in one place so:
//! - the lookup/metrics code stays clean and testable
//! - output changes are localized (the Markdown table feeds the weekly document)

use crate::domain::ReportMetric;
use crate::report::FundRateReport;
use crate::table::{DatedTable, month_day_label};

/// Row headings of the rate table, after the `M/D value` row.
const CHANGE_ROWS: [&str; 3] = ["1-day change", "1-month change", "1-year change"];

const NOT_AVAILABLE: &str = "n/a";

/// Format the run summary (input, table shape, target date).
pub fn format_run_summary(report: &FundRateReport, table: &DatedTable, preamble_rows: usize) -> String {
    let mut out = String::new();

    out.push_str("=== fundrate - Funding Rate Monitor ===\n");
    out.push_str(&format!("Input: {}\n", report.source));
    out.push_str(&format!(
        "Rows: n={} | dated={} | preamble skipped={} | duplicates={}\n",
        table.len(),
        table.index().len(),
        preamble_rows,
        table.index().duplicates(),
    ));
    if let Some(last) = table.last_date() {
        out.push_str(&format!("Latest date in sheet: {last}\n"));
    }
    out.push_str(&format!("Target date: {}\n", report.target_date));
    out.push('\n');

    out
}

/// The four-row rate table as aligned terminal text.
pub fn format_metrics_table(report: &FundRateReport) -> String {
    let rows = table_cells(report);
    let mut widths = vec![0usize; rows[0].len()];
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for (r, row) in rows.iter().enumerate() {
        let mut line = String::new();
        for (i, cell) in row.iter().enumerate() {
            if i == 0 {
                line.push_str(&format!("{cell:<w$}", w = widths[0]));
            } else {
                line.push_str(&format!("  {cell:>w$}", w = widths[i]));
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
        if r == 0 {
            let total: usize = widths.iter().sum::<usize>() + 2 * (widths.len() - 1);
            out.push_str(&"-".repeat(total));
            out.push('\n');
        }
    }

    for (spec, err) in report.failures() {
        out.push_str(&format!("  ({} unavailable) {err}\n", spec.label));
    }

    out
}

/// The rate table as a Markdown table (bold first row and column).
pub fn format_markdown(report: &FundRateReport) -> String {
    let rows = table_cells(report);
    let mut out = String::new();

    out.push_str(&format!("## Funding rates as of {}\n\n", report.target_date));

    for (r, row) in rows.iter().enumerate() {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(c, cell)| {
                if cell.is_empty() {
                    String::new()
                } else if r == 0 || c == 0 {
                    format!("**{cell}**")
                } else {
                    cell.clone()
                }
            })
            .collect();
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
        if r == 0 {
            let sep: Vec<&str> = row
                .iter()
                .enumerate()
                .map(|(c, _)| if c == 0 { ":--" } else { "--:" })
                .collect();
            out.push_str(&format!("| {} |\n", sep.join(" | ")));
        }
    }

    out
}

/// Two fractional digits, the precision every rate is reported at.
pub fn fmt2(v: f64) -> String {
    format!("{v:.2}")
}

fn table_cells(report: &FundRateReport) -> Vec<Vec<String>> {
    let mut header = vec![String::new()];
    header.extend(report.metrics.iter().map(|m| m.spec.label.clone()));

    let value_label = format!("{} value", month_day_label(report.target_date));
    let mut rows = vec![header];
    let pickers: [(String, fn(&ReportMetric) -> f64); 4] = [
        (value_label, |m| m.current),
        (CHANGE_ROWS[0].to_string(), |m| m.delta_day),
        (CHANGE_ROWS[1].to_string(), |m| m.delta_month),
        (CHANGE_ROWS[2].to_string(), |m| m.delta_year),
    ];

    for (label, pick) in pickers {
        let mut row = vec![label];
        for entry in &report.metrics {
            row.push(match &entry.result {
                Ok(m) => fmt2(pick(m)),
                Err(_) => NOT_AVAILABLE.to_string(),
            });
        }
        rows.push(row);
    }

    rows
}
