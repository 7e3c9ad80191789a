//! Reporting utilities: metric tables, chart series, and formatted output.

use chrono::NaiveDate;

use crate::domain::{MetricSpec, PlotSpec, ReportMetric, SheetLayout};
use crate::error::LookupError;
use crate::metrics::{MetricsEngine, PlotWindow};
use crate::table::DatedTable;

pub mod format;

pub use format::*;

/// One reported column: its spec and either the metric or why it failed.
#[derive(Debug, Clone)]
pub struct MetricEntry {
    pub spec: MetricSpec,
    pub result: Result<ReportMetric, LookupError>,
}

/// The numbers behind the rate table for one target date.
#[derive(Debug, Clone)]
pub struct FundRateReport {
    pub target_date: NaiveDate,
    pub source: String,
    pub metrics: Vec<MetricEntry>,
}

impl FundRateReport {
    pub fn successes(&self) -> impl Iterator<Item = &ReportMetric> {
        self.metrics.iter().filter_map(|m| m.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&MetricSpec, &LookupError)> {
        self.metrics
            .iter()
            .filter_map(|m| m.result.as_ref().err().map(|e| (&m.spec, e)))
    }
}

/// A plotted column and its `(date, value)` points.
#[derive(Debug, Clone)]
pub struct ChartSeries {
    pub spec: PlotSpec,
    pub points: Vec<(NaiveDate, f64)>,
}

/// Everything a renderer needs to draw the rate chart.
#[derive(Debug, Clone)]
pub struct ChartData {
    pub window: PlotWindow,
    pub series: Vec<ChartSeries>,
}

impl ChartData {
    /// Points of every series that fall inside the display window.
    pub fn visible(&self) -> Vec<Vec<(NaiveDate, f64)>> {
        self.series
            .iter()
            .map(|s| {
                s.points
                    .iter()
                    .copied()
                    .filter(|(d, _)| self.window.contains(*d))
                    .collect()
            })
            .collect()
    }
}

pub fn build_report(table: &DatedTable, target: NaiveDate, layout: &SheetLayout, source: &str) -> FundRateReport {
    let engine = MetricsEngine::new(table);
    let metrics = engine
        .report_metrics(target, &layout.metrics)
        .into_iter()
        .map(|(spec, result)| MetricEntry { spec, result })
        .collect();

    FundRateReport {
        target_date: target,
        source: source.to_string(),
        metrics,
    }
}

pub fn build_chart(table: &DatedTable, target: NaiveDate, layout: &SheetLayout) -> Result<ChartData, LookupError> {
    let window = PlotWindow::select(table, target)?;
    let mut series = Vec::with_capacity(layout.plots.len());
    for spec in &layout.plots {
        let points = window.series(table, spec.column)?;
        series.push(ChartSeries {
            spec: spec.clone(),
            points,
        });
    }
    Ok(ChartData { window, series })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Cell, RawTable};
    use crate::table::dated::tests::{col, ymd};

    fn small_table() -> DatedTable {
        let mut rows = Vec::new();
        let mut d = ymd(2022, 1, 3);
        let mut i = 0.0;
        while d <= ymd(2023, 4, 28) {
            rows.push(vec![Cell::Date(d), Cell::Number(2.0 + i * 0.001), Cell::Empty]);
            d = d.succ_opt().unwrap();
            i += 1.0;
        }
        DatedTable::from_raw(RawTable::new(rows), 0, col("A"))
    }

    fn layout() -> SheetLayout {
        SheetLayout {
            date_column: col("A"),
            rolling: Vec::new(),
            metrics: vec![
                MetricSpec { column: col("B"), label: "rate".into() },
                MetricSpec { column: col("C"), label: "blank".into() },
            ],
            plots: vec![PlotSpec { column: col("B"), label: "rate".into(), dashed: false }],
        }
    }

    #[test]
    fn report_keeps_failed_columns() {
        let t = small_table();
        let report = build_report(&t, ymd(2023, 4, 28), &layout(), "test");
        assert_eq!(report.successes().count(), 1);
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0.label, "blank");
        assert!(matches!(failures[0].1, LookupError::UndefinedValue { .. }));
    }

    #[test]
    fn chart_points_precede_target() {
        let t = small_table();
        let chart = build_chart(&t, ymd(2023, 4, 28), &layout()).unwrap();
        let pts = &chart.series[0].points;
        assert_eq!(pts.last().unwrap().0, ymd(2023, 4, 27));
        assert_eq!(chart.visible()[0].len(), pts.len());
    }
}
