//! Derived metrics over a `DatedTable`.
//!
//! The engine never writes into the table it reads. Rolling means come back
//! as `DerivedColumns`, which the caller merges with `DatedTable::with_derived`
//! before running point and delta queries against the merged table.

use chrono::NaiveDate;

use crate::domain::{ColumnId, MetricSpec, ReportMetric, RollingSpec, WINDOW_SIZE};
use crate::error::LookupError;
use crate::table::{DatedTable, DerivedColumns, minus_days, minus_months};

pub mod rolling;
pub mod window;

pub use rolling::*;
pub use window::*;

/// Current value of a column and its change against three earlier dates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deltas {
    pub current: f64,
    pub delta_day: f64,
    pub delta_month: f64,
    pub delta_year: f64,
}

pub struct MetricsEngine<'a> {
    table: &'a DatedTable,
    window: usize,
}

impl<'a> MetricsEngine<'a> {
    pub fn new(table: &'a DatedTable) -> Self {
        Self {
            table,
            window: WINDOW_SIZE,
        }
    }

    /// Compute every rolling spec in one forward pass per column.
    ///
    /// A spec may read a column produced by an earlier spec in the list.
    pub fn rolling_means(&self, specs: &[RollingSpec]) -> Result<DerivedColumns, LookupError> {
        let mut derived = DerivedColumns::new();

        for spec in specs {
            let source = match derived.get(spec.source) {
                Some(values) => values.to_vec(),
                None => self.table.column_values(spec.source)?,
            };
            let means = trailing_mean(&source, self.window);

            let undefined = means.iter().skip(self.window).filter(|v| v.is_none()).count();
            if undefined > 0 {
                tracing::debug!(
                    source = %spec.source,
                    target = %spec.target,
                    undefined,
                    "Rolling mean left rows undefined because of missing inputs."
                );
            }

            if let Some(rounded) = spec.rounded {
                derived.push(rounded, means.iter().map(|v| v.map(round2)).collect());
            }
            derived.push(spec.target, means);
        }

        Ok(derived)
    }

    /// `(current, current - 1 day, current - 1 month, current - 1 year)`.
    ///
    /// The target date must exist exactly; the earlier dates use fallback
    /// lookups so weekends and holidays resolve to the previous trading day.
    pub fn deltas(&self, target: NaiveDate, column: ColumnId) -> Result<Deltas, LookupError> {
        let current = self.table.get_number(target, column, true)?;

        let out_of_range = |offset| LookupError::OffsetOutOfRange { date: target, offset };
        let day = minus_days(target, 1).ok_or_else(|| out_of_range("1 day"))?;
        let month = minus_months(target, 1).ok_or_else(|| out_of_range("1 month"))?;
        let year = minus_months(target, 12).ok_or_else(|| out_of_range("12 months"))?;

        let prev_day = self.table.get_number(day, column, false)?;
        let prev_month = self.table.get_number(month, column, false)?;
        let prev_year = self.table.get_number(year, column, false)?;

        Ok(Deltas {
            current,
            delta_day: current - prev_day,
            delta_month: current - prev_month,
            delta_year: current - prev_year,
        })
    }

    /// One report entry per metric spec; a failed column does not affect the others.
    pub fn report_metrics(
        &self,
        target: NaiveDate,
        specs: &[MetricSpec],
    ) -> Vec<(MetricSpec, Result<ReportMetric, LookupError>)> {
        specs
            .iter()
            .map(|spec| {
                let result = self.deltas(target, spec.column).map(|d| ReportMetric {
                    column: spec.column,
                    label: spec.label.clone(),
                    current: d.current,
                    delta_day: d.delta_day,
                    delta_month: d.delta_month,
                    delta_year: d.delta_year,
                });
                if let Err(err) = &result {
                    tracing::warn!(column = %spec.column, %err, "Metric lookup failed.");
                }
                (spec.clone(), result)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Cell, RawTable};
    use crate::table::dated::tests::{col, weekday_table, ymd};

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn rolling_means_match_prior_window() {
        let t = weekday_table(ymd(2023, 1, 2), ymd(2023, 2, 28));
        let engine = MetricsEngine::new(&t);
        let specs = [RollingSpec {
            source: col("B"),
            target: col("C"),
            rounded: Some(col("D")),
        }];
        let derived = engine.rolling_means(&specs).unwrap();
        let means = derived.get(col("C")).unwrap();
        assert!(means[..7].iter().all(Option::is_none));
        for (i, m) in means.iter().enumerate().skip(7) {
            // B holds the row position, so the prior-7 mean is i - 4.
            assert_close(m.unwrap(), i as f64 - 4.0);
        }

        let merged = t.clone().with_derived(&derived);
        let d = merged.label(10).date().unwrap();
        assert_close(merged.get_number(d, col("C"), true).unwrap(), 6.0);
        assert_close(merged.get_number(d, col("D"), true).unwrap(), 6.0);
        let early = merged.label(3).date().unwrap();
        assert!(matches!(
            merged.get_number(early, col("C"), true),
            Err(LookupError::UndefinedValue { .. })
        ));
    }

    #[test]
    fn chained_rolling_specs_read_earlier_output() {
        let t = weekday_table(ymd(2023, 1, 2), ymd(2023, 2, 28));
        let engine = MetricsEngine::new(&t);
        let specs = [
            RollingSpec { source: col("B"), target: col("C"), rounded: None },
            RollingSpec { source: col("C"), target: col("D"), rounded: None },
        ];
        let derived = engine.rolling_means(&specs).unwrap();
        let second = derived.get(col("D")).unwrap();
        // C is defined from row 7, so D needs rows 7..=13 and starts at 14.
        assert!(second[13].is_none());
        // mean(C[7..=13]) = mean(3..=9)
        assert_close(second[14].unwrap(), 6.0);
    }

    #[test]
    fn rounded_column_has_two_decimals() {
        let rows: Vec<Vec<Cell>> = (0..8)
            .map(|i| {
                vec![
                    Cell::Date(ymd(2023, 1, 2) + chrono::Days::new(i)),
                    Cell::Number(if i == 0 { 1.0 } else { 1.01 }),
                ]
            })
            .collect();
        let t = DatedTable::from_raw(RawTable::new(rows), 0, col("A"));
        let specs = [RollingSpec { source: col("B"), target: col("C"), rounded: Some(col("D")) }];
        let derived = MetricsEngine::new(&t).rolling_means(&specs).unwrap();
        let raw = derived.get(col("C")).unwrap()[7].unwrap();
        let rounded = derived.get(col("D")).unwrap()[7].unwrap();
        assert_close(raw, (1.0 + 6.0 * 1.01) / 7.0);
        assert_close(rounded, 1.01);
    }

    #[test]
    fn deltas_use_calendar_offsets_with_fallback() {
        let t = weekday_table(ymd(2022, 1, 3), ymd(2023, 4, 28));
        let engine = MetricsEngine::new(&t);
        let target = ymd(2023, 3, 31); // Friday
        let d = engine.deltas(target, col("B")).unwrap();

        let at = |date| t.get_number(date, col("B"), true).unwrap();
        let current = at(target);
        assert_close(d.current, current);
        assert_close(d.delta_day, current - at(ymd(2023, 3, 30)));
        // 2023-02-28 is a Tuesday and present.
        assert_close(d.delta_month, current - at(ymd(2023, 2, 28)));
        // 2022-03-31 is a Thursday.
        assert_close(d.delta_year, current - at(ymd(2022, 3, 31)));
    }

    #[test]
    fn month_and_year_lookups_fall_back_from_weekends() {
        let t = weekday_table(ymd(2022, 1, 3), ymd(2023, 5, 5));
        let engine = MetricsEngine::new(&t);
        let target = ymd(2023, 5, 1); // Monday
        let d = engine.deltas(target, col("B")).unwrap();

        let at = |date| t.get_number(date, col("B"), true).unwrap();
        let current = at(target);
        // 2023-04-01 is a Saturday -> Friday 2023-03-31.
        assert_close(d.delta_month, current - at(ymd(2023, 3, 31)));
        // 2022-05-01 is a Sunday -> Friday 2022-04-29.
        assert_close(d.delta_year, current - at(ymd(2022, 4, 29)));
        // 2023-04-30 is a Sunday -> Friday 2023-04-28.
        assert_close(d.delta_day, current - at(ymd(2023, 4, 28)));
    }

    #[test]
    fn offsets_before_the_calendar_start_name_the_offset() {
        let rows = vec![vec![Cell::Date(NaiveDate::MIN), Cell::Number(1.0)]];
        let t = DatedTable::from_raw(RawTable::new(rows), 0, col("A"));
        let err = MetricsEngine::new(&t).deltas(NaiveDate::MIN, col("B")).unwrap_err();
        assert_eq!(
            err,
            LookupError::OffsetOutOfRange { date: NaiveDate::MIN, offset: "1 day" }
        );
        assert!(err.to_string().starts_with("Cannot step back 1 day from "));
    }

    #[test]
    fn monday_day_delta_falls_back_to_friday() {
        let t = weekday_table(ymd(2022, 1, 3), ymd(2023, 4, 28));
        let engine = MetricsEngine::new(&t);
        let d = engine.deltas(ymd(2023, 4, 24), col("B")).unwrap();
        // Consecutive weekday rows differ by exactly one position.
        assert_close(d.delta_day, 1.0);
    }

    #[test]
    fn deltas_require_exact_target() {
        let t = weekday_table(ymd(2022, 1, 3), ymd(2023, 4, 28));
        let engine = MetricsEngine::new(&t);
        assert_eq!(
            engine.deltas(ymd(2023, 4, 29), col("B")),
            Err(LookupError::DateNotFound { date: ymd(2023, 4, 29) })
        );
    }

    #[test]
    fn deltas_fail_when_history_is_short() {
        let t = weekday_table(ymd(2023, 1, 2), ymd(2023, 4, 28));
        let engine = MetricsEngine::new(&t);
        assert!(matches!(
            engine.deltas(ymd(2023, 4, 28), col("B")),
            Err(LookupError::DateNotFoundAfterFallback { .. })
        ));
    }

    #[test]
    fn report_metrics_isolate_failures_per_column() {
        let t = weekday_table(ymd(2022, 1, 3), ymd(2023, 4, 28));
        let engine = MetricsEngine::new(&t);
        let specs = vec![
            MetricSpec { column: col("B"), label: "ok".into() },
            MetricSpec { column: col("Q"), label: "missing".into() },
        ];
        let out = engine.report_metrics(ymd(2023, 4, 28), &specs);
        assert_eq!(out.len(), 2);
        assert!(out[0].1.is_ok());
        assert_eq!(out[0].1.as_ref().unwrap().label, "ok");
        assert!(matches!(out[1].1, Err(LookupError::UnknownColumn { .. })));
    }
}
