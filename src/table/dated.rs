//! `DatedTable`: rows of a rate sheet plus a date -> row-position index.
//!
//! Rows keep their source order (assumed chronologically ascending). Rows
//! whose date field is not a calendar date (headers, notes, blank lines) stay
//! in the sequence so positions and column alignment match the sheet, but
//! they never appear in the index.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::domain::{Cell, ColumnId, DateLabel, RawTable, FALLBACK_DAYS};
use crate::error::LookupError;
use crate::table::calendar::minus_days;

/// Mapping from calendar date to row position.
#[derive(Debug, Clone, Default)]
pub struct DateIndex {
    positions: HashMap<NaiveDate, usize>,
    duplicates: usize,
}

impl DateIndex {
    /// Scan labels in order; a later duplicate date overwrites the earlier one.
    pub fn build(labels: &[DateLabel]) -> Self {
        let mut positions = HashMap::with_capacity(labels.len());
        let mut duplicates = 0usize;
        for (pos, label) in labels.iter().enumerate() {
            if let DateLabel::Valid(date) = label {
                if let Some(prev) = positions.insert(*date, pos) {
                    duplicates += 1;
                    tracing::warn!(
                        date = %date,
                        previous_row = prev,
                        row = pos,
                        "Duplicate date in sheet; keeping the later row."
                    );
                }
            }
        }
        Self {
            positions,
            duplicates,
        }
    }

    pub fn get(&self, date: NaiveDate) -> Option<usize> {
        self.positions.get(&date).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of rows shadowed by a later row with the same date.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

/// Computed column values, one slot per table row, ready to merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedColumns {
    columns: Vec<(ColumnId, Vec<Option<f64>>)>,
}

impl DerivedColumns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: ColumnId, values: Vec<Option<f64>>) {
        self.columns.push((column, values));
    }

    pub fn get(&self, column: ColumnId) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (ColumnId, &[Option<f64>])> {
        self.columns.iter().map(|(c, v)| (*c, v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct DatedTable {
    rows: Vec<Vec<Cell>>,
    width: usize,
    date_column: ColumnId,
    labels: Vec<DateLabel>,
    index: DateIndex,
}

impl DatedTable {
    /// Drop `preamble_rows` leading rows, label each remaining row from
    /// `date_column`, and index the valid labels.
    pub fn from_raw(raw: RawTable, preamble_rows: usize, date_column: ColumnId) -> Self {
        let RawTable { rows, width } = raw;
        let skipped = preamble_rows.min(rows.len());
        let rows: Vec<Vec<Cell>> = rows.into_iter().skip(skipped).collect();

        let table = Self::index_rows(rows, width, date_column);
        tracing::debug!(
            preamble = skipped,
            rows = table.len(),
            indexed = table.index.len(),
            width = table.width,
            "Built dated table."
        );
        table
    }

    fn index_rows(rows: Vec<Vec<Cell>>, width: usize, date_column: ColumnId) -> Self {
        let labels: Vec<DateLabel> = rows
            .iter()
            .map(|row| {
                row.get(date_column.index())
                    .map(DateLabel::of)
                    .unwrap_or(DateLabel::Invalid)
            })
            .collect();
        let index = DateIndex::build(&labels);
        Self {
            rows,
            width,
            date_column,
            labels,
            index,
        }
    }

    /// Merge computed columns, returning the updated table.
    ///
    /// Targets past the current width widen every row. Slots beyond the
    /// provided values are left untouched.
    pub fn with_derived(self, derived: &DerivedColumns) -> Self {
        let Self {
            mut rows,
            mut width,
            date_column,
            ..
        } = self;

        for (column, values) in derived.iter() {
            if column.index() >= width {
                width = column.index() + 1;
                for row in &mut rows {
                    row.resize(width, Cell::Empty);
                }
            }
            for (row, value) in rows.iter_mut().zip(values) {
                row[column.index()] = Cell::from_opt(*value);
            }
        }

        Self::index_rows(rows, width, date_column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn index(&self) -> &DateIndex {
        &self.index
    }

    pub fn labels(&self) -> &[DateLabel] {
        &self.labels
    }

    pub fn label(&self, pos: usize) -> DateLabel {
        self.labels.get(pos).copied().unwrap_or(DateLabel::Invalid)
    }

    pub fn row(&self, pos: usize) -> Option<&[Cell]> {
        self.rows.get(pos).map(Vec::as_slice)
    }

    /// Row position of an exact date.
    pub fn position_of(&self, date: NaiveDate) -> Option<usize> {
        self.index.get(date)
    }

    /// Latest indexed date, by row order.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.labels.iter().rev().find_map(|l| l.date())
    }

    /// Resolve `date` to `(matched_date, row_position)`.
    ///
    /// Strict lookups require the exact date. Fallback lookups try `date`
    /// and then each of the previous `FALLBACK_DAYS - 1` days; the first
    /// indexed candidate wins.
    pub fn resolve(&self, date: NaiveDate, strict: bool) -> Result<(NaiveDate, usize), LookupError> {
        if strict {
            return self
                .index
                .get(date)
                .map(|pos| (date, pos))
                .ok_or(LookupError::DateNotFound { date });
        }

        let mut earliest = date;
        for offset in 0..FALLBACK_DAYS {
            let Some(candidate) = minus_days(date, u64::from(offset)) else {
                break;
            };
            earliest = candidate;
            if let Some(pos) = self.index.get(candidate) {
                if offset > 0 {
                    tracing::trace!(requested = %date, matched = %candidate, "Fallback lookup.");
                }
                return Ok((candidate, pos));
            }
        }

        Err(LookupError::DateNotFoundAfterFallback { date, earliest })
    }

    /// The cell at `date` in `column`.
    pub fn get(&self, date: NaiveDate, column: ColumnId, strict: bool) -> Result<&Cell, LookupError> {
        self.check_column(column)?;
        let (_, pos) = self.resolve(date, strict)?;
        Ok(&self.rows[pos][column.index()])
    }

    /// Like `get`, but the cell must hold a number.
    pub fn get_number(&self, date: NaiveDate, column: ColumnId, strict: bool) -> Result<f64, LookupError> {
        self.check_column(column)?;
        let (matched, pos) = self.resolve(date, strict)?;
        self.rows[pos][column.index()]
            .as_number()
            .ok_or(LookupError::UndefinedValue {
                date: matched,
                column,
            })
    }

    /// Numeric view of a whole column in row order (`None` for non-numbers).
    pub fn column_values(&self, column: ColumnId) -> Result<Vec<Option<f64>>, LookupError> {
        self.check_column(column)?;
        Ok(self
            .rows
            .iter()
            .map(|row| row[column.index()].as_number())
            .collect())
    }

    fn check_column(&self, column: ColumnId) -> Result<(), LookupError> {
        if column.index() < self.width {
            Ok(())
        } else {
            Err(LookupError::UnknownColumn { column })
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Datelike, Weekday};

    pub(crate) fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub(crate) fn col(s: &str) -> ColumnId {
        s.parse().unwrap()
    }

    /// Every weekday in `[start, end]`, column A = date, column B = row position.
    pub(crate) fn weekday_table(start: NaiveDate, end: NaiveDate) -> DatedTable {
        let mut rows = Vec::new();
        let mut d = start;
        while d <= end {
            if !matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
                let pos = rows.len() as f64;
                rows.push(vec![Cell::Date(d), Cell::Number(pos)]);
            }
            d = d.succ_opt().unwrap();
        }
        DatedTable::from_raw(RawTable::new(rows), 0, col("A"))
    }

    fn table_with_preamble() -> DatedTable {
        let rows = vec![
            vec![Cell::Text("Date".into()), Cell::Text("Rate".into())],
            vec![Cell::Text("unit".into()), Cell::Text("%".into())],
            vec![Cell::Empty, Cell::Empty],
            vec![Cell::Date(ymd(2023, 1, 3)), Cell::Number(1.5)],
            vec![Cell::Text("note".into()), Cell::Number(9.9)],
            vec![Cell::Date(ymd(2023, 1, 4)), Cell::Number(1.6)],
            vec![Cell::Date(ymd(2023, 1, 5)), Cell::Empty],
        ];
        DatedTable::from_raw(RawTable::new(rows), 3, col("A"))
    }

    #[test]
    fn preamble_is_dropped_and_non_dates_are_kept_but_unindexed() {
        let t = table_with_preamble();
        assert_eq!(t.len(), 4);
        assert_eq!(t.index().len(), 3);
        assert_eq!(t.label(1), DateLabel::Invalid);
        assert_eq!(t.position_of(ymd(2023, 1, 4)), Some(2));
    }

    #[test]
    fn index_covers_every_dated_row() {
        let t = weekday_table(ymd(2023, 1, 2), ymd(2023, 4, 28));
        for pos in 0..t.len() {
            let date = t.label(pos).date().unwrap();
            assert_eq!(t.index().get(date), Some(pos));
        }
        assert_eq!(t.index().len(), t.len());
    }

    #[test]
    fn strict_lookup_returns_row_value() {
        let t = weekday_table(ymd(2023, 1, 2), ymd(2023, 4, 28));
        for pos in 0..t.len() {
            let date = t.label(pos).date().unwrap();
            let v = t.get_number(date, col("B"), true).unwrap();
            assert_eq!(v, pos as f64);
            assert_eq!(t.get(date, col("B"), true).unwrap(), &t.row(pos).unwrap()[1]);
        }
    }

    #[test]
    fn strict_lookup_fails_on_missing_date() {
        let t = weekday_table(ymd(2023, 1, 2), ymd(2023, 4, 28));
        let sat = ymd(2023, 4, 29);
        assert_eq!(
            t.get(sat, col("B"), true),
            Err(LookupError::DateNotFound { date: sat })
        );
    }

    #[test]
    fn weekend_falls_back_to_friday() {
        let t = weekday_table(ymd(2023, 1, 2), ymd(2023, 4, 28));
        let fri = t.get_number(ymd(2023, 4, 28), col("B"), true).unwrap();
        assert_eq!(t.get_number(ymd(2023, 4, 29), col("B"), false).unwrap(), fri);
        assert_eq!(t.get_number(ymd(2023, 4, 30), col("B"), false).unwrap(), fri);
        assert_eq!(t.resolve(ymd(2023, 4, 30), false).unwrap().0, ymd(2023, 4, 28));
    }

    #[test]
    fn fallback_prefers_exact_date() {
        let t = weekday_table(ymd(2023, 1, 2), ymd(2023, 4, 28));
        let (matched, _) = t.resolve(ymd(2023, 4, 27), false).unwrap();
        assert_eq!(matched, ymd(2023, 4, 27));
    }

    #[test]
    fn fallback_reaches_six_days_back_but_not_seven() {
        let rows = vec![vec![Cell::Date(ymd(2023, 1, 1)), Cell::Number(7.0)]];
        let t = DatedTable::from_raw(RawTable::new(rows), 0, col("A"));
        assert_eq!(t.get_number(ymd(2023, 1, 7), col("B"), false).unwrap(), 7.0);
        assert_eq!(
            t.get_number(ymd(2023, 1, 8), col("B"), false),
            Err(LookupError::DateNotFoundAfterFallback {
                date: ymd(2023, 1, 8),
                earliest: ymd(2023, 1, 2),
            })
        );
    }

    #[test]
    fn eight_day_gap_fails_fallback_inside_gap() {
        let full = weekday_table(ymd(2023, 1, 2), ymd(2023, 3, 31));
        let gap_start = ymd(2023, 2, 6);
        let gap_end = ymd(2023, 2, 13);
        let rows: Vec<Vec<Cell>> = (0..full.len())
            .filter(|&pos| {
                let d = full.label(pos).date().unwrap();
                d < gap_start || d > gap_end
            })
            .map(|pos| full.row(pos).unwrap().to_vec())
            .collect();
        let t = DatedTable::from_raw(RawTable::new(rows), 0, col("A"));

        // Last row before the gap is Fri 2023-02-03; 2023-02-10 is 7 days after it.
        assert!(matches!(
            t.get(ymd(2023, 2, 10), col("B"), false),
            Err(LookupError::DateNotFoundAfterFallback { .. })
        ));
        assert!(t.get(ymd(2023, 2, 9), col("B"), false).is_ok());
        assert!(t.get(ymd(2023, 2, 14), col("B"), false).is_ok());
    }

    #[test]
    fn duplicate_dates_keep_last_row() {
        let d = ymd(2023, 1, 3);
        let rows = vec![
            vec![Cell::Date(d), Cell::Number(1.0)],
            vec![Cell::Date(d), Cell::Number(2.0)],
        ];
        let t = DatedTable::from_raw(RawTable::new(rows), 0, col("A"));
        assert_eq!(t.position_of(d), Some(1));
        assert_eq!(t.index().duplicates(), 1);
        assert_eq!(t.get_number(d, col("B"), true).unwrap(), 2.0);
    }

    #[test]
    fn blank_cell_is_undefined_value() {
        let t = table_with_preamble();
        assert_eq!(
            t.get_number(ymd(2023, 1, 5), col("B"), true),
            Err(LookupError::UndefinedValue {
                date: ymd(2023, 1, 5),
                column: col("B"),
            })
        );
        assert_eq!(t.get(ymd(2023, 1, 5), col("B"), true).unwrap(), &Cell::Empty);
    }

    #[test]
    fn unknown_column_is_rejected() {
        let t = table_with_preamble();
        assert_eq!(
            t.get(ymd(2023, 1, 3), col("Z"), true),
            Err(LookupError::UnknownColumn { column: col("Z") })
        );
    }

    #[test]
    fn derived_columns_merge_and_widen() {
        let t = table_with_preamble();
        let mut derived = DerivedColumns::new();
        derived.push(col("D"), vec![None, Some(2.0), Some(3.0), None]);
        let t = t.with_derived(&derived);
        assert_eq!(t.width(), 4);
        assert_eq!(t.get_number(ymd(2023, 1, 4), col("D"), true).unwrap(), 3.0);
        assert!(t.get_number(ymd(2023, 1, 3), col("D"), true).is_err());
        assert_eq!(t.index().len(), 3);
    }

    #[test]
    fn last_date_skips_trailing_non_dates() {
        let rows = vec![
            vec![Cell::Date(ymd(2023, 1, 3))],
            vec![Cell::Date(ymd(2023, 1, 4))],
            vec![Cell::Text("source: CFETS".into())],
        ];
        let t = DatedTable::from_raw(RawTable::new(rows), 0, col("A"));
        assert_eq!(t.last_date(), Some(ymd(2023, 1, 4)));
    }
}
