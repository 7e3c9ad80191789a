//! Chart window selection.
//!
//! Charts show rows strictly before the target date, framed by the trailing
//! `DISPLAY_MONTHS` calendar months ending at the target.

use std::ops::Range;

use chrono::NaiveDate;

use crate::domain::{ColumnId, DISPLAY_MONTHS};
use crate::error::LookupError;
use crate::table::{DatedTable, minus_months};

/// Row range and display bounds for one target date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotWindow {
    pub target: NaiveDate,
    /// Row position of the target date; plotted rows are `0..stop_row`.
    pub stop_row: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PlotWindow {
    /// Select the window for `target`, which must be an indexed date.
    pub fn select(table: &DatedTable, target: NaiveDate) -> Result<Self, LookupError> {
        let stop_row = table
            .position_of(target)
            .ok_or(LookupError::DateNotFound { date: target })?;
        let start = minus_months(target, DISPLAY_MONTHS).unwrap_or(NaiveDate::MIN);
        Ok(Self {
            target,
            stop_row,
            start,
            end: target,
        })
    }

    pub fn rows(&self) -> Range<usize> {
        0..self.stop_row
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// `(date, value)` pairs for `column` in row order.
    ///
    /// Rows without a date or without a numeric value are skipped; rows before
    /// the display start are kept (renderers clip to `start..=end`).
    pub fn series(&self, table: &DatedTable, column: ColumnId) -> Result<Vec<(NaiveDate, f64)>, LookupError> {
        let values = table.column_values(column)?;
        Ok(self
            .rows()
            .filter_map(|pos| {
                let date = table.label(pos).date()?;
                let value = values.get(pos).copied().flatten()?;
                Some((date, value))
            })
            .collect())
    }
}
