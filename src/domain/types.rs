//! Shared domain types.
//!
//! These types stay lightweight so they can be:
//!
//! - produced by any ingest backend (spreadsheet, CSV, synthetic sample)
//! - queried by the date index and metrics engine
//! - exported to CSV/JSON/Markdown for downstream documents

use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of prior rows averaged by the rolling-mean columns.
pub const WINDOW_SIZE: usize = 7;

/// Candidate dates tried by a fallback lookup (the date itself plus 6 prior days).
pub const FALLBACK_DAYS: u32 = 7;

/// Leading rows of the source workbook that carry no data
/// (one header row followed by two metadata rows).
pub const DEFAULT_PREAMBLE_ROWS: usize = 3;

/// Trailing display window for charts, in calendar months.
pub const DISPLAY_MONTHS: u32 = 36;

/// Before this hour the reference business day is yesterday.
pub const DEFAULT_CUTOFF_HOUR: u32 = 12;

/// Fixed y-axis range (percent) used when charts do not autoscale.
pub const DEFAULT_Y_BOUNDS: [f64; 2] = [1.0, 3.7];

/// One spreadsheet cell as handed over by the ingest layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Date(NaiveDate),
    Number(f64),
    Text(String),
    Empty,
}

impl Cell {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Convert an optional computed value back into a cell.
    pub fn from_opt(value: Option<f64>) -> Self {
        match value {
            Some(v) => Cell::Number(v),
            None => Cell::Empty,
        }
    }
}

/// Canonical date label of a row.
///
/// Rows whose date field does not hold a calendar date carry `Invalid` and
/// are left out of the date index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateLabel {
    Valid(NaiveDate),
    Invalid,
}

impl DateLabel {
    pub fn of(cell: &Cell) -> Self {
        match cell.as_date() {
            Some(d) => DateLabel::Valid(d),
            None => DateLabel::Invalid,
        }
    }

    pub fn date(self) -> Option<NaiveDate> {
        match self {
            DateLabel::Valid(d) => Some(d),
            DateLabel::Invalid => None,
        }
    }
}

impl std::fmt::Display for DateLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateLabel::Valid(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            DateLabel::Invalid => write!(f, "<not a date>"),
        }
    }
}

/// Letter-coded column identifier (`A`, `B`, ..., `Z`, `AA`, `AB`, ...).
///
/// Ids are assigned positionally and never depend on the source headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ColumnId(usize);

impl ColumnId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ColumnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Bijective base-26: 0 -> A, 25 -> Z, 26 -> AA, 50 -> AY.
        let mut n = self.0 + 1;
        let mut letters = Vec::new();
        while n > 0 {
            let rem = (n - 1) % 26;
            letters.push((b'A' + rem as u8) as char);
            n = (n - 1) / 26;
        }
        let s: String = letters.into_iter().rev().collect();
        f.write_str(&s)
    }
}

impl FromStr for ColumnId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(format!("Invalid column id '{s}'. Expected letters like A, H, AA."));
        }
        let mut n = 0usize;
        for c in s.chars() {
            let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
            n = n
                .checked_mul(26)
                .and_then(|v| v.checked_add(digit))
                .ok_or_else(|| format!("Column id '{s}' is too large."))?;
        }
        Ok(Self(n - 1))
    }
}

impl From<ColumnId> for String {
    fn from(value: ColumnId) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for ColumnId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Rectangular, row-major cells exactly as read from the source.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub rows: Vec<Vec<Cell>>,
    pub width: usize,
}

impl RawTable {
    /// Build a table, padding short rows with `Cell::Empty` so every row has
    /// the same width.
    pub fn new(mut rows: Vec<Vec<Cell>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, Cell::Empty);
        }
        Self { rows, width }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }
}

/// A trailing-mean derived column, with an optional rounded presentation copy.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingSpec {
    pub source: ColumnId,
    pub target: ColumnId,
    pub rounded: Option<ColumnId>,
}

/// A column reported as `(current, Δday, Δmonth, Δyear)`.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSpec {
    pub column: ColumnId,
    pub label: String,
}

/// A column drawn on the rate chart.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSpec {
    pub column: ColumnId,
    pub label: String,
    pub dashed: bool,
}

/// Which columns of the sheet mean what.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetLayout {
    pub date_column: ColumnId,
    pub rolling: Vec<RollingSpec>,
    pub metrics: Vec<MetricSpec>,
    pub plots: Vec<PlotSpec>,
}

impl Default for SheetLayout {
    /// The funding-rate workbook: `B` 7-day OMO rate, `H` R007, `I` DR007,
    /// `N` OMO rate for charting, `J`/`K` 7-day means, `O`/`P` rounded means.
    fn default() -> Self {
        let col = |s: &str| s.parse::<ColumnId>().unwrap_or(ColumnId::new(0));
        Self {
            date_column: col("A"),
            rolling: vec![
                RollingSpec { source: col("I"), target: col("J"), rounded: Some(col("O")) },
                RollingSpec { source: col("H"), target: col("K"), rounded: Some(col("P")) },
            ],
            metrics: vec![
                MetricSpec { column: col("B"), label: "7D OMO (%)".to_string() },
                MetricSpec { column: col("I"), label: "DR007 (%)".to_string() },
                MetricSpec { column: col("H"), label: "R007 (%)".to_string() },
            ],
            plots: vec![
                PlotSpec { column: col("N"), label: "7 day OMO rate".to_string(), dashed: true },
                PlotSpec { column: col("O"), label: "DR007(7DMA)".to_string(), dashed: false },
                PlotSpec { column: col("P"), label: "R007(7DMA)".to_string(), dashed: false },
            ],
        }
    }
}

/// Current value and period-over-period changes of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetric {
    pub column: ColumnId,
    pub label: String,
    pub current: f64,
    pub delta_day: f64,
    pub delta_month: f64,
    pub delta_year: f64,
}

/// Where the run reads its table from.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    File(PathBuf),
    /// Seeded synthetic workbook (no file needed).
    Demo { seed: u64 },
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub input: InputSource,
    /// Explicit target date; `None` resolves via the cutoff-hour rule.
    pub target_date: Option<NaiveDate>,
    pub cutoff_hour: u32,
    pub preamble_rows: usize,
    pub layout: SheetLayout,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    /// Fixed y-axis range for charts; `None` autoscales to the data.
    pub y_bounds: Option<[f64; 2]>,

    pub export_csv: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
    pub export_markdown: Option<PathBuf>,
    pub export_series: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            input: InputSource::Demo { seed: 42 },
            target_date: None,
            cutoff_hour: DEFAULT_CUTOFF_HOUR,
            preamble_rows: DEFAULT_PREAMBLE_ROWS,
            layout: SheetLayout::default(),
            plot: true,
            plot_width: 100,
            plot_height: 25,
            y_bounds: None,
            export_csv: None,
            export_json: None,
            export_markdown: None,
            export_series: None,
        }
    }
}
