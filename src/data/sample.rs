//! Synthetic funding-rate workbook.
//!
//! Produces a `RawTable` laid out like the source sheet so the whole
//! pipeline (preamble skip, date index, rolling means, deltas, charts) can
//! run without a spreadsheet:
//!
//! - row 0: column headers, rows 1-2: unit and source notes
//! - one row per business day: `A` date, `B` 7-day OMO rate, `H` R007,
//!   `I` DR007, `N` OMO rate again (the chart copy)
//! - `J`, `K`, `O`, `P` are left blank for the rolling-mean columns

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{Datelike, NaiveDate, Weekday};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{Cell, RawTable};
use crate::error::AppError;

/// Sheet width: columns `A` through `P`.
const SHEET_WIDTH: usize = 16;

const COL_OMO: usize = 1; // B
const COL_R007: usize = 7; // H
const COL_DR007: usize = 8; // I
const COL_OMO_CHART: usize = 13; // N

/// Policy-rate step size and the chance of a cut on any given day.
const OMO_STEP: f64 = 0.10;
const OMO_CUT_PROB: f64 = 0.004;
const OMO_FLOOR: f64 = 1.40;

/// Probability that a weekday is a market holiday (no row).
const HOLIDAY_PROB: f64 = 0.02;

/// Mean spreads over OMO and their AR(1) persistence / daily noise.
const DR007_SPREAD: f64 = 0.05;
const R007_SPREAD: f64 = 0.20;
const SPREAD_PERSISTENCE: f64 = 0.85;
const SPREAD_NOISE: f64 = 0.06;

#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub seed: u64,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub initial_omo: f64,
}

impl SampleConfig {
    /// Four years of history ending at `end`.
    pub fn ending_at(end: NaiveDate, seed: u64) -> Self {
        let start = end
            .checked_sub_months(chrono::Months::new(48))
            .unwrap_or(end);
        Self {
            seed,
            start,
            end,
            initial_omo: 2.20,
        }
    }
}

/// Generate the sheet. The `end` date always gets a row when it is a weekday.
pub fn generate_workbook(config: &SampleConfig) -> Result<RawTable, AppError> {
    if config.end < config.start {
        return Err(AppError::new(2, "Sample end date is before its start date."));
    }
    if !(config.initial_omo.is_finite() && config.initial_omo > 0.0) {
        return Err(AppError::new(2, "Invalid initial OMO rate for sample generation."));
    }

    let mut rng = StdRng::seed_from_u64(sample_seed(config));
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let mut rows = preamble_rows();

    let mut omo = config.initial_omo;
    let mut dr_spread = DR007_SPREAD;
    let mut r_spread = R007_SPREAD;
    let mut skipped_last = false;

    let mut day = config.start;
    while day <= config.end {
        let weekday = !matches!(day.weekday(), Weekday::Sat | Weekday::Sun);
        if weekday {
            let holiday = day != config.end && !skipped_last && rng.gen_bool(HOLIDAY_PROB);
            skipped_last = holiday;

            if rng.gen_bool(OMO_CUT_PROB) && omo - OMO_STEP >= OMO_FLOOR {
                omo -= OMO_STEP;
            }
            dr_spread = ar1_step(dr_spread, DR007_SPREAD, normal.sample(&mut rng));
            r_spread = ar1_step(r_spread, R007_SPREAD, normal.sample(&mut rng));

            if !holiday {
                let dr007 = round4(omo + dr_spread);
                // R007 trades above DR007 (wider collateral set).
                let r007 = round4((omo + r_spread).max(dr007));
                let mut row = vec![Cell::Empty; SHEET_WIDTH];
                row[0] = Cell::Date(day);
                row[COL_OMO] = Cell::Number(omo);
                row[COL_R007] = Cell::Number(r007);
                row[COL_DR007] = Cell::Number(dr007);
                row[COL_OMO_CHART] = Cell::Number(omo);
                rows.push(row);
            }
        }
        let Some(next) = day.succ_opt() else { break };
        day = next;
    }

    rows.push(vec![Cell::Text("Source: synthetic sample".to_string())]);

    Ok(RawTable::new(rows))
}

fn preamble_rows() -> Vec<Vec<Cell>> {
    let mut header = vec![Cell::Empty; SHEET_WIDTH];
    header[0] = Cell::Text("Date".to_string());
    header[COL_OMO] = Cell::Text("7D OMO".to_string());
    header[COL_R007] = Cell::Text("R007".to_string());
    header[COL_DR007] = Cell::Text("DR007".to_string());
    header[COL_OMO_CHART] = Cell::Text("7D OMO (chart)".to_string());

    let mut unit = vec![Cell::Empty; SHEET_WIDTH];
    unit[0] = Cell::Text("Unit".to_string());
    for col in [COL_OMO, COL_R007, COL_DR007, COL_OMO_CHART] {
        unit[col] = Cell::Text("%".to_string());
    }

    let mut freq = vec![Cell::Empty; SHEET_WIDTH];
    freq[0] = Cell::Text("Frequency".to_string());
    for col in [COL_OMO, COL_R007, COL_DR007, COL_OMO_CHART] {
        freq[col] = Cell::Text("daily".to_string());
    }

    vec![header, unit, freq]
}

fn ar1_step(prev: f64, mean: f64, z: f64) -> f64 {
    mean + SPREAD_PERSISTENCE * (prev - mean) + SPREAD_NOISE * z
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

fn sample_seed(config: &SampleConfig) -> u64 {
    let mut hasher = DefaultHasher::new();
    config.seed.hash(&mut hasher);
    config.start.hash(&mut hasher);
    config.end.hash(&mut hasher);
    config.initial_omo.to_bits().hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ColumnId, DEFAULT_PREAMBLE_ROWS};
    use crate::table::DatedTable;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn sample_is_deterministic_per_seed() {
        let cfg = SampleConfig::ending_at(ymd(2023, 4, 28), 7);
        let a = generate_workbook(&cfg).unwrap();
        let b = generate_workbook(&cfg).unwrap();
        assert_eq!(a.rows, b.rows);

        let other = generate_workbook(&SampleConfig { seed: 8, ..cfg }).unwrap();
        assert_ne!(a.rows, other.rows);
    }

    #[test]
    fn sample_has_sheet_layout_and_no_long_gaps() {
        let cfg = SampleConfig::ending_at(ymd(2023, 4, 28), 1);
        let raw = generate_workbook(&cfg).unwrap();
        assert_eq!(raw.width, SHEET_WIDTH);

        let table = DatedTable::from_raw(raw, DEFAULT_PREAMBLE_ROWS, ColumnId::new(0));
        assert!(table.position_of(ymd(2023, 4, 28)).is_some());
        // Trailing note row stays in the sequence but not in the index.
        assert_eq!(table.index().len(), table.len() - 1);

        let dates: Vec<NaiveDate> = table.labels().iter().filter_map(|l| l.date()).collect();
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
        assert!(dates.windows(2).all(|w| (w[1] - w[0]).num_days() <= 4));
        // 2019-04-28 is a Sunday; at most one holiday can follow it.
        let first = dates.first().copied().unwrap();
        assert!(first == ymd(2019, 4, 29) || first == ymd(2019, 4, 30));
    }

    #[test]
    fn dr007_never_exceeds_r007() {
        let raw = generate_workbook(&SampleConfig::ending_at(ymd(2023, 4, 28), 3)).unwrap();
        for row in raw.rows.iter().skip(DEFAULT_PREAMBLE_ROWS) {
            if let (Some(dr), Some(r)) = (row[COL_DR007].as_number(), row[COL_R007].as_number()) {
                assert!(dr <= r);
            }
        }
    }

    #[test]
    fn end_before_start_is_rejected() {
        let cfg = SampleConfig {
            seed: 0,
            start: ymd(2023, 1, 2),
            end: ymd(2022, 1, 3),
            initial_omo: 2.0,
        };
        assert_eq!(generate_workbook(&cfg).unwrap_err().exit_code(), 2);
    }
}
