//! Spreadsheet and CSV ingest.
//!
//! This module turns a rate workbook into a rectangular `RawTable`:
//!
//! - **No header interpretation**: every sheet row becomes a table row; the
//!   preamble is dropped later by `DatedTable`
//! - **Absolute alignment**: raw row 0 is sheet row 1 and raw column 0 is
//!   sheet column `A`, even when the used range starts further in
//! - **Typed cells**: real dates, numbers, text, or empty

use std::fs::File;
use std::path::Path;

use calamine::{Data, ExcelDateTime, Reader, open_workbook_auto};
use chrono::NaiveDate;

use crate::domain::{Cell, RawTable};
use crate::error::AppError;

/// Ingest output: the raw table plus where it came from.
#[derive(Debug, Clone)]
pub struct IngestedTable {
    pub raw: RawTable,
    pub source: String,
    pub sheet: Option<String>,
}

/// Load a workbook (`.xlsx`, `.xlsm`, `.xls`, `.xlsb`, `.ods`) or `.csv` file.
pub fn load_table(path: &Path) -> Result<IngestedTable, AppError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let table = match ext.as_str() {
        "csv" => load_csv(path)?,
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => load_workbook(path)?,
        _ => {
            return Err(AppError::new(
                2,
                format!(
                    "Unsupported input '{}'. Expected .xlsx, .xlsm, .xls, .xlsb, .ods or .csv.",
                    path.display()
                ),
            ));
        }
    };

    if table.raw.height() == 0 {
        return Err(AppError::new(3, format!("Input '{}' contains no rows.", path.display())));
    }

    tracing::info!(
        source = %table.source,
        sheet = table.sheet.as_deref().unwrap_or("-"),
        rows = table.raw.height(),
        columns = table.raw.width,
        "Loaded input table."
    );
    Ok(table)
}

fn load_workbook(path: &Path) -> Result<IngestedTable, AppError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| AppError::new(2, format!("Failed to open workbook '{}': {e}", path.display())))?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| AppError::new(3, format!("Workbook '{}' has no sheets.", path.display())))?;

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| AppError::new(2, format!("Failed to read sheet '{sheet}': {e}")))?;

    let (row0, col0) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row0];
    for sheet_row in range.rows() {
        let mut row = vec![Cell::Empty; col0];
        row.extend(sheet_row.iter().map(convert_data));
        rows.push(row);
    }

    Ok(IngestedTable {
        raw: RawTable::new(rows),
        source: path.display().to_string(),
        sheet: Some(sheet),
    })
}

fn load_csv(path: &Path) -> Result<IngestedTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result
            .map_err(|e| AppError::new(2, format!("CSV parse error on line {}: {e}", idx + 1)))?;
        rows.push(record.iter().map(parse_text_cell).collect());
    }

    Ok(IngestedTable {
        raw: RawTable::new(rows),
        source: path.display().to_string(),
        sheet: None,
    })
}

/// Map a workbook cell. Only cells stored as dates become `Cell::Date`;
/// date-looking strings stay text, matching how the sheet itself types them.
/// Duration cells (`[hh]:mm`) keep their day count as a number.
fn convert_data(data: &Data) -> Cell {
    match data {
        Data::DateTime(dt) if dt.is_duration() => Cell::Number(dt.as_f64()),
        Data::DateTime(dt) => excel_date(dt).map(Cell::Date).unwrap_or(Cell::Empty),
        Data::DateTimeIso(s) => parse_iso_prefix(s)
            .map(Cell::Date)
            .unwrap_or_else(|| Cell::Text(s.clone())),
        Data::Float(f) if f.is_finite() => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Text(b.to_string()),
        _ => Cell::Empty,
    }
}

/// Calendar day of a date cell. calamine resolves the workbook's date system
/// (1900 or 1904); time-only cells (serial below 1) are not dates.
fn excel_date(dt: &ExcelDateTime) -> Option<NaiveDate> {
    let serial = dt.as_f64();
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let (year, month, day, ..) = dt.to_ymd_hms_milli();
    NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
}

fn parse_iso_prefix(s: &str) -> Option<NaiveDate> {
    let head = s.get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// CSV cells are untyped; recognise dates and numbers, keep the rest as text.
fn parse_text_cell(raw: &str) -> Cell {
    let s = raw.trim().trim_start_matches('\u{feff}');
    if s.is_empty() {
        return Cell::Empty;
    }
    if let Some(d) = parse_date(s) {
        return Cell::Date(d);
    }
    if let Some(v) = parse_f64(s) {
        return Cell::Number(v);
    }
    Cell::Text(s.to_string())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    // ISO first; slashed forms are what spreadsheet "Save as CSV" emits.
    const FMTS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];
    if s.len() >= 10 {
        if let Some(d) = parse_iso_prefix(s) {
            return Some(d);
        }
    }
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            // `%Y%m%d` would otherwise accept plain 8-digit numbers anywhere.
            if fmt == "%Y%m%d" && !(1900..=2200).contains(&chrono::Datelike::year(&d)) {
                continue;
            }
            return Some(d);
        }
    }
    None
}

fn parse_f64(s: &str) -> Option<f64> {
    let v = s.replace(',', "").parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}
