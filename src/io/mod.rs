//! Input/output helpers.
//!
//! - workbook/CSV ingest into a raw table (`ingest`)
//! - report and chart-series exports (CSV/JSON/Markdown) (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
