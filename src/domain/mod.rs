//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw cells and tables handed over by ingest (`Cell`, `RawTable`)
//! - column addressing and date labels (`ColumnId`, `DateLabel`)
//! - sheet layout and run configuration (`SheetLayout`, `ReportConfig`)
//! - report outputs (`ReportMetric`)

pub mod types;

pub use types::*;
