//! Date-indexed table access.
//!
//! - `dated`: the `DatedTable` wrapper, its `DateIndex`, and strict/fallback lookups
//! - `calendar`: calendar arithmetic used by lookups and reports

pub mod calendar;
pub mod dated;

pub use calendar::*;
pub use dated::*;
