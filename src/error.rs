use chrono::NaiveDate;

use crate::domain::ColumnId;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Failures raised by date-indexed table queries.
///
/// Every variant names the offending date (as `YYYY-MM-DD`) so a failed
/// metric can be traced back to the source sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupError {
    /// Strict lookup: the exact date has no indexed row.
    DateNotFound { date: NaiveDate },
    /// Fallback lookup: none of `date` and the six days before it are indexed.
    DateNotFoundAfterFallback { date: NaiveDate, earliest: NaiveDate },
    /// The row exists but the cell holds no number (blank, text, or a derived
    /// value inside the warm-up window).
    UndefinedValue { date: NaiveDate, column: ColumnId },
    /// The column id is outside the table width.
    UnknownColumn { column: ColumnId },
    /// Stepping back `offset` from `date` leaves the supported calendar.
    OffsetOutOfRange { date: NaiveDate, offset: &'static str },
}

impl std::fmt::Display for LookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupError::DateNotFound { date } => {
                write!(f, "Date not found in table: {}", date.format("%Y-%m-%d"))
            }
            LookupError::DateNotFoundAfterFallback { date, earliest } => write!(
                f,
                "Date not found after searching back from {} to {}",
                date.format("%Y-%m-%d"),
                earliest.format("%Y-%m-%d"),
            ),
            LookupError::UndefinedValue { date, column } => write!(
                f,
                "No numeric value in column {column} on {}",
                date.format("%Y-%m-%d")
            ),
            LookupError::UnknownColumn { column } => write!(f, "Unknown column: {column}"),
            LookupError::OffsetOutOfRange { date, offset } => write!(
                f,
                "Cannot step back {offset} from {}: outside the calendar range",
                date.format("%Y-%m-%d")
            ),
        }
    }
}

impl std::error::Error for LookupError {}

impl From<LookupError> for AppError {
    fn from(err: LookupError) -> Self {
        AppError::new(3, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_errors_name_the_date() {
        let date = NaiveDate::from_ymd_opt(2023, 4, 29).unwrap();
        let err = LookupError::DateNotFound { date };
        assert!(err.to_string().contains("2023-04-29"));

        let earliest = NaiveDate::from_ymd_opt(2023, 4, 23).unwrap();
        let err = LookupError::DateNotFoundAfterFallback { date, earliest };
        let msg = err.to_string();
        assert!(msg.contains("2023-04-29") && msg.contains("2023-04-23"));

        let app: AppError = err.into();
        assert_eq!(app.exit_code(), 3);

        let err = LookupError::OffsetOutOfRange { date, offset: "12 months" };
        assert_eq!(
            err.to_string(),
            "Cannot step back 12 months from 2023-04-29: outside the calendar range"
        );
    }
}
