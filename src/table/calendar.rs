//! Calendar arithmetic.
//!
//! Month and year offsets follow the calendar, not fixed day counts:
//! stepping back one month from the 31st lands on the last valid day of the
//! shorter month (`2023-03-31 -> 2023-02-28`).

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, Timelike};

pub fn minus_days(date: NaiveDate, days: u64) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(days))
}

pub fn minus_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_sub_months(Months::new(months))
}

/// The business day a run reports on.
///
/// Data for a day is usually published around midday, so before `cutoff_hour`
/// the reference day is yesterday; from `cutoff_hour` on it is today.
pub fn reference_date(now: NaiveDateTime, cutoff_hour: u32) -> NaiveDate {
    let today = now.date();
    if now.hour() < cutoff_hour {
        today.pred_opt().unwrap_or(today)
    } else {
        today
    }
}

/// Short `M/D` label used in report row headers.
pub fn month_day_label(date: NaiveDate) -> String {
    format!("{}/{}", date.month(), date.day())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_subtraction_clamps_to_month_end() {
        assert_eq!(minus_months(ymd(2023, 3, 31), 1), Some(ymd(2023, 2, 28)));
        assert_eq!(minus_months(ymd(2024, 3, 31), 1), Some(ymd(2024, 2, 29)));
        assert_eq!(minus_months(ymd(2024, 2, 29), 12), Some(ymd(2023, 2, 28)));
        assert_eq!(minus_months(ymd(2023, 5, 15), 1), Some(ymd(2023, 4, 15)));
    }

    #[test]
    fn day_subtraction_crosses_year() {
        assert_eq!(minus_days(ymd(2023, 1, 1), 1), Some(ymd(2022, 12, 31)));
        assert_eq!(minus_days(ymd(2023, 1, 1), 0), Some(ymd(2023, 1, 1)));
    }

    #[test]
    fn reference_date_respects_cutoff() {
        let morning = ymd(2023, 4, 28).and_hms_opt(9, 30, 0).unwrap();
        let noon = ymd(2023, 4, 28).and_hms_opt(12, 0, 0).unwrap();
        let evening = ymd(2023, 4, 28).and_hms_opt(18, 0, 0).unwrap();
        assert_eq!(reference_date(morning, 12), ymd(2023, 4, 27));
        assert_eq!(reference_date(noon, 12), ymd(2023, 4, 28));
        assert_eq!(reference_date(evening, 12), ymd(2023, 4, 28));
        assert_eq!(reference_date(morning, 0), ymd(2023, 4, 28));
    }

    #[test]
    fn month_day_label_has_no_padding() {
        assert_eq!(month_day_label(ymd(2023, 4, 3)), "4/3");
    }
}
