//! Calendar-month helpers used by scheduling and finance.

use chrono::{Datelike, NaiveDate};

use crate::error::CoreError;
use crate::types::Date;

/// First and last day of a calendar month.
pub fn month_bounds(year: i32, month: u32) -> Result<(Date, Date), CoreError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| CoreError::Validation(format!("Invalid month: {year}-{month:02}")))?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| CoreError::Validation(format!("Invalid month: {year}-{month:02}")))?;
    Ok((first, next_first.pred_opt().unwrap_or(first)))
}

/// Number of days in a calendar month.
pub fn days_in_month(year: i32, month: u32) -> Result<u32, CoreError> {
    let (_, last) = month_bounds(year, month)?;
    Ok(last.day())
}

/// `YYYY-MM` label for a month.
pub fn period_label(year: i32, month: u32) -> String {
    format!("{year:04}-{month:02}")
}

/// Validate that `from <= to`.
pub fn validate_range(from: Date, to: Date) -> Result<(), CoreError> {
    if to < from {
        return Err(CoreError::Validation(format!(
            "End date {to} is before start date {from}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> Date {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn february_leap_year() {
        assert_eq!(days_in_month(2024, 2).unwrap(), 29);
        assert_eq!(days_in_month(2025, 2).unwrap(), 28);
    }

    #[test]
    fn december_rolls_into_next_year() {
        let (first, last) = month_bounds(2025, 12).unwrap();
        assert_eq!(first, d(2025, 12, 1));
        assert_eq!(last, d(2025, 12, 31));
    }

    #[test]
    fn invalid_month_rejected() {
        assert!(month_bounds(2025, 13).is_err());
        assert!(month_bounds(2025, 0).is_err());
    }

    #[test]
    fn period_label_is_zero_padded() {
        assert_eq!(period_label(2026, 3), "2026-03");
    }
}
