use crate::error::{ReportingError, Result};
use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};

pub fn validate_month(month: u32) -> Result<()> {
    if !(1..=12).contains(&month) {
        return Err(ReportingError::InvalidMonth(month));
    }
    Ok(())
}

pub fn first_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    validate_month(month)?;
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| ReportingError::DateError(format!("{}-{:02} is out of range", year, month)))
}

pub fn last_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    let (next_year, next_month) = shift_month(year, month, 1);

    first_day_of_month(next_year, next_month)?
        .checked_sub_days(Days::new(1))
        .ok_or_else(|| {
            ReportingError::DateError(format!("No last day for {}-{:02}", year, month))
        })
}

pub fn days_in_month(year: i32, month: u32) -> Result<u32> {
    Ok(last_day_of_month(year, month)?.day())
}

/// Moves a (year, month) pair by `delta` months, crossing year boundaries.
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + (month as i32 - 1) + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

pub fn months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    let year_diff = end.year() - start.year();
    let month_diff = end.month() as i32 - start.month() as i32;
    year_diff * 12 + month_diff
}

pub fn start_of_day_utc(date: NaiveDate) -> Result<DateTime<Utc>> {
    date.and_hms_milli_opt(0, 0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| ReportingError::DateError(format!("No midnight for {}", date)))
}

/// Last representable millisecond of `date` in UTC (23:59:59.999).
pub fn end_of_day_utc(date: NaiveDate) -> Result<DateTime<Utc>> {
    date.and_hms_milli_opt(23, 59, 59, 999)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| ReportingError::DateError(format!("No end of day for {}", date)))
}

/// Zero for anything that is not a finite number.
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_shift_month() {
        assert_eq!(shift_month(2025, 1, -1), (2024, 12));
        assert_eq!(shift_month(2025, 12, 1), (2026, 1));
        assert_eq!(shift_month(2025, 3, -14), (2024, 1));
        assert_eq!(shift_month(2025, 6, 0), (2025, 6));
    }

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(
            last_day_of_month(2023, 2).unwrap(),
            NaiveDate::from_ymd_opt(2023, 2, 28).unwrap()
        );
        assert_eq!(
            last_day_of_month(2024, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            last_day_of_month(2023, 12).unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_invalid_month_rejected() {
        assert!(matches!(
            first_day_of_month(2025, 13),
            Err(ReportingError::InvalidMonth(13))
        ));
        assert!(last_day_of_month(2025, 0).is_err());
    }

    #[test]
    fn test_months_between() {
        let start = NaiveDate::from_ymd_opt(2024, 11, 15).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        assert_eq!(months_between(start, end), 3);
    }

    #[test]
    fn test_day_boundaries() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 16).unwrap();
        let end = end_of_day_utc(date).unwrap();
        assert_eq!(end.hour(), 23);
        assert_eq!(end.timestamp_subsec_millis(), 999);
        assert_eq!(start_of_day_utc(date).unwrap().hour(), 0);
    }

    #[test]
    fn test_finite_or_zero() {
        assert_eq!(finite_or_zero(f64::NAN), 0.0);
        assert_eq!(finite_or_zero(f64::INFINITY), 0.0);
        assert_eq!(finite_or_zero(12.5), 12.5);
    }
}
