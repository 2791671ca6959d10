use crate::error::{ReportingError, Result};
use crate::utils::{first_day_of_month, last_day_of_month, shift_month, validate_month};
use chrono::{Datelike, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of positional week slots in a month.
pub const WEEKS_PER_MONTH: usize = 5;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// A calendar month. Orders chronologically (year first, then month).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        validate_month(month)?;
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parses labels of the form `"March 2025"`. Month names are matched
    /// case-insensitively and may be abbreviated to three letters.
    pub fn parse_label(label: &str) -> Result<Self> {
        let invalid = || ReportingError::InvalidMonthLabel(label.to_string());

        let mut parts = label.split_whitespace();
        let (name, year) = match (parts.next(), parts.next(), parts.next()) {
            (Some(name), Some(year), None) => (name, year),
            _ => return Err(invalid()),
        };

        let month = month_from_name(name).ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;

        Ok(Self { year, month })
    }

    pub fn label(&self) -> String {
        format!("{} {}", month_name(self.month), self.year)
    }

    pub fn shift(&self, delta: i32) -> Self {
        let (year, month) = shift_month(self.year, self.month, delta);
        Self { year, month }
    }

    pub fn first_day(&self) -> Result<NaiveDate> {
        first_day_of_month(self.year, self.month)
    }

    pub fn last_day(&self) -> Result<NaiveDate> {
        last_day_of_month(self.year, self.month)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES
        .get((month as usize).wrapping_sub(1))
        .copied()
        .unwrap_or("Unknown")
}

fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.to_ascii_lowercase();
    MONTH_NAMES.iter().position(|full| {
        let full = full.to_ascii_lowercase();
        full == lower || (lower.len() == 3 && full.starts_with(&lower))
    })
    .map(|idx| idx as u32 + 1)
}

/// Maps a day of the month to its week slot: 1-7, 8-14, 15-21, 22-28, 29+.
pub fn week_of_month(day: u32) -> u8 {
    match day {
        0..=7 => 1,
        8..=14 => 2,
        15..=21 => 3,
        22..=28 => 4,
        _ => 5,
    }
}

pub fn week_of_date(date: NaiveDate) -> u8 {
    week_of_month(date.day())
}

pub fn validate_week(week: u8) -> Result<()> {
    if !(1..=WEEKS_PER_MONTH as u8).contains(&week) {
        return Err(ReportingError::InvalidWeek(week));
    }
    Ok(())
}

pub fn is_current_month(month: u32, year: i32, today: NaiveDate) -> bool {
    MonthKey { year, month } == MonthKey::from_date(today)
}

pub fn is_past_month(month: u32, year: i32, today: NaiveDate) -> bool {
    MonthKey { year, month } < MonthKey::from_date(today)
}

pub fn is_future_month(month: u32, year: i32, today: NaiveDate) -> bool {
    MonthKey { year, month } > MonthKey::from_date(today)
}

/// What a user may change in one weekly projection slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum WeekLock {
    /// Value and remarks are both open.
    Editable,
    /// The week is running: the value is frozen, remarks may still be added.
    RemarksOnly,
    Locked,
}

impl WeekLock {
    pub fn value_editable(&self) -> bool {
        matches!(self, WeekLock::Editable)
    }

    pub fn remarks_editable(&self) -> bool {
        !matches!(self, WeekLock::Locked)
    }
}

/// Lock state of `week` (1..=5) of the given month as seen on `today`.
pub fn week_lock(month: u32, year: i32, week: u8, today: NaiveDate) -> Result<WeekLock> {
    validate_month(month)?;
    validate_week(week)?;

    if is_past_month(month, year, today) {
        return Ok(WeekLock::Locked);
    }
    if is_future_month(month, year, today) {
        return Ok(WeekLock::Editable);
    }

    let current_week = week_of_date(today);
    Ok(match week.cmp(&current_week) {
        std::cmp::Ordering::Less => WeekLock::Locked,
        std::cmp::Ordering::Equal => WeekLock::RemarksOnly,
        std::cmp::Ordering::Greater => WeekLock::Editable,
    })
}

/// Lock states for all five weeks of a month, week 1 first.
pub fn month_locks(month: u32, year: i32, today: NaiveDate) -> Result<[WeekLock; WEEKS_PER_MONTH]> {
    let mut locks = [WeekLock::Editable; WEEKS_PER_MONTH];
    for (idx, lock) in locks.iter_mut().enumerate() {
        *lock = week_lock(month, year, idx as u8 + 1, today)?;
    }
    Ok(locks)
}
