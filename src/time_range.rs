use crate::calendar::MonthKey;
use crate::error::{ReportingError, Result};
use crate::schema::TimeRangeSpec;
use crate::utils::{end_of_day_utc, start_of_day_utc};
use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

/// Inclusive UTC interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    /// The whole calendar month, first millisecond to last.
    pub fn for_month(key: MonthKey) -> Result<Self> {
        Ok(Self {
            from: start_of_day_utc(key.first_day()?)?,
            to: end_of_day_utc(key.last_day()?)?,
        })
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from <= instant && instant <= self.to
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.from.date_naive() <= date && date <= self.to.date_naive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ResolvedRange {
    Single(DateRange),
    /// `past` is always the chronologically earlier month.
    Comparison { past: DateRange, latest: DateRange },
}

impl ResolvedRange {
    /// Ranges in chronological order.
    pub fn ranges(&self) -> Vec<DateRange> {
        match *self {
            ResolvedRange::Single(range) => vec![range],
            ResolvedRange::Comparison { past, latest } => vec![past, latest],
        }
    }

    /// Smallest single range covering every resolved range.
    pub fn span(&self) -> DateRange {
        match *self {
            ResolvedRange::Single(range) => range,
            ResolvedRange::Comparison { past, latest } => DateRange {
                from: past.from,
                to: latest.to,
            },
        }
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.ranges().iter().any(|r| r.contains_date(date))
    }
}

/// Parses both labels and returns them as `(past, latest)`.
pub fn comparison_keys(label_a: &str, label_b: &str) -> Result<(MonthKey, MonthKey)> {
    let a = MonthKey::parse_label(label_a)?;
    let b = MonthKey::parse_label(label_b)?;
    Ok(if a <= b { (a, b) } else { (b, a) })
}

/// Largest look-back a relative range accepts, one century of months.
pub const MAX_MONTHS_BACK: u32 = 1200;

fn months_back_delta(months_back: u32) -> Result<i32> {
    if months_back > MAX_MONTHS_BACK {
        return Err(ReportingError::DateError(format!(
            "monthsBack {} exceeds the maximum of {}",
            months_back, MAX_MONTHS_BACK
        )));
    }
    Ok(-(months_back as i32))
}

pub fn resolve(spec: &TimeRangeSpec, now: DateTime<Utc>) -> Result<ResolvedRange> {
    let resolved = match spec {
        TimeRangeSpec::Relative { months_back } => {
            let today = now.date_naive();
            let start = MonthKey::from_date(today).shift(months_back_delta(*months_back)?);
            ResolvedRange::Single(DateRange {
                from: start_of_day_utc(start.first_day()?)?,
                to: end_of_day_utc(today)?,
            })
        }
        TimeRangeSpec::Month { label } => {
            ResolvedRange::Single(DateRange::for_month(MonthKey::parse_label(label)?)?)
        }
        TimeRangeSpec::Comparison { label_a, label_b } => {
            let (past, latest) = comparison_keys(label_a, label_b)?;
            ResolvedRange::Comparison {
                past: DateRange::for_month(past)?,
                latest: DateRange::for_month(latest)?,
            }
        }
    };

    debug!("Resolved {:?} at {} to {:?}", spec, now, resolved);
    Ok(resolved)
}

/// Months covered by `spec`, oldest first.
pub fn month_keys(spec: &TimeRangeSpec, now: DateTime<Utc>) -> Result<Vec<MonthKey>> {
    match spec {
        TimeRangeSpec::Relative { months_back } => {
            let current = MonthKey::from_date(now.date_naive());
            let first = current.shift(months_back_delta(*months_back)?);
            Ok((0..=*months_back as i32).map(|i| first.shift(i)).collect())
        }
        TimeRangeSpec::Month { label } => Ok(vec![MonthKey::parse_label(label)?]),
        TimeRangeSpec::Comparison { label_a, label_b } => {
            let (past, latest) = comparison_keys(label_a, label_b)?;
            Ok(vec![past, latest])
        }
    }
}

pub fn month_labels(spec: &TimeRangeSpec, now: DateTime<Utc>) -> Result<Vec<String>> {
    Ok(month_keys(spec, now)?.iter().map(MonthKey::label).collect())
}

/// Labels offered for month and comparison pickers: the current month followed
/// by the `history` months before it, newest first.
pub fn available_month_labels(today: NaiveDate, history: u32) -> Vec<String> {
    let current = MonthKey::from_date(today);
    (0..=history as i32)
        .map(|offset| current.shift(-offset).label())
        .collect()
}
