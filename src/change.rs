use crate::utils::finite_or_zero;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reported for growth from a zero baseline. Large enough that presentation can
/// tell it apart from ordinary changes and render it as "100%+".
pub const UNBOUNDED_GROWTH: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PercentChange {
    /// Both periods are zero.
    Unchanged,
    /// Ordinary signed change, unrounded.
    Delta { percent: f64 },
    /// The earlier period was zero and the later one was not.
    Unbounded { negative: bool },
}

impl PercentChange {
    pub fn as_percent(&self, sentinel: f64) -> f64 {
        match *self {
            PercentChange::Unchanged => 0.0,
            PercentChange::Delta { percent } => percent,
            PercentChange::Unbounded { negative: false } => sentinel,
            PercentChange::Unbounded { negative: true } => -sentinel,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, PercentChange::Unbounded { .. })
    }
}

pub fn compare(latest: f64, past: f64) -> PercentChange {
    let latest = finite_or_zero(latest);
    let past = finite_or_zero(past);

    if past == 0.0 {
        if latest == 0.0 {
            PercentChange::Unchanged
        } else {
            PercentChange::Unbounded {
                negative: latest < 0.0,
            }
        }
    } else {
        PercentChange::Delta {
            percent: (latest - past) / past * 100.0,
        }
    }
}

pub fn percent_change(latest: f64, past: f64) -> f64 {
    percent_change_with(latest, past, UNBOUNDED_GROWTH)
}

pub fn percent_change_with(latest: f64, past: f64, sentinel: f64) -> f64 {
    compare(latest, past).as_percent(sentinel)
}

/// Change between each consecutive pair of periods, oldest first.
pub fn month_over_month(values: &[f64]) -> Vec<f64> {
    month_over_month_with(values, UNBOUNDED_GROWTH)
}

pub fn month_over_month_with(values: &[f64], sentinel: f64) -> Vec<f64> {
    values
        .windows(2)
        .map(|pair| percent_change_with(pair[1], pair[0], sentinel))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_baseline_policy() {
        assert_eq!(percent_change(0.0, 0.0), 0.0);
        assert!(percent_change(1.0, 0.0) >= 1000.0);
        assert!(percent_change(250_000.0, 0.0) >= 1000.0);
        assert_eq!(percent_change(-5.0, 0.0), -UNBOUNDED_GROWTH);
    }

    #[test]
    fn test_signed_unrounded_change() {
        assert_eq!(percent_change(150.0, 100.0), 50.0);
        assert_eq!(percent_change(50.0, 100.0), -50.0);
        assert_eq!(percent_change(0.0, 100.0), -100.0);
        let third = percent_change(4.0, 3.0);
        assert!((third - 33.333_333_333).abs() < 1e-6);
    }

    #[test]
    fn test_never_non_finite() {
        for (latest, past) in [
            (f64::NAN, 0.0),
            (0.0, f64::NAN),
            (f64::INFINITY, 10.0),
            (10.0, f64::NEG_INFINITY),
        ] {
            assert!(percent_change(latest, past).is_finite());
        }
    }

    #[test]
    fn test_compare_variants() {
        assert_eq!(compare(0.0, 0.0), PercentChange::Unchanged);
        assert!(compare(10.0, 0.0).is_unbounded());
        assert_eq!(compare(20.0, 10.0), PercentChange::Delta { percent: 100.0 });
        assert_eq!(compare(10.0, 0.0).as_percent(5000.0), 5000.0);
    }

    #[test]
    fn test_month_over_month() {
        let changes = month_over_month(&[100.0, 200.0, 0.0, 0.0, 40.0]);
        assert_eq!(changes, vec![100.0, -100.0, 0.0, UNBOUNDED_GROWTH]);
        assert!(month_over_month(&[5.0]).is_empty());
        assert_eq!(month_over_month_with(&[0.0, 40.0], 2_500.0), vec![2_500.0]);
    }
}
