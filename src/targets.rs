use crate::calendar::MonthKey;
use crate::error::Result;
use crate::schema::{AnalyticsRecord, BdContext, Target};
use crate::status::{classify, StatusContext, StatusReport};
use crate::utils::finite_or_zero;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetStatus {
    pub bd_code: String,
    pub bd_name: String,
    pub month: u32,
    pub year: i32,
    pub target: f64,
    pub achieved: f64,
    /// Amount still needed to reach the target, never negative.
    pub remaining: f64,
    pub status: StatusReport,
}

pub fn target_for<'a>(targets: &'a [Target], bd_code: &str, month: u32, year: i32) -> Option<&'a Target> {
    targets
        .iter()
        .find(|t| t.bd_code == bd_code && t.month == month && t.year == year)
}

/// A BD's achievement against their monthly target. A missing target counts
/// as a target of zero.
pub fn target_status(
    targets: &[Target],
    context: &BdContext,
    month: u32,
    year: i32,
    achieved: f64,
) -> Result<TargetStatus> {
    MonthKey::new(year, month)?;

    let target = target_for(targets, &context.bd_code, month, year)
        .map(|t| finite_or_zero(t.value).max(0.0))
        .unwrap_or(0.0);
    let achieved = finite_or_zero(achieved);

    Ok(TargetStatus {
        bd_code: context.bd_code.clone(),
        bd_name: context.bd_name.clone(),
        month,
        year,
        target,
        achieved,
        remaining: (target - achieved).max(0.0),
        status: classify(achieved, target, StatusContext::Target),
    })
}

/// Registration value a BD achieved in one month, each registration counted once.
pub fn achieved_in_month(records: &[AnalyticsRecord], bd_name: &str, month: MonthKey) -> f64 {
    let mut seen: HashSet<&str> = HashSet::new();
    records
        .iter()
        .filter(|r| r.bd_name.as_deref().map(str::trim) == Some(bd_name.trim()))
        .filter_map(|r| {
            let (date, value) = r.registration()?;
            if !month.contains(date) {
                return None;
            }
            match r.registration_key() {
                Some(key) if !seen.insert(key) => None,
                _ => Some(value),
            }
        })
        .sum()
}

/// Target status for each BD, achievement taken from `records`.
pub fn target_statuses(
    targets: &[Target],
    records: &[AnalyticsRecord],
    contexts: &[BdContext],
    month: u32,
    year: i32,
) -> Result<Vec<TargetStatus>> {
    let period = MonthKey::new(year, month)?;
    contexts
        .iter()
        .map(|context| {
            let achieved = achieved_in_month(records, &context.bd_name, period);
            target_status(targets, context, month, year, achieved)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusKind;
    use chrono::NaiveDate;

    fn target(bd: &str, month: u32, value: f64) -> Target {
        Target {
            id: None,
            bd_code: bd.to_string(),
            month,
            year: 2025,
            value,
        }
    }

    fn registration(bd: &str, regis_no: &str, month: u32, value: f64) -> AnalyticsRecord {
        AnalyticsRecord {
            bd_name: Some(bd.to_string()),
            regis_no: Some(regis_no.to_string()),
            regis_date: NaiveDate::from_ymd_opt(2025, month, 10),
            regis_val: Some(value),
            ..Default::default()
        }
    }

    #[test]
    fn test_target_lookup() {
        let targets = vec![target("BD01", 3, 50_000.0), target("BD01", 4, 60_000.0)];
        assert_eq!(target_for(&targets, "BD01", 4, 2025).unwrap().value, 60_000.0);
        assert!(target_for(&targets, "BD02", 3, 2025).is_none());
    }

    #[test]
    fn test_status_against_target() {
        let targets = vec![target("BD01", 3, 50_000.0)];
        let context = BdContext::new("BD01", "Asha");

        let status = target_status(&targets, &context, 3, 2025, 20_000.0).unwrap();
        assert_eq!(status.status.kind, StatusKind::PartialAchieved);
        assert_eq!(status.remaining, 30_000.0);
        assert!((status.status.progress - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_target_is_no_target() {
        let context = BdContext::new("BD09", "Nobody");
        let status = target_status(&[], &context, 3, 2025, 1_000.0).unwrap();
        assert_eq!(status.status.text, "No Target");
        assert_eq!(status.status.progress, 100.0);
        assert_eq!(status.remaining, 0.0);
    }

    #[test]
    fn test_target_statuses_from_records() {
        let targets = vec![target("BD01", 3, 1_000.0), target("BD02", 3, 1_000.0)];
        let records = vec![
            registration("Asha", "R-1", 3, 700.0),
            registration("Asha", "R-1", 3, 700.0),
            registration("Asha", "R-2", 3, 400.0),
            registration("Asha", "R-3", 2, 5_000.0),
            registration("Ravi", "R-4", 3, 200.0),
        ];
        let contexts = vec![BdContext::new("BD01", "Asha"), BdContext::new("BD02", "Ravi")];

        let statuses = target_statuses(&targets, &records, &contexts, 3, 2025).unwrap();
        assert_eq!(statuses[0].achieved, 1_100.0);
        assert_eq!(statuses[0].status.kind, StatusKind::Achieved);
        assert_eq!(statuses[1].achieved, 200.0);
        assert_eq!(statuses[1].status.kind, StatusKind::PartialAchieved);
    }
}
