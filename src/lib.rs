//! # BD Reporting Engine
//!
//! The computation behind business-development reporting dashboards: it turns
//! flat collections of dated business records (inquiries, quotations,
//! registrations, weekly projections, monthly targets) into month-aligned
//! summaries, week-of-month buckets, achievement status and month-over-month
//! changes.
//!
//! ## Core Concepts
//!
//! - **Time ranges**: a report covers the last N months, one month, or two months
//!   compared against each other. Comparisons are always ordered `[past, latest]`.
//! - **Week-of-month buckets**: days 1-7, 8-14, 15-21, 22-28 and 29+. Projections
//!   are entered per bucket and achievements are bucketed the same way.
//! - **Zero baselines**: status progress and percentage changes never divide by
//!   zero; both have an explicit policy for empty targets and empty periods.
//! - **Injected time**: nothing reads the wall clock except
//!   [`ReportingEngine::now_utc`]. Pass "now" in for deterministic results.
//!
//! ## Example
//!
//! ```rust,ignore
//! use bd_reporting_engine::*;
//! use chrono::{TimeZone, Utc};
//!
//! let now = Utc.with_ymd_and_hms(2025, 3, 16, 9, 0, 0).unwrap();
//! let engine = ReportingEngine::new(EngineConfig::default(), now)?;
//!
//! let spec = TimeRangeSpec::Comparison {
//!     label_a: "March 2025".to_string(),
//!     label_b: "February 2025".to_string(),
//! };
//! let panels = engine.group_records(&records, &spec)?;
//! for panel in &panels {
//!     if let Some(change) = engine.comparison_change(panel) {
//!         println!("{}: {:+.1}%", panel.entity, change.value);
//!     }
//! }
//! ```

pub mod calendar;
pub mod change;
pub mod config;
pub mod error;
pub mod format;
pub mod grouping;
pub mod ingestion;
pub mod kpi;
pub mod reconcile;
pub mod schema;
pub mod status;
pub mod summary;
pub mod targets;
pub mod time_range;
pub mod utils;

pub use calendar::{
    is_current_month, is_future_month, is_past_month, month_locks, week_lock, week_of_date,
    week_of_month, MonthKey, WeekLock, WEEKS_PER_MONTH,
};
pub use change::{
    compare, month_over_month, month_over_month_with, percent_change, percent_change_with,
    PercentChange, UNBOUNDED_GROWTH,
};
pub use config::EngineConfig;
pub use error::{ReportingError, Result};
pub use format::{format_amount, format_amount_with};
pub use grouping::{
    group, group_by_months, BreakdownRow, BreakdownTable, EntityChange, EntityMonthlySummary,
    MonthBucket,
};
pub use ingestion::period_rows_from_records;
pub use kpi::{KpiChange, KpiSummary};
pub use reconcile::{
    reconcile, reconcile_bd, BdReconciliation, ClientReconciliation, WeekTotal, WeeklyBreakdown,
};
pub use schema::*;
pub use status::{classify, StatusContext, StatusKind, StatusReport};
pub use summary::{parse_summary, render_summary, ParsedSummary, SummaryEntry, SummaryMap};
pub use targets::{target_for, target_status, target_statuses, TargetStatus};
pub use time_range::{
    available_month_labels, month_keys, month_labels, resolve, DateRange, ResolvedRange,
    MAX_MONTHS_BACK,
};

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Everything one BD's performance screen shows for a time range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BdPerformanceReport {
    pub context: BdContext,
    pub month_labels: Vec<String>,
    /// `None` when the BD registered nothing in the range.
    pub summary: Option<EntityMonthlySummary>,
    /// Latest against past month of `summary`, for comparison ranges only.
    pub summary_change: Option<EntityChange>,
    /// One entry per resolved range, oldest first.
    pub kpis: Vec<KpiSummary>,
    /// Latest against past, for comparison ranges only.
    pub kpi_change: Option<KpiChange>,
    /// Target and reconciliation are for the latest month in the range.
    pub target: TargetStatus,
    pub reconciliation: BdReconciliation,
}

/// Configuration plus the instant every computation is evaluated at.
#[derive(Debug, Clone)]
pub struct ReportingEngine {
    config: EngineConfig,
    now: DateTime<Utc>,
}

impl ReportingEngine {
    pub fn new(config: EngineConfig, now: DateTime<Utc>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, now })
    }

    /// Engine evaluated at the current wall-clock time.
    pub fn now_utc(config: EngineConfig) -> Result<Self> {
        Self::new(config, Utc::now())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    pub fn resolve(&self, spec: &TimeRangeSpec) -> Result<ResolvedRange> {
        resolve(spec, self.now)
    }

    pub fn month_labels(&self, spec: &TimeRangeSpec) -> Result<Vec<String>> {
        month_labels(spec, self.now)
    }

    pub fn available_month_labels(&self) -> Vec<String> {
        available_month_labels(self.today(), self.config.month_history)
    }

    pub fn percent_change(&self, latest: f64, past: f64) -> f64 {
        change::percent_change_with(latest, past, self.config.unbounded_growth_sentinel)
    }

    pub fn month_over_month(&self, values: &[f64]) -> Vec<f64> {
        month_over_month_with(values, self.config.unbounded_growth_sentinel)
    }

    pub fn comparison_change(&self, summary: &EntityMonthlySummary) -> Option<EntityChange> {
        summary.comparison_change_with(self.config.unbounded_growth_sentinel)
    }

    pub fn monthly_changes(&self, summary: &EntityMonthlySummary) -> Vec<EntityChange> {
        summary.monthly_changes_with(self.config.unbounded_growth_sentinel)
    }

    pub fn kpi_change(&self, latest: &KpiSummary, past: &KpiSummary) -> KpiChange {
        latest.change_from_with(past, self.config.unbounded_growth_sentinel)
    }

    pub fn format_amount(&self, value: f64) -> String {
        format_amount_with(value, self.config.amount_decimals)
    }

    pub fn week_lock(&self, month: u32, year: i32, week: u8) -> Result<WeekLock> {
        week_lock(month, year, week, self.today())
    }

    pub fn validate_edit(&self, edit: &ProjectionEdit) -> Result<()> {
        edit.validate(self.today())
    }

    /// Groups pre-aggregated period rows.
    pub fn group(&self, rows: &[RawPeriodRow], spec: &TimeRangeSpec) -> Result<Vec<EntityMonthlySummary>> {
        group(rows, spec, self.now)
    }

    /// Groups raw records by BD: records are first bucketed into stamped period
    /// rows, so alignment does not depend on record order.
    pub fn group_records(
        &self,
        records: &[AnalyticsRecord],
        spec: &TimeRangeSpec,
    ) -> Result<Vec<EntityMonthlySummary>> {
        let months = month_keys(spec, self.now)?;
        let rows = period_rows_from_records(records, &months, &self.config.unassigned_label);
        Ok(group_by_months(&rows, &months, spec.is_comparison()))
    }

    pub fn kpis(&self, records: &[AnalyticsRecord], spec: &TimeRangeSpec) -> Result<Vec<KpiSummary>> {
        Ok(KpiSummary::for_range(records, &self.resolve(spec)?))
    }

    pub fn bd_performance(
        &self,
        context: &BdContext,
        spec: &TimeRangeSpec,
        input: &ReportingInput,
    ) -> Result<BdPerformanceReport> {
        info!(
            "Building performance report for {} ({}) over {:?}",
            context.bd_name, context.bd_code, spec
        );

        let months = month_keys(spec, self.now)?;
        let latest = months
            .last()
            .copied()
            .ok_or_else(|| ReportingError::DateError("Time range covers no months".to_string()))?;

        let bd_records: Vec<AnalyticsRecord> = input
            .records
            .iter()
            .filter(|r| r.bd_name.as_deref().map(str::trim) == Some(context.bd_name.trim()))
            .cloned()
            .collect();
        debug!(
            "{} of {} records belong to {}",
            bd_records.len(),
            input.records.len(),
            context.bd_name
        );

        let summary = self
            .group_records(&bd_records, spec)?
            .into_iter()
            .find(|s| s.entity == context.bd_name.trim());
        let summary_change = summary
            .as_ref()
            .filter(|_| spec.is_comparison())
            .and_then(|s| self.comparison_change(s));

        let kpis = self.kpis(&bd_records, spec)?;
        let kpi_change = match (spec.is_comparison(), kpis.as_slice()) {
            (true, [past, latest]) => Some(self.kpi_change(latest, past)),
            _ => None,
        };

        let achieved = targets::achieved_in_month(&bd_records, &context.bd_name, latest);
        let target = target_status(&input.targets, context, latest.month, latest.year, achieved)?;
        let reconciliation = reconcile_bd(
            context,
            latest.month,
            latest.year,
            &input.projections,
            &bd_records,
        )?;

        Ok(BdPerformanceReport {
            context: context.clone(),
            month_labels: months.iter().map(MonthKey::label).collect(),
            summary,
            summary_change,
            kpis,
            kpi_change,
            target,
            reconciliation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn engine() -> ReportingEngine {
        let now = Utc.with_ymd_and_hms(2025, 3, 16, 9, 0, 0).unwrap();
        ReportingEngine::new(EngineConfig::default(), now).unwrap()
    }

    #[test]
    fn test_engine_rejects_invalid_config() {
        let config = EngineConfig {
            unbounded_growth_sentinel: 10.0,
            ..Default::default()
        };
        assert!(ReportingEngine::new(config, Utc::now()).is_err());
    }

    #[test]
    fn test_engine_uses_configured_sentinel() {
        let config = EngineConfig {
            unbounded_growth_sentinel: 9999.0,
            amount_decimals: 1,
            ..Default::default()
        };
        let engine = ReportingEngine::new(config, Utc::now()).unwrap();
        assert_eq!(engine.percent_change(5.0, 0.0), 9999.0);
        assert_eq!(engine.format_amount(1_260.0), "1.3K");
    }

    #[test]
    fn test_configured_sentinel_reaches_panels_and_kpis() {
        let config = EngineConfig {
            unbounded_growth_sentinel: 9999.0,
            ..Default::default()
        };
        let now = Utc.with_ymd_and_hms(2025, 3, 16, 9, 0, 0).unwrap();
        let engine = ReportingEngine::new(config, now).unwrap();
        let input = ReportingInput {
            records: vec![AnalyticsRecord {
                bd_name: Some("Asha".to_string()),
                client_code: Some("C-01".to_string()),
                regis_no: Some("R-1".to_string()),
                regis_date: NaiveDate::from_ymd_opt(2025, 3, 5),
                regis_val: Some(100.0),
                ..Default::default()
            }],
            ..Default::default()
        };
        let spec = TimeRangeSpec::Comparison {
            label_a: "February 2025".to_string(),
            label_b: "March 2025".to_string(),
        };

        let panels = engine.group_records(&input.records, &spec).unwrap();
        assert_eq!(engine.comparison_change(&panels[0]).unwrap().value, 9999.0);
        assert_eq!(engine.monthly_changes(&panels[0])[0].registrations, 9999.0);
        assert_eq!(engine.month_over_month(&[0.0, 3.0]), vec![9999.0]);

        let report = engine
            .bd_performance(&BdContext::new("BD01", "Asha"), &spec, &input)
            .unwrap();
        assert_eq!(report.summary_change.unwrap().value, 9999.0);
        assert_eq!(report.kpi_change.unwrap().registrations, 9999.0);
    }

    #[test]
    fn test_engine_month_vocabulary() {
        let labels = engine().available_month_labels();
        assert_eq!(labels.len(), 13);
        assert_eq!(labels[0], "March 2025");
    }

    #[test]
    fn test_group_records_orders_by_date_not_arrival() {
        let record = |no: &str, month: u32, value: f64| AnalyticsRecord {
            bd_name: Some("Asha".to_string()),
            regis_no: Some(no.to_string()),
            regis_date: NaiveDate::from_ymd_opt(2025, month, 3),
            regis_val: Some(value),
            ..Default::default()
        };
        // Newest first on purpose.
        let records = vec![record("R-3", 3, 300.0), record("R-1", 1, 100.0)];

        let panels = engine()
            .group_records(&records, &TimeRangeSpec::Relative { months_back: 2 })
            .unwrap();
        assert_eq!(panels.len(), 1);
        let values: Vec<f64> = panels[0].months.iter().map(|m| m.value).collect();
        assert_eq!(values, vec![100.0, 0.0, 300.0]);
    }
}
