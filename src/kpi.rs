use crate::change::{percent_change_with, UNBOUNDED_GROWTH};
use crate::schema::AnalyticsRecord;
use crate::time_range::{DateRange, ResolvedRange};
use crate::utils::finite_or_zero;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSummary {
    pub inquiries: u64,
    /// Distinct quotation numbers.
    pub quotations: u64,
    pub quotation_value: f64,
    /// Distinct registration numbers.
    pub registrations: u64,
    pub registration_value: f64,
    /// Registrations per hundred quotations; 0 when there were no quotations.
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiChange {
    pub inquiries: f64,
    pub quotations: f64,
    pub quotation_value: f64,
    pub registrations: f64,
    pub registration_value: f64,
}

impl KpiSummary {
    /// Counts what happened inside `range`. Each kind of event is dated by its
    /// own field, so one record can count as an inquiry in one range and as a
    /// registration in another. Quotations and registrations sharing a number
    /// are counted once, with the first occurrence's value; rows without a
    /// number each count on their own.
    pub fn from_records(records: &[AnalyticsRecord], range: &DateRange) -> Self {
        let mut summary = KpiSummary::default();
        let mut seen_quotations: HashSet<&str> = HashSet::new();
        let mut seen_registrations: HashSet<&str> = HashSet::new();

        for record in records {
            if record.inq_date.is_some_and(|d| range.contains_date(d)) {
                summary.inquiries += 1;
            }

            if record.quot_date.is_some_and(|d| range.contains_date(d))
                && first_sighting(&mut seen_quotations, record.quotation_key())
            {
                summary.quotations += 1;
                summary.quotation_value += finite_or_zero(record.quot_val_after_dis.unwrap_or(0.0));
            }

            if let Some((date, value)) = record.registration() {
                if range.contains_date(date)
                    && first_sighting(&mut seen_registrations, record.registration_key())
                {
                    summary.registrations += 1;
                    summary.registration_value += value;
                }
            }
        }

        summary.conversion_rate = if summary.quotations == 0 {
            0.0
        } else {
            summary.registrations as f64 / summary.quotations as f64 * 100.0
        };

        summary
    }

    /// One summary per resolved range, oldest first.
    pub fn for_range(records: &[AnalyticsRecord], resolved: &ResolvedRange) -> Vec<Self> {
        resolved
            .ranges()
            .iter()
            .map(|range| Self::from_records(records, range))
            .collect()
    }

    /// Percentage change from `past` to `self`.
    pub fn change_from(&self, past: &KpiSummary) -> KpiChange {
        self.change_from_with(past, UNBOUNDED_GROWTH)
    }

    /// Same as [`KpiSummary::change_from`], reporting growth from zero as `sentinel`.
    pub fn change_from_with(&self, past: &KpiSummary, sentinel: f64) -> KpiChange {
        let change = |latest: f64, past: f64| percent_change_with(latest, past, sentinel);
        KpiChange {
            inquiries: change(self.inquiries as f64, past.inquiries as f64),
            quotations: change(self.quotations as f64, past.quotations as f64),
            quotation_value: change(self.quotation_value, past.quotation_value),
            registrations: change(self.registrations as f64, past.registrations as f64),
            registration_value: change(self.registration_value, past.registration_value),
        }
    }
}

fn first_sighting<'a>(seen: &mut HashSet<&'a str>, key: Option<&'a str>) -> bool {
    match key {
        Some(key) => seen.insert(key),
        None => true,
    }
}
