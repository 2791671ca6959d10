use crate::calendar::MonthKey;
use crate::schema::{AnalyticsRecord, RawPeriodRow};
use crate::summary::{render_summary, SummaryEntry, SummaryMap};
use log::debug;
use std::collections::{HashMap, HashSet};

#[derive(Default, Clone)]
struct PeriodAccumulator {
    registrations: u64,
    value: f64,
    verticals: SummaryMap,
    clients: SummaryMap,
}

fn label_or<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
}

fn non_empty_summary(entries: &SummaryMap) -> Option<String> {
    if entries.is_empty() {
        None
    } else {
        Some(render_summary(entries))
    }
}

/// Buckets raw registrations into one row per BD per month, the same shape the
/// per-period summary endpoint returns. Rows are stamped with their month, so
/// grouping aligns them by key rather than by arrival order.
///
/// Each BD gets a row for every distinct month in `months`, zero where nothing
/// was registered. A registration number is counted once.
pub fn period_rows_from_records(
    records: &[AnalyticsRecord],
    months: &[MonthKey],
    unassigned_label: &str,
) -> Vec<RawPeriodRow> {
    let mut order: Vec<&str> = Vec::new();
    let mut per_bd: HashMap<&str, Vec<PeriodAccumulator>> = HashMap::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut skipped = 0usize;

    let mut distinct: Vec<MonthKey> = Vec::with_capacity(months.len());
    for month in months {
        if !distinct.contains(month) {
            distinct.push(*month);
        }
    }
    let months = distinct.as_slice();

    for record in records {
        let Some((date, value)) = record.registration() else {
            continue;
        };
        let Some(slot) = months.iter().position(|m| m.contains(date)) else {
            skipped += 1;
            continue;
        };
        if let Some(key) = record.registration_key() {
            if !seen.insert(key) {
                continue;
            }
        }

        let bd = label_or(record.bd_name.as_deref(), unassigned_label);
        let accumulators = per_bd.entry(bd).or_insert_with(|| {
            order.push(bd);
            vec![PeriodAccumulator::default(); months.len()]
        });

        let acc = &mut accumulators[slot];
        let entry = SummaryEntry::new(1, value);
        acc.registrations += 1;
        acc.value += value;
        acc.verticals
            .entry(label_or(record.vertical.as_deref(), "Unspecified").to_string())
            .or_default()
            .absorb(entry);
        let client = [record.client_name.as_deref(), record.client_code.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|v| !v.is_empty())
            .unwrap_or("Unknown");
        acc.clients.entry(client.to_string()).or_default().absorb(entry);
    }

    if skipped > 0 {
        debug!("{} registrations fell outside the requested months", skipped);
    }

    order
        .into_iter()
        .flat_map(|bd| {
            let accumulators = per_bd.remove(bd).unwrap_or_default();
            months
                .iter()
                .zip(accumulators)
                .map(move |(month, acc)| RawPeriodRow {
                    entity: bd.to_string(),
                    registrations: acc.registrations,
                    regis_value: acc.value,
                    vertical_summary: non_empty_summary(&acc.verticals),
                    client_summary: non_empty_summary(&acc.clients),
                    month: Some(month.month),
                    year: Some(month.year),
                })
        })
        .collect()
}
