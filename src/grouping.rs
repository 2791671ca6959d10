use crate::calendar::MonthKey;
use crate::change::{percent_change_with, UNBOUNDED_GROWTH};
use crate::error::Result;
use crate::schema::{RawPeriodRow, TimeRangeSpec};
use crate::summary::{parse_summary, SummaryEntry, SummaryMap};
use crate::time_range::month_keys;
use crate::utils::finite_or_zero;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthBucket {
    pub label: String,
    pub registrations: u64,
    pub value: f64,
    pub verticals: SummaryMap,
    pub clients: SummaryMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownRow {
    pub name: String,
    /// One cell per month label, in label order.
    pub cells: Vec<SummaryEntry>,
    pub total: SummaryEntry,
}

/// A sub-entity (vertical or client) by month matrix with row and column totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownTable {
    pub month_labels: Vec<String>,
    pub rows: Vec<BreakdownRow>,
    pub month_totals: Vec<SummaryEntry>,
    pub grand_total: SummaryEntry,
}

impl BreakdownTable {
    pub fn build(month_labels: &[String], per_month: &[&SummaryMap]) -> Self {
        let names: BTreeSet<&String> = per_month.iter().flat_map(|m| m.keys()).collect();

        let mut rows: Vec<BreakdownRow> = names
            .into_iter()
            .map(|name| {
                let cells: Vec<SummaryEntry> = per_month
                    .iter()
                    .map(|m| m.get(name).copied().unwrap_or_default())
                    .collect();
                let mut total = SummaryEntry::default();
                cells.iter().for_each(|cell| total.absorb(*cell));
                BreakdownRow {
                    name: name.clone(),
                    cells,
                    total,
                }
            })
            .collect();

        rows.sort_by(|a, b| {
            b.total
                .value
                .total_cmp(&a.total.value)
                .then_with(|| a.name.cmp(&b.name))
        });

        let mut month_totals = vec![SummaryEntry::default(); month_labels.len()];
        for row in &rows {
            for (total, cell) in month_totals.iter_mut().zip(&row.cells) {
                total.absorb(*cell);
            }
        }

        let mut grand_total = SummaryEntry::default();
        month_totals.iter().for_each(|t| grand_total.absorb(*t));

        Self {
            month_labels: month_labels.to_vec(),
            rows,
            month_totals,
            grand_total,
        }
    }

    pub fn row(&self, name: &str) -> Option<&BreakdownRow> {
        self.rows.iter().find(|r| r.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityChange {
    pub registrations: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMonthlySummary {
    pub entity: String,
    pub total_registrations: u64,
    pub total_value: f64,
    pub months: Vec<MonthBucket>,
    pub vertical_breakdown: BreakdownTable,
    pub client_breakdown: BreakdownTable,
}

impl EntityMonthlySummary {
    pub fn month_labels(&self) -> Vec<&str> {
        self.months.iter().map(|m| m.label.as_str()).collect()
    }

    /// Latest month against the one before it. Only meaningful for comparison
    /// panels, where `months` is exactly `[past, latest]`.
    pub fn comparison_change(&self) -> Option<EntityChange> {
        self.comparison_change_with(UNBOUNDED_GROWTH)
    }

    pub fn comparison_change_with(&self, sentinel: f64) -> Option<EntityChange> {
        match self.months.as_slice() {
            [past, latest] => Some(change_between(past, latest, sentinel)),
            _ => None,
        }
    }

    /// Change between each pair of consecutive months, oldest pair first.
    pub fn monthly_changes(&self) -> Vec<EntityChange> {
        self.monthly_changes_with(UNBOUNDED_GROWTH)
    }

    pub fn monthly_changes_with(&self, sentinel: f64) -> Vec<EntityChange> {
        self.months
            .windows(2)
            .map(|pair| change_between(&pair[0], &pair[1], sentinel))
            .collect()
    }
}

fn change_between(past: &MonthBucket, latest: &MonthBucket, sentinel: f64) -> EntityChange {
    EntityChange {
        registrations: percent_change_with(
            latest.registrations as f64,
            past.registrations as f64,
            sentinel,
        ),
        value: percent_change_with(latest.value, past.value, sentinel),
    }
}

/// Groups `rows` by entity over the months `spec` covers.
pub fn group(
    rows: &[RawPeriodRow],
    spec: &TimeRangeSpec,
    now: DateTime<Utc>,
) -> Result<Vec<EntityMonthlySummary>> {
    let keys = month_keys(spec, now)?;
    Ok(group_by_months(rows, &keys, spec.is_comparison()))
}

/// Rows are placed into months in one of two ways:
///
/// - If every row of an entity is stamped with `month`/`year`, each row goes to
///   every slot whose month matches its stamp, so a month compared with itself
///   fills both slots. Rows for months outside `months` are dropped and do not
///   count towards totals.
/// - Otherwise rows are zipped with `months` in arrival order (row 0 goes to the
///   oldest month), which requires the fetch layer to deliver them oldest first.
///   Rows beyond the number of months are ignored by the buckets but still
///   count towards non-comparison totals.
///
/// Every summary gets the same month labels in the same order; months without
/// data are zero-filled.
pub fn group_by_months(
    rows: &[RawPeriodRow],
    months: &[MonthKey],
    is_comparison: bool,
) -> Vec<EntityMonthlySummary> {
    let labels: Vec<String> = months.iter().map(MonthKey::label).collect();
    let mut order: Vec<&str> = Vec::new();
    let mut by_entity: HashMap<&str, Vec<&RawPeriodRow>> = HashMap::new();

    for row in rows {
        let entity = row.entity.as_str();
        by_entity
            .entry(entity)
            .or_insert_with(|| {
                order.push(entity);
                Vec::new()
            })
            .push(row);
    }

    info!(
        "Grouping {} rows into {} entities over {} months",
        rows.len(),
        order.len(),
        labels.len()
    );

    order
        .into_iter()
        .map(|entity| {
            let entity_rows = by_entity.get(entity).map(Vec::as_slice).unwrap_or_default();
            summarize_entity(entity, entity_rows, months, &labels, is_comparison)
        })
        .collect()
}

struct AlignedRows<'a> {
    slots: Vec<Vec<&'a RawPeriodRow>>,
    keyed: bool,
}

fn align_rows<'a>(entity: &str, rows: &[&'a RawPeriodRow], months: &[MonthKey]) -> AlignedRows<'a> {
    let mut slots: Vec<Vec<&RawPeriodRow>> = vec![Vec::new(); months.len()];
    let keyed = rows.iter().all(|r| r.period().is_some());

    if keyed {
        for &row in rows {
            let Some(period) = row.period() else {
                continue;
            };
            let mut placed = false;
            for (slot, month) in slots.iter_mut().zip(months) {
                if *month == period {
                    slot.push(row);
                    placed = true;
                }
            }
            if !placed {
                warn!(
                    "Dropping row for '{}' in {}: outside the requested months",
                    entity, period
                );
            }
        }
    } else {
        if rows.len() > months.len() {
            debug!(
                "'{}' has {} rows for {} months; ignoring the extra rows",
                entity,
                rows.len(),
                months.len()
            );
        }
        for (slot, row) in slots.iter_mut().zip(rows.iter().copied()) {
            slot.push(row);
        }
    }

    AlignedRows { slots, keyed }
}

fn summarize_entity(
    entity: &str,
    rows: &[&RawPeriodRow],
    months: &[MonthKey],
    labels: &[String],
    is_comparison: bool,
) -> EntityMonthlySummary {
    let AlignedRows { slots, keyed } = align_rows(entity, rows, months);

    let buckets: Vec<MonthBucket> = labels
        .iter()
        .zip(&slots)
        .map(|(label, slot_rows)| {
            let mut bucket = MonthBucket {
                label: label.clone(),
                registrations: 0,
                value: 0.0,
                verticals: SummaryMap::new(),
                clients: SummaryMap::new(),
            };
            for row in slot_rows {
                bucket.registrations += row.registrations;
                bucket.value += finite_or_zero(row.regis_value);
                merge_into(&mut bucket.verticals, row.vertical_summary.as_deref());
                merge_into(&mut bucket.clients, row.client_summary.as_deref());
            }
            bucket
        })
        .collect();

    let (total_registrations, total_value) = if is_comparison || keyed {
        buckets
            .iter()
            .fold((0, 0.0), |(regs, value), b| (regs + b.registrations, value + b.value))
    } else {
        rows.iter().fold((0, 0.0), |(regs, value), r| {
            (regs + r.registrations, value + finite_or_zero(r.regis_value))
        })
    };

    let verticals: Vec<&SummaryMap> = buckets.iter().map(|b| &b.verticals).collect();
    let clients: Vec<&SummaryMap> = buckets.iter().map(|b| &b.clients).collect();

    EntityMonthlySummary {
        entity: entity.to_string(),
        total_registrations,
        total_value,
        vertical_breakdown: BreakdownTable::build(labels, &verticals),
        client_breakdown: BreakdownTable::build(labels, &clients),
        months: buckets,
    }
}

fn merge_into(target: &mut SummaryMap, summary: Option<&str>) {
    for (name, entry) in parse_summary(summary).entries {
        target.entry(name).or_default().absorb(entry);
    }
}
