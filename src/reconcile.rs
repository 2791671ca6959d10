use crate::calendar::{week_of_date, MonthKey, WEEKS_PER_MONTH};
use crate::error::Result;
use crate::schema::{AnalyticsRecord, BdContext, WeeklyProjection};
use crate::status::{classify, StatusContext, StatusReport};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyBreakdown {
    pub week: u8,
    pub projected_value: f64,
    pub achieved_value: f64,
    pub remarks: Option<String>,
}

impl WeeklyBreakdown {
    pub fn status(&self) -> StatusReport {
        classify(
            self.achieved_value,
            self.projected_value,
            StatusContext::Projection,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientReconciliation {
    pub client_code: String,
    pub client_name: Option<String>,
    pub projected_total: f64,
    pub achieved_total: f64,
    /// Week 1 first.
    pub weekly_breakdown: [WeeklyBreakdown; WEEKS_PER_MONTH],
}

impl ClientReconciliation {
    pub fn status(&self) -> StatusReport {
        classify(
            self.achieved_total,
            self.projected_total,
            StatusContext::Projection,
        )
    }

    pub fn is_projected(&self) -> bool {
        self.projected_total > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekTotal {
    pub week: u8,
    pub projected: f64,
    pub achieved: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BdReconciliation {
    pub bd_code: String,
    pub bd_name: String,
    pub month: u32,
    pub year: i32,
    pub clients: Vec<ClientReconciliation>,
    pub total_projected: f64,
    /// Everything achieved in the month, projected client or not.
    pub total_achieved: f64,
    /// Achieved only by clients that had a projection.
    pub total_achieved_from_projected_clients: f64,
    pub weekly_totals: [WeekTotal; WEEKS_PER_MONTH],
}

impl BdReconciliation {
    /// How well the BD delivered on what they projected.
    pub fn projection_status(&self) -> StatusReport {
        classify(
            self.total_achieved_from_projected_clients,
            self.total_projected,
            StatusContext::Projection,
        )
    }
}

#[derive(Default)]
struct ClientAccumulator {
    client_name: Option<String>,
    projected: [f64; WEEKS_PER_MONTH],
    achieved: [f64; WEEKS_PER_MONTH],
    remarks: [Option<String>; WEEKS_PER_MONTH],
}

impl ClientAccumulator {
    fn add_projection(&mut self, projection: &WeeklyProjection) {
        if self.client_name.is_none() {
            self.client_name = projection.client_name.clone();
        }
        for (idx, slot) in projection.weeks.iter().enumerate() {
            self.projected[idx] += slot.amount();
            if let Some(text) = slot.remarks.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                self.remarks[idx] = Some(match self.remarks[idx].take() {
                    Some(existing) => format!("{}; {}", existing, text),
                    None => text.to_string(),
                });
            }
        }
    }

    fn finish(self, client_code: String) -> ClientReconciliation {
        let ClientAccumulator {
            client_name,
            projected,
            achieved,
            mut remarks,
        } = self;

        let weekly_breakdown = std::array::from_fn(|idx| WeeklyBreakdown {
            week: idx as u8 + 1,
            projected_value: projected[idx],
            achieved_value: achieved[idx],
            remarks: remarks[idx].take(),
        });

        ClientReconciliation {
            client_code,
            client_name,
            projected_total: projected.iter().sum(),
            achieved_total: achieved.iter().sum(),
            weekly_breakdown,
        }
    }
}

fn client_key(record: &AnalyticsRecord) -> Option<&str> {
    [record.client_code.as_deref(), record.client_name.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|key| !key.is_empty())
}

fn client_entry<'m>(
    clients: &'m mut HashMap<String, ClientAccumulator>,
    order: &mut Vec<String>,
    code: &str,
) -> &'m mut ClientAccumulator {
    clients.entry(code.to_string()).or_insert_with(|| {
        order.push(code.to_string());
        ClientAccumulator::default()
    })
}

/// Buckets achievements into the projections' week slots, per client.
///
/// Only records carrying both a registration date and value count, and a
/// registration number is counted once. Clients with neither a projection nor
/// an achievement are left out.
pub fn reconcile(
    projections: &[WeeklyProjection],
    achievements: &[AnalyticsRecord],
) -> Vec<ClientReconciliation> {
    let mut order: Vec<String> = Vec::new();
    let mut clients: HashMap<String, ClientAccumulator> = HashMap::new();

    for projection in projections {
        client_entry(&mut clients, &mut order, projection.client_code.trim())
            .add_projection(projection);
    }

    let mut seen_registrations: HashSet<&str> = HashSet::new();
    for record in achievements {
        let Some((date, value)) = record.registration() else {
            continue;
        };
        if let Some(key) = record.registration_key() {
            if !seen_registrations.insert(key) {
                continue;
            }
        }
        let Some(code) = client_key(record) else {
            debug!("Registration {:?} has no client; not reconciled", record.regis_no);
            continue;
        };

        let week = week_of_date(date);
        let client = client_entry(&mut clients, &mut order, code);
        client.achieved[week as usize - 1] += value;
        if client.client_name.is_none() {
            client.client_name = record.client_name.clone();
        }
    }

    let mut result: Vec<ClientReconciliation> = order
        .into_iter()
        .filter_map(|code| {
            let acc = clients.remove(&code)?;
            let client = acc.finish(code);
            (client.projected_total > 0.0 || client.achieved_total > 0.0).then_some(client)
        })
        .collect();

    result.sort_by(|a, b| {
        b.projected_total
            .total_cmp(&a.projected_total)
            .then_with(|| a.client_code.cmp(&b.client_code))
    });

    result
}

/// Reconciles one BD's month: their projections for that month against their
/// registrations dated in that month.
pub fn reconcile_bd(
    context: &BdContext,
    month: u32,
    year: i32,
    projections: &[WeeklyProjection],
    achievements: &[AnalyticsRecord],
) -> Result<BdReconciliation> {
    let period = MonthKey::new(year, month)?;

    let bd_projections: Vec<WeeklyProjection> = projections
        .iter()
        .filter(|p| p.bd_code == context.bd_code && p.month == month && p.year == year)
        .cloned()
        .collect();

    let bd_achievements: Vec<AnalyticsRecord> = achievements
        .iter()
        .filter(|r| r.bd_name.as_deref().map(str::trim) == Some(context.bd_name.trim()))
        .filter(|r| r.regis_date.is_some_and(|d| period.contains(d)))
        .cloned()
        .collect();

    let clients = reconcile(&bd_projections, &bd_achievements);

    let total_projected: f64 = clients.iter().map(|c| c.projected_total).sum();
    let total_achieved: f64 = clients.iter().map(|c| c.achieved_total).sum();
    let total_achieved_from_projected_clients: f64 = clients
        .iter()
        .filter(|c| c.is_projected())
        .map(|c| c.achieved_total)
        .sum();

    let weekly_totals = std::array::from_fn(|idx| WeekTotal {
        week: idx as u8 + 1,
        projected: clients
            .iter()
            .map(|c| c.weekly_breakdown[idx].projected_value)
            .sum(),
        achieved: clients
            .iter()
            .map(|c| c.weekly_breakdown[idx].achieved_value)
            .sum(),
    });

    info!(
        "Reconciled {} for {}: {} clients, projected {:.2}, achieved {:.2}",
        context.bd_code,
        period,
        clients.len(),
        total_projected,
        total_achieved
    );

    Ok(BdReconciliation {
        bd_code: context.bd_code.clone(),
        bd_name: context.bd_name.clone(),
        month,
        year,
        clients,
        total_projected,
        total_achieved,
        total_achieved_from_projected_clients,
        weekly_totals,
    })
}
