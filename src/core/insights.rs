//! Business-intelligence breakdowns over the filtered billing set

use std::collections::BTreeMap;

use serde::Serialize;

use crate::consts::{UNKNOWN_GROUP, UNKNOWN_REASON};
use crate::core::classify::FunnelStage;
use crate::core::math::{percent, ratio, round_to};
use crate::core::types::BillingRecord;

/// Emission delays outside this window are data errors, not SLA.
const SLA_MIN_DAYS: i64 = -5;
const SLA_MAX_DAYS: i64 = 60;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct NatureSplit {
    pub(crate) nature: &'static str,
    pub(crate) accounts: usize,
    pub(crate) kwh: f64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChurnReason {
    pub(crate) reason: String,
    pub(crate) accounts: usize,
    pub(crate) kwh: f64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct UtilityAverage {
    pub(crate) utility: String,
    pub(crate) average: f64,
    pub(crate) samples: usize,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TariffGroupTicket {
    pub(crate) group: String,
    pub(crate) macro_group: &'static str,
    pub(crate) invoices: usize,
    pub(crate) average_ticket: f64,
    pub(crate) average_kwh: f64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Insights {
    pub(crate) nature: Vec<NatureSplit>,
    pub(crate) churn: Vec<ChurnReason>,
    pub(crate) churn_rate_pct: f64,
    pub(crate) discount_pct: f64,
    pub(crate) discount_by_utility: Vec<UtilityAverage>,
    pub(crate) tickets: Vec<TariffGroupTicket>,
    pub(crate) sla_days: f64,
    pub(crate) sla_by_utility: Vec<UtilityAverage>,
}

const MAX_CHURN_REASONS: usize = 7;

#[derive(Default)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn value(&self) -> f64 {
        ratio(self.sum, self.count as f64)
    }
}

fn is_churned(stage: &str) -> bool {
    matches!(
        FunnelStage::classify(stage),
        FunnelStage::BeingCancelled | FunnelStage::Cancelled
    ) || stage == "Cancelado"
}

fn per_utility(means: BTreeMap<&str, Mean>, places: i32) -> Vec<UtilityAverage> {
    let mut out: Vec<UtilityAverage> = means
        .into_iter()
        .map(|(utility, mean)| UtilityAverage {
            utility: utility.to_string(),
            average: round_to(mean.value(), places),
            samples: mean.count,
        })
        .collect();
    out.sort_by(|a, b| b.average.total_cmp(&a.average));
    out
}

/// `rows` is the filtered month-level set, `profiles` the same set collapsed per account.
pub(crate) fn insights(rows: &[&BillingRecord], profiles: &[&BillingRecord]) -> Insights {
    let mut pj = NatureSplit {
        nature: "PJ",
        accounts: 0,
        kwh: 0.0,
    };
    let mut pf = NatureSplit {
        nature: "PF",
        accounts: 0,
        kwh: 0.0,
    };
    let mut churn: BTreeMap<String, (usize, f64)> = BTreeMap::new();

    for profile in profiles {
        let kwh = profile.energy_kwh();
        match profile.customer_nature.as_deref() {
            Some("PJ") => {
                pj.accounts += 1;
                pj.kwh += kwh;
            }
            Some("PF") => {
                pf.accounts += 1;
                pf.kwh += kwh;
            }
            _ => {}
        }
        if is_churned(&profile.stage) {
            let reason = profile
                .cancellation_reason
                .clone()
                .unwrap_or_else(|| UNKNOWN_REASON.to_string());
            let entry = churn.entry(reason).or_default();
            entry.0 += 1;
            entry.1 += kwh;
        }
    }

    let churned: usize = churn.values().map(|(n, _)| n).sum();
    let mut churn: Vec<ChurnReason> = churn
        .into_iter()
        .map(|(reason, (accounts, kwh))| ChurnReason {
            reason,
            accounts,
            kwh,
        })
        .collect();
    churn.sort_by(|a, b| b.accounts.cmp(&a.accounts));
    churn.truncate(MAX_CHURN_REASONS);

    let mut discount = Mean::default();
    let mut discounts: BTreeMap<&str, Mean> = BTreeMap::new();
    let mut groups: BTreeMap<String, (usize, f64, f64)> = BTreeMap::new();
    let mut sla = Mean::default();
    let mut slas: BTreeMap<&str, Mean> = BTreeMap::new();

    for row in rows {
        if row.discount_pct > 0.0 {
            discount.add(row.discount_pct);
            discounts.entry(row.utility.as_str()).or_default().add(row.discount_pct);
        }
        if let Some(group) = row.tariff_group.as_deref()
            && group.trim() != UNKNOWN_GROUP
            && row.invoiced > 0.0
        {
            let entry = groups.entry(group.trim().to_uppercase()).or_default();
            entry.0 += 1;
            entry.1 += row.invoiced;
            entry.2 += row.consumed_kwh;
        }
        if let (Some(ours), Some(theirs)) = (row.emission.date(), row.distributor_emission) {
            let days = (ours - theirs).num_days();
            if (SLA_MIN_DAYS..=SLA_MAX_DAYS).contains(&days) {
                sla.add(days as f64);
                slas.entry(row.utility.as_str()).or_default().add(days as f64);
            }
        }
    }

    let tickets = groups
        .into_iter()
        .map(|(group, (invoices, total, kwh))| TariffGroupTicket {
            macro_group: if group.starts_with('A') { "A" } else { "B" },
            group,
            invoices,
            average_ticket: ratio(total, invoices as f64),
            average_kwh: ratio(kwh, invoices as f64),
        })
        .collect();

    Insights {
        nature: [pj, pf].into_iter().filter(|n| n.accounts > 0).collect(),
        churn,
        churn_rate_pct: round_to(percent(churned, profiles.len()), 1),
        discount_pct: round_to(discount.value(), 1),
        discount_by_utility: per_utility(discounts, 1),
        tickets,
        sla_days: sla.value().round(),
        sla_by_utility: per_utility(slas, 0),
    }
}
