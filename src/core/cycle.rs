//! Billing-cycle tagging and the per-account customer report

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::classify::{FinancialBucket, payment_badge};
use crate::core::math::{ratio, round_to};
use crate::core::types::{BillingRecord, RefMonth};

const UNDER_REVIEW_STATUS: &str = "em análise";
const SERIES_MONTHS: usize = 12;
const RECENT_INVOICES: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum CyclePhase {
    NoCompensation,
    UnderReview,
    FirstBilling,
    Recurring,
}

impl CyclePhase {
    pub(crate) fn label(self) -> &'static str {
        match self {
            CyclePhase::NoCompensation => "No compensation",
            CyclePhase::UnderReview => "Under review",
            CyclePhase::FirstBilling => "First billing",
            CyclePhase::Recurring => "Recurring",
        }
    }
}

fn is_valid_status(status: &str) -> bool {
    payment_badge(status).is_some() && status.trim().to_lowercase() != UNDER_REVIEW_STATUS
}

/// Billing-fact rows of one account, sorted by reference month (unknown months first).
fn account_rows<'a>(rows: &[&'a BillingRecord], uc: &str) -> Vec<&'a BillingRecord> {
    let mut out: Vec<&BillingRecord> = rows
        .iter()
        .copied()
        .filter(|r| r.uc == uc && !r.is_crm_only())
        .collect();
    out.sort_by_key(|r| r.month);
    out
}

/// Tag each row of `uc` with its cycle phase, in month order.
pub(crate) fn billing_cycle<'a>(
    rows: &[&'a BillingRecord],
    uc: &str,
) -> Vec<(&'a BillingRecord, CyclePhase)> {
    let mut first_seen = false;
    account_rows(rows, uc)
        .into_iter()
        .map(|row| {
            let phase = if row.compensated_kwh <= 0.0 {
                CyclePhase::NoCompensation
            } else if !is_valid_status(&row.status) {
                CyclePhase::UnderReview
            } else if !first_seen {
                first_seen = true;
                CyclePhase::FirstBilling
            } else {
                CyclePhase::Recurring
            };
            (row, phase)
        })
        .collect()
}

/// Cost with the service: our invoice plus what the distributor still bills.
fn cost_with(row: &BillingRecord) -> f64 {
    if row.is_equatorial_go_consortium() {
        row.settled
    } else {
        row.settled + row.distributor_invoice
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CustomerProfile {
    pub(crate) uc: String,
    pub(crate) name: String,
    pub(crate) utility: String,
    pub(crate) stage: String,
    pub(crate) contracted_kwh: f64,
    pub(crate) discount_pct: f64,
    pub(crate) first_savings_month: Option<RefMonth>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct MonthSummary {
    pub(crate) month: Option<RefMonth>,
    pub(crate) cost_with: f64,
    pub(crate) cost_without: f64,
    pub(crate) savings: f64,
    pub(crate) compensated_kwh: f64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct InvoiceLine {
    pub(crate) month: Option<RefMonth>,
    pub(crate) status: String,
    pub(crate) badge: Option<FinancialBucket>,
    pub(crate) phase: CyclePhase,
    pub(crate) due_date: Option<chrono::NaiveDate>,
    pub(crate) settled: f64,
    pub(crate) savings: f64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CustomerReport {
    pub(crate) profile: CustomerProfile,
    pub(crate) total_savings: f64,
    pub(crate) cost_with: f64,
    pub(crate) cost_without: f64,
    pub(crate) consumed_kwh: f64,
    pub(crate) compensated_kwh: f64,
    pub(crate) efficiency_pct: f64,
    pub(crate) free_months: f64,
    pub(crate) series: Vec<MonthSummary>,
    pub(crate) invoices: Vec<InvoiceLine>,
}

/// Report for one account, `None` when it has no billing rows.
pub(crate) fn customer_report(rows: &[&BillingRecord], uc: &str) -> Option<CustomerReport> {
    let cycle = billing_cycle(rows, uc);
    let (latest, _) = cycle.last()?;

    let mut total_savings = 0.0;
    let mut total_with = 0.0;
    let mut total_without = 0.0;
    let mut consumed_kwh = 0.0;
    let mut compensated_kwh = 0.0;
    let mut valid_invoices = 0usize;
    let mut efficiency_sum = 0.0;
    let mut efficiency_count = 0usize;
    let mut by_month: BTreeMap<Option<RefMonth>, MonthSummary> = BTreeMap::new();

    for (row, _) in &cycle {
        let with = cost_with(row);
        let without = with + row.savings;
        total_savings += row.savings;
        total_with += with;
        consumed_kwh += row.consumed_kwh;
        compensated_kwh += row.compensated_kwh;
        if without > 0.0 {
            total_without += without;
            valid_invoices += 1;
        }
        if row.efficiency > 0.0 {
            efficiency_sum += row.efficiency;
            efficiency_count += 1;
        }

        let month = by_month.entry(row.month).or_insert(MonthSummary {
            month: row.month,
            cost_with: 0.0,
            cost_without: 0.0,
            savings: 0.0,
            compensated_kwh: 0.0,
        });
        month.cost_with += with;
        month.cost_without += without;
        month.savings += row.savings;
        month.compensated_kwh += row.compensated_kwh;
    }

    let average_without = ratio(total_without, valid_invoices as f64);
    let first_savings_month = cycle
        .iter()
        .find(|(_, phase)| *phase == CyclePhase::FirstBilling)
        .and_then(|(row, _)| row.month);

    let series: Vec<MonthSummary> = by_month.into_values().collect();
    let series = series[series.len().saturating_sub(SERIES_MONTHS)..].to_vec();

    let invoices = cycle
        .iter()
        .rev()
        .take(RECENT_INVOICES)
        .map(|(row, phase)| InvoiceLine {
            month: row.month,
            status: row.status.clone(),
            badge: payment_badge(&row.status),
            phase: *phase,
            due_date: row.due_date,
            settled: row.settled,
            savings: row.savings,
        })
        .collect();

    Some(CustomerReport {
        profile: CustomerProfile {
            uc: latest.uc.clone(),
            name: latest.name.clone(),
            utility: latest.utility.clone(),
            stage: latest.stage.clone(),
            contracted_kwh: latest.contracted_kwh,
            discount_pct: latest.discount_pct,
            first_savings_month,
        },
        total_savings,
        cost_with: total_with,
        cost_without: total_with + total_savings,
        consumed_kwh,
        compensated_kwh,
        efficiency_pct: round_to(ratio(efficiency_sum, efficiency_count as f64) * 100.0, 1),
        free_months: round_to(ratio(total_savings, average_without), 1),
        series,
        invoices,
    })
}
