//! Commission on settled invoices

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::core::classify::{FinancialBucket, classify_payment};
use crate::core::math::round_to;
use crate::core::types::{BillingRecord, RefMonth};

/// Per-account commission percentage, maintained outside the billing snapshot.
pub(crate) trait CommissionLookup {
    fn percentage(&self, uc: &str) -> Option<f64>;
}

impl CommissionLookup for HashMap<String, f64> {
    fn percentage(&self, uc: &str) -> Option<f64> {
        self.get(uc).copied()
    }
}

/// Settled amount, net of the distributor invoice for Equatorial GO consortium accounts.
pub(crate) fn commission_base(record: &BillingRecord) -> f64 {
    if record.is_equatorial_go_consortium() {
        (record.settled - record.distributor_invoice).max(0.0)
    } else {
        record.settled
    }
}

/// Commission for one row; anything not `Paid` earns nothing.
pub(crate) fn commission_for(
    record: &BillingRecord,
    bucket: FinancialBucket,
    lookup: &dyn CommissionLookup,
) -> f64 {
    if bucket != FinancialBucket::Paid || record.is_crm_only() {
        return 0.0;
    }
    let pct = lookup.percentage(&record.uc).unwrap_or(0.0);
    commission_base(record) * pct / 100.0
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CommissionLine {
    pub(crate) uc: String,
    pub(crate) name: String,
    pub(crate) utility: String,
    pub(crate) month: Option<RefMonth>,
    pub(crate) settled: f64,
    pub(crate) base: f64,
    pub(crate) percentage: Option<f64>,
    pub(crate) commission: f64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CommissionReport {
    pub(crate) lines: Vec<CommissionLine>,
    pub(crate) total_base: f64,
    pub(crate) total_commission: f64,
    /// Paid rows with no entry in the percentage table
    pub(crate) without_percentage: usize,
}

/// One line per paid billing row.
pub(crate) fn commission_report(
    rows: &[&BillingRecord],
    lookup: &dyn CommissionLookup,
    today: NaiveDate,
) -> CommissionReport {
    let lines: Vec<CommissionLine> = rows
        .iter()
        .filter(|r| !r.is_crm_only())
        .filter(|r| classify_payment(&r.status, r.due_date, today) == FinancialBucket::Paid)
        .map(|r| {
            let percentage = lookup.percentage(&r.uc);
            CommissionLine {
                uc: r.uc.clone(),
                name: r.name.clone(),
                utility: r.utility.clone(),
                month: r.month,
                settled: r.settled,
                base: commission_base(r),
                percentage,
                commission: round_to(commission_for(r, FinancialBucket::Paid, lookup), 2),
            }
        })
        .collect();

    CommissionReport {
        total_base: lines.iter().map(|l| l.base).sum(),
        total_commission: lines.iter().map(|l| l.commission).sum(),
        without_percentage: lines.iter().filter(|l| l.percentage.is_none()).count(),
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn table(entries: &[(&str, f64)]) -> HashMap<String, f64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn paid(uc: &str, utility: &str, consortium: &str, settled: f64, dist: f64) -> BillingRecord {
        BillingRecord {
            uc: uc.to_string(),
            utility: utility.to_string(),
            consortium: Some(consortium.to_string()),
            status: "RECEIVED".to_string(),
            settled,
            distributor_invoice: dist,
            ..Default::default()
        }
    }

    #[test]
    fn equatorial_go_consortium_nets_distributor_invoice() {
        let record = paid("1", "EQUATORIAL GO", "SIM", 1000.0, 300.0);
        assert_eq!(commission_base(&record), 700.0);
        let lookup = table(&[("1", 10.0)]);
        assert_eq!(commission_for(&record, FinancialBucket::Paid, &lookup), 70.0);
    }

    #[test]
    fn base_never_negative() {
        let record = paid("1", "Equatorial Goiás", "sim", 100.0, 300.0);
        assert_eq!(commission_base(&record), 0.0);
    }

    #[test]
    fn other_utilities_use_settled_amount() {
        let record = paid("1", "EQUATORIAL PA", "SIM", 1000.0, 300.0);
        assert_eq!(commission_base(&record), 1000.0);
        let record = paid("1", "EQUATORIAL GO", "NAO", 1000.0, 300.0);
        assert_eq!(commission_base(&record), 1000.0);
    }

    #[test]
    fn unpaid_or_unlisted_earn_nothing() {
        let record = paid("1", "CEMIG", "NAO", 1000.0, 0.0);
        let lookup = table(&[("1", 10.0)]);
        assert_eq!(commission_for(&record, FinancialBucket::Sent, &lookup), 0.0);
        assert_eq!(commission_for(&record, FinancialBucket::Paid, &table(&[])), 0.0);
    }

    #[test]
    fn report_only_lists_paid_rows() {
        let a = paid("1", "EQUATORIAL GO", "SIM", 1000.0, 300.0);
        let b = paid("2", "CEMIG", "NAO", 500.0, 0.0);
        let open = BillingRecord {
            status: "SENT".to_string(),
            ..paid("3", "CEMIG", "NAO", 900.0, 0.0)
        };
        let crm_only = BillingRecord {
            source_tag: Some("RD".to_string()),
            ..paid("4", "CEMIG", "NAO", 900.0, 0.0)
        };
        let lookup = table(&[("1", 10.0), ("3", 50.0), ("4", 50.0)]);
        let report = commission_report(&[&a, &b, &open, &crm_only], &lookup, today());
        assert_eq!(report.lines.len(), 2);
        assert_eq!(report.total_base, 1200.0);
        assert_eq!(report.total_commission, 70.0);
        assert_eq!(report.without_percentage, 1);
    }
}
