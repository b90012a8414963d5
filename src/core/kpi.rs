//! Headline KPIs, payment groups and the emission worklist

use chrono::NaiveDate;
use serde::Serialize;

use crate::core::classify::{
    EmissionState, FinancialBucket, classify_emission, classify_payment,
};
use crate::core::math::ratio;
use crate::core::types::{BillingRecord, RefMonth};

/// Count, money, energy and implied tariff (money per kWh) of a row subset.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub(crate) struct Tally {
    pub(crate) count: usize,
    pub(crate) value: f64,
    pub(crate) mwh: f64,
    pub(crate) tariff: f64,
}

impl Tally {
    fn add(&mut self, value: f64, kwh: f64) {
        self.count += 1;
        self.value += value;
        self.mwh += kwh / 1000.0;
    }

    fn close(mut self) -> Self {
        self.tariff = ratio(self.value, self.mwh * 1000.0);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Kpis {
    /// Issued invoices: settled money over compensated energy
    pub(crate) realized: Tally,
    /// Not yet issued: estimated money over contracted energy
    pub(crate) pending: Tally,
    /// Every row: estimated money over contracted energy
    pub(crate) estimated: Tally,
    pub(crate) records: usize,
    pub(crate) revenue: f64,
    pub(crate) energy_mwh: f64,
    pub(crate) average_ticket: f64,
    pub(crate) average_consumption_kwh: f64,
}

/// Monetary value of a row; CRM-only rows never carry money.
fn money(record: &BillingRecord, amount: f64) -> f64 {
    if record.is_crm_only() { 0.0 } else { amount }
}

pub(crate) fn kpis(rows: &[&BillingRecord], today: NaiveDate) -> Kpis {
    let mut realized = Tally::default();
    let mut pending = Tally::default();
    let mut estimated = Tally::default();

    for row in rows {
        let state = classify_emission(row.predicted_emission, row.emission, row.settled, today);
        if state == EmissionState::Issued {
            realized.add(money(row, row.settled), row.compensated_kwh);
        } else {
            pending.add(money(row, row.estimated), row.contracted_kwh);
        }
        estimated.add(money(row, row.estimated), row.contracted_kwh);
    }

    let (realized, pending, estimated) = (realized.close(), pending.close(), estimated.close());
    let records = rows.len();
    let revenue = realized.value + pending.value;
    let energy_mwh = realized.mwh + pending.mwh;

    Kpis {
        realized,
        pending,
        estimated,
        records,
        revenue,
        energy_mwh,
        average_ticket: ratio(revenue, records as f64),
        average_consumption_kwh: ratio(energy_mwh * 1000.0, records as f64),
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct FinanceLine {
    pub(crate) uc: String,
    pub(crate) name: String,
    pub(crate) utility: String,
    pub(crate) month: Option<RefMonth>,
    pub(crate) status: String,
    pub(crate) due_date: Option<NaiveDate>,
    pub(crate) invoiced: f64,
    pub(crate) compensated_kwh: f64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct FinanceGroup {
    pub(crate) bucket: FinancialBucket,
    pub(crate) lines: Vec<FinanceLine>,
    pub(crate) total_invoiced: f64,
    pub(crate) compensated_mwh: f64,
}

/// Partition rows into the four payment buckets, in fixed order.
pub(crate) fn financial_groups(rows: &[&BillingRecord], today: NaiveDate) -> Vec<FinanceGroup> {
    let mut groups: Vec<FinanceGroup> = FinancialBucket::ALL
        .iter()
        .map(|&bucket| FinanceGroup {
            bucket,
            lines: Vec::new(),
            total_invoiced: 0.0,
            compensated_mwh: 0.0,
        })
        .collect();

    for row in rows {
        let bucket = classify_payment(&row.status, row.due_date, today);
        let Some(group) = groups.iter_mut().find(|g| g.bucket == bucket) else {
            continue;
        };
        group.total_invoiced += money(row, row.invoiced);
        group.compensated_mwh += row.compensated_kwh / 1000.0;
        group.lines.push(FinanceLine {
            uc: row.uc.clone(),
            name: row.name.clone(),
            utility: row.utility.clone(),
            month: row.month,
            status: row.status.clone(),
            due_date: row.due_date,
            invoiced: row.invoiced,
            compensated_kwh: row.compensated_kwh,
        });
    }
    groups
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct EmissionLine {
    pub(crate) uc: String,
    pub(crate) name: String,
    pub(crate) utility: String,
    pub(crate) stage: String,
    pub(crate) month: Option<RefMonth>,
    pub(crate) predicted: Option<NaiveDate>,
    pub(crate) emitted: Option<NaiveDate>,
    pub(crate) estimated: f64,
    pub(crate) settled: f64,
    pub(crate) state: EmissionState,
}

/// Per-row emission state, optionally narrowed by state and a name/account search.
pub(crate) fn emission_lines(
    rows: &[&BillingRecord],
    today: NaiveDate,
    state: Option<EmissionState>,
    search: Option<&str>,
) -> Vec<EmissionLine> {
    let term = search.map(str::to_lowercase).filter(|t| !t.is_empty());
    rows.iter()
        .filter(|r| {
            term.as_ref().is_none_or(|t| {
                r.name.to_lowercase().contains(t) || r.uc.to_lowercase().contains(t)
            })
        })
        .map(|r| EmissionLine {
            uc: r.uc.clone(),
            name: r.name.clone(),
            utility: r.utility.clone(),
            stage: r.stage.clone(),
            month: r.month,
            predicted: r.predicted_emission.date(),
            emitted: r.emission.date(),
            estimated: r.estimated,
            settled: r.settled,
            state: classify_emission(r.predicted_emission, r.emission, r.settled, today),
        })
        .filter(|line| state.is_none_or(|s| s == line.state))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DateField;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn row(uc: &str, status: &str, due: Option<(i32, u32, u32)>) -> BillingRecord {
        BillingRecord {
            uc: uc.to_string(),
            status: status.to_string(),
            due_date: due.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            invoiced: 100.0,
            compensated_kwh: 500.0,
            ..Default::default()
        }
    }

    #[test]
    fn buckets_partition_the_set() {
        let rows = vec![
            row("1", "PAID", None),
            row("2", "SENT", Some((2020, 1, 1))),
            row("3", "SENT", Some((2099, 1, 1))),
            row("4", "Indefinido", None),
            row("5", "REFUNDED", None),
            row("6", "LATE", None),
        ];
        let refs: Vec<&BillingRecord> = rows.iter().collect();
        let groups = financial_groups(&refs, today());

        let total: usize = groups.iter().map(|g| g.lines.len()).sum();
        assert_eq!(total, rows.len());
        for r in &rows {
            let hits = groups
                .iter()
                .filter(|g| g.lines.iter().any(|l| l.uc == r.uc))
                .count();
            assert_eq!(hits, 1, "row {} in {hits} buckets", r.uc);
        }
        assert_eq!(groups[0].bucket, FinancialBucket::Paid);
        assert_eq!(groups[1].lines.len(), 2);
        assert_eq!(groups[2].lines.len(), 1);
        assert_eq!(groups[3].lines.len(), 2);
        assert_eq!(groups[3].total_invoiced, 200.0);
        assert_eq!(groups[3].compensated_mwh, 1.0);
    }

    #[test]
    fn crm_rows_do_not_add_money() {
        let crm = BillingRecord {
            source_tag: Some("RD".to_string()),
            ..row("1", "PAID", None)
        };
        let groups = financial_groups(&[&crm], today());
        assert_eq!(groups[0].lines.len(), 1);
        assert_eq!(groups[0].total_invoiced, 0.0);
    }

    #[test]
    fn kpis_split_realized_and_pending() {
        let issued = BillingRecord {
            uc: "1".to_string(),
            settled: 400.0,
            estimated: 450.0,
            compensated_kwh: 2000.0,
            contracted_kwh: 2500.0,
            ..Default::default()
        };
        let waiting = BillingRecord {
            uc: "2".to_string(),
            estimated: 300.0,
            contracted_kwh: 1500.0,
            predicted_emission: DateField::Date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()),
            ..Default::default()
        };
        let k = kpis(&[&issued, &waiting], today());
        assert_eq!(k.realized.count, 1);
        assert_eq!(k.realized.value, 400.0);
        assert_eq!(k.realized.mwh, 2.0);
        assert_eq!(k.realized.tariff, 0.2);
        assert_eq!(k.pending.count, 1);
        assert_eq!(k.pending.value, 300.0);
        assert_eq!(k.pending.tariff, 0.2);
        assert_eq!(k.estimated.value, 750.0);
        assert_eq!(k.estimated.mwh, 4.0);
        assert_eq!(k.revenue, 700.0);
        assert_eq!(k.energy_mwh, 3.5);
        assert_eq!(k.average_ticket, 350.0);
        assert_eq!(k.average_consumption_kwh, 1750.0);
    }

    #[test]
    fn kpis_of_nothing_are_zero() {
        let k = kpis(&[], today());
        assert_eq!(k.records, 0);
        assert_eq!(k.average_ticket, 0.0);
        assert_eq!(k.realized.tariff, 0.0);
    }

    #[test]
    fn emission_worklist_filters_by_state() {
        let late = BillingRecord {
            uc: "1".to_string(),
            name: "Mercado".to_string(),
            predicted_emission: DateField::Date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()),
            ..Default::default()
        };
        let waiting = BillingRecord {
            uc: "2".to_string(),
            name: "Loja".to_string(),
            ..Default::default()
        };
        let rows = [&late, &waiting];
        let all = emission_lines(&rows, today(), None, None);
        assert_eq!(all.len(), 2);
        let only_late = emission_lines(&rows, today(), Some(EmissionState::Late), None);
        assert_eq!(only_late.len(), 1);
        assert_eq!(only_late[0].uc, "1");
        let searched = emission_lines(&rows, today(), None, Some("LOJA"));
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].state, EmissionState::Awaiting);
    }
}
