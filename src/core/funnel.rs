//! Funnel counts and lifecycle transition times

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::core::classify::{FunnelStage, stage_sort_key};
use crate::core::types::{BillingRecord, CrmRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub(crate) struct Milestone {
    pub(crate) accounts: usize,
    pub(crate) kwh: f64,
}

impl Milestone {
    fn record(&mut self, date: Option<NaiveDate>, kwh: f64) {
        if date.is_some() {
            self.accounts += 1;
            self.kwh += kwh;
        }
    }
}

/// Day differences between two milestones; inverted pairs are skipped.
#[derive(Debug, Clone, Copy, Default)]
struct Transition {
    total_days: i64,
    pairs: usize,
}

impl Transition {
    fn record(&mut self, earlier: Option<NaiveDate>, later: Option<NaiveDate>) {
        if let (Some(earlier), Some(later)) = (earlier, later)
            && later >= earlier
        {
            self.total_days += (later - earlier).num_days();
            self.pairs += 1;
        }
    }

    fn average_days(self) -> i64 {
        if self.pairs == 0 {
            0
        } else {
            (self.total_days as f64 / self.pairs as f64).round() as i64
        }
    }
}

/// Accounts reaching each milestone and average days between them.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Journey {
    pub(crate) won: Milestone,
    pub(crate) protocol: Milestone,
    pub(crate) first_savings: Milestone,
    pub(crate) first_invoice: Milestone,
    pub(crate) won_to_protocol_days: i64,
    pub(crate) protocol_to_savings_days: i64,
    pub(crate) savings_to_invoice_days: i64,
}

pub(crate) fn journey(records: &[&CrmRecord]) -> Journey {
    let mut won = Milestone::default();
    let mut protocol = Milestone::default();
    let mut first_savings = Milestone::default();
    let mut first_invoice = Milestone::default();
    let mut won_to_protocol = Transition::default();
    let mut protocol_to_savings = Transition::default();
    let mut savings_to_invoice = Transition::default();

    for record in records {
        let kwh = record.avg_consumption_mwh * 1000.0;
        won.record(record.won_date, kwh);
        let protocol_date = record.protocol_date.date();
        let savings_date = record.first_savings_date.date();
        let invoice_date = record.first_invoice_date.date();
        protocol.record(protocol_date, kwh);
        first_savings.record(savings_date, kwh);
        first_invoice.record(invoice_date, kwh);

        won_to_protocol.record(record.won_date, protocol_date);
        protocol_to_savings.record(protocol_date, savings_date);
        savings_to_invoice.record(savings_date, invoice_date);
    }

    Journey {
        won,
        protocol,
        first_savings,
        first_invoice,
        won_to_protocol_days: won_to_protocol.average_days(),
        protocol_to_savings_days: protocol_to_savings.average_days(),
        savings_to_invoice_days: savings_to_invoice.average_days(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct StageBucket {
    pub(crate) stage: FunnelStage,
    pub(crate) label: &'static str,
    pub(crate) accounts: usize,
    pub(crate) kwh: f64,
}

/// Account profiles per funnel stage, every stage present in display order.
pub(crate) fn stage_buckets(profiles: &[&BillingRecord]) -> Vec<StageBucket> {
    let mut buckets: Vec<StageBucket> = FunnelStage::ALL
        .iter()
        .map(|&stage| StageBucket {
            stage,
            label: stage.label(),
            accounts: 0,
            kwh: 0.0,
        })
        .collect();
    for profile in profiles {
        let stage = FunnelStage::classify(&profile.stage);
        if let Some(bucket) = buckets.iter_mut().find(|b| b.stage == stage) {
            bucket.accounts += 1;
            bucket.kwh += profile.energy_kwh();
        }
    }
    buckets
}

/// Multi-select filters for the CRM overview; empty lists match everything.
#[derive(Debug, Clone, Default)]
pub(crate) struct CrmQuery {
    pub(crate) utilities: Vec<String>,
    pub(crate) areas: Vec<String>,
    pub(crate) stages: Vec<String>,
    pub(crate) statuses: Vec<String>,
    pub(crate) search: Option<String>,
}

impl CrmQuery {
    fn matches(&self, record: &CrmRecord) -> bool {
        let any = |list: &[String], value: &str| list.is_empty() || list.iter().any(|v| v == value);
        let search_ok = match self.search.as_deref().map(str::to_lowercase) {
            Some(term) if !term.is_empty() => {
                record.uc.to_lowercase().contains(&term)
                    || record.business_name.to_lowercase().contains(&term)
            }
            _ => true,
        };
        search_ok
            && any(&self.utilities, &record.utility)
            && any(&self.areas, &record.area)
            && any(&self.stages, &record.stage)
            && any(&self.statuses, &record.status)
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct GroupTotal {
    pub(crate) name: String,
    pub(crate) accounts: usize,
    pub(crate) mwh: f64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CrmOptions {
    pub(crate) utilities: Vec<String>,
    pub(crate) areas: Vec<String>,
    pub(crate) stages: Vec<String>,
    pub(crate) statuses: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CrmOverview {
    pub(crate) accounts: usize,
    pub(crate) mwh: f64,
    pub(crate) by_area: Vec<GroupTotal>,
    pub(crate) by_stage: Vec<GroupTotal>,
    pub(crate) by_status: Vec<GroupTotal>,
    pub(crate) options: CrmOptions,
}

fn group_by<F>(records: &[&CrmRecord], key: F) -> Vec<GroupTotal>
where
    F: Fn(&CrmRecord) -> &str,
{
    let mut groups: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
    for record in records {
        let entry = groups.entry(key(record)).or_default();
        entry.0 += 1;
        entry.1 += record.avg_consumption_mwh;
    }
    groups
        .into_iter()
        .map(|(name, (accounts, mwh))| GroupTotal {
            name: name.to_string(),
            accounts,
            mwh,
        })
        .collect()
}

fn distinct<F>(records: &[CrmRecord], key: F) -> Vec<String>
where
    F: Fn(&CrmRecord) -> &str,
{
    records
        .iter()
        .map(key)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub(crate) fn crm_overview(records: &[CrmRecord], query: &CrmQuery) -> CrmOverview {
    let filtered: Vec<&CrmRecord> = records.iter().filter(|r| query.matches(r)).collect();

    let mut by_stage = group_by(&filtered, |r| r.stage.as_str());
    by_stage.sort_by(|a, b| stage_sort_key(&a.name).cmp(&stage_sort_key(&b.name)));
    let mut stages = distinct(records, |r| r.stage.as_str());
    stages.sort_by(|a, b| stage_sort_key(a).cmp(&stage_sort_key(b)));

    CrmOverview {
        accounts: filtered.len(),
        mwh: filtered.iter().map(|r| r.avg_consumption_mwh).sum(),
        by_area: group_by(&filtered, |r| r.area.as_str()),
        by_stage,
        by_status: group_by(&filtered, |r| r.status.as_str()),
        options: CrmOptions {
            utilities: distinct(records, |r| r.utility.as_str()),
            areas: distinct(records, |r| r.area.as_str()),
            stages,
            statuses: distinct(records, |r| r.status.as_str()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn deal(won: Option<NaiveDate>, protocol: Option<NaiveDate>) -> CrmRecord {
        CrmRecord {
            uc: "1".to_string(),
            won_date: won,
            protocol_date: protocol.into(),
            avg_consumption_mwh: 2.0,
            ..Default::default()
        }
    }

    #[test]
    fn milestones_are_counted_independently() {
        let a = CrmRecord {
            first_savings_date: ymd(2024, 3, 1).into(),
            first_invoice_date: ymd(2024, 3, 20).into(),
            ..deal(ymd(2024, 1, 1), ymd(2024, 1, 11))
        };
        let b = deal(ymd(2024, 1, 1), None);
        let j = journey(&[&a, &b]);
        assert_eq!(j.won.accounts, 2);
        assert_eq!(j.won.kwh, 4000.0);
        assert_eq!(j.protocol.accounts, 1);
        assert_eq!(j.first_savings.accounts, 1);
        assert_eq!(j.first_invoice.accounts, 1);
        assert_eq!(j.won_to_protocol_days, 10);
        assert_eq!(j.protocol_to_savings_days, 50);
        assert_eq!(j.savings_to_invoice_days, 19);
    }

    #[test]
    fn inverted_pairs_are_skipped() {
        let ok = deal(ymd(2024, 1, 1), ymd(2024, 1, 4));
        let inverted = deal(ymd(2024, 2, 1), ymd(2024, 1, 1));
        let same_day = deal(ymd(2024, 5, 5), ymd(2024, 5, 5));
        let j = journey(&[&ok, &inverted, &same_day]);
        // (3 + 0) / 2 rounds to 2
        assert_eq!(j.won_to_protocol_days, 2);
    }

    #[test]
    fn no_pairs_average_to_zero() {
        let j = journey(&[]);
        assert_eq!(j.won_to_protocol_days, 0);
        assert_eq!(j.protocol_to_savings_days, 0);
        assert_eq!(j.won.accounts, 0);
    }

    #[test]
    fn stage_buckets_cover_all_stages() {
        let p1 = BillingRecord {
            uc: "1".to_string(),
            stage: "Operacional".to_string(),
            contracted_kwh: 1000.0,
            ..Default::default()
        };
        let p2 = BillingRecord {
            uc: "2".to_string(),
            stage: "Qualquer".to_string(),
            consumed_kwh: 300.0,
            ..Default::default()
        };
        let buckets = stage_buckets(&[&p1, &p2]);
        assert_eq!(buckets.len(), 6);
        assert_eq!(buckets[2].stage, FunnelStage::Operational);
        assert_eq!(buckets[2].kwh, 1000.0);
        assert_eq!(buckets[5].accounts, 1);
        assert_eq!(buckets[5].kwh, 300.0);
    }

    #[test]
    fn crm_overview_filters_and_groups() {
        let rows = vec![
            CrmRecord {
                uc: "100".to_string(),
                business_name: "Padaria Central".to_string(),
                area: "Sul".to_string(),
                stage: "Operacional".to_string(),
                status: "Ativo".to_string(),
                avg_consumption_mwh: 1.0,
                ..Default::default()
            },
            CrmRecord {
                uc: "200".to_string(),
                business_name: "Mercado".to_string(),
                area: "Norte".to_string(),
                stage: "Pré-protocolo".to_string(),
                status: "Stand-by".to_string(),
                avg_consumption_mwh: 2.5,
                ..Default::default()
            },
        ];
        let all = crm_overview(&rows, &CrmQuery::default());
        assert_eq!(all.accounts, 2);
        assert_eq!(all.mwh, 3.5);
        assert_eq!(all.by_stage[0].name, "Pré-protocolo");
        assert_eq!(all.options.stages, vec!["Pré-protocolo", "Operacional"]);

        let query = CrmQuery {
            search: Some("padaria".to_string()),
            ..Default::default()
        };
        let found = crm_overview(&rows, &query);
        assert_eq!(found.accounts, 1);
        assert_eq!(found.by_area[0].name, "Sul");

        let query = CrmQuery {
            statuses: vec!["Stand-by".to_string()],
            ..Default::default()
        };
        assert_eq!(crm_overview(&rows, &query).by_status[0].accounts, 1);
    }
}
