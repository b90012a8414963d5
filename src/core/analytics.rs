//! Read-only query surface over one snapshot
//!
//! Every view takes the same selection and "today"; nothing here mutates the
//! snapshot, so views can be computed in any order.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::core::audit::{AuditReport, audit};
use crate::core::classify::EmissionState;
use crate::core::commission::{CommissionLookup, CommissionReport, commission_report};
use crate::core::cycle::{CustomerReport, customer_report};
use crate::core::dedup::{DedupOrder, deduplicate};
use crate::core::filter::Selection;
use crate::core::funnel::{CrmOverview, CrmQuery, Journey, StageBucket, crm_overview, journey, stage_buckets};
use crate::core::growth::{ConsumptionSeries, GrowthPoint, consumption_series, growth_series};
use crate::core::insights::{Insights, insights};
use crate::core::kpi::{EmissionLine, FinanceGroup, Kpis, emission_lines, financial_groups, kpis};
use crate::core::portfolio::{PortfolioMatrix, known_utilities, portfolio_matrix};
use crate::core::types::{BillingRecord, CrmRecord, Snapshot};

pub(crate) struct Analytics {
    snapshot: Arc<Snapshot>,
    selection: Selection,
    today: NaiveDate,
    utilities: Vec<String>,
}

impl Analytics {
    /// `configured_utilities` fixes the portfolio columns; empty derives them from the data.
    pub(crate) fn new(
        snapshot: Arc<Snapshot>,
        selection: Selection,
        today: NaiveDate,
        configured_utilities: &[String],
    ) -> Self {
        let utilities = known_utilities(&snapshot.billing, configured_utilities);
        Self {
            snapshot,
            selection,
            today,
            utilities,
        }
    }

    /// Month rows passing every filter.
    fn billing_rows(&self) -> Vec<&BillingRecord> {
        self.snapshot
            .billing
            .iter()
            .filter(|r| self.selection.matches_billing(r))
            .collect()
    }

    /// Month rows passing the segment filters only; time views pick their own months.
    fn segment_rows(&self) -> Vec<&BillingRecord> {
        self.snapshot
            .billing
            .iter()
            .filter(|r| self.selection.matches_segment(r))
            .collect()
    }

    /// Latest row per account, then the segment filters; an account is
    /// judged by where it stands now, not by an older month.
    fn segment_profiles(&self) -> Vec<&BillingRecord> {
        deduplicate(self.snapshot.billing.iter(), DedupOrder::Chronological)
            .into_iter()
            .filter(|r| self.selection.matches_segment(r))
            .collect()
    }

    fn crm_rows(&self) -> Vec<&CrmRecord> {
        self.snapshot
            .crm
            .iter()
            .filter(|r| self.selection.matches_crm(r))
            .collect()
    }

    pub(crate) fn kpis(&self) -> Kpis {
        kpis(&self.billing_rows(), self.today)
    }

    pub(crate) fn finance(&self) -> Vec<FinanceGroup> {
        financial_groups(&self.billing_rows(), self.today)
    }

    pub(crate) fn emission(&self, state: Option<EmissionState>, search: Option<&str>) -> Vec<EmissionLine> {
        emission_lines(&self.billing_rows(), self.today, state, search)
    }

    pub(crate) fn growth(&self) -> Vec<GrowthPoint> {
        growth_series(&self.segment_profiles(), self.selection.window_end(self.today))
    }

    pub(crate) fn consumption(&self) -> ConsumptionSeries {
        consumption_series(&self.segment_rows(), self.selection.window_end(self.today))
    }

    pub(crate) fn portfolio(&self) -> PortfolioMatrix {
        portfolio_matrix(&self.segment_profiles(), &self.utilities)
    }

    pub(crate) fn funnel(&self) -> Vec<StageBucket> {
        stage_buckets(&self.segment_profiles())
    }

    pub(crate) fn journey(&self) -> Journey {
        journey(&self.crm_rows())
    }

    /// The CRM overview carries its own multi-select filters; single-value
    /// segment filters are folded in when the query leaves them open.
    pub(crate) fn crm(&self, query: &CrmQuery) -> CrmOverview {
        let mut query = query.clone();
        let fold = |list: &mut Vec<String>, value: &Option<String>| {
            if list.is_empty()
                && let Some(value) = value
            {
                list.push(value.clone());
            }
        };
        fold(&mut query.utilities, &self.selection.utility);
        fold(&mut query.areas, &self.selection.area);
        fold(&mut query.stages, &self.selection.stage);

        match &self.selection.owner {
            Some(owner) => {
                let records: Vec<CrmRecord> = self
                    .snapshot
                    .crm
                    .iter()
                    .filter(|r| &r.owner == owner)
                    .cloned()
                    .collect();
                crm_overview(&records, &query)
            }
            None => crm_overview(&self.snapshot.crm, &query),
        }
    }

    pub(crate) fn audit(&self) -> AuditReport {
        audit(&self.crm_rows())
    }

    pub(crate) fn commission(&self, lookup: &dyn CommissionLookup) -> CommissionReport {
        commission_report(&self.billing_rows(), lookup, self.today)
    }

    pub(crate) fn insights(&self) -> Insights {
        let rows = self.billing_rows();
        let profiles = deduplicate(rows.iter().copied(), DedupOrder::Chronological);
        insights(&rows, &profiles)
    }

    /// Customer report ignores the selection: it always covers the whole account.
    pub(crate) fn report(&self, uc: &str) -> Option<CustomerReport> {
        let rows: Vec<&BillingRecord> = self.snapshot.billing.iter().collect();
        customer_report(&rows, uc.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RefMonth;

    fn row(uc: &str, month: u32, stage: &str, mwh: f64) -> BillingRecord {
        BillingRecord {
            uc: uc.to_string(),
            utility: "CEMIG".to_string(),
            area: "Sul".to_string(),
            stage: stage.to_string(),
            month: RefMonth::new(2024, month),
            status: "PAID".to_string(),
            settled: 100.0,
            contracted_kwh: mwh * 1000.0,
            ..Default::default()
        }
    }

    fn analytics(selection: Selection) -> Analytics {
        let snapshot = Snapshot {
            billing: vec![
                row("1", 2, "Operacional", 2.0),
                row("1", 1, "Protocolado", 2.0),
                row("2", 2, "Pré-protocolo", 1.0),
                BillingRecord {
                    utility: "Outra".to_string(),
                    ..row("3", 2, "Operacional", 5.0)
                },
            ],
            crm: vec![CrmRecord {
                uc: "1".to_string(),
                owner: "Ana".to_string(),
                utility: "CEMIG".to_string(),
                stage: "Operacional".to_string(),
                ..Default::default()
            }],
            fetched_at: None,
        };
        let today = NaiveDate::from_ymd_opt(2024, 2, 20).unwrap();
        Analytics::new(Arc::new(snapshot), selection, today, &[])
    }

    #[test]
    fn profiles_take_the_latest_month() {
        let a = analytics(Selection::default());
        let funnel = a.funnel();
        let operational = funnel
            .iter()
            .find(|b| b.label == "Operacional")
            .map(|b| b.accounts);
        assert_eq!(operational, Some(2));
        let matrix = a.portfolio();
        assert_eq!(matrix.utilities, vec!["CEMIG".to_string()]);
        assert_eq!(matrix.grand_total.accounts, 2);
    }

    #[test]
    fn stage_filter_sees_the_current_profile() {
        let snapshot = Snapshot {
            billing: vec![
                row("1", 1, "Operacional", 5.0),
                row("1", 3, "Excluído", 0.0),
            ],
            crm: Vec::new(),
            fetched_at: None,
        };
        let selection = Selection {
            stage: Some("Operacional".to_string()),
            ..Default::default()
        };
        let today = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let a = Analytics::new(Arc::new(snapshot), selection, today, &[]);

        assert_eq!(a.growth()[11].active, 0);
        assert_eq!(a.portfolio().grand_total.accounts, 0);
        assert!(a.funnel().iter().all(|b| b.accounts == 0));
    }

    #[test]
    fn month_filter_narrows_row_views() {
        let selection = Selection {
            month: RefMonth::new(2024, 1),
            ..Default::default()
        };
        let a = analytics(selection);
        assert_eq!(a.kpis().records, 1);
        // Time series ignore the month filter for membership
        assert_eq!(a.growth().len(), 12);
        assert_eq!(a.growth()[11].month, RefMonth::new(2024, 1).unwrap());
    }

    #[test]
    fn crm_overview_honours_segment_and_owner() {
        let selection = Selection {
            owner: Some("Bia".to_string()),
            ..Default::default()
        };
        assert_eq!(analytics(selection).crm(&CrmQuery::default()).accounts, 0);
        let selection = Selection {
            utility: Some("CEMIG".to_string()),
            ..Default::default()
        };
        assert_eq!(analytics(selection).crm(&CrmQuery::default()).accounts, 1);
    }

    #[test]
    fn report_covers_the_whole_account() {
        let selection = Selection {
            month: RefMonth::new(2024, 2),
            ..Default::default()
        };
        let report = analytics(selection).report("1").unwrap();
        assert_eq!(report.series.len(), 2);
        assert!(analytics(Selection::default()).report("404").is_none());
    }
}
