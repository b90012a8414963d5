//! Core module - canonical records and every aggregation over them

mod analytics;
mod audit;
mod classify;
mod commission;
mod cycle;
mod dedup;
mod filter;
mod funnel;
mod growth;
mod insights;
mod kpi;
mod math;
mod normalize;
mod portfolio;
mod types;

pub(crate) use analytics::Analytics;
pub(crate) use audit::{AuditIssue, AuditQuery, AuditReport};
pub(crate) use classify::{EmissionState, FinancialBucket};
pub(crate) use commission::{CommissionLookup, CommissionReport};
pub(crate) use cycle::CustomerReport;
pub(crate) use filter::{DateRange, Selection};
pub(crate) use funnel::{CrmOverview, CrmQuery, GroupTotal, Journey, StageBucket};
pub(crate) use growth::{ConsumptionSeries, GrowthPoint};
pub(crate) use insights::Insights;
pub(crate) use kpi::{FinanceGroup, Kpis, EmissionLine};
pub(crate) use normalize::{normalize_snapshot, parse_number};
pub(crate) use portfolio::PortfolioMatrix;
pub(crate) use types::{RawRecord, RawSnapshot, RefMonth, Snapshot};
