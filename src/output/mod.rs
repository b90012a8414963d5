mod crm;
mod finance;
mod format;
mod insights;
mod json;
mod portfolio;
mod trend;

pub(crate) use crm::{print_audit_table, print_crm_table, print_funnel_table};
pub(crate) use finance::{
    print_commission_table, print_emission_table, print_finance_table, print_kpi_table,
};
pub(crate) use format::NumberFormat;
pub(crate) use insights::{print_insights_table, print_report_table};
pub(crate) use json::to_json;
pub(crate) use portfolio::print_portfolio_table;
pub(crate) use trend::{print_consumption_table, print_growth_table};

/// Rendering choices shared by every table printer
#[derive(Debug, Clone, Copy)]
pub(crate) struct TableOptions {
    pub(crate) use_color: bool,
    pub(crate) number_format: NumberFormat,
}
