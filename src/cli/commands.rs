//! CLI subcommand definitions
//!
//! One subcommand per view over the snapshot, plus `refresh`.

use clap::{Subcommand, ValueEnum};

use crate::core::EmissionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum EmissionFilter {
    Issued,
    Awaiting,
    Late,
}

impl From<EmissionFilter> for EmissionState {
    fn from(filter: EmissionFilter) -> Self {
        match filter {
            EmissionFilter::Issued => EmissionState::Issued,
            EmissionFilter::Awaiting => EmissionState::Awaiting,
            EmissionFilter::Late => EmissionState::Late,
        }
    }
}

/// Main CLI commands
#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Headline KPIs: realized, pending and estimated (default)
    Kpi,
    /// Invoices grouped by payment situation
    Finance,
    /// Emission worklist: issued, awaiting or late invoices
    Emission {
        /// Only rows in this state
        #[arg(long, value_enum)]
        state: Option<EmissionFilter>,
        /// Match account or customer name
        #[arg(long)]
        search: Option<String>,
    },
    /// Entries, exits and active load over 12 months
    Growth,
    /// Contracted vs compensated energy over 12 months
    Consumption,
    /// Accounts and MWh by area, stage and utility
    Portfolio,
    /// Funnel stages and milestone transition times
    Funnel,
    /// CRM overview by area, stage and status
    Crm {
        /// CRM status (repeatable or comma-separated)
        #[arg(long = "status", value_delimiter = ',')]
        statuses: Vec<String>,
        /// Match account or business name
        #[arg(long)]
        search: Option<String>,
    },
    /// CRM records missing fields their stage requires
    Audit {
        /// Match account or business name
        #[arg(long)]
        search: Option<String>,
        /// Only issues in these stages (repeatable or comma-separated)
        #[arg(long = "audit-stage", value_delimiter = ',')]
        stages: Vec<String>,
        /// Only issues missing one of these fields (repeatable or comma-separated)
        #[arg(long = "label", value_delimiter = ',')]
        labels: Vec<String>,
    },
    /// Commission on paid invoices
    Commission,
    /// Customer nature, churn, discount, ticket and SLA breakdowns
    Insights,
    /// Savings report for one account
    Report {
        /// Account (UC) identifier
        uc: String,
    },
    /// Re-fetch the snapshot, asking the database to recompute first
    Refresh {
        /// Skip the upstream recompute and only re-fetch
        #[arg(long)]
        no_upstream: bool,
    },
}
