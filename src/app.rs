use std::time::Duration;

use serde_json::json;

use crate::cli::{Cli, Commands};
use crate::commission_table::CommissionTable;
use crate::core::{Analytics, AuditQuery, CrmQuery};
use crate::error::SourceError;
use crate::output::{
    TableOptions, print_audit_table, print_commission_table, print_consumption_table,
    print_crm_table, print_emission_table, print_finance_table, print_funnel_table,
    print_growth_table, print_insights_table, print_kpi_table, print_portfolio_table,
    print_report_table, to_json,
};
use crate::source::{RefreshOutcome, SnapshotStore};

pub(crate) struct CommandContext<'a> {
    pub(crate) cli: &'a Cli,
    pub(crate) analytics: &'a Analytics,
    pub(crate) options: TableOptions,
    pub(crate) fetch_timeout: Duration,
}

fn handle_funnel(ctx: &CommandContext<'_>) {
    let stages = ctx.analytics.funnel();
    let journey = ctx.analytics.journey();
    if ctx.cli.json {
        println!("{}", to_json(&json!({ "stages": stages, "journey": journey })));
    } else {
        print_funnel_table(&stages, &journey, ctx.options);
    }
}

fn handle_audit(query: &AuditQuery, ctx: &CommandContext<'_>) {
    let report = ctx.analytics.audit();
    let issues = report.query(query);
    if ctx.cli.json {
        let value = json!({
            "analyzed": report.analyzed,
            "integrity_pct": report.integrity_pct,
            "flagged": report.issues.len(),
            "options": report.options(),
            "issues": issues,
        });
        println!("{}", to_json(&value));
    } else {
        print_audit_table(&report, &issues, ctx.options);
    }
}

fn handle_commission(ctx: &CommandContext<'_>) {
    let table = CommissionTable::load(
        ctx.cli.commission_table.as_deref(),
        ctx.cli.offline,
        ctx.fetch_timeout,
    );
    log::info!("{} commission rates loaded", table.len());
    let report = ctx.analytics.commission(&table);
    if ctx.cli.json {
        println!("{}", to_json(&report));
    } else {
        print_commission_table(&report, ctx.options);
    }
}

fn handle_report(uc: &str, ctx: &CommandContext<'_>) {
    let Some(report) = ctx.analytics.report(uc) else {
        println!("No billing rows for UC {}.", uc.trim());
        return;
    };
    if ctx.cli.json {
        println!("{}", to_json(&report));
    } else {
        print_report_table(&report, ctx.options);
    }
}

/// Render one view of the loaded snapshot.
pub(crate) fn handle_view(command: &Commands, ctx: &CommandContext<'_>) {
    let json = ctx.cli.json;
    let analytics = ctx.analytics;
    match command {
        Commands::Kpi => {
            let kpis = analytics.kpis();
            if json {
                println!("{}", to_json(&kpis));
            } else {
                print_kpi_table(&kpis, ctx.options);
            }
        }
        Commands::Finance => {
            let groups = analytics.finance();
            if json {
                println!("{}", to_json(&groups));
            } else {
                print_finance_table(&groups, ctx.options);
            }
        }
        Commands::Emission { state, search } => {
            let lines = analytics.emission(state.map(Into::into), search.as_deref());
            if json {
                println!("{}", to_json(&lines));
            } else {
                print_emission_table(&lines, ctx.options);
            }
        }
        Commands::Growth => {
            let points = analytics.growth();
            if json {
                println!("{}", to_json(&points));
            } else {
                print_growth_table(&points, ctx.options);
            }
        }
        Commands::Consumption => {
            let series = analytics.consumption();
            if json {
                println!("{}", to_json(&series));
            } else {
                print_consumption_table(&series, ctx.options);
            }
        }
        Commands::Portfolio => {
            let matrix = analytics.portfolio();
            if json {
                println!("{}", to_json(&matrix));
            } else {
                print_portfolio_table(&matrix, ctx.options);
            }
        }
        Commands::Funnel => handle_funnel(ctx),
        Commands::Crm { statuses, search } => {
            let query = CrmQuery {
                statuses: statuses.clone(),
                search: search.clone(),
                ..Default::default()
            };
            let overview = analytics.crm(&query);
            if json {
                println!("{}", to_json(&overview));
            } else {
                print_crm_table(&overview, ctx.options);
            }
        }
        Commands::Audit {
            search,
            stages,
            labels,
        } => {
            let query = AuditQuery {
                search: search.clone(),
                stages: stages.clone(),
                labels: labels.clone(),
            };
            handle_audit(&query, ctx);
        }
        Commands::Commission => handle_commission(ctx),
        Commands::Insights => {
            let insights = analytics.insights();
            if json {
                println!("{}", to_json(&insights));
            } else {
                print_insights_table(&insights, ctx.options);
            }
        }
        Commands::Report { uc } => handle_report(uc, ctx),
        Commands::Refresh { .. } => {
            log::warn!("refresh is handled before any view is rendered");
        }
    }
}

/// Ask upstream to recompute (unless skipped) and re-fetch.
pub(crate) fn handle_refresh(store: &SnapshotStore, upstream: bool, json: bool) -> Result<(), SourceError> {
    match store.refresh(upstream)? {
        RefreshOutcome::Refreshed { billing, crm } => {
            if json {
                let value = json!({ "status": "refreshed", "billing": billing, "crm": crm });
                println!("{}", to_json(&value));
            } else {
                println!(
                    "Refreshed {} snapshot: {} billing rows, {} CRM rows.",
                    store.source_name(),
                    billing,
                    crm
                );
            }
        }
        RefreshOutcome::AlreadyRunning => {
            if json {
                println!("{}", to_json(&json!({ "status": "already_running" })));
            } else {
                println!("A refresh is already running.");
            }
        }
    }
    Ok(())
}
