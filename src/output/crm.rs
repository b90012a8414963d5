//! Funnel, CRM overview and data-quality tables

use comfy_table::Cell;

use crate::core::{AuditIssue, AuditReport, CrmOverview, GroupTotal, Journey, StageBucket};
use crate::output::TableOptions;
use crate::output::format::{
    create_styled_table, format_count, format_energy_kwh, format_mwh, format_percent, header_row,
    print_title, right_cell,
};

pub(crate) fn print_funnel_table(buckets: &[StageBucket], journey: &Journey, options: TableOptions) {
    let fmt = options.number_format;
    let mut stages = create_styled_table();
    stages.set_header(header_row(&["Stage", "Accounts", "Energy"], options.use_color));
    for bucket in buckets {
        stages.add_row(vec![
            Cell::new(bucket.label),
            right_cell(&format_count(bucket.accounts, fmt), None, false),
            right_cell(&format_energy_kwh(bucket.kwh, fmt), None, false),
        ]);
    }
    print_title("Funnel by stage");
    println!("{stages}");

    let mut milestones = create_styled_table();
    milestones.set_header(header_row(
        &["Milestone", "Accounts", "Energy", "Days from previous"],
        options.use_color,
    ));
    let rows = [
        ("Won", &journey.won, None),
        ("Protocol", &journey.protocol, Some(journey.won_to_protocol_days)),
        ("First savings", &journey.first_savings, Some(journey.protocol_to_savings_days)),
        ("First invoice", &journey.first_invoice, Some(journey.savings_to_invoice_days)),
    ];
    for (label, milestone, days) in rows {
        milestones.add_row(vec![
            Cell::new(label),
            right_cell(&format_count(milestone.accounts, fmt), None, false),
            right_cell(&format_energy_kwh(milestone.kwh, fmt), None, false),
            right_cell(
                &days.map_or_else(|| "-".to_string(), |d| format!("{d} d")),
                None,
                false,
            ),
        ]);
    }
    print_title("Customer journey");
    println!("{milestones}\n");
}

fn group_table(title: &str, groups: &[GroupTotal], options: TableOptions) {
    let fmt = options.number_format;
    let mut table = create_styled_table();
    table.set_header(header_row(&[title, "Accounts", "Energy"], options.use_color));
    for group in groups {
        table.add_row(vec![
            Cell::new(&group.name),
            right_cell(&format_count(group.accounts, fmt), None, false),
            right_cell(&format_mwh(group.mwh, fmt), None, false),
        ]);
    }
    println!("{table}");
}

pub(crate) fn print_crm_table(overview: &CrmOverview, options: TableOptions) {
    let fmt = options.number_format;
    print_title(&format!(
        "CRM: {} accounts, {}",
        format_count(overview.accounts, fmt),
        format_mwh(overview.mwh, fmt)
    ));
    group_table("Area", &overview.by_area, options);
    group_table("Stage", &overview.by_stage, options);
    group_table("Status", &overview.by_status, options);
    println!();
}

pub(crate) fn print_audit_table(report: &AuditReport, issues: &[&AuditIssue], options: TableOptions) {
    let fmt = options.number_format;
    let integrity = format_percent(report.integrity_pct, fmt);
    let integrity = if options.use_color {
        let code = match report.integrity_pct {
            p if p >= 90.0 => 32,
            p if p >= 70.0 => 33,
            _ => 31,
        };
        format!("\x1b[{code}m{integrity}\x1b[0m")
    } else {
        integrity
    };

    let mut table = create_styled_table();
    table.set_header(header_row(
        &["UC", "Business", "Stage", "Missing", "Deal"],
        options.use_color,
    ));
    for issue in issues {
        table.add_row(vec![
            Cell::new(&issue.uc),
            Cell::new(&issue.business_name),
            Cell::new(&issue.stage),
            Cell::new(issue.missing.join(", ")),
            Cell::new(issue.deal_link.as_deref().unwrap_or("-")),
        ]);
    }

    print_title("Data quality");
    println!(
        "  Analyzed {} | Flagged {} | Integrity {}\n",
        format_count(report.analyzed, fmt),
        format_count(report.issues.len(), fmt),
        integrity
    );
    if issues.is_empty() {
        println!("  No issues match.\n");
    } else {
        println!("{table}\n");
    }
}
