use comfy_table::{Cell, Color};

use crate::core::{CustomerReport, Insights};
use crate::output::TableOptions;
use crate::output::format::{
    create_styled_table, format_count, format_day, format_decimal, format_energy_kwh,
    format_money, format_month, format_percent, header_row, print_title, right_cell,
};

const TOP_UTILITIES: usize = 6;

pub(crate) fn print_insights_table(insights: &Insights, options: TableOptions) {
    let fmt = options.number_format;

    let mut nature = create_styled_table();
    nature.set_header(header_row(&["Nature", "Accounts", "Energy"], options.use_color));
    for split in &insights.nature {
        nature.add_row(vec![
            Cell::new(split.nature),
            right_cell(&format_count(split.accounts, fmt), None, false),
            right_cell(&format_energy_kwh(split.kwh, fmt), None, false),
        ]);
    }
    print_title("Customer nature");
    println!("{nature}");

    let mut churn = create_styled_table();
    churn.set_header(header_row(&["Reason", "Accounts", "Energy"], options.use_color));
    for reason in &insights.churn {
        churn.add_row(vec![
            Cell::new(&reason.reason),
            right_cell(&format_count(reason.accounts, fmt), None, false),
            right_cell(&format_energy_kwh(reason.kwh, fmt), None, false),
        ]);
    }
    print_title(&format!(
        "Churn ({} of accounts)",
        format_percent(insights.churn_rate_pct, fmt)
    ));
    println!("{churn}");

    let mut discount = create_styled_table();
    discount.set_header(header_row(&["Utility", "Average discount", "Invoices"], options.use_color));
    for avg in &insights.discount_by_utility {
        discount.add_row(vec![
            Cell::new(&avg.utility),
            right_cell(&format_percent(avg.average, fmt), None, false),
            right_cell(&format_count(avg.samples, fmt), None, false),
        ]);
    }
    print_title(&format!("Discount (overall {})", format_percent(insights.discount_pct, fmt)));
    println!("{discount}");

    let mut tickets = create_styled_table();
    tickets.set_header(header_row(
        &["Tariff group", "Macro", "Invoices", "Average ticket", "Average consumption"],
        options.use_color,
    ));
    for ticket in &insights.tickets {
        tickets.add_row(vec![
            Cell::new(&ticket.group),
            Cell::new(format!("Grupo {}", ticket.macro_group)),
            right_cell(&format_count(ticket.invoices, fmt), None, false),
            right_cell(&format_money(ticket.average_ticket, fmt), None, false),
            right_cell(&format_energy_kwh(ticket.average_kwh, fmt), None, false),
        ]);
    }
    print_title("Ticket by tariff group");
    println!("{tickets}");

    let mut sla = create_styled_table();
    sla.set_header(header_row(&["Utility", "Days after distributor", "Invoices"], options.use_color));
    for avg in insights.sla_by_utility.iter().take(TOP_UTILITIES) {
        sla.add_row(vec![
            Cell::new(&avg.utility),
            right_cell(&format_decimal(avg.average, 0, fmt), None, false),
            right_cell(&format_count(avg.samples, fmt), None, false),
        ]);
    }
    print_title(&format!(
        "Invoicing SLA (overall {} days)",
        format_decimal(insights.sla_days, 0, fmt)
    ));
    println!("{sla}\n");
}

pub(crate) fn print_report_table(report: &CustomerReport, options: TableOptions) {
    let fmt = options.number_format;
    let profile = &report.profile;

    print_title(&format!("{} | UC {}", profile.name, profile.uc));
    println!("  Utility {} | Stage {}", profile.utility, profile.stage);
    println!(
        "  Contracted {} | Discount {} | First savings {}\n",
        format_energy_kwh(profile.contracted_kwh, fmt),
        format_percent(profile.discount_pct, fmt),
        profile
            .first_savings_month
            .map_or_else(|| "-".to_string(), |m| m.label())
    );

    let mut totals = create_styled_table();
    totals.set_header(header_row(&["", "Total"], options.use_color));
    let savings_color = options.use_color.then_some(Color::Green);
    for (label, value, color) in [
        ("Savings", format_money(report.total_savings, fmt), savings_color),
        ("Cost with service", format_money(report.cost_with, fmt), None),
        ("Cost without service", format_money(report.cost_without, fmt), None),
        ("Consumed", format_energy_kwh(report.consumed_kwh, fmt), None),
        ("Compensated", format_energy_kwh(report.compensated_kwh, fmt), None),
        ("Compensation efficiency", format_percent(report.efficiency_pct, fmt), None),
        ("Free months", format_decimal(report.free_months, 1, fmt), savings_color),
    ] {
        totals.add_row(vec![Cell::new(label), right_cell(&value, color, false)]);
    }
    println!("{totals}");

    let mut series = create_styled_table();
    series.set_header(header_row(
        &["Month", "Without service", "With service", "Savings", "Compensated"],
        options.use_color,
    ));
    for month in &report.series {
        series.add_row(vec![
            Cell::new(format_month(month.month)),
            right_cell(&format_money(month.cost_without, fmt), None, false),
            right_cell(&format_money(month.cost_with, fmt), None, false),
            right_cell(&format_money(month.savings, fmt), savings_color, false),
            right_cell(&format_energy_kwh(month.compensated_kwh, fmt), None, false),
        ]);
    }
    print_title("Monthly history");
    println!("{series}");

    let mut invoices = create_styled_table();
    invoices.set_header(header_row(
        &["Month", "Status", "Cycle", "Due", "Settled", "Savings"],
        options.use_color,
    ));
    for invoice in &report.invoices {
        let status = invoice
            .badge
            .map_or(invoice.status.as_str(), |badge| badge.label());
        invoices.add_row(vec![
            Cell::new(format_month(invoice.month)),
            Cell::new(status),
            Cell::new(invoice.phase.label()),
            Cell::new(format_day(invoice.due_date)),
            right_cell(&format_money(invoice.settled, fmt), None, false),
            right_cell(&format_money(invoice.savings, fmt), None, false),
        ]);
    }
    print_title("Recent invoices");
    println!("{invoices}\n");
}
