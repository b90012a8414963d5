//! KPI, payment, emission and commission tables

use comfy_table::{Cell, Color};

use crate::core::{
    CommissionReport, EmissionLine, EmissionState, FinanceGroup, FinancialBucket, Kpis,
};
use crate::output::TableOptions;
use crate::output::format::{
    create_styled_table, format_count, format_day, format_decimal, format_energy_kwh,
    format_money, format_month, format_mwh, header_row, print_title, right_cell, styled_cell,
};

fn bucket_color(bucket: FinancialBucket) -> Color {
    match bucket {
        FinancialBucket::Paid => Color::Green,
        FinancialBucket::Overdue => Color::Red,
        FinancialBucket::Sent => Color::Blue,
        FinancialBucket::NotSent => Color::DarkGrey,
    }
}

fn emission_color(state: EmissionState) -> Color {
    match state {
        EmissionState::Issued => Color::Green,
        EmissionState::Awaiting => Color::Yellow,
        EmissionState::Late => Color::Red,
    }
}

pub(crate) fn print_kpi_table(kpis: &Kpis, options: TableOptions) {
    let fmt = options.number_format;
    let mut table = create_styled_table();
    table.set_header(header_row(
        &["", "Records", "Value", "Energy", "Tariff (R$/kWh)"],
        options.use_color,
    ));

    for (label, tally) in [
        ("Realized", &kpis.realized),
        ("Pending", &kpis.pending),
        ("Estimated", &kpis.estimated),
    ] {
        table.add_row(vec![
            Cell::new(label),
            right_cell(&format_count(tally.count, fmt), None, false),
            right_cell(&format_money(tally.value, fmt), None, false),
            right_cell(&format_mwh(tally.mwh, fmt), None, false),
            right_cell(&format_decimal(tally.tariff, 4, fmt), None, false),
        ]);
    }

    let total_color = options.use_color.then_some(Color::Yellow);
    table.add_row(vec![
        styled_cell("Total", total_color, true),
        right_cell(&format_count(kpis.records, fmt), total_color, true),
        right_cell(&format_money(kpis.revenue, fmt), total_color, true),
        right_cell(&format_mwh(kpis.energy_mwh, fmt), total_color, true),
        Cell::new(""),
    ]);

    print_title("Headline KPIs");
    println!("{table}");
    println!(
        "\n  Average ticket {} | Average consumption {}\n",
        format_money(kpis.average_ticket, fmt),
        format_energy_kwh(kpis.average_consumption_kwh, fmt)
    );
}

pub(crate) fn print_finance_table(groups: &[FinanceGroup], options: TableOptions) {
    let fmt = options.number_format;
    let mut summary = create_styled_table();
    summary.set_header(header_row(
        &["Bucket", "Invoices", "Invoiced", "Compensated"],
        options.use_color,
    ));
    for group in groups {
        let color = options.use_color.then(|| bucket_color(group.bucket));
        summary.add_row(vec![
            styled_cell(group.bucket.label(), color, true),
            right_cell(&format_count(group.lines.len(), fmt), None, false),
            right_cell(&format_money(group.total_invoiced, fmt), None, false),
            right_cell(&format_mwh(group.compensated_mwh, fmt), None, false),
        ]);
    }
    print_title("Payment situation");
    println!("{summary}");

    for group in groups.iter().filter(|g| !g.lines.is_empty()) {
        let mut table = create_styled_table();
        table.set_header(header_row(
            &["UC", "Name", "Utility", "Month", "Status", "Due", "Invoiced"],
            options.use_color,
        ));
        for line in &group.lines {
            table.add_row(vec![
                Cell::new(&line.uc),
                Cell::new(&line.name),
                Cell::new(&line.utility),
                Cell::new(format_month(line.month)),
                Cell::new(&line.status),
                Cell::new(format_day(line.due_date)),
                right_cell(&format_money(line.invoiced, fmt), None, false),
            ]);
        }
        print_title(group.bucket.label());
        println!("{table}");
    }
    println!();
}

pub(crate) fn print_emission_table(lines: &[EmissionLine], options: TableOptions) {
    let fmt = options.number_format;
    let mut table = create_styled_table();
    table.set_header(header_row(
        &["UC", "Name", "Utility", "Month", "Predicted", "Emitted", "Estimated", "State"],
        options.use_color,
    ));
    for line in lines {
        let color = options.use_color.then(|| emission_color(line.state));
        table.add_row(vec![
            Cell::new(&line.uc),
            Cell::new(&line.name),
            Cell::new(&line.utility),
            Cell::new(format_month(line.month)),
            Cell::new(format_day(line.predicted)),
            Cell::new(format_day(line.emitted)),
            right_cell(&format_money(line.estimated, fmt), None, false),
            styled_cell(line.state.label(), color, false),
        ]);
    }
    print_title("Invoice emission");
    println!("{table}");
    println!("\n  {} rows\n", format_count(lines.len(), fmt));
}

pub(crate) fn print_commission_table(report: &CommissionReport, options: TableOptions) {
    let fmt = options.number_format;
    let mut table = create_styled_table();
    table.set_header(header_row(
        &["UC", "Name", "Utility", "Month", "Settled", "Base", "%", "Commission"],
        options.use_color,
    ));
    let money_color = options.use_color.then_some(Color::Green);
    for line in &report.lines {
        let pct = line
            .percentage
            .map(|p| format_decimal(p, 2, fmt))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(&line.uc),
            Cell::new(&line.name),
            Cell::new(&line.utility),
            Cell::new(format_month(line.month)),
            right_cell(&format_money(line.settled, fmt), None, false),
            right_cell(&format_money(line.base, fmt), None, false),
            right_cell(&pct, None, false),
            right_cell(&format_money(line.commission, fmt), money_color, false),
        ]);
    }
    let total_color = options.use_color.then_some(Color::Yellow);
    table.add_row(vec![
        styled_cell("Total", total_color, true),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        right_cell(&format_money(report.total_base, fmt), total_color, true),
        Cell::new(""),
        right_cell(&format_money(report.total_commission, fmt), total_color, true),
    ]);

    print_title("Commission on paid invoices");
    println!("{table}");
    if report.without_percentage > 0 {
        println!(
            "\n  {} paid rows have no commission percentage\n",
            format_count(report.without_percentage, fmt)
        );
    } else {
        println!();
    }
}
