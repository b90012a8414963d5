use comfy_table::{Cell, Color};

use crate::core::{ConsumptionSeries, GrowthPoint};
use crate::output::TableOptions;
use crate::output::format::{
    create_styled_table, format_count, format_decimal, format_energy_kwh, format_money, format_mwh,
    format_percent, header_row, print_title, right_cell,
};

fn growth_color(pct: f64) -> Option<Color> {
    if pct > 0.0 {
        Some(Color::Green)
    } else if pct < 0.0 {
        Some(Color::Red)
    } else {
        None
    }
}

pub(crate) fn print_growth_table(points: &[GrowthPoint], options: TableOptions) {
    let fmt = options.number_format;
    let mut table = create_styled_table();
    table.set_header(header_row(
        &["Month", "Entries", "Entry load", "Exits", "Exit load", "Active", "Active load", "Growth"],
        options.use_color,
    ));

    for point in points {
        let color = if options.use_color {
            growth_color(point.growth_pct)
        } else {
            None
        };
        table.add_row(vec![
            Cell::new(point.month.label()),
            right_cell(&format_count(point.entries, fmt), None, false),
            right_cell(&format_mwh(point.entries_mwh, fmt), None, false),
            right_cell(&format_count(point.exits, fmt), None, false),
            right_cell(&format_mwh(point.exits_mwh, fmt), None, false),
            right_cell(&format_count(point.active, fmt), None, false),
            right_cell(&format!("{} MWh", format_decimal(point.active_mwh, 0, fmt)), None, false),
            right_cell(&format_percent(point.growth_pct, fmt), color, false),
        ]);
    }

    print_title("Portfolio growth (12 months)");
    println!("{table}\n");
}

pub(crate) fn print_consumption_table(series: &ConsumptionSeries, options: TableOptions) {
    let fmt = options.number_format;
    let mut table = create_styled_table();
    table.set_header(header_row(
        &["Month", "Contracted", "Compensated", "Invoiced"],
        options.use_color,
    ));
    for point in &series.points {
        table.add_row(vec![
            Cell::new(point.month.label()),
            right_cell(&format_energy_kwh(point.contracted_kwh, fmt), None, false),
            right_cell(&format_energy_kwh(point.compensated_kwh, fmt), None, false),
            right_cell(&format_money(point.invoiced, fmt), None, false),
        ]);
    }
    print_title("Consumption vs compensation (12 months)");
    println!("{table}");
    println!(
        "\n  Average tariff R$ {}/kWh\n",
        format_decimal(series.average_tariff, 4, fmt)
    );
}
