use comfy_table::{Cell, Color};

use crate::core::PortfolioMatrix;
use crate::output::TableOptions;
use crate::output::format::{
    NumberFormat, create_styled_table, format_count, format_decimal, header_cell, print_title,
    right_cell, styled_cell,
};

fn cell_text(accounts: usize, mwh: f64, fmt: NumberFormat) -> String {
    if accounts == 0 {
        "-".to_string()
    } else {
        format!("{} | {}", format_count(accounts, fmt), format_decimal(mwh, 1, fmt))
    }
}

/// Area → stage → utility matrix; each cell reads "accounts | MWh".
pub(crate) fn print_portfolio_table(matrix: &PortfolioMatrix, options: TableOptions) {
    let fmt = options.number_format;
    let mut table = create_styled_table();

    let mut header = vec![
        header_cell("Area", options.use_color),
        header_cell("Stage", options.use_color),
    ];
    header.extend(matrix.utilities.iter().map(|u| header_cell(u, options.use_color)));
    header.push(header_cell("Total", options.use_color));
    table.set_header(header);

    let subtotal_color = options.use_color.then_some(Color::Cyan);
    for area in &matrix.areas {
        for (i, row) in area.rows.iter().enumerate() {
            let mut cells = vec![
                Cell::new(if i == 0 { area.area.as_str() } else { "" }),
                Cell::new(&row.stage),
            ];
            cells.extend(
                row.cells
                    .iter()
                    .map(|c| right_cell(&cell_text(c.accounts, c.mwh, fmt), None, false)),
            );
            cells.push(right_cell(
                &cell_text(row.total.accounts, row.total.mwh, fmt),
                None,
                true,
            ));
            table.add_row(cells);
        }
        let mut subtotal = vec![
            Cell::new(""),
            styled_cell(&format!("Subtotal {}", area.area), subtotal_color, true),
        ];
        subtotal.extend(
            area.cells
                .iter()
                .map(|c| right_cell(&cell_text(c.accounts, c.mwh, fmt), subtotal_color, false)),
        );
        subtotal.push(right_cell(
            &cell_text(area.total.accounts, area.total.mwh, fmt),
            subtotal_color,
            true,
        ));
        table.add_row(subtotal);
    }

    let total_color = options.use_color.then_some(Color::Yellow);
    let mut total = vec![styled_cell("Total", total_color, true), Cell::new("")];
    total.extend(
        matrix
            .utility_totals
            .iter()
            .map(|c| right_cell(&cell_text(c.accounts, c.mwh, fmt), total_color, true)),
    );
    total.push(right_cell(
        &cell_text(matrix.grand_total.accounts, matrix.grand_total.mwh, fmt),
        total_color,
        true,
    ));
    table.add_row(total);

    print_title("Portfolio (accounts | MWh)");
    println!("{table}\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cells_render_as_dash() {
        let fmt = NumberFormat::default();
        assert_eq!(cell_text(0, 0.0, fmt), "-");
        assert_eq!(cell_text(3, 1234.56, fmt), "3 | 1.234,6");
    }
}
