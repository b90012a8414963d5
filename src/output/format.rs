use chrono::NaiveDate;
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ContentArrangement, Table, TableComponent,
    modifiers::UTF8_SOLID_INNER_BORDERS, presets::UTF8_FULL,
};

use crate::consts::UNKNOWN_MONTH;
use crate::core::RefMonth;
use crate::error::AppError;

/// Group and decimal separators. Defaults to Brazilian Portuguese (`1.234,5`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NumberFormat {
    group_sep: char,
    decimal_sep: char,
}

impl Default for NumberFormat {
    fn default() -> Self {
        NumberFormat {
            group_sep: '.',
            decimal_sep: ',',
        }
    }
}

impl NumberFormat {
    pub(crate) fn from_locale(locale: Option<&str>) -> Result<Self, AppError> {
        let Some(raw) = locale else {
            return Ok(NumberFormat::default());
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(NumberFormat::default());
        }
        let base = trimmed
            .split(['-', '_'])
            .next()
            .unwrap_or(trimmed)
            .to_ascii_lowercase();

        let format = match base.as_str() {
            "pt" | "de" | "es" | "it" => NumberFormat::default(),
            "fr" | "ru" => NumberFormat {
                group_sep: ' ',
                decimal_sep: ',',
            },
            "en" | "zh" => NumberFormat {
                group_sep: ',',
                decimal_sep: '.',
            },
            _ => {
                return Err(AppError::UnsupportedLocale {
                    input: trimmed.to_string(),
                });
            }
        };

        Ok(format)
    }
}

fn group_digits(digits: &str, format: NumberFormat) -> String {
    let mut result = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(format.group_sep);
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

pub(super) fn format_count(n: usize, format: NumberFormat) -> String {
    group_digits(&n.to_string(), format)
}

/// Fixed decimals with locale separators; never prints a negative zero.
pub(super) fn format_decimal(value: f64, places: usize, format: NumberFormat) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }
    let rendered = format!("{:.*}", places, value.abs());
    let (int_part, frac_part) = rendered.split_once('.').unwrap_or((rendered.as_str(), ""));
    let is_zero = rendered.chars().all(|c| c == '0' || c == '.');
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };
    let grouped = group_digits(int_part, format);
    if frac_part.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}{}{frac_part}", format.decimal_sep)
    }
}

/// Energy in the unit that reads best: MWh (at most 1 decimal) from 1 MWh up, else kWh.
pub(super) fn format_energy_kwh(kwh: f64, format: NumberFormat) -> String {
    if kwh.abs() >= 1000.0 {
        let mwh = format_decimal(kwh / 1000.0, 1, format);
        let zero_tail = format!("{}0", format.decimal_sep);
        let mwh = mwh.strip_suffix(zero_tail.as_str()).unwrap_or(mwh.as_str());
        format!("{mwh} MWh")
    } else {
        format!("{} kWh", format_decimal(kwh, 0, format))
    }
}

pub(super) fn format_mwh(mwh: f64, format: NumberFormat) -> String {
    format_energy_kwh(mwh * 1000.0, format)
}

pub(super) fn format_money(value: f64, format: NumberFormat) -> String {
    format!("R$ {}", format_decimal(value, 2, format))
}

pub(super) fn format_percent(value: f64, format: NumberFormat) -> String {
    format!("{}%", format_decimal(value, 1, format))
}

pub(super) fn format_day(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub(super) fn format_month(month: Option<RefMonth>) -> String {
    month
        .map(RefMonth::label)
        .unwrap_or_else(|| UNKNOWN_MONTH.to_string())
}

pub(super) fn styled_cell(text: &str, color: Option<Color>, bold: bool) -> Cell {
    let mut cell = Cell::new(text);
    if let Some(c) = color {
        cell = cell.fg(c);
    }
    if bold {
        cell = cell.add_attribute(Attribute::Bold);
    }
    cell
}

pub(super) fn header_cell(text: &str, use_color: bool) -> Cell {
    let mut cell = Cell::new(text).add_attribute(Attribute::Bold);
    if use_color {
        cell = cell.fg(Color::Cyan);
    }
    cell
}

/// Replace the double-line header separator (╞═╪═╡) with single-line (├─┼─┤)
fn normalize_header_separator(table: &mut Table) {
    table.set_style(TableComponent::HeaderLines, '─');
    table.set_style(TableComponent::LeftHeaderIntersection, '├');
    table.set_style(TableComponent::MiddleHeaderIntersections, '┼');
    table.set_style(TableComponent::RightHeaderIntersection, '┤');
}

/// Create a table with the standard preset, inner borders, and normalized header separator.
pub(super) fn create_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    normalize_header_separator(&mut table);
    table
}

pub(super) fn right_cell(text: &str, color: Option<Color>, bold: bool) -> Cell {
    let mut cell = Cell::new(text).set_alignment(CellAlignment::Right);
    if let Some(c) = color {
        cell = cell.fg(c);
    }
    if bold {
        cell = cell.add_attribute(Attribute::Bold);
    }
    cell
}

/// Header row from plain labels.
pub(super) fn header_row(labels: &[&str], use_color: bool) -> Vec<Cell> {
    labels.iter().map(|l| header_cell(l, use_color)).collect()
}

pub(super) fn print_title(title: &str) {
    println!("\n  {title}\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn en() -> NumberFormat {
        NumberFormat::from_locale(Some("en")).unwrap()
    }

    #[test]
    fn format_count_groups_digits() {
        let pt = NumberFormat::default();
        assert_eq!(format_count(0, pt), "0");
        assert_eq!(format_count(999, pt), "999");
        assert_eq!(format_count(1_234_567, pt), "1.234.567");
        assert_eq!(format_count(12_345, en()), "12,345");
    }

    #[test]
    fn format_decimal_uses_locale_separators() {
        let pt = NumberFormat::default();
        assert_eq!(format_decimal(1234.5, 2, pt), "1.234,50");
        assert_eq!(format_decimal(1234.5, 2, en()), "1,234.50");
        assert_eq!(format_decimal(-0.04, 1, pt), "0,0");
        assert_eq!(format_decimal(-12.0, 0, pt), "-12");
        assert_eq!(format_decimal(f64::NAN, 1, pt), "-");
    }

    #[test]
    fn energy_switches_unit_at_one_mwh() {
        let pt = NumberFormat::default();
        assert_eq!(format_energy_kwh(999.4, pt), "999 kWh");
        assert_eq!(format_energy_kwh(1000.0, pt), "1 MWh");
        assert_eq!(format_energy_kwh(1500.0, en()), "1.5 MWh");
        assert_eq!(format_energy_kwh(2_345_678.0, pt), "2.345,7 MWh");
        assert_eq!(format_mwh(0.5, pt), "500 kWh");
    }

    #[test]
    fn money_and_percent() {
        let pt = NumberFormat::default();
        assert_eq!(format_money(1500.0, pt), "R$ 1.500,00");
        assert_eq!(format_percent(12.34, pt), "12,3%");
    }

    #[test]
    fn locale_parsing() {
        assert_eq!(NumberFormat::from_locale(None).unwrap(), NumberFormat::default());
        assert_eq!(NumberFormat::from_locale(Some("pt_BR")).unwrap(), NumberFormat::default());
        assert_eq!(NumberFormat::from_locale(Some("en-US")).unwrap(), en());
        assert!(NumberFormat::from_locale(Some("xx")).is_err());
    }

    #[test]
    fn dates_and_months() {
        assert_eq!(format_day(NaiveDate::from_ymd_opt(2024, 3, 5)), "05/03/2024");
        assert_eq!(format_day(None), "-");
        assert_eq!(format_month(RefMonth::new(2024, 3)), "03/2024");
        assert_eq!(format_month(None), "N/D");
    }
}
