//! Area × stage × utility cross-tab of the current portfolio

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::consts::DEFAULT_UTILITY;
use crate::core::classify::stage_sort_key;
use crate::core::types::BillingRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub(crate) struct PortfolioCell {
    pub(crate) accounts: usize,
    pub(crate) mwh: f64,
}

impl PortfolioCell {
    fn add(&mut self, mwh: f64) {
        self.accounts += 1;
        self.mwh += mwh;
    }

    fn merge(&mut self, other: &PortfolioCell) {
        self.accounts += other.accounts;
        self.mwh += other.mwh;
    }
}

/// One stage under an area; `cells` is aligned with `PortfolioMatrix::utilities`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct PortfolioRow {
    pub(crate) stage: String,
    pub(crate) cells: Vec<PortfolioCell>,
    pub(crate) total: PortfolioCell,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PortfolioArea {
    pub(crate) area: String,
    pub(crate) rows: Vec<PortfolioRow>,
    pub(crate) cells: Vec<PortfolioCell>,
    pub(crate) total: PortfolioCell,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PortfolioMatrix {
    pub(crate) utilities: Vec<String>,
    pub(crate) areas: Vec<PortfolioArea>,
    pub(crate) utility_totals: Vec<PortfolioCell>,
    pub(crate) grand_total: PortfolioCell,
}

/// Utility columns: the configured list, else every utility seen except the placeholder.
pub(crate) fn known_utilities(rows: &[BillingRecord], configured: &[String]) -> Vec<String> {
    if !configured.is_empty() {
        return configured.to_vec();
    }
    rows.iter()
        .map(|r| r.utility.as_str())
        .filter(|u| *u != DEFAULT_UTILITY)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Count profiles into cells. Profiles of unknown utilities still create
/// their (area, stage) row but are not counted anywhere.
pub(crate) fn portfolio_matrix(profiles: &[&BillingRecord], utilities: &[String]) -> PortfolioMatrix {
    let width = utilities.len();
    let mut grid: BTreeMap<&str, BTreeMap<&str, Vec<PortfolioCell>>> = BTreeMap::new();

    for profile in profiles {
        let row = grid
            .entry(profile.area.as_str())
            .or_default()
            .entry(profile.stage.as_str())
            .or_insert_with(|| vec![PortfolioCell::default(); width]);
        if let Some(col) = utilities.iter().position(|u| *u == profile.utility) {
            row[col].add(profile.contracted_mwh());
        }
    }

    let mut utility_totals = vec![PortfolioCell::default(); width];
    let mut grand_total = PortfolioCell::default();
    let mut areas = Vec::with_capacity(grid.len());

    for (area, stages) in grid {
        let mut area_cells = vec![PortfolioCell::default(); width];
        let mut area_total = PortfolioCell::default();
        let mut rows: Vec<PortfolioRow> = stages
            .into_iter()
            .map(|(stage, cells)| {
                let mut total = PortfolioCell::default();
                for (col, cell) in cells.iter().enumerate() {
                    total.merge(cell);
                    area_cells[col].merge(cell);
                    utility_totals[col].merge(cell);
                }
                area_total.merge(&total);
                PortfolioRow {
                    stage: stage.to_string(),
                    cells,
                    total,
                }
            })
            .collect();
        rows.sort_by(|a, b| stage_sort_key(&a.stage).cmp(&stage_sort_key(&b.stage)));
        grand_total.merge(&area_total);
        areas.push(PortfolioArea {
            area: area.to_string(),
            rows,
            cells: area_cells,
            total: area_total,
        });
    }

    PortfolioMatrix {
        utilities: utilities.to_vec(),
        areas,
        utility_totals,
        grand_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(uc: &str, utility: &str, area: &str, stage: &str, mwh: f64) -> BillingRecord {
        BillingRecord {
            uc: uc.to_string(),
            utility: utility.to_string(),
            area: area.to_string(),
            stage: stage.to_string(),
            contracted_kwh: mwh * 1000.0,
            ..Default::default()
        }
    }

    fn sample() -> Vec<BillingRecord> {
        vec![
            profile("1", "CEMIG", "Sul", "Operacional", 1.5),
            profile("2", "ENEL", "Sul", "Operacional", 2.0),
            profile("3", "CEMIG", "Sul", "Pré-protocolo", 0.25),
            profile("4", "CEMIG", "Norte", "Excluído", 3.0),
            profile("5", "Outra", "Norte", "Sem Etapa", 9.0),
        ]
    }

    #[test]
    fn known_utilities_excludes_placeholder() {
        assert_eq!(known_utilities(&sample(), &[]), vec!["CEMIG", "ENEL"]);
        let configured = vec!["ENEL".to_string()];
        assert_eq!(known_utilities(&sample(), &configured), configured);
    }

    #[test]
    fn rollups_sum_to_grand_total() {
        let rows = sample();
        let profiles: Vec<&BillingRecord> = rows.iter().collect();
        let utilities = known_utilities(&rows, &[]);
        let matrix = portfolio_matrix(&profiles, &utilities);

        assert_eq!(matrix.grand_total.accounts, 4);
        assert!((matrix.grand_total.mwh - 6.75).abs() < 1e-9);

        let area_sum: usize = matrix.areas.iter().map(|a| a.total.accounts).sum();
        let row_sum: usize = matrix
            .areas
            .iter()
            .flat_map(|a| &a.rows)
            .map(|r| r.total.accounts)
            .sum();
        let cell_sum: usize = matrix
            .areas
            .iter()
            .flat_map(|a| &a.rows)
            .flat_map(|r| &r.cells)
            .map(|c| c.accounts)
            .sum();
        let column_sum: usize = matrix.utility_totals.iter().map(|c| c.accounts).sum();
        assert_eq!(area_sum, 4);
        assert_eq!(row_sum, 4);
        assert_eq!(cell_sum, 4);
        assert_eq!(column_sum, 4);

        let cell_mwh: f64 = matrix
            .areas
            .iter()
            .flat_map(|a| &a.rows)
            .flat_map(|r| &r.cells)
            .map(|c| c.mwh)
            .sum();
        assert!((cell_mwh - matrix.grand_total.mwh).abs() < 1e-9);
    }

    #[test]
    fn rows_follow_stage_order_and_unknown_utility_rows_are_empty() {
        let rows = sample();
        let profiles: Vec<&BillingRecord> = rows.iter().collect();
        let matrix = portfolio_matrix(&profiles, &known_utilities(&rows, &[]));

        let norte = &matrix.areas[0];
        assert_eq!(norte.area, "Norte");
        let stages: Vec<&str> = norte.rows.iter().map(|r| r.stage.as_str()).collect();
        assert_eq!(stages, vec!["Excluído", "Sem Etapa"]);
        assert_eq!(norte.rows[1].total, PortfolioCell::default());

        let sul = &matrix.areas[1];
        let stages: Vec<&str> = sul.rows.iter().map(|r| r.stage.as_str()).collect();
        assert_eq!(stages, vec!["Pré-protocolo", "Operacional"]);
        assert_eq!(sul.rows[1].cells[0].accounts, 1);
        assert_eq!(sul.rows[1].cells[1].accounts, 1);
        assert_eq!(sul.cells[0].accounts, 2);
    }
}
