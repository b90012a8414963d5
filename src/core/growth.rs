//! Rolling 12-month series
//!
//! Portfolio growth works on one profile per account; consumption works on the
//! raw month rows. Both share the same window of months.

use serde::Serialize;

use crate::consts::WINDOW_MONTHS;
use crate::core::math::{ratio, round_to};
use crate::core::types::{BillingRecord, RefMonth};

#[derive(Debug, Clone, Serialize)]
pub(crate) struct GrowthPoint {
    pub(crate) month: RefMonth,
    pub(crate) entries: usize,
    pub(crate) entries_mwh: f64,
    pub(crate) exits: usize,
    pub(crate) exits_mwh: f64,
    pub(crate) active: usize,
    /// Active contracted load, rounded to whole MWh
    pub(crate) active_mwh: f64,
    pub(crate) growth_pct: f64,
}

/// Entries, exits and active load for the 12 months ending at `end`.
///
/// An account is active in a month when it entered before the 28th and had
/// not left by the 28th. Growth is net MWh change over the previous month's
/// rounded active load; 0 for the first month or an empty baseline.
pub(crate) fn growth_series(profiles: &[&BillingRecord], end: RefMonth) -> Vec<GrowthPoint> {
    let mut previous_active_mwh = 0.0;

    end.window_ending(WINDOW_MONTHS)
        .into_iter()
        .enumerate()
        .map(|(index, month)| {
            let reference = month.reference_point();
            let mut point = GrowthPoint {
                month,
                entries: 0,
                entries_mwh: 0.0,
                exits: 0,
                exits_mwh: 0.0,
                active: 0,
                active_mwh: 0.0,
                growth_pct: 0.0,
            };
            let mut active_mwh = 0.0;

            for profile in profiles {
                let mwh = profile.contracted_mwh();
                let entry = profile.entry_date;
                let exit = profile.cancellation_date;

                if entry.is_some_and(|d| month.contains(d)) {
                    point.entries += 1;
                    point.entries_mwh += mwh;
                }
                if exit.is_some_and(|d| month.contains(d)) {
                    point.exits += 1;
                    point.exits_mwh += mwh;
                }
                let entered = entry.is_none_or(|d| d < reference);
                let still_there = exit.is_none_or(|d| d > reference);
                if entered && still_there {
                    point.active += 1;
                    active_mwh += mwh;
                }
            }

            point.active_mwh = active_mwh.round();
            if index > 0 && previous_active_mwh > 0.0 {
                let net = point.entries_mwh - point.exits_mwh;
                point.growth_pct = round_to(net / previous_active_mwh * 100.0, 1);
            }
            previous_active_mwh = point.active_mwh;
            point.entries_mwh = round_to(point.entries_mwh, 1);
            point.exits_mwh = round_to(point.exits_mwh, 1);
            point
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ConsumptionPoint {
    pub(crate) month: RefMonth,
    pub(crate) contracted_kwh: f64,
    pub(crate) compensated_kwh: f64,
    pub(crate) invoiced: f64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ConsumptionSeries {
    pub(crate) points: Vec<ConsumptionPoint>,
    /// Total invoiced over total compensated kWh across the window
    pub(crate) average_tariff: f64,
}

/// Monthly contracted vs compensated energy and invoiced value.
/// Rows with no real payment status are left out.
pub(crate) fn consumption_series(rows: &[&BillingRecord], end: RefMonth) -> ConsumptionSeries {
    let valid: Vec<&&BillingRecord> = rows.iter().filter(|r| has_real_status(r)).collect();
    let mut total_invoiced = 0.0;
    let mut total_compensated = 0.0;

    let points = end
        .window_ending(WINDOW_MONTHS)
        .into_iter()
        .map(|month| {
            let mut contracted = 0.0;
            let mut compensated = 0.0;
            let mut invoiced = 0.0;
            for row in valid.iter().filter(|r| r.month == Some(month)) {
                contracted += row.contracted_kwh;
                compensated += row.compensated_kwh;
                invoiced += row.invoiced;
            }
            total_invoiced += invoiced;
            total_compensated += compensated;
            ConsumptionPoint {
                month,
                contracted_kwh: contracted.round(),
                compensated_kwh: compensated.round(),
                invoiced: round_to(invoiced, 2),
            }
        })
        .collect();

    ConsumptionSeries {
        points,
        average_tariff: ratio(total_invoiced, total_compensated),
    }
}

fn has_real_status(record: &BillingRecord) -> bool {
    let status = record.status.trim();
    !status.is_empty()
        && status != crate::consts::UNDEFINED_STATUS
        && !status.eq_ignore_ascii_case("null")
}
