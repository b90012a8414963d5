//! Status classification
//!
//! Pure functions; "today" is always passed in.

use chrono::NaiveDate;
use serde::Serialize;

use crate::consts::{LATE_STATUSES, OPEN_STATUSES, PAID_STATUSES};
use crate::core::types::DateField;

/// Mutually exclusive payment situation of a billing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum FinancialBucket {
    Paid,
    Overdue,
    Sent,
    NotSent,
}

impl FinancialBucket {
    pub(crate) const ALL: [FinancialBucket; 4] = [
        FinancialBucket::Paid,
        FinancialBucket::Overdue,
        FinancialBucket::Sent,
        FinancialBucket::NotSent,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            FinancialBucket::Paid => "Paid",
            FinancialBucket::Overdue => "Overdue",
            FinancialBucket::Sent => "Sent",
            FinancialBucket::NotSent => "Not sent",
        }
    }
}

/// Bucket a payment status. Any status outside the paid and open lists,
/// including `Indefinido`, drafts and unknown codes, is `NotSent`.
pub(crate) fn classify_payment(
    status: &str,
    due: Option<NaiveDate>,
    today: NaiveDate,
) -> FinancialBucket {
    let status = status.trim().to_uppercase();
    if PAID_STATUSES.contains(&status.as_str()) {
        return FinancialBucket::Paid;
    }
    if OPEN_STATUSES.contains(&status.as_str()) {
        let explicit_late = LATE_STATUSES.contains(&status.as_str());
        let past_due = due.is_some_and(|d| d < today);
        return if explicit_late || past_due {
            FinancialBucket::Overdue
        } else {
            FinancialBucket::Sent
        };
    }
    FinancialBucket::NotSent
}

/// Badge shown next to an invoice: the status alone, no due-date inference.
pub(crate) fn payment_badge(status: &str) -> Option<FinancialBucket> {
    let status = status.trim().to_uppercase();
    if PAID_STATUSES.contains(&status.as_str()) {
        Some(FinancialBucket::Paid)
    } else if LATE_STATUSES.contains(&status.as_str()) {
        Some(FinancialBucket::Overdue)
    } else if OPEN_STATUSES.contains(&status.as_str()) {
        Some(FinancialBucket::Sent)
    } else {
        None
    }
}

/// Whether our own invoice for the month has gone out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum EmissionState {
    Issued,
    Awaiting,
    Late,
}

impl EmissionState {
    pub(crate) fn label(self) -> &'static str {
        match self {
            EmissionState::Issued => "Issued",
            EmissionState::Awaiting => "Awaiting",
            EmissionState::Late => "Late",
        }
    }
}

/// An actual emission (or any settled money) always wins over dates.
/// An unreadable predicted date is treated like a missing one.
pub(crate) fn classify_emission(
    predicted: DateField,
    actual: DateField,
    settled: f64,
    today: NaiveDate,
) -> EmissionState {
    if actual.is_present() || settled > 0.0 {
        return EmissionState::Issued;
    }
    match predicted.date() {
        Some(p) if today > p => EmissionState::Late,
        _ => EmissionState::Awaiting,
    }
}

/// Lifecycle phase of an account, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum FunnelStage {
    PreProtocol,
    Protocoled,
    Operational,
    BeingCancelled,
    Cancelled,
    Unknown,
}

impl FunnelStage {
    pub(crate) const ALL: [FunnelStage; 6] = [
        FunnelStage::PreProtocol,
        FunnelStage::Protocoled,
        FunnelStage::Operational,
        FunnelStage::BeingCancelled,
        FunnelStage::Cancelled,
        FunnelStage::Unknown,
    ];

    /// Map a free-form stage name by substring, checked in lifecycle order.
    pub(crate) fn classify(stage: &str) -> Self {
        if stage.contains("Pré") {
            FunnelStage::PreProtocol
        } else if stage.contains("Protocolado") {
            FunnelStage::Protocoled
        } else if stage.contains("Operacional") {
            FunnelStage::Operational
        } else if stage.contains("Em Exclusão") {
            FunnelStage::BeingCancelled
        } else if stage.contains("Excluído") {
            FunnelStage::Cancelled
        } else {
            FunnelStage::Unknown
        }
    }

    pub(crate) fn weight(self) -> u32 {
        match self {
            FunnelStage::PreProtocol => 1,
            FunnelStage::Protocoled => 2,
            FunnelStage::Operational => 3,
            FunnelStage::BeingCancelled => 4,
            FunnelStage::Cancelled => 5,
            FunnelStage::Unknown => 99,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            FunnelStage::PreProtocol => "Pré-protocolo",
            FunnelStage::Protocoled => "Protocolado",
            FunnelStage::Operational => "Operacional",
            FunnelStage::BeingCancelled => "Em Exclusão",
            FunnelStage::Cancelled => "Excluído",
            FunnelStage::Unknown => "Sem Etapa",
        }
    }
}

/// Sort key for any stage name; ties broken by name.
pub(crate) fn stage_sort_key(stage: &str) -> (u32, &str) {
    (FunnelStage::classify(stage).weight(), stage)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn received_is_paid_regardless_of_due_date() {
        for today in [ymd(2023, 1, 1), ymd(2024, 1, 1), ymd(2030, 6, 1)] {
            assert_eq!(
                classify_payment("RECEIVED", Some(ymd(2024, 1, 1)), today),
                FinancialBucket::Paid
            );
        }
    }

    #[test]
    fn sent_past_due_is_overdue() {
        assert_eq!(
            classify_payment("SENT", Some(ymd(2020, 1, 1)), ymd(2024, 5, 10)),
            FinancialBucket::Overdue
        );
    }

    #[test]
    fn due_today_is_not_overdue() {
        let today = ymd(2024, 5, 10);
        assert_eq!(
            classify_payment("pending", Some(today), today),
            FinancialBucket::Sent
        );
        assert_eq!(classify_payment("OPEN", None, today), FinancialBucket::Sent);
    }

    #[test]
    fn explicit_late_status_wins_over_future_due() {
        assert_eq!(
            classify_payment("LATE", Some(ymd(2099, 1, 1)), ymd(2024, 1, 1)),
            FinancialBucket::Overdue
        );
    }

    #[test]
    fn unknown_statuses_are_not_sent() {
        let today = ymd(2024, 1, 1);
        for status in ["Indefinido", "", "DRAFT", "GENERATED_BILL", "NULL", "REFUNDED"] {
            assert_eq!(
                classify_payment(status, Some(ymd(2020, 1, 1)), today),
                FinancialBucket::NotSent,
                "{status}"
            );
        }
    }

    #[test]
    fn badge_ignores_due_date() {
        assert_eq!(payment_badge("paid"), Some(FinancialBucket::Paid));
        assert_eq!(payment_badge("OVERDUE"), Some(FinancialBucket::Overdue));
        assert_eq!(payment_badge("SENT"), Some(FinancialBucket::Sent));
        assert_eq!(payment_badge("Em análise"), None);
    }

    #[test]
    fn emission_actual_result_wins() {
        let today = ymd(2024, 5, 10);
        let overdue = DateField::Date(ymd(2024, 1, 1));
        assert_eq!(
            classify_emission(overdue, DateField::Date(ymd(2024, 5, 1)), 0.0, today),
            EmissionState::Issued
        );
        assert_eq!(
            classify_emission(overdue, DateField::Missing, 10.0, today),
            EmissionState::Issued
        );
        assert_eq!(
            classify_emission(overdue, DateField::Missing, 0.0, today),
            EmissionState::Late
        );
    }

    #[test]
    fn emission_without_prediction_is_awaiting() {
        let today = ymd(2024, 5, 10);
        assert_eq!(
            classify_emission(DateField::Missing, DateField::Missing, 0.0, today),
            EmissionState::Awaiting
        );
        assert_eq!(
            classify_emission(DateField::Malformed, DateField::Missing, 0.0, today),
            EmissionState::Awaiting
        );
        assert_eq!(
            classify_emission(DateField::Date(today), DateField::Missing, 0.0, today),
            EmissionState::Awaiting
        );
    }

    #[test]
    fn stage_substrings() {
        assert_eq!(FunnelStage::classify("Pré-protocolo"), FunnelStage::PreProtocol);
        assert_eq!(FunnelStage::classify("02 - Protocolados"), FunnelStage::Protocoled);
        assert_eq!(FunnelStage::classify("Operacional"), FunnelStage::Operational);
        assert_eq!(FunnelStage::classify("Em Exclusão"), FunnelStage::BeingCancelled);
        assert_eq!(FunnelStage::classify("Excluído"), FunnelStage::Cancelled);
        assert_eq!(FunnelStage::classify("Sem Etapa"), FunnelStage::Unknown);
        assert_eq!(FunnelStage::classify("Prospecção"), FunnelStage::Unknown);
    }

    #[test]
    fn stage_weights_order_display() {
        let mut stages = vec!["Excluído", "Sem Etapa", "Pré-protocolo", "Operacional"];
        stages.sort_by(|a, b| stage_sort_key(a).cmp(&stage_sort_key(b)));
        assert_eq!(stages, vec!["Pré-protocolo", "Operacional", "Excluído", "Sem Etapa"]);
        assert_eq!(FunnelStage::Unknown.weight(), 99);
    }
}
