/// Standard date format used throughout the codebase: "2025-01-15"
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// Status placeholder when a billing row carries no usable payment status
pub(crate) const UNDEFINED_STATUS: &str = "Indefinido";

pub(crate) const DEFAULT_UTILITY: &str = "Outra";
pub(crate) const DEFAULT_AREA: &str = "Outros";
pub(crate) const DEFAULT_STAGE: &str = "Sem Etapa";
pub(crate) const DEFAULT_CRM_STATUS: &str = "Sem Status";
pub(crate) const DEFAULT_OWNER: &str = "Sem Parceiro";
pub(crate) const DEFAULT_NAME: &str = "Sem Nome";
pub(crate) const UNKNOWN_MONTH: &str = "N/D";
/// Placeholder the billing export writes for an unclassified tariff group
pub(crate) const UNKNOWN_GROUP: &str = "N/D";
pub(crate) const UNKNOWN_REASON: &str = "Não informado";

/// Data-source tag marking rows that come from the CRM export, not billing facts
pub(crate) const CRM_SOURCE_TAG: &str = "RD";

pub(crate) const PAID_STATUSES: &[&str] = &[
    "CONFIRMED",
    "RECEIVED",
    "RECEIVED_IN_CASH",
    "PAID",
    "LIQUIDATED",
];
pub(crate) const OPEN_STATUSES: &[&str] = &[
    "SENT",
    "OPEN",
    "AWAITING_PAYMENT",
    "PENDING",
    "OVERDUE",
    "LATE",
];
pub(crate) const LATE_STATUSES: &[&str] = &["OVERDUE", "LATE"];

pub(crate) const CRM_DEAL_URL: &str = "https://crm.rdstation.com/app/deals/";

/// Day of month used as the "is this account active" reference point
pub(crate) const ACTIVE_REFERENCE_DAY: u32 = 28;

/// Number of months in every rolling window
pub(crate) const WINDOW_MONTHS: usize = 12;

/// A refresh lock older than this was left by a crashed run
pub(crate) const REFRESH_LOCK_STALE_AFTER: std::time::Duration = std::time::Duration::from_secs(15 * 60);
