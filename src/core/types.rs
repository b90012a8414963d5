//! Canonical record shapes shared by every aggregation
//!
//! Raw rows from any source are mapped onto these by `normalize`.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::consts::ACTIVE_REFERENCE_DAY;

/// An untyped row exactly as the source delivered it
pub(crate) type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Calendar month a billing row refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct RefMonth {
    year: i32,
    month: u32,
}

impl RefMonth {
    pub(crate) fn new(year: i32, month: u32) -> Option<Self> {
        ((1..=12).contains(&month) && (1900..=9999).contains(&year)).then_some(Self { year, month })
    }

    pub(crate) fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Accepts `MM/YYYY`, `YYYY-MM` and any `YYYY-MM-…` timestamp.
    pub(crate) fn parse(input: &str) -> Option<Self> {
        let s = input.trim();
        if let Some((month, year)) = s.split_once('/') {
            return Self::new(year.trim().parse().ok()?, month.trim().parse().ok()?);
        }
        let mut parts = s.splitn(3, '-');
        let year = parts.next()?;
        let month = parts.next()?;
        if year.len() != 4 || month.len() != 2 {
            return None;
        }
        Self::new(year.parse().ok()?, month.parse().ok()?)
    }

    pub(crate) fn year(self) -> i32 {
        self.year
    }

    pub(crate) fn month(self) -> u32 {
        self.month
    }

    pub(crate) fn label(self) -> String {
        format!("{:02}/{}", self.month, self.year)
    }

    pub(crate) fn previous(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// The 28th of the month: the cut-off for active-load membership.
    pub(crate) fn reference_point(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, ACTIVE_REFERENCE_DAY).unwrap_or(NaiveDate::MIN)
    }

    pub(crate) fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// The `len` consecutive months ending at (and including) `self`, oldest first.
    pub(crate) fn window_ending(self, len: usize) -> Vec<RefMonth> {
        let mut months = Vec::with_capacity(len);
        let mut current = self;
        for _ in 0..len {
            months.push(current);
            current = current.previous();
        }
        months.reverse();
        months
    }
}

impl Serialize for RefMonth {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

/// A date column that distinguishes "absent" from "present but unreadable".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum DateField {
    #[default]
    Missing,
    Malformed,
    Date(NaiveDate),
}

impl DateField {
    pub(crate) fn date(self) -> Option<NaiveDate> {
        match self {
            DateField::Date(d) => Some(d),
            _ => None,
        }
    }

    pub(crate) fn is_present(self) -> bool {
        !matches!(self, DateField::Missing)
    }
}

impl From<Option<NaiveDate>> for DateField {
    fn from(date: Option<NaiveDate>) -> Self {
        date.map_or(DateField::Missing, DateField::Date)
    }
}

/// One account in one reference month.
#[derive(Debug, Clone, Default)]
pub(crate) struct BillingRecord {
    pub(crate) uc: String,
    pub(crate) name: String,
    pub(crate) utility: String,
    pub(crate) area: String,
    pub(crate) stage: String,
    /// Referring partner; the "owner" of the account
    pub(crate) owner: String,
    pub(crate) month: Option<RefMonth>,
    pub(crate) status: String,
    pub(crate) invoiced: f64,
    pub(crate) estimated: f64,
    pub(crate) settled: f64,
    pub(crate) savings: f64,
    pub(crate) distributor_invoice: f64,
    /// Contracted average consumption, always kWh
    pub(crate) contracted_kwh: f64,
    pub(crate) consumed_kwh: f64,
    pub(crate) compensated_kwh: f64,
    pub(crate) efficiency: f64,
    pub(crate) discount_pct: f64,
    pub(crate) tariff_group: Option<String>,
    pub(crate) customer_nature: Option<String>,
    pub(crate) consortium: Option<String>,
    pub(crate) source_tag: Option<String>,
    pub(crate) cancellation_reason: Option<String>,
    pub(crate) due_date: Option<NaiveDate>,
    pub(crate) predicted_emission: DateField,
    pub(crate) emission: DateField,
    pub(crate) distributor_emission: Option<NaiveDate>,
    pub(crate) win_date: Option<NaiveDate>,
    pub(crate) protocol_date: Option<NaiveDate>,
    /// First non-empty of protocol, first-protocol, win and creation dates
    pub(crate) entry_date: Option<NaiveDate>,
    pub(crate) cancellation_date: Option<NaiveDate>,
}

impl BillingRecord {
    /// CRM-only rows ride along in the billing view but never carry money.
    pub(crate) fn is_crm_only(&self) -> bool {
        self.source_tag
            .as_deref()
            .is_some_and(|tag| tag.eq_ignore_ascii_case(crate::consts::CRM_SOURCE_TAG))
    }

    pub(crate) fn contracted_mwh(&self) -> f64 {
        self.contracted_kwh / 1000.0
    }

    /// Contracted consumption, falling back to measured consumption.
    pub(crate) fn energy_kwh(&self) -> f64 {
        if self.contracted_kwh != 0.0 {
            self.contracted_kwh
        } else {
            self.consumed_kwh
        }
    }

    /// Equatorial GO consortium accounts pay the distributor directly.
    pub(crate) fn is_equatorial_go_consortium(&self) -> bool {
        let utility = self.utility.to_uppercase();
        utility.contains("EQUATORIAL")
            && utility.contains("GO")
            && self
                .consortium
                .as_deref()
                .is_some_and(|flag| flag.trim().to_uppercase() == "SIM")
    }
}

/// One deal from the relationship-management export.
#[derive(Debug, Clone, Default)]
pub(crate) struct CrmRecord {
    pub(crate) uc: String,
    pub(crate) business_name: String,
    pub(crate) utility: String,
    pub(crate) area: String,
    pub(crate) stage: String,
    pub(crate) status: String,
    pub(crate) owner: String,
    pub(crate) won_date: Option<NaiveDate>,
    /// Audited dates keep "filled but unreadable" apart from "blank"
    pub(crate) protocol_date: DateField,
    pub(crate) first_savings_date: DateField,
    pub(crate) first_invoice_date: DateField,
    pub(crate) cancellation_date: DateField,
    pub(crate) last_billing_date: DateField,
    pub(crate) cancellation_reason: Option<String>,
    pub(crate) avg_consumption_mwh: f64,
    pub(crate) latitude: Option<f64>,
    pub(crate) longitude: Option<f64>,
    pub(crate) monitoring: Option<String>,
    pub(crate) allocated_plant: Option<String>,
    pub(crate) deal_id: Option<String>,
}

/// Rows exactly as fetched; also the on-disk cache format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct RawSnapshot {
    pub(crate) billing: Vec<RawRecord>,
    pub(crate) crm: Vec<RawRecord>,
    #[serde(default)]
    pub(crate) fetched_at: Option<DateTime<Utc>>,
}

/// A normalized, immutable snapshot every view reads from.
#[derive(Debug, Clone, Default)]
pub(crate) struct Snapshot {
    pub(crate) billing: Vec<BillingRecord>,
    pub(crate) crm: Vec<CrmRecord>,
    pub(crate) fetched_at: Option<DateTime<Utc>>,
}
