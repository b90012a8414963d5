//! The filter selection every view accepts

use chrono::NaiveDate;

use crate::core::types::{BillingRecord, CrmRecord, DateField, RefMonth};

/// Predicted-emission window. With no end it matches a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DateRange {
    from: NaiveDate,
    to: Option<NaiveDate>,
}

impl DateRange {
    pub(crate) fn new(from: NaiveDate, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    /// Inclusive on both ends; an inverted range matches nothing.
    pub(crate) fn contains(&self, date: NaiveDate) -> bool {
        match self.to {
            Some(to) => self.from <= date && date <= to,
            None => date == self.from,
        }
    }

    fn admits(&self, predicted: DateField) -> bool {
        match predicted {
            DateField::Missing => true,
            DateField::Malformed => false,
            DateField::Date(d) => self.contains(d),
        }
    }
}

/// Active filter values; `None` means "all".
#[derive(Debug, Clone, Default)]
pub(crate) struct Selection {
    pub(crate) utility: Option<String>,
    pub(crate) area: Option<String>,
    pub(crate) stage: Option<String>,
    pub(crate) month: Option<RefMonth>,
    pub(crate) date_range: Option<DateRange>,
    pub(crate) owner: Option<String>,
}

fn matches(wanted: Option<&String>, actual: &str) -> bool {
    wanted.is_none_or(|w| w == actual)
}

impl Selection {
    /// Utility, area, stage and owner; the non-temporal filters.
    pub(crate) fn matches_segment(&self, record: &BillingRecord) -> bool {
        matches(self.utility.as_ref(), &record.utility)
            && matches(self.area.as_ref(), &record.area)
            && matches(self.stage.as_ref(), &record.stage)
            && matches(self.owner.as_ref(), &record.owner)
    }

    pub(crate) fn matches_billing(&self, record: &BillingRecord) -> bool {
        if !self.matches_segment(record) {
            return false;
        }
        if let Some(month) = self.month
            && record.month != Some(month)
        {
            return false;
        }
        self.date_range
            .is_none_or(|range| range.admits(record.predicted_emission))
    }

    pub(crate) fn matches_crm(&self, record: &CrmRecord) -> bool {
        matches(self.utility.as_ref(), &record.utility)
            && matches(self.area.as_ref(), &record.area)
            && matches(self.stage.as_ref(), &record.stage)
            && matches(self.owner.as_ref(), &record.owner)
    }

    /// Last month of every rolling window: the selected month, else today's.
    pub(crate) fn window_end(&self, today: NaiveDate) -> RefMonth {
        self.month.unwrap_or_else(|| RefMonth::from_date(today))
    }
}
