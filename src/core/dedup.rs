//! Per-account deduplication
//!
//! Billing rows are one per account per month. Views that need the "current"
//! state of an account (portfolio, growth, funnel buckets) collapse them to a
//! single profile: last write wins per account identifier.

use std::collections::HashMap;

use crate::core::types::{BillingRecord, CrmRecord, RefMonth};

/// Trait for rows that can be collapsed per account
pub(crate) trait Deduplicatable {
    fn account_key(&self) -> &str;

    /// Month the row refers to, when the row is month-indexed
    fn ref_month(&self) -> Option<RefMonth> {
        None
    }
}

impl Deduplicatable for BillingRecord {
    fn account_key(&self) -> &str {
        &self.uc
    }

    fn ref_month(&self) -> Option<RefMonth> {
        self.month
    }
}

impl Deduplicatable for CrmRecord {
    fn account_key(&self) -> &str {
        &self.uc
    }
}

impl<T: Deduplicatable> Deduplicatable for &T {
    fn account_key(&self) -> &str {
        (**self).account_key()
    }

    fn ref_month(&self) -> Option<RefMonth> {
        (**self).ref_month()
    }
}

/// How "latest" is decided when collapsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum DedupOrder {
    /// Last row in input order wins; the caller guarantees chronological input
    Input,
    /// Rows are stably sorted by reference month first (unknown months oldest),
    /// so the newest month wins and ties keep input order
    #[default]
    Chronological,
}

/// Incremental last-write-wins accumulator.
#[derive(Debug, Clone)]
pub(crate) struct DedupAccumulator<T: Deduplicatable> {
    slots: HashMap<String, usize>,
    entries: Vec<T>,
    total: usize,
}

impl<T: Deduplicatable> Default for DedupAccumulator<T> {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
            entries: Vec::new(),
            total: 0,
        }
    }
}

impl<T: Deduplicatable> DedupAccumulator<T> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, entry: T) {
        self.total += 1;
        match self.slots.get(entry.account_key()) {
            Some(&slot) => self.entries[slot] = entry,
            None => {
                self.slots
                    .insert(entry.account_key().to_string(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub(crate) fn extend<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = T>,
    {
        for entry in entries {
            self.push(entry);
        }
    }

    /// Profiles in order of first appearance, plus how many rows were superseded.
    pub(crate) fn finalize(self) -> (Vec<T>, usize) {
        let superseded = self.total - self.entries.len();
        (self.entries, superseded)
    }
}

/// Collapse rows to one profile per account.
pub(crate) fn deduplicate<T, I>(rows: I, order: DedupOrder) -> Vec<T>
where
    T: Deduplicatable,
    I: IntoIterator<Item = T>,
{
    let mut rows: Vec<T> = rows.into_iter().collect();
    if order == DedupOrder::Chronological {
        rows.sort_by_key(|row| row.ref_month());
    }
    let mut accumulator = DedupAccumulator::new();
    accumulator.extend(rows);
    let (profiles, superseded) = accumulator.finalize();
    log::debug!(
        "Collapsed {} superseded rows into {} account profiles",
        superseded,
        profiles.len()
    );
    profiles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(uc: &str, month: Option<(i32, u32)>, name: &str) -> BillingRecord {
        BillingRecord {
            uc: uc.to_string(),
            name: name.to_string(),
            month: month.and_then(|(y, m)| RefMonth::new(y, m)),
            ..Default::default()
        }
    }

    #[test]
    fn last_write_wins_in_input_order() {
        let rows = vec![
            row("a", Some((2024, 3)), "march"),
            row("b", Some((2024, 1)), "b"),
            row("a", Some((2024, 1)), "january"),
        ];
        let profiles = deduplicate(&rows, DedupOrder::Input);
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].name, "january");
        assert_eq!(profiles[1].name, "b");
    }

    #[test]
    fn chronological_mode_picks_newest_month() {
        let rows = vec![
            row("a", Some((2024, 3)), "march"),
            row("a", None, "unknown"),
            row("a", Some((2024, 1)), "january"),
        ];
        let profiles = deduplicate(&rows, DedupOrder::Chronological);
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].name, "march");
    }

    #[test]
    fn chronological_ties_keep_input_order() {
        let rows = vec![
            row("a", Some((2024, 3)), "first"),
            row("a", Some((2024, 3)), "second"),
        ];
        let profiles = deduplicate(&rows, DedupOrder::Chronological);
        assert_eq!(profiles[0].name, "second");
    }

    #[test]
    fn accumulator_counts_superseded_rows() {
        let mut acc = DedupAccumulator::new();
        acc.extend(vec![row("a", None, "1"), row("a", None, "2"), row("a", None, "3")]);
        acc.push(row("b", None, "4"));
        let (profiles, superseded) = acc.finalize();
        assert_eq!(profiles.len(), 2);
        assert_eq!(superseded, 2);
        assert_eq!(profiles[0].name, "3");
    }

    #[test]
    fn empty_input() {
        let rows: Vec<BillingRecord> = Vec::new();
        assert!(deduplicate(&rows, DedupOrder::Input).is_empty());
    }

    #[test]
    fn crm_rows_collapse_by_account() {
        let rows = vec![
            CrmRecord {
                uc: "x".to_string(),
                stage: "Protocolados".to_string(),
                ..Default::default()
            },
            CrmRecord {
                uc: "x".to_string(),
                stage: "Operacional".to_string(),
                ..Default::default()
            },
        ];
        let profiles = deduplicate(&rows, DedupOrder::Input);
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].stage, "Operacional");
    }
}
