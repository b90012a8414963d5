//! Externally maintained commission percentages

mod cache;
mod provider;
mod table;

pub(crate) use table::CommissionTable;
