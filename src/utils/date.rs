use chrono::NaiveDate;

use crate::consts::DATE_FORMAT;
use crate::error::AppError;

/// Lenient date reader for export columns.
///
/// Accepts `YYYY-MM-DD`, any timestamp starting with one (`2024-01-05T10:00:00Z`,
/// `2024-01-05 10:00:00+00`), `DD/MM/YYYY` and `YYYYMMDD`. Returns `None` for
/// anything else; callers treat that as an absent date.
pub(crate) fn parse_flexible_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(prefix) = s.get(..10)
        && let Ok(d) = NaiveDate::parse_from_str(prefix, DATE_FORMAT)
    {
        return Some(d);
    }
    if s.contains('/') {
        let head = s.split_whitespace().next().unwrap_or(s);
        return NaiveDate::parse_from_str(head, "%d/%m/%Y").ok();
    }
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::parse_from_str(s, "%Y%m%d").ok();
    }
    None
}

/// Strict variant for command-line input.
pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, AppError> {
    parse_flexible_date(s).ok_or_else(|| AppError::InvalidDate {
        input: s.to_string(),
    })
}
