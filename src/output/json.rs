use serde::Serialize;

/// Pretty JSON for any view; a serialization failure prints `null`.
pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        log::error!("Failed to serialize JSON output: {}", e);
        "null".to_string()
    })
}
