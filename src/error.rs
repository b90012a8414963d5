use std::path::PathBuf;

use thiserror::Error;

/// Message shown whenever the upstream database times out
pub(crate) const TIMEOUT_HINT: &str =
    "The database took too long to respond. Try again in a minute.";

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("Invalid date \"{input}\" (expected YYYY-MM-DD, YYYYMMDD or DD/MM/YYYY)")]
    InvalidDate { input: String },

    #[error("Invalid reference month \"{input}\" (expected MM/YYYY or all)")]
    InvalidMonth { input: String },

    #[error("Invalid timezone: {input}")]
    InvalidTimezone { input: String },

    #[error("Unsupported locale: {input}")]
    UnsupportedLocale { input: String },

    #[error("Unknown source \"{name}\" (expected one of: {known})")]
    UnknownSource { name: String, known: String },

    #[error("{0}")]
    Source(#[from] SourceError),
}

/// Failures at the snapshot boundary: fetching rows or asking upstream to recompute.
#[derive(Debug, Error)]
pub(crate) enum SourceError {
    #[error("{TIMEOUT_HINT} ({message})")]
    Timeout { message: String },

    #[error("HTTP {status} from {url}: {message}")]
    Http {
        status: u16,
        url: String,
        message: String,
    },

    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON from {origin}: {message}")]
    Parse { origin: String, message: String },

    #[error("Supabase credentials missing (set SUPABASE_URL and SUPABASE_KEY or add them to the config file)")]
    MissingCredentials,

    #[error("No export files found in {path}")]
    NoData { path: PathBuf },

    #[error("No cached snapshot at {path} (run once without --offline)")]
    NoCachedSnapshot { path: PathBuf },

    #[error("{source_name} cannot request an upstream refresh")]
    RefreshUnsupported { source_name: &'static str },
}

impl SourceError {
    /// Timeout-class failures are user-actionable ("wait and retry").
    pub(crate) fn is_timeout(&self) -> bool {
        matches!(self, SourceError::Timeout { .. })
    }

    /// Classify a non-success HTTP response, promoting statement timeouts.
    pub(crate) fn from_response(status: u16, url: &str, body: &str) -> Self {
        if status == 408 || status == 504 || mentions_timeout(body) {
            return SourceError::Timeout {
                message: body.trim().to_string(),
            };
        }
        SourceError::Http {
            status,
            url: url.to_string(),
            message: body.trim().to_string(),
        }
    }

    pub(crate) fn from_transport(url: &str, err: ureq::Error) -> Self {
        match err {
            ureq::Error::Timeout(kind) => SourceError::Timeout {
                message: format!("{kind:?} timeout reached"),
            },
            other => {
                let message = other.to_string();
                if mentions_timeout(&message) {
                    SourceError::Timeout { message }
                } else {
                    SourceError::Transport {
                        url: url.to_string(),
                        message,
                    }
                }
            }
        }
    }
}

fn mentions_timeout(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("timeout") || lower.contains("canceling statement")
}
