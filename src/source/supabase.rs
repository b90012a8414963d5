//! PostgREST views behind a Supabase project

use chrono::Utc;

use crate::core::{RawRecord, RawSnapshot};
use crate::error::SourceError;

use super::{SnapshotSource, SourceSettings};

pub(crate) struct SupabaseSource {
    base_url: String,
    key: String,
    billing_view: String,
    crm_view: String,
    refresh_rpc: String,
    page_size: usize,
    agent: ureq::Agent,
}

impl SupabaseSource {
    pub(crate) fn new(settings: &SourceSettings) -> Result<Self, SourceError> {
        let (Some(url), Some(key)) = (
            settings.supabase_url.as_deref().map(str::trim).filter(|u| !u.is_empty()),
            settings.supabase_key.as_deref().map(str::trim).filter(|k| !k.is_empty()),
        ) else {
            return Err(SourceError::MissingCredentials);
        };

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(settings.timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self {
            base_url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            billing_view: settings.billing_view.clone(),
            crm_view: settings.crm_view.clone(),
            refresh_rpc: settings.refresh_rpc.clone(),
            page_size: settings.page_size.max(1),
            agent,
        })
    }

    fn page_url(&self, view: &str, offset: usize) -> String {
        format!(
            "{}/rest/v1/{}?select=*&offset={}&limit={}",
            self.base_url, view, offset, self.page_size
        )
    }

    fn get_page(&self, view: &str, offset: usize) -> Result<Vec<RawRecord>, SourceError> {
        let url = self.page_url(view, offset);
        let response = self
            .agent
            .get(&url)
            .header("apikey", &self.key)
            .header("Authorization", &format!("Bearer {}", self.key))
            .header("Accept", "application/json")
            .call()
            .map_err(|e| SourceError::from_transport(&url, e))?;

        let status = response.status().as_u16();
        let mut body = response.into_body();
        if !(200..300).contains(&status) {
            let text = body.read_to_string().unwrap_or_default();
            return Err(SourceError::from_response(status, &url, &text));
        }
        serde_json::from_reader(body.as_reader()).map_err(|e| SourceError::Parse {
            origin: url,
            message: e.to_string(),
        })
    }

    /// Page through a view until a short page comes back.
    fn fetch_view(&self, view: &str) -> Result<Vec<RawRecord>, SourceError> {
        let mut rows = Vec::new();
        let mut offset = 0;
        loop {
            let page = self.get_page(view, offset)?;
            let len = page.len();
            rows.extend(page);
            log::debug!("{}: {} rows at offset {}", view, len, offset);
            if len < self.page_size {
                break;
            }
            offset += len;
        }
        log::info!("Fetched {} rows from {}", rows.len(), view);
        Ok(rows)
    }
}

impl SnapshotSource for SupabaseSource {
    fn name(&self) -> &'static str {
        "supabase"
    }

    fn fetch_snapshot(&self) -> Result<RawSnapshot, SourceError> {
        let billing = self.fetch_view(&self.billing_view)?;
        let crm = self.fetch_view(&self.crm_view)?;
        Ok(RawSnapshot {
            billing,
            crm,
            fetched_at: Some(Utc::now()),
        })
    }

    fn request_upstream_refresh(&self) -> Result<(), SourceError> {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, self.refresh_rpc);
        log::info!("Requesting upstream refresh via {}", self.refresh_rpc);
        let response = self
            .agent
            .post(&url)
            .header("apikey", &self.key)
            .header("Authorization", &format!("Bearer {}", self.key))
            .send_json(serde_json::json!({}))
            .map_err(|e| SourceError::from_transport(&url, e))?;

        let status = response.status().as_u16();
        if (200..300).contains(&status) {
            return Ok(());
        }
        let text = response.into_body().read_to_string().unwrap_or_default();
        Err(SourceError::from_response(status, &url, &text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings() -> SourceSettings {
        SourceSettings {
            supabase_url: Some("https://demo.supabase.co/".to_string()),
            supabase_key: Some("anon".to_string()),
            billing_view: "analytics_completo".to_string(),
            crm_view: "view_crm_dashboard".to_string(),
            refresh_rpc: "refresh_analytics".to_string(),
            page_size: 500,
            timeout: Duration::from_secs(5),
            data_dir: None,
        }
    }

    #[test]
    fn requires_credentials() {
        let missing = SourceSettings {
            supabase_key: Some("  ".to_string()),
            ..settings()
        };
        assert!(matches!(
            SupabaseSource::new(&missing),
            Err(SourceError::MissingCredentials)
        ));
    }

    #[test]
    fn builds_paged_urls() {
        let source = SupabaseSource::new(&settings()).unwrap();
        assert_eq!(
            source.page_url("analytics_completo", 1000),
            "https://demo.supabase.co/rest/v1/analytics_completo?select=*&offset=1000&limit=500"
        );
    }
}
