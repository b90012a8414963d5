use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

pub(crate) const DEFAULT_BILLING_VIEW: &str = "analytics_completo";
pub(crate) const DEFAULT_CRM_VIEW: &str = "view_crm_dashboard";
pub(crate) const DEFAULT_REFRESH_RPC: &str = "refresh_analytics";
pub(crate) const DEFAULT_PAGE_SIZE: usize = 1000;
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub(crate) const DEFAULT_TIMEZONE: &str = "America/Sao_Paulo";
pub(crate) const DEFAULT_LOCALE: &str = "pt";

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ConfigColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ConfigSource {
    Supabase,
    File,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Config {
    #[serde(default)]
    pub(crate) offline: bool,
    #[serde(default)]
    pub(crate) no_color: bool,
    #[serde(default)]
    pub(crate) source: Option<ConfigSource>,
    #[serde(default)]
    pub(crate) supabase_url: Option<String>,
    #[serde(default)]
    pub(crate) supabase_key: Option<String>,
    #[serde(default)]
    pub(crate) billing_view: Option<String>,
    #[serde(default)]
    pub(crate) crm_view: Option<String>,
    #[serde(default)]
    pub(crate) refresh_rpc: Option<String>,
    #[serde(default)]
    pub(crate) page_size: Option<usize>,
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
    #[serde(default)]
    pub(crate) data_dir: Option<PathBuf>,
    /// Commission percentage table: local JSON path or http(s) URL
    #[serde(default)]
    pub(crate) commission_table: Option<String>,
    /// Utilities shown as portfolio columns; derived from the snapshot when empty
    #[serde(default)]
    pub(crate) known_utilities: Vec<String>,
    #[serde(default)]
    pub(crate) color: Option<ConfigColorMode>,
    #[serde(default)]
    pub(crate) timezone: Option<String>,
    #[serde(default)]
    pub(crate) locale: Option<String>,
}

impl Config {
    pub(crate) fn load() -> Self {
        let mut config = Self::load_from_paths(&Self::get_config_paths());
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    fn load_from_paths(paths: &[PathBuf]) -> Self {
        for path in paths {
            if path.exists()
                && let Ok(content) = fs::read_to_string(path)
            {
                match toml::from_str::<Config>(&content) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        log::warn!("Failed to parse {}: {}", path.display(), e);
                    }
                }
            }
        }

        Self::default()
    }

    /// Environment credentials take precedence over the file.
    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SUPABASE_URL").filter(|v| !v.trim().is_empty()) {
            self.supabase_url = Some(url);
        }
        if let Some(key) = lookup("SUPABASE_KEY").filter(|v| !v.trim().is_empty()) {
            self.supabase_key = Some(key);
        }
    }

    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // 1. XDG config: ~/.config/enstats/config.toml
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join("enstats").join("config.toml"));
        }

        // 2. Platform config dir (macOS Application Support, Windows AppData)
        if let Some(config_dir) = dirs::config_dir() {
            let platform_path = config_dir.join("enstats").join("config.toml");
            if !paths.contains(&platform_path) {
                paths.push(platform_path);
            }
        }

        // 3. Home directory: ~/.enstats.toml
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".enstats.toml"));
        }

        paths
    }

    pub(crate) fn billing_view(&self) -> &str {
        self.billing_view.as_deref().unwrap_or(DEFAULT_BILLING_VIEW)
    }

    pub(crate) fn crm_view(&self) -> &str {
        self.crm_view.as_deref().unwrap_or(DEFAULT_CRM_VIEW)
    }

    pub(crate) fn refresh_rpc(&self) -> &str {
        self.refresh_rpc.as_deref().unwrap_or(DEFAULT_REFRESH_RPC)
    }

    pub(crate) fn page_size(&self) -> usize {
        self.page_size
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub(crate) fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_paths() {
        let paths = Config::get_config_paths();
        assert!(!paths.is_empty());
        assert!(paths.iter().all(|p| p.to_string_lossy().contains("enstats")));
    }

    #[test]
    fn parses_full_config() {
        let config: Config = toml::from_str(
            r#"
source = "supabase"
supabase_url = "https://example.supabase.co"
billing_view = "analytics_v2"
page_size = 500
known_utilities = ["CEMIG", "EQUATORIAL GO"]
color = "never"
"#,
        )
        .unwrap();
        assert_eq!(config.source, Some(ConfigSource::Supabase));
        assert_eq!(config.billing_view(), "analytics_v2");
        assert_eq!(config.crm_view(), DEFAULT_CRM_VIEW);
        assert_eq!(config.page_size(), 500);
        assert_eq!(config.known_utilities.len(), 2);
    }

    #[test]
    fn zero_page_size_falls_back_to_default() {
        let config: Config = toml::from_str("page_size = 0").unwrap();
        assert_eq!(config.page_size(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn env_overrides_file_credentials() {
        let mut config: Config = toml::from_str(r#"supabase_key = "from-file""#).unwrap();
        config.apply_env(|key| match key {
            "SUPABASE_KEY" => Some("from-env".to_string()),
            "SUPABASE_URL" => Some("   ".to_string()),
            _ => None,
        });
        assert_eq!(config.supabase_key.as_deref(), Some("from-env"));
        assert!(config.supabase_url.is_none());
    }

    #[test]
    fn unreadable_paths_yield_default() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("config.toml");
        fs::write(&bad, "page_size = \"many\"").unwrap();
        let config = Config::load_from_paths(&[dir.path().join("missing.toml"), bad]);
        assert_eq!(config.page_size(), DEFAULT_PAGE_SIZE);
    }
}
