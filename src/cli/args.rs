//! CLI argument definitions
//!
//! Global CLI options and configuration merging logic.

use std::io::IsTerminal;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, ValueEnum};

use crate::config::{Config, ConfigColorMode, ConfigSource, DEFAULT_LOCALE, DEFAULT_TIMEZONE};
use crate::core::{DateRange, RefMonth, Selection};
use crate::error::AppError;
use crate::utils::{Timezone, parse_date};

use super::commands::Commands;

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq)]
pub(crate) enum ColorMode {
    /// Auto-detect based on terminal (default)
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

#[derive(Parser)]
#[command(name = "enstats")]
#[command(
    about = "Commercial and financial reporting for energy-resale billing and CRM snapshots",
    version
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Option<Commands>,

    /// Only this utility (concessionária)
    #[arg(long, global = true)]
    pub(crate) utility: Option<String>,

    /// Only this management area
    #[arg(long, global = true)]
    pub(crate) area: Option<String>,

    /// Only this funnel stage (exact stage text)
    #[arg(long, global = true)]
    pub(crate) stage: Option<String>,

    /// Only accounts referred by this partner
    #[arg(long, global = true)]
    pub(crate) owner: Option<String>,

    /// Reference month (MM/YYYY or YYYY-MM), or "all"
    #[arg(short, long, global = true)]
    pub(crate) month: Option<String>,

    /// Predicted emission from this date (YYYY-MM-DD, YYYYMMDD or DD/MM/YYYY)
    #[arg(long, global = true)]
    pub(crate) from: Option<String>,

    /// Predicted emission until this date (inclusive)
    #[arg(long, global = true)]
    pub(crate) to: Option<String>,

    /// Snapshot source: supabase or file
    #[arg(short, long, global = true)]
    pub(crate) source: Option<String>,

    /// Directory holding billing*.json and crm*.json exports (file source)
    #[arg(long, global = true, value_name = "DIR")]
    pub(crate) data_dir: Option<PathBuf>,

    /// Serve the cached snapshot without contacting the source
    #[arg(short = 'O', long, global = true)]
    pub(crate) offline: bool,

    /// Commission percentage table (JSON file path or URL)
    #[arg(long, global = true, value_name = "PATH_OR_URL")]
    pub(crate) commission_table: Option<String>,

    /// Evaluate dates as of this day instead of the current one
    #[arg(long, global = true, value_name = "DATE")]
    pub(crate) today: Option<String>,

    /// Output as JSON
    #[arg(short, long, global = true)]
    pub(crate) json: bool,

    /// Color output mode
    #[arg(long, global = true, value_enum, default_value = "auto")]
    pub(crate) color: ColorMode,

    /// Disable colored output (shorthand for --color=never)
    #[arg(long, global = true)]
    pub(crate) no_color: bool,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    pub(crate) verbose: bool,

    /// Log processing details to stderr
    #[arg(long, global = true)]
    pub(crate) debug: bool,

    /// Timezone deciding the current day (default America/Sao_Paulo)
    #[arg(long, global = true, value_name = "TZ")]
    pub(crate) timezone: Option<String>,

    /// Locale for number formatting (pt, en, de, fr)
    #[arg(long, global = true, value_name = "LOCALE")]
    pub(crate) locale: Option<String>,
}

/// "all", "todas" and blank mean no filter.
fn filter_value(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all") && !v.eq_ignore_ascii_case("todas"))
        .map(str::to_string)
}

impl Cli {
    /// Merge config file values into CLI (CLI args take precedence)
    pub(crate) fn with_config(mut self, config: &Config) -> Self {
        // For boolean flags, config only applies if CLI is false (default)
        if !self.offline && config.offline {
            self.offline = true;
        }
        if !self.no_color && config.no_color {
            self.no_color = true;
        }

        if let Some(color) = config.color
            && self.color == ColorMode::Auto
        {
            match color {
                ConfigColorMode::Always => self.color = ColorMode::Always,
                ConfigColorMode::Never => self.color = ColorMode::Never,
                ConfigColorMode::Auto => {}
            }
        }

        if self.source.is_none() {
            self.source = config.source.map(|s| {
                match s {
                    ConfigSource::Supabase => "supabase",
                    ConfigSource::File => "file",
                }
                .to_string()
            });
        }

        // String options: only apply if CLI didn't set them
        if self.data_dir.is_none() {
            self.data_dir = config.data_dir.clone();
        }
        if self.commission_table.is_none() {
            self.commission_table = config.commission_table.clone();
        }
        if self.timezone.is_none() {
            self.timezone = config.timezone.clone();
        }
        if self.locale.is_none() {
            self.locale = config.locale.clone();
        }

        self
    }

    pub(crate) fn use_color(&self) -> bool {
        if self.no_color {
            return false;
        }
        match self.color {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => std::io::stdout().is_terminal(),
        }
    }

    pub(crate) fn log_level(&self) -> log::LevelFilter {
        if self.debug {
            log::LevelFilter::Debug
        } else if self.verbose {
            log::LevelFilter::Info
        } else {
            log::LevelFilter::Warn
        }
    }

    pub(crate) fn source_name(&self) -> &str {
        self.source.as_deref().unwrap_or("supabase")
    }

    pub(crate) fn locale(&self) -> &str {
        self.locale.as_deref().unwrap_or(DEFAULT_LOCALE)
    }

    pub(crate) fn timezone(&self) -> Result<Timezone, AppError> {
        Timezone::parse(Some(self.timezone.as_deref().unwrap_or(DEFAULT_TIMEZONE)))
    }

    /// `--today` when given, else the current day in the configured timezone.
    pub(crate) fn today(&self) -> Result<NaiveDate, AppError> {
        match self.today.as_deref() {
            Some(raw) => parse_date(raw),
            None => Ok(self.timezone()?.today()),
        }
    }

    pub(crate) fn selection(&self) -> Result<Selection, AppError> {
        let month = match filter_value(&self.month) {
            Some(raw) => Some(RefMonth::parse(&raw).ok_or(AppError::InvalidMonth { input: raw })?),
            None => None,
        };
        let from = self.from.as_deref().map(parse_date).transpose()?;
        let to = self.to.as_deref().map(parse_date).transpose()?;
        let date_range = match (from, to) {
            (Some(from), to) => Some(DateRange::new(from, to)),
            (None, Some(to)) => Some(DateRange::new(NaiveDate::MIN, Some(to))),
            (None, None) => None,
        };

        Ok(Selection {
            utility: filter_value(&self.utility),
            area: filter_value(&self.area),
            stage: filter_value(&self.stage),
            month,
            date_range,
            owner: filter_value(&self.owner),
        })
    }
}
