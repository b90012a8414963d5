mod app;
mod cli;
mod commission_table;
mod config;
mod consts;
mod core;
mod error;
mod output;
mod source;
mod utils;

use std::time::Duration;

use clap::Parser;

use crate::app::CommandContext;
use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::core::Analytics;
use crate::error::AppError;
use crate::output::{NumberFormat, TableOptions};
use crate::source::{Freshness, SnapshotCache, SnapshotStore, SourceSettings, build_source};

fn source_settings(cli: &Cli, config: &Config) -> SourceSettings {
    SourceSettings {
        supabase_url: config.supabase_url.clone(),
        supabase_key: config.supabase_key.clone(),
        billing_view: config.billing_view().to_string(),
        crm_view: config.crm_view().to_string(),
        refresh_rpc: config.refresh_rpc().to_string(),
        page_size: config.page_size(),
        timeout: Duration::from_secs(config.timeout_secs()),
        data_dir: cli.data_dir.clone(),
    }
}

fn run(cli: &Cli, config: &Config) -> Result<(), AppError> {
    // Validate every flag before touching the network.
    let number_format = NumberFormat::from_locale(Some(cli.locale()))?;
    let today = cli.today()?;
    let selection = cli.selection()?;

    let settings = source_settings(cli, config);
    let source = build_source(cli.source_name(), &settings)?;
    let store = SnapshotStore::new(source, SnapshotCache::default_location());

    let command = cli.command.as_ref().unwrap_or(&Commands::Kpi);
    if let Commands::Refresh { no_upstream } = command {
        return Ok(app::handle_refresh(&store, !no_upstream, cli.json)?);
    }

    match store.load(cli.offline)? {
        Freshness::Live => {}
        Freshness::Cached => log::info!("Serving cached {} snapshot", store.source_name()),
        Freshness::Stale(err) => {
            eprintln!("Warning: showing the last cached snapshot; refresh failed: {}", err);
        }
    }

    let snapshot = store.snapshot();
    if snapshot.billing.is_empty() && snapshot.crm.is_empty() {
        println!("No data found in the {} snapshot.", store.source_name());
        return Ok(());
    }

    let analytics = Analytics::new(snapshot, selection, today, &config.known_utilities);
    let ctx = CommandContext {
        cli,
        analytics: &analytics,
        options: TableOptions {
            use_color: cli.use_color(),
            number_format,
        },
        fetch_timeout: settings.timeout,
    };
    app::handle_view(command, &ctx);
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .init();

    let config = Config::load();
    let cli = cli.with_config(&config);

    if let Err(err) = run(&cli, &config) {
        eprintln!("Error: {}", err);
        // Exit code 2 marks a database timeout.
        let timed_out = matches!(&err, AppError::Source(source) if source.is_timeout());
        std::process::exit(if timed_out { 2 } else { 1 });
    }
}
