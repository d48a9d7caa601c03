//! Atelier Ledger service entry point.
//!
//! Opens the ledger database, builds the initial report snapshot, and runs
//! the daily refresh scheduler until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use atelier_ledger::{cache::ReportCache, config::Config, db, scheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,atelier_ledger=debug"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();

    let config = Config::from_env();
    info!(
        timezone = config.timezone.name(),
        schedule_hour = config.schedule.hour,
        schedule_minute = config.schedule.minute,
        auto_create = config.allow_auto_create_workshops,
        "Starting Atelier Ledger"
    );

    let data_dir = std::env::var("LEDGER_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"));
    let db = Arc::new(db::init(&data_dir).context("open ledger database")?);

    let cache = Arc::new(ReportCache::new());
    if let Err(e) = scheduler::refresh_reports(&db, &config, &cache) {
        warn!("Initial report refresh failed: {e}");
    }

    let handle = scheduler::start_report_scheduler(db, config, cache);

    tokio::signal::ctrl_c()
        .await
        .context("listen for shutdown signal")?;
    info!("Shutdown signal received");
    handle.stop();

    Ok(())
}
