//! Prediction Engine Service
//!
//! One matching pass over imported fixtures:
//! - Loads upcoming fixtures with opening odds from Postgres
//! - Applies the active golden-rule set to each odds vector
//! - Writes ranked prediction records (first writer wins per fixture+date)
//! - Records a run-audit row with pass statistics

mod config;
mod runner;

use anyhow::Result;
use config::EngineServiceConfig;
use dotenv::dotenv;
use goalhawk_rust_core::db;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    info!("Starting Prediction Engine...");

    let cfg = EngineServiceConfig::from_env()?;
    info!(
        "Config: dates={}..+{}d leagues={:?} min_confidence={} refresh={}",
        cfg.date_from
            .map(|d| d.to_string())
            .unwrap_or_else(|| "today".to_string()),
        cfg.days_ahead,
        cfg.leagues,
        cfg.min_confidence,
        cfg.refresh,
    );

    let pool = db::pool::connect(&cfg.database_url, 5).await?;
    info!("Connected to database");

    let summary = runner::run_pass(&pool, &cfg).await?;

    info!(
        "Engine pass complete: run={} processed={} opportunities={} inserted={} \
         skipped_existing={} missing_primary={} below_confidence={} cleared={} ({} ms)",
        summary.run_id,
        summary.matches_processed,
        summary.opportunities_found,
        summary.inserted,
        summary.skipped_existing,
        summary.missing_primary,
        summary.below_confidence,
        summary.cleared,
        summary.execution_time_ms,
    );

    Ok(())
}
