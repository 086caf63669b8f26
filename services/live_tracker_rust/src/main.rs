//! Live Tracker Service
//!
//! The polling loop around stored predictions:
//! - Fetches live telemetry through a process-wide throttled feed cache
//! - Resolves stored fixtures against feed fixtures by fuzzy team identity
//! - Diffs live state and persists only on change
//! - Evaluates final verdicts when fixtures finish
//! - Emits at-most-once proximity alerts and result notifications

use anyhow::Result;
use chrono::Utc;
use dotenv::dotenv;
use goalhawk_rust_core::clients::{ApiFootballClient, ThrottledFeed};
use goalhawk_rust_core::db;
use goalhawk_rust_core::matching::NameResolver;
use live_tracker_rust::config::TrackerConfig;
use live_tracker_rust::notifier::Notifier;
use live_tracker_rust::tracker::Tracker;
use log::{error, info};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    info!("Starting Live Tracker Service...");

    let cfg = TrackerConfig::from_env()?;
    info!(
        "Config: poll={}s idle={}s feed_throttle={}s quiet_hours={}",
        cfg.poll_interval.as_secs(),
        cfg.idle_interval.as_secs(),
        cfg.feed_min_interval.as_secs(),
        cfg.quiet_hours_enabled,
    );

    let pool = db::pool::connect(&cfg.database_url, 5).await?;
    info!("Connected to database");

    let client = ApiFootballClient::new(cfg.api_football_key.clone());
    match client.usage().await {
        Ok(usage) => info!(
            "API-Football quota: plan={} used={}/{} remaining={}",
            usage.plan, usage.used_today, usage.daily_limit, usage.remaining
        ),
        Err(e) => info!("API-Football usage probe failed (continuing): {e}"),
    }

    // Constructed once and injected: all pollers share one throttle window.
    let feed = Arc::new(ThrottledFeed::new(Arc::new(client), cfg.feed_min_interval));
    let notifier = Arc::new(Notifier::from_config(&cfg));
    let tracker = Tracker::new(
        pool,
        feed,
        Arc::new(NameResolver::new()),
        notifier,
        cfg.clone(),
    );

    let mut cycle: u64 = 0;
    loop {
        cycle += 1;
        let idle = match tracker.run_cycle(Utc::now()).await {
            Ok(stats) => {
                info!(
                    "Cycle #{cycle}: {} tracked, {} live, {} finished, {} unmatched, \
                     {}/{} writes ({} errors, {} abandoned), {} notifications, {}W/{}L",
                    stats.trackable,
                    stats.live,
                    stats.finished,
                    stats.unmatched,
                    stats.written,
                    stats.planned_writes,
                    stats.write_errors,
                    stats.abandoned,
                    stats.notifications_sent,
                    stats.won,
                    stats.lost,
                );
                stats.trackable == 0
            }
            Err(e) => {
                error!("Cycle #{cycle} failed: {e}");
                false
            }
        };

        let delay = if idle {
            info!("No trackable fixtures, backing off for {}s", cfg.idle_interval.as_secs());
            cfg.idle_interval
        } else {
            cfg.poll_interval
        };
        tokio::time::sleep(delay).await;
    }
}
