//! Throttled, shared access to the live feed.
//!
//! Third-party quotas are tight, so upstream is hit at most once per
//! configured interval regardless of how often pollers ask. The component is
//! constructed once per process and injected; `fetch` takes the current time
//! as a parameter so tests can drive it with a fake clock. On upstream
//! failure the last good response is served stale.

use super::api_football::{ApiFootballClient, LiveFixture};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use log::warn;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Source of live fixtures for a given day. The production impl is
/// `ApiFootballClient`; tests substitute a scripted provider.
#[async_trait]
pub trait LiveFeedProvider: Send + Sync {
    /// All fixtures relevant to `date`: the day's schedule plus anything
    /// currently in play.
    async fn fixtures_for(&self, date: NaiveDate) -> Result<Vec<LiveFixture>>;
}

#[async_trait]
impl LiveFeedProvider for ApiFootballClient {
    async fn fixtures_for(&self, date: NaiveDate) -> Result<Vec<LiveFixture>> {
        let mut fixtures = self.fixtures_by_date(date).await?;
        // The in-play endpoint catches fixtures that slipped the date query
        // (late kickoffs across midnight). Its failure is not fatal.
        match self.live_fixtures().await {
            Ok(live) => {
                let seen: HashSet<i64> = fixtures.iter().map(|f| f.fixture_id).collect();
                fixtures.extend(live.into_iter().filter(|f| !seen.contains(&f.fixture_id)));
            }
            Err(e) => warn!("live fixtures fetch failed, using day schedule only: {e}"),
        }
        Ok(fixtures)
    }
}

#[derive(Default)]
struct FeedCache {
    fetched_at: Option<DateTime<Utc>>,
    date: Option<NaiveDate>,
    fixtures: Vec<LiveFixture>,
}

/// Process-wide throttle over a `LiveFeedProvider`.
pub struct ThrottledFeed {
    provider: Arc<dyn LiveFeedProvider>,
    min_interval: chrono::Duration,
    cache: Mutex<FeedCache>,
}

impl ThrottledFeed {
    pub fn new(provider: Arc<dyn LiveFeedProvider>, min_interval: Duration) -> Self {
        Self {
            provider,
            min_interval: chrono::Duration::from_std(min_interval)
                .unwrap_or_else(|_| chrono::Duration::seconds(60)),
            cache: Mutex::new(FeedCache::default()),
        }
    }

    /// Cached-or-fresh fixtures for `date`.
    ///
    /// Inside the throttle window the cached response is returned without an
    /// upstream call. The cache lock is held across the refresh, so
    /// concurrent pollers queue behind one upstream call and then read the
    /// fresh cache. Errors surface only when there is no cache to fall back
    /// on; the caller degrades to a cycle with zero live updates.
    pub async fn fetch(&self, now: DateTime<Utc>, date: NaiveDate) -> Result<Vec<LiveFixture>> {
        let mut cache = self.cache.lock().await;

        if cache.date == Some(date) {
            if let Some(fetched_at) = cache.fetched_at {
                if now.signed_duration_since(fetched_at) < self.min_interval {
                    return Ok(cache.fixtures.clone());
                }
            }
        }

        match self.provider.fixtures_for(date).await {
            Ok(fixtures) => {
                cache.fetched_at = Some(now);
                cache.date = Some(date);
                cache.fixtures = fixtures.clone();
                Ok(fixtures)
            }
            Err(e) if cache.date == Some(date) => {
                warn!("live feed refresh failed, serving stale cache: {e}");
                Ok(cache.fixtures.clone())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchPhase;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedProvider {
        calls: AtomicUsize,
        fail_from_call: usize,
    }

    impl ScriptedProvider {
        fn new(fail_from_call: usize) -> Self {
            Self { calls: AtomicUsize::new(0), fail_from_call }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LiveFeedProvider for ScriptedProvider {
        async fn fixtures_for(&self, _date: NaiveDate) -> Result<Vec<LiveFixture>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call >= self.fail_from_call {
                anyhow::bail!("upstream down");
            }
            Ok(vec![LiveFixture {
                fixture_id: call as i64,
                home_team: "Lens".to_string(),
                away_team: "Lille".to_string(),
                status_short: "1H".to_string(),
                phase: MatchPhase::Live,
                elapsed: Some(12),
                home_goals: Some(0),
                away_goals: Some(0),
                halftime_home: None,
                halftime_away: None,
            }])
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_throttle_window_hits_upstream_once() {
        let provider = Arc::new(ScriptedProvider::new(usize::MAX));
        let feed = ThrottledFeed::new(provider.clone(), Duration::from_secs(60));
        let date = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();

        feed.fetch(at(0), date).await.unwrap();
        feed.fetch(at(10), date).await.unwrap();
        feed.fetch(at(59), date).await.unwrap();
        assert_eq!(provider.call_count(), 1);

        feed.fetch(at(61), date).await.unwrap();
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_stale_cache_served_on_upstream_failure() {
        let provider = Arc::new(ScriptedProvider::new(2));
        let feed = ThrottledFeed::new(provider.clone(), Duration::from_secs(60));
        let date = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();

        let fresh = feed.fetch(at(0), date).await.unwrap();
        assert_eq!(fresh.len(), 1);

        // Outside the window the refresh fails; the stale cache comes back.
        let stale = feed.fetch(at(120), date).await.unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].fixture_id, fresh[0].fixture_id);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_no_cache_and_failure_surfaces_error() {
        let provider = Arc::new(ScriptedProvider::new(1));
        let feed = ThrottledFeed::new(provider, Duration::from_secs(60));
        let date = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        assert!(feed.fetch(at(0), date).await.is_err());
    }

    #[tokio::test]
    async fn test_date_change_bypasses_window() {
        let provider = Arc::new(ScriptedProvider::new(usize::MAX));
        let feed = ThrottledFeed::new(provider.clone(), Duration::from_secs(600));
        let day1 = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();

        feed.fetch(at(0), day1).await.unwrap();
        feed.fetch(at(10), day2).await.unwrap();
        assert_eq!(provider.call_count(), 2);
    }
}
