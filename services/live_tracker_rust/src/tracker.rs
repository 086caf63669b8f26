//! The per-cycle tracking loop.
//!
//! Each cycle loads trackable predictions, resolves them against the
//! throttled live feed, diffs state, evaluates verdicts on finish and
//! dispatches record writes concurrently under a soft deadline. State
//! planning is pure (`plan_update`) so idempotence is testable without a
//! database: an unchanged feed plans zero writes.

use crate::config::TrackerConfig;
use crate::notifier::{self, Notifier, PlannedNotification};
use anyhow::Result;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use goalhawk_rust_core::clients::{LiveFixture, ThrottledFeed};
use goalhawk_rust_core::db::predictions::{self, LiveUpdate};
use goalhawk_rust_core::ledger::NotificationLedger;
use goalhawk_rust_core::matching::TeamResolver;
use goalhawk_rust_core::models::{AltPrediction, MatchPhase, PredictionRecord, Verdict};
use goalhawk_rust_core::outcome;
use log::{debug, error, warn};
use sqlx::PgPool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default, Clone)]
pub struct CycleStats {
    pub trackable: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub live: usize,
    pub finished: usize,
    pub planned_writes: usize,
    pub written: usize,
    pub write_errors: usize,
    pub abandoned: usize,
    pub notifications_sent: usize,
    pub won: usize,
    pub lost: usize,
}

enum WriteJob {
    State {
        update: LiveUpdate,
        notifications: Vec<PlannedNotification>,
    },
    LedgerOnly {
        id: i64,
        ledger: String,
        notifications: Vec<PlannedNotification>,
    },
}

pub struct Tracker {
    pool: PgPool,
    feed: Arc<ThrottledFeed>,
    resolver: Arc<dyn TeamResolver>,
    notifier: Arc<Notifier>,
    cfg: TrackerConfig,
}

impl Tracker {
    pub fn new(
        pool: PgPool,
        feed: Arc<ThrottledFeed>,
        resolver: Arc<dyn TeamResolver>,
        notifier: Arc<Notifier>,
        cfg: TrackerConfig,
    ) -> Self {
        Self { pool, feed, resolver, notifier, cfg }
    }

    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<CycleStats> {
        let date = now.date_naive();
        let mut stats = CycleStats::default();

        let records = predictions::fetch_trackable(&self.pool, date).await?;
        stats.trackable = records.len();
        if records.is_empty() {
            return Ok(stats);
        }

        let fixtures = match self.feed.fetch(now, date).await {
            Ok(fixtures) => fixtures,
            Err(e) => {
                // Graceful degradation: no cache, no feed - zero live
                // updates this cycle, retry next cycle.
                warn!("Live feed unavailable, skipping updates this cycle: {e}");
                return Ok(stats);
            }
        };

        let mut jobs = Vec::new();
        for record in &records {
            let Some(fixture) = self.resolve(record, &fixtures) else {
                stats.unmatched += 1;
                debug!("No live-feed match for {}", record.fixture_label());
                continue;
            };
            stats.matched += 1;
            match fixture.phase {
                MatchPhase::Live => stats.live += 1,
                MatchPhase::Finished => stats.finished += 1,
                MatchPhase::NotStarted => {}
            }

            let update = plan_update(record, fixture);
            match update.as_ref().and_then(|u| u.verdict) {
                Some(Verdict::Won) => stats.won += 1,
                Some(Verdict::Lost) => stats.lost += 1,
                _ => {}
            }

            let candidates =
                notifier::plan_notifications(record, fixture, update.as_ref(), now, &self.cfg);
            let mut ledger = NotificationLedger::parse(&record.notified);
            let mut to_send = Vec::new();
            for candidate in candidates {
                // The durable ledger decides delivery history; the filters
                // only decide whether this cycle may send.
                if ledger.contains(&candidate.kind.token()) {
                    continue;
                }
                if let Some(admitted) = self.notifier.admit(candidate, now) {
                    ledger.record(&admitted.kind.token());
                    to_send.push(admitted);
                }
            }

            match update {
                Some(mut u) => {
                    u.ledger = ledger.to_string();
                    jobs.push(WriteJob::State { update: u, notifications: to_send });
                }
                None if !to_send.is_empty() => {
                    jobs.push(WriteJob::LedgerOnly {
                        id: record.id,
                        ledger: ledger.to_string(),
                        notifications: to_send,
                    });
                }
                None => {}
            }
        }

        stats.planned_writes = jobs.len();
        if jobs.is_empty() {
            return Ok(stats);
        }

        let sent_before = self.notifier.sent_count();
        let written = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));

        // One concurrent write per changed fixture. Notifications go out only
        // after their ledger tokens are durable.
        let handles: Vec<_> = jobs
            .into_iter()
            .map(|job| {
                let pool = self.pool.clone();
                let notifier = self.notifier.clone();
                let written = written.clone();
                let failed = failed.clone();
                tokio::spawn(async move {
                    let (result, notifications) = match job {
                        WriteJob::State { update, notifications } => {
                            (predictions::apply_live_update(&pool, &update).await, notifications)
                        }
                        WriteJob::LedgerOnly { id, ledger, notifications } => {
                            (predictions::update_ledger(&pool, id, &ledger).await, notifications)
                        }
                    };
                    match result {
                        Ok(()) => {
                            written.fetch_add(1, Ordering::Relaxed);
                            notifier.dispatch(&notifications).await;
                        }
                        Err(e) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                            error!("Fixture write failed, retried next cycle: {e}");
                        }
                    }
                })
            })
            .collect();

        // Soft deadline: stop waiting, never cancel - stragglers finish in
        // the background and anything unpersisted is retried next cycle.
        if tokio::time::timeout(self.cfg.write_deadline, join_all(handles))
            .await
            .is_err()
        {
            warn!(
                "Write deadline ({:?}) exceeded with writes outstanding",
                self.cfg.write_deadline
            );
        }

        stats.written = written.load(Ordering::Relaxed);
        stats.write_errors = failed.load(Ordering::Relaxed);
        stats.abandoned = stats
            .planned_writes
            .saturating_sub(stats.written + stats.write_errors);
        stats.notifications_sent = self.notifier.sent_count().saturating_sub(sent_before);

        Ok(stats)
    }

    fn resolve<'a>(
        &self,
        record: &PredictionRecord,
        fixtures: &'a [LiveFixture],
    ) -> Option<&'a LiveFixture> {
        fixtures.iter().find(|f| {
            self.resolver.fixture_matches(
                &record.home_team,
                &record.away_team,
                &f.home_team,
                &f.away_team,
            )
        })
    }
}

/// Diff the stored record against the feed fixture. `None` means nothing
/// changed and no write happens - calling this twice with the same feed
/// plans exactly one write.
pub fn plan_update(record: &PredictionRecord, fixture: &LiveFixture) -> Option<LiveUpdate> {
    // Finished is terminal and immutable.
    if record.is_finished {
        return None;
    }
    // Monotonic lifecycle: a live record never regresses on a feed glitch.
    if record.is_live && fixture.phase == MatchPhase::NotStarted {
        return None;
    }

    let is_live = fixture.phase.is_live();
    let is_finished = fixture.phase.is_finished();
    let live_status = Some(fixture.status_short.clone());

    let changed = record.home_score != fixture.home_goals
        || record.away_score != fixture.away_goals
        || record.halftime_home != fixture.halftime_home
        || record.halftime_away != fixture.halftime_away
        || record.elapsed != fixture.elapsed
        || record.is_live != is_live
        || record.is_finished != is_finished
        || record.live_status != live_status;
    if !changed {
        return None;
    }

    let mut update = LiveUpdate {
        id: record.id,
        home_score: fixture.home_goals,
        away_score: fixture.away_goals,
        halftime_home: fixture.halftime_home,
        halftime_away: fixture.halftime_away,
        elapsed: fixture.elapsed,
        is_live,
        is_finished,
        live_status,
        verdict: None,
        alternatives: None,
        result_note: None,
        ledger: record.notified.clone(),
    };

    // Verdicts are computed exactly once, on the transition into finished
    // with both scores on hand.
    if is_finished && record.final_verdict().is_none() {
        if let (Some(home), Some(away)) = (fixture.home_goals, fixture.away_goals) {
            let home = home.max(0) as u32;
            let away = away.max(0) as u32;
            let half = match (fixture.halftime_home, fixture.halftime_away) {
                (Some(h), Some(a)) => Some((h.max(0) as u32, a.max(0) as u32)),
                _ => None,
            };

            update.verdict = Some(outcome::evaluate(&record.prediction, home, away, half));

            // Each alternative settles independently of the primary.
            let alternatives: Vec<AltPrediction> = record
                .alternatives
                .0
                .iter()
                .map(|alt| AltPrediction {
                    verdict: Some(
                        outcome::evaluate(&alt.prediction, home, away, half)
                            .as_str()
                            .to_string(),
                    ),
                    ..alt.clone()
                })
                .collect();
            update.alternatives = Some(alternatives);

            let half_note = half
                .map(|(h, a)| format!(" | HT {h}-{a}"))
                .unwrap_or_default();
            update.result_note = Some(format!("FT {home}-{away}{half_note}"));
        }
    }

    Some(update)
}
