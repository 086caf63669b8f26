//! Notification planning and dispatch.
//!
//! Planning is pure: candidates are derived from the record, the feed
//! fixture and the cycle's planned update. The tracker checks each candidate
//! against the durable ledger, runs it through the delivery filters, and only
//! sends after the ledger token has been persisted - the durable ledger is
//! the sole source of truth for delivery history.

use crate::config::TrackerConfig;
use crate::filters::{FilterDecision, NotificationFilter};
use crate::formatters;
use crate::telegram::TelegramClient;
use chrono::{DateTime, NaiveTime, Utc};
use goalhawk_rust_core::alerts::{self, AlertLevel};
use goalhawk_rust_core::clients::LiveFixture;
use goalhawk_rust_core::db::predictions::LiveUpdate;
use goalhawk_rust_core::ledger::NotificationKind;
use goalhawk_rust_core::models::{MatchPhase, PredictionRecord, Verdict};
use log::{error, info, warn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct PlannedNotification {
    pub kind: NotificationKind,
    pub text: String,
    pub silent: bool,
}

/// Candidate notifications for one fixture in one cycle, before ledger and
/// filter checks.
pub fn plan_notifications(
    record: &PredictionRecord,
    fixture: &LiveFixture,
    update: Option<&LiveUpdate>,
    now: DateTime<Utc>,
    cfg: &TrackerConfig,
) -> Vec<PlannedNotification> {
    let mut out = Vec::new();

    match fixture.phase {
        MatchPhase::NotStarted => {
            if let Some(minutes) = minutes_to_kickoff(record, now) {
                if minutes > 0 && minutes <= cfg.upcoming_window_mins {
                    out.push(PlannedNotification {
                        kind: NotificationKind::Upcoming,
                        text: formatters::format_upcoming(record, minutes),
                        silent: true,
                    });
                }
            }
        }
        MatchPhase::Live => {
            if !record.is_live {
                out.push(PlannedNotification {
                    kind: NotificationKind::Kickoff,
                    text: formatters::format_kickoff(record),
                    silent: true,
                });
            }

            let home = fixture.home_goals.unwrap_or(0).max(0) as u32;
            let away = fixture.away_goals.unwrap_or(0).max(0) as u32;
            let half = match (fixture.halftime_home, fixture.halftime_away) {
                (Some(h), Some(a)) => Some((h.max(0) as u32, a.max(0) as u32)),
                _ => None,
            };
            let alert = alerts::assess(
                &record.prediction,
                home,
                away,
                fixture.elapsed.map(|m| m.max(0) as u32),
                half,
            );
            match alert.level {
                AlertLevel::Hot => out.push(PlannedNotification {
                    kind: NotificationKind::Hot { home, away },
                    text: formatters::format_alert(record, &alert),
                    silent: false,
                }),
                AlertLevel::Warm if cfg.notify_warm => out.push(PlannedNotification {
                    kind: NotificationKind::Warm { home, away },
                    text: formatters::format_alert(record, &alert),
                    silent: true,
                }),
                _ => {}
            }
        }
        MatchPhase::Finished => {
            if let Some(update) = update {
                match update.verdict {
                    Some(verdict @ (Verdict::Won | Verdict::Lost)) => {
                        out.push(PlannedNotification {
                            kind: NotificationKind::Result(verdict),
                            text: formatters::format_result(
                                record,
                                verdict,
                                update.result_note.as_deref(),
                            ),
                            // Losing results arrive silently.
                            silent: verdict == Verdict::Lost,
                        });
                    }
                    _ => {}
                }
            }
        }
    }

    out
}

fn minutes_to_kickoff(record: &PredictionRecord, now: DateTime<Utc>) -> Option<i64> {
    let raw = record.match_time.as_deref()?;
    let time = NaiveTime::parse_from_str(raw.trim(), "%H:%M").ok()?;
    let kickoff = record.match_date.and_time(time).and_utc();
    Some((kickoff - now).num_minutes())
}

/// Applies delivery filters and pushes through the Telegram channel.
/// With no channel configured every candidate is refused, so nothing is
/// marked sent in the ledger.
pub struct Notifier {
    telegram: Option<TelegramClient>,
    filter: Mutex<NotificationFilter>,
    sent: AtomicUsize,
}

impl Notifier {
    pub fn from_config(cfg: &TrackerConfig) -> Self {
        let telegram = match (&cfg.telegram_bot_token, &cfg.telegram_chat_id) {
            (Some(token), Some(chat_id)) => Some(TelegramClient::new(token, chat_id.clone())),
            _ => {
                warn!("Telegram not configured, notifications disabled");
                None
            }
        };
        Self {
            telegram,
            filter: Mutex::new(NotificationFilter::new(
                cfg.quiet_hours_enabled,
                cfg.quiet_hours_start,
                cfg.quiet_hours_end,
                cfg.quiet_hours_timezone,
                cfg.rate_limit_max_per_minute,
            )),
            sent: AtomicUsize::new(0),
        }
    }

    /// Run a candidate through the filters. `None` means do not send this
    /// cycle and do not record it - it may retry next cycle.
    pub fn admit(&self, mut n: PlannedNotification, now: DateTime<Utc>) -> Option<PlannedNotification> {
        self.telegram.as_ref()?;

        let decision = {
            let mut filter = self.filter.lock().unwrap_or_else(|e| e.into_inner());
            filter.decide(n.silent, now)
        };
        match decision {
            FilterDecision::Send { silent } => {
                n.silent = silent;
                Some(n)
            }
            FilterDecision::RateLimited => {
                info!("Rate-limited notification: {}", n.kind.token());
                None
            }
        }
    }

    /// Push admitted notifications whose ledger tokens are already durable.
    pub async fn dispatch(&self, batch: &[PlannedNotification]) {
        let Some(telegram) = &self.telegram else {
            return;
        };
        for n in batch {
            match telegram.send(&n.text, n.silent).await {
                Ok(()) => {
                    self.sent.fetch_add(1, Ordering::Relaxed);
                    info!("Sent notification: {}", n.kind.token());
                }
                Err(e) => error!("Notification send failed ({}): {e}", n.kind.token()),
            }
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent.load(Ordering::Relaxed)
    }
}
