//! Delivery filters: quiet hours and a sliding-window rate limit.
//!
//! Quiet hours demote to silent instead of dropping - a result notification
//! suppressed here would otherwise be lost forever, since the ledger records
//! it as sent. Rate-limited sends are dropped *before* any ledger write, so
//! they retry on the next cycle.

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Send { silent: bool },
    RateLimited,
}

#[derive(Debug)]
pub struct NotificationFilter {
    quiet_hours_enabled: bool,
    quiet_hours_start: NaiveTime,
    quiet_hours_end: NaiveTime,
    timezone: Tz,
    max_per_minute: usize,
    window: Duration,
    sent_timestamps: VecDeque<Instant>,
}

impl NotificationFilter {
    pub fn new(
        quiet_hours_enabled: bool,
        quiet_hours_start: NaiveTime,
        quiet_hours_end: NaiveTime,
        timezone: Tz,
        max_per_minute: usize,
    ) -> Self {
        Self {
            quiet_hours_enabled,
            quiet_hours_start,
            quiet_hours_end,
            timezone,
            max_per_minute,
            window: Duration::from_secs(60),
            sent_timestamps: VecDeque::new(),
        }
    }

    /// Decide whether a message may go out now, and at what urgency.
    pub fn decide(&mut self, silent: bool, now_utc: DateTime<Utc>) -> FilterDecision {
        let silent = silent || self.is_in_quiet_hours(now_utc);

        if !self.admit_rate_limited() {
            return FilterDecision::RateLimited;
        }

        FilterDecision::Send { silent }
    }

    pub fn is_in_quiet_hours(&self, now_utc: DateTime<Utc>) -> bool {
        if !self.quiet_hours_enabled {
            return false;
        }

        let now_local = now_utc.with_timezone(&self.timezone).time();
        let start = self.quiet_hours_start;
        let end = self.quiet_hours_end;

        // start > end means the window wraps midnight.
        if start > end {
            now_local >= start || now_local < end
        } else {
            now_local >= start && now_local < end
        }
    }

    fn admit_rate_limited(&mut self) -> bool {
        let now = Instant::now();

        while let Some(front) = self.sent_timestamps.front() {
            if now.duration_since(*front) > self.window {
                self.sent_timestamps.pop_front();
            } else {
                break;
            }
        }

        if self.sent_timestamps.len() >= self.max_per_minute {
            return false;
        }

        self.sent_timestamps.push_back(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn filter(max_per_minute: usize) -> NotificationFilter {
        NotificationFilter::new(
            true,
            NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            chrono_tz::UTC,
            max_per_minute,
        )
    }

    fn at_hour(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 2, h, 30, 0).unwrap()
    }

    #[test]
    fn test_quiet_hours_wrap_midnight() {
        let f = filter(10);
        assert!(f.is_in_quiet_hours(at_hour(23)));
        assert!(f.is_in_quiet_hours(at_hour(2)));
        assert!(f.is_in_quiet_hours(at_hour(7)));
        assert!(!f.is_in_quiet_hours(at_hour(8)));
        assert!(!f.is_in_quiet_hours(at_hour(12)));
    }

    #[test]
    fn test_quiet_hours_demote_to_silent() {
        let mut f = filter(10);
        assert_eq!(f.decide(false, at_hour(2)), FilterDecision::Send { silent: true });
        assert_eq!(f.decide(false, at_hour(12)), FilterDecision::Send { silent: false });
        assert_eq!(f.decide(true, at_hour(12)), FilterDecision::Send { silent: true });
    }

    #[test]
    fn test_rate_limit_caps_window() {
        let mut f = filter(2);
        assert_eq!(f.decide(false, at_hour(12)), FilterDecision::Send { silent: false });
        assert_eq!(f.decide(false, at_hour(12)), FilterDecision::Send { silent: false });
        assert_eq!(f.decide(false, at_hour(12)), FilterDecision::RateLimited);
    }
}
