//! The at-most-once notification ledger.
//!
//! A comma-joined token set carried on the persisted prediction record. The
//! durable ledger is the single source of truth for delivery history: it
//! survives process restarts because it rides on the record, and no transient
//! in-memory cache may substitute for the membership check.

use crate::models::Verdict;
use std::collections::BTreeSet;
use std::fmt;

/// Parsed ledger. Tokens are kept sorted so the serialized form is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationLedger {
    tokens: BTreeSet<String>,
}

impl NotificationLedger {
    /// Parse the comma-joined form stored on the record. Empty and malformed
    /// fragments are dropped.
    pub fn parse(raw: &str) -> Self {
        let tokens = raw
            .split(',')
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .collect();
        Self { tokens }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    /// Idempotent union: returns true only when the token was newly added.
    pub fn record(&mut self, token: &str) -> bool {
        self.tokens.insert(token.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl fmt::Display for NotificationLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for token in &self.tokens {
            if !first {
                f.write_str(",")?;
            }
            f.write_str(token)?;
            first = false;
        }
        Ok(())
    }
}

/// The notification types the tracker can emit. Score-parameterized kinds
/// let the same fixture re-alert at a different score without re-sending for
/// the same one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationKind {
    /// Pre-match low-urgency notice shortly before kickoff.
    Upcoming,
    /// The fixture has gone live.
    Kickoff,
    Hot { home: u32, away: u32 },
    Warm { home: u32, away: u32 },
    Result(Verdict),
}

impl NotificationKind {
    pub fn token(&self) -> String {
        match self {
            NotificationKind::Upcoming => "upcoming".to_string(),
            NotificationKind::Kickoff => "kickoff".to_string(),
            NotificationKind::Hot { home, away } => format!("hot_{home}-{away}"),
            NotificationKind::Warm { home, away } => format!("warm_{home}-{away}"),
            NotificationKind::Result(verdict) => format!("result_{}", verdict.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display_round_trip() {
        let ledger = NotificationLedger::parse("hot_2-1,upcoming,result_won");
        assert!(ledger.contains("upcoming"));
        assert!(ledger.contains("hot_2-1"));
        assert!(!ledger.contains("hot_1-1"));
        assert_eq!(ledger.to_string(), "hot_2-1,result_won,upcoming");
        assert_eq!(NotificationLedger::parse(&ledger.to_string()), ledger);
    }

    #[test]
    fn test_record_is_at_most_once() {
        let mut ledger = NotificationLedger::default();
        let token = NotificationKind::Hot { home: 2, away: 1 }.token();
        // First record admits, every repeat is refused, across any number of calls.
        assert!(ledger.record(&token));
        for _ in 0..5 {
            assert!(!ledger.record(&token));
        }
        assert!(ledger.contains(&token));
    }

    #[test]
    fn test_different_score_state_is_a_new_token() {
        let mut ledger = NotificationLedger::default();
        assert!(ledger.record(&NotificationKind::Hot { home: 1, away: 0 }.token()));
        assert!(ledger.record(&NotificationKind::Hot { home: 2, away: 0 }.token()));
    }

    #[test]
    fn test_tokens() {
        assert_eq!(NotificationKind::Hot { home: 2, away: 1 }.token(), "hot_2-1");
        assert_eq!(NotificationKind::Result(Verdict::Won).token(), "result_won");
        assert_eq!(NotificationKind::Result(Verdict::Lost).token(), "result_lost");
        assert_eq!(NotificationKind::Upcoming.token(), "upcoming");
    }

    #[test]
    fn test_parse_tolerates_noise() {
        let ledger = NotificationLedger::parse(" upcoming, ,result_won,");
        assert!(ledger.contains("upcoming"));
        assert!(ledger.contains("result_won"));
        assert_eq!(ledger.to_string(), "result_won,upcoming");
    }
}
