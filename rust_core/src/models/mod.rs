//! Shared record shapes persisted by the prediction engine and the live tracker.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Lifecycle phase of a fixture as reported by the live feed.
///
/// Transitions are monotonic: `NotStarted -> Live -> Finished`. Feed glitches
/// that would regress a fixture are ignored by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    NotStarted,
    Live,
    Finished,
}

impl MatchPhase {
    pub fn is_live(&self) -> bool {
        matches!(self, MatchPhase::Live)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, MatchPhase::Finished)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchPhase::NotStarted => "not_started",
            MatchPhase::Live => "live",
            MatchPhase::Finished => "finished",
        }
    }
}

/// Final verdict for a prediction once its fixture has finished.
///
/// `Indeterminate` is an explicit value (e.g. a first-half prediction with no
/// half-time score on record), distinct from both won and lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Won,
    Lost,
    Indeterminate,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Won => "won",
            Verdict::Lost => "lost",
            Verdict::Indeterminate => "unknown",
        }
    }

    pub fn parse(raw: &str) -> Option<Verdict> {
        match raw {
            "won" => Some(Verdict::Won),
            "lost" => Some(Verdict::Lost),
            "unknown" => Some(Verdict::Indeterminate),
            _ => None,
        }
    }
}

/// Importance tier of a golden rule. Higher tiers add a fixed confidence boost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Normal,
    Important,
    Special,
}

impl Importance {
    pub fn boost(&self) -> u8 {
        match self {
            Importance::Normal => 0,
            Importance::Important => 2,
            Importance::Special => 3,
        }
    }

    pub fn parse(raw: &str) -> Option<Importance> {
        match raw.trim().to_lowercase().as_str() {
            "normal" => Some(Importance::Normal),
            "important" => Some(Importance::Important),
            "special" => Some(Importance::Special),
            _ => None,
        }
    }
}

/// An externally authored golden rule: a condition over a small odds vector
/// that yields one or more prediction notations with a base confidence.
///
/// Immutable during a matching pass; read from the `golden_rules` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub id: i64,
    pub name: String,
    /// Market key -> ideal decimal price. Must be non-empty.
    pub primary_odds: HashMap<String, f64>,
    /// Optional confirming conditions; all must hold for the rule to match.
    pub secondary_odds: Option<HashMap<String, f64>>,
    /// Optional disqualifying conditions; any hit rejects the rule.
    pub exclude_odds: Option<HashMap<String, f64>>,
    /// Prediction notations this rule yields when it matches.
    pub predictions: Vec<String>,
    pub confidence_base: u8,
    pub importance: Importance,
    pub active: bool,
}

/// An alternative prediction carried alongside the primary one.
///
/// `verdict` is filled in when the fixture finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AltPrediction {
    pub prediction: String,
    pub confidence: u8,
    pub rule_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<String>,
}

/// One row of the `predictions` table: a fixture-side prediction with its
/// live-tracking state and notification ledger.
///
/// Invariant: once `is_finished` is true the score fields are immutable and
/// the verdict has been computed exactly once (enforced by the repository's
/// update guard).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PredictionRecord {
    pub id: i64,
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    pub match_date: NaiveDate,
    /// Kickoff time as `HH:MM` (UTC), when known.
    pub match_time: Option<String>,
    /// Primary prediction in prediction notation.
    pub prediction: String,
    pub confidence: i32,
    pub alternatives: sqlx::types::Json<Vec<AltPrediction>>,
    pub matched_rules: sqlx::types::Json<Vec<i64>>,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub halftime_home: Option<i32>,
    pub halftime_away: Option<i32>,
    pub elapsed: Option<i32>,
    pub is_live: bool,
    pub is_finished: bool,
    pub live_status: Option<String>,
    /// `won` / `lost` / `unknown`, set once on finish.
    pub verdict: Option<String>,
    /// Human-readable final score note, e.g. `FT 2-1 | HT 1-0`.
    pub result_note: Option<String>,
    /// Comma-joined notification ledger tokens (see `ledger`).
    pub notified: String,
    pub run_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PredictionRecord {
    pub fn final_verdict(&self) -> Option<Verdict> {
        self.verdict.as_deref().and_then(Verdict::parse)
    }

    pub fn fixture_label(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_round_trip() {
        for v in [Verdict::Won, Verdict::Lost, Verdict::Indeterminate] {
            assert_eq!(Verdict::parse(v.as_str()), Some(v));
        }
        assert_eq!(Verdict::parse("draw"), None);
    }

    #[test]
    fn test_importance_boosts() {
        assert_eq!(Importance::Normal.boost(), 0);
        assert_eq!(Importance::Important.boost(), 2);
        assert_eq!(Importance::Special.boost(), 3);
        assert_eq!(Importance::parse("IMPORTANT"), Some(Importance::Important));
        assert_eq!(Importance::parse("critical"), None);
    }

    #[test]
    fn test_phase_predicates() {
        assert!(MatchPhase::Live.is_live());
        assert!(!MatchPhase::Live.is_finished());
        assert!(MatchPhase::Finished.is_finished());
        assert_eq!(MatchPhase::NotStarted.as_str(), "not_started");
    }
}
