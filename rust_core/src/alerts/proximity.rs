//! Proximity alerts: how close a live match is to satisfying a prediction.
//!
//! Pure computation over the current score - safe to call on every poll tick.
//! The distance metric is goals-to-go for markets a goal can lock in (over
//! lines, BTTS-yes). Result markets and under lines are binary: they resolve
//! at full time and never tier hot or warm.

use crate::models::Verdict;
use crate::notation::{self, Market, Notation, Side};
use crate::outcome;
use serde::Serialize;

/// Minutes in a regulation first half. Beyond this a first-half notation's
/// window has closed.
const FIRST_HALF_MINUTES: u32 = 45;

/// Minute from which a single-goal side-specific line is treated as less
/// certain and demoted from hot to warm.
const LATE_GAME_MINUTE: u32 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Hot,
    Warm,
    Cold,
}

/// Snapshot of a prediction's live proximity. Recomputed on every poll,
/// never persisted directly.
#[derive(Debug, Clone, Serialize)]
pub struct AlertState {
    /// Market family tag: `result`, `btts`, `goal_line` or `unknown`.
    pub kind: &'static str,
    /// Goals still needed to satisfy the prediction, when the metric applies.
    pub goals_needed: Option<u32>,
    pub home_score: u32,
    pub away_score: u32,
    /// Literal restatement of the threshold, e.g. `OVER 2.5 (first half)`.
    pub target: String,
    pub first_half: bool,
    pub elapsed: Option<u32>,
    pub level: AlertLevel,
    pub message: String,
    pub already_hit: bool,
}

/// Assess how close the live score is to satisfying `raw`.
pub fn assess(
    raw: &str,
    home: u32,
    away: u32,
    elapsed: Option<u32>,
    half: Option<(u32, u32)>,
) -> AlertState {
    let Some(parsed) = notation::parse(raw) else {
        return AlertState {
            kind: "unknown",
            goals_needed: None,
            home_score: home,
            away_score: away,
            target: raw.trim().to_string(),
            first_half: false,
            elapsed,
            level: AlertLevel::Cold,
            message: "unrecognized notation".to_string(),
            already_hit: false,
        };
    };

    let first_half = parsed.is_first_half();
    let window_closed =
        first_half && (half.is_some() || elapsed.map_or(false, |m| m > FIRST_HALF_MINUTES));

    // Scores the notation is judged against: a first-half line uses the
    // recorded half-time score once the half is over, otherwise the running
    // score IS the first-half score so far.
    let (eff_home, eff_away) = if first_half {
        half.unwrap_or((home, away))
    } else {
        (home, away)
    };

    // A goal can only lock in monotone markets; everything else stays open
    // until the final whistle, so a live Won verdict is not yet "hit".
    let lockable = matches!(
        parsed.market,
        Market::BothScore(true) | Market::GoalLine { over: true, .. }
    );
    let already_hit = lockable
        && outcome::evaluate(raw, home, away, if first_half { Some((eff_home, eff_away)) } else { half })
            == Verdict::Won;

    let goals_needed = goal_distance(&parsed, eff_home, eff_away);
    let target = parsed.target_description();

    if already_hit {
        return AlertState {
            kind: market_kind(&parsed.market),
            goals_needed: Some(0),
            home_score: home,
            away_score: away,
            target: target.clone(),
            first_half,
            elapsed,
            level: AlertLevel::Cold,
            message: format!("already satisfied at {home}-{away}: {target}"),
            already_hit: true,
        };
    }

    let (level, message) = match goals_needed {
        _ if window_closed => (
            AlertLevel::Cold,
            format!("first-half window closed for {target}"),
        ),
        Some(1) => {
            let side_specific = matches!(
                parsed.market,
                Market::GoalLine { side: Side::Home | Side::Away, .. }
            );
            let late = elapsed.map_or(false, |m| m >= LATE_GAME_MINUTE);
            if side_specific && late {
                (AlertLevel::Warm, format!("1 goal away from {target} (late)"))
            } else {
                (AlertLevel::Hot, format!("1 goal away from {target}"))
            }
        }
        Some(2) => (AlertLevel::Warm, format!("2 goals away from {target}")),
        Some(n) => (AlertLevel::Cold, format!("{n} goals away from {target}")),
        None => (
            AlertLevel::Cold,
            format!("binary market, no goal distance: {target}"),
        ),
    };

    AlertState {
        kind: market_kind(&parsed.market),
        goals_needed,
        home_score: home,
        away_score: away,
        target,
        first_half,
        elapsed,
        level,
        message,
        already_hit: false,
    }
}

fn market_kind(market: &Market) -> &'static str {
    match market {
        Market::HomeWin | Market::Draw | Market::AwayWin => "result",
        Market::BothScore(_) => "btts",
        Market::GoalLine { .. } => "goal_line",
    }
}

/// Goals still needed to satisfy the market, for markets where a goal can
/// bring satisfaction closer. `None` for binary markets.
fn goal_distance(parsed: &Notation, home: u32, away: u32) -> Option<u32> {
    match parsed.market {
        Market::GoalLine { side, over: true, line } => {
            let current = match side {
                Side::Total => home + away,
                Side::Home => home,
                Side::Away => away,
            };
            // Strictly above the line: the first whole number beyond it.
            let needed_total = line.floor() as u32 + 1;
            Some(needed_total.saturating_sub(current))
        }
        Market::BothScore(true) => {
            Some(u32::from(home == 0) + u32::from(away == 0))
        }
        // Unders, BTTS-no and result markets resolve only at full time.
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_goal_away_is_hot() {
        let state = assess("over 2.5", 2, 0, Some(60), None);
        assert_eq!(state.level, AlertLevel::Hot);
        assert_eq!(state.goals_needed, Some(1));
        assert!(!state.already_hit);
        assert_eq!(state.message, "1 goal away from OVER 2.5");
    }

    #[test]
    fn test_two_goals_away_is_warm() {
        let state = assess("over 3.5", 2, 0, Some(30), None);
        assert_eq!(state.level, AlertLevel::Warm);
        assert_eq!(state.goals_needed, Some(2));
    }

    #[test]
    fn test_satisfied_is_never_hot() {
        let state = assess("over 2.5", 2, 1, Some(70), None);
        assert!(state.already_hit);
        assert_eq!(state.level, AlertLevel::Cold);
        assert_eq!(state.goals_needed, Some(0));
    }

    #[test]
    fn test_result_market_is_binary() {
        let state = assess("1", 1, 0, Some(60), None);
        assert_eq!(state.level, AlertLevel::Cold);
        assert_eq!(state.goals_needed, None);
        assert!(!state.already_hit);
    }

    #[test]
    fn test_under_has_no_distance() {
        let state = assess("under 2.5", 0, 0, Some(60), None);
        assert_eq!(state.level, AlertLevel::Cold);
        assert_eq!(state.goals_needed, None);
        assert!(!state.already_hit);
    }

    #[test]
    fn test_btts_distance() {
        let one_side = assess("BTTS-yes", 2, 0, Some(40), None);
        assert_eq!(one_side.goals_needed, Some(1));
        assert_eq!(one_side.level, AlertLevel::Hot);

        let hit = assess("BTTS-yes", 1, 1, Some(50), None);
        assert!(hit.already_hit);
        assert_eq!(hit.level, AlertLevel::Cold);
    }

    #[test]
    fn test_first_half_window_closes() {
        // One goal from the first-half line, but the half has ended.
        let stale = assess("1H over 1.5", 1, 0, Some(60), Some((1, 0)));
        assert_eq!(stale.level, AlertLevel::Cold);
        assert!(stale.message.contains("window closed"));

        // Same distance while the half is still running stays hot.
        let open = assess("1H over 1.5", 1, 0, Some(30), None);
        assert_eq!(open.level, AlertLevel::Hot);
    }

    #[test]
    fn test_first_half_hit_survives_window_close() {
        // Satisfied during the half: informational, not stale.
        let state = assess("1H over 0.5", 2, 1, Some(70), Some((1, 0)));
        assert!(state.already_hit);
        assert_eq!(state.level, AlertLevel::Cold);
    }

    #[test]
    fn test_late_side_specific_demotes_to_warm() {
        let state = assess("home over 1.5", 1, 0, Some(85), None);
        assert_eq!(state.goals_needed, Some(1));
        assert_eq!(state.level, AlertLevel::Warm);
    }

    #[test]
    fn test_unknown_notation_is_cold() {
        let state = assess("triple chance", 0, 0, Some(10), None);
        assert_eq!(state.level, AlertLevel::Cold);
        assert_eq!(state.kind, "unknown");
    }
}
