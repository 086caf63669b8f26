//! Outcome evaluation for finished matches.
//!
//! `evaluate` is total and deterministic: it returns exactly one of won /
//! lost / indeterminate and never fails. Half-time-gated notations are
//! indeterminate when no half-time score is on record, even when a plausible
//! inference exists from the full-time score - a half-time result is never
//! fabricated.

use crate::models::Verdict;
use crate::notation::{self, Market, Period, Side};

/// Evaluate a prediction notation against a completed match.
///
/// `half` is the half-time score when the feed recorded one.
pub fn evaluate(raw: &str, final_home: u32, final_away: u32, half: Option<(u32, u32)>) -> Verdict {
    let Some(parsed) = notation::parse(raw) else {
        return Verdict::Indeterminate;
    };

    let (home, away) = match parsed.period {
        Period::FullTime => (final_home, final_away),
        Period::FirstHalf => match half {
            Some(scores) => scores,
            None => return Verdict::Indeterminate,
        },
    };

    let won = match parsed.market {
        Market::HomeWin => home > away,
        Market::Draw => home == away,
        Market::AwayWin => home < away,
        Market::BothScore(yes) => (home > 0 && away > 0) == yes,
        Market::GoalLine { side, over, line } => {
            let value = match side {
                Side::Total => home + away,
                Side::Home => home,
                Side::Away => away,
            } as f64;
            if over {
                value > line
            } else {
                value < line
            }
        }
    };

    if won {
        Verdict::Won
    } else {
        Verdict::Lost
    }
}
