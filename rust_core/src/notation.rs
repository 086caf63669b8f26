//! Prediction notation - the compact textual grammar for wagering outcomes.
//!
//! Grammar (case-insensitive, diacritics folded, `-` treated as whitespace):
//!
//! | notation            | meaning                                   |
//! |---------------------|-------------------------------------------|
//! | `1` / `X` / `2`     | full-time result: home win / draw / away  |
//! | `BTTS-yes` `BTTS-no`| both teams to score                       |
//! | `over 2.5`          | total goals strictly above the line       |
//! | `under 3.5`         | total goals strictly below the line       |
//! | `home over 1.5`     | home-only goal line (`away` analogous)    |
//! | `1H <any>`          | first-half variant of any of the above    |
//!
//! Parsing is total: anything outside the grammar yields `None`, and callers
//! treat that as an indeterminate evaluation rather than an error.

use crate::matching::fold_diacritics;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    FullTime,
    FirstHalf,
}

/// Which side a goal line applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Total,
    Home,
    Away,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    HomeWin,
    Draw,
    AwayWin,
    /// `true` = BTTS-yes, `false` = BTTS-no.
    BothScore(bool),
    GoalLine { side: Side, over: bool, line: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Notation {
    pub period: Period,
    pub market: Market,
}

impl Notation {
    pub fn is_first_half(&self) -> bool {
        self.period == Period::FirstHalf
    }

    /// Restates the literal target, e.g. `OVER 2.5 (first half)`.
    pub fn target_description(&self) -> String {
        let suffix = match self.period {
            Period::FullTime => "",
            Period::FirstHalf => " (first half)",
        };
        let body = match self.market {
            Market::HomeWin => "HOME WIN".to_string(),
            Market::Draw => "DRAW".to_string(),
            Market::AwayWin => "AWAY WIN".to_string(),
            Market::BothScore(true) => "BTTS YES".to_string(),
            Market::BothScore(false) => "BTTS NO".to_string(),
            Market::GoalLine { side, over, line } => {
                let scope = match side {
                    Side::Total => "",
                    Side::Home => "HOME ",
                    Side::Away => "AWAY ",
                };
                let dir = if over { "OVER" } else { "UNDER" };
                format!("{scope}{dir} {line}")
            }
        };
        format!("{body}{suffix}")
    }
}

/// Parse a notation string. Returns `None` for anything outside the grammar.
pub fn parse(raw: &str) -> Option<Notation> {
    let folded = fold_diacritics(raw).to_lowercase().replace('-', " ");
    let mut tokens: Vec<&str> = folded.split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    let period = if tokens[0] == "1h" {
        tokens.remove(0);
        Period::FirstHalf
    } else {
        Period::FullTime
    };

    let market = match tokens.as_slice() {
        ["1"] => Market::HomeWin,
        ["x"] => Market::Draw,
        ["2"] => Market::AwayWin,
        ["btts", "yes"] => Market::BothScore(true),
        ["btts", "no"] => Market::BothScore(false),
        [dir, line] if is_direction(dir) => Market::GoalLine {
            side: Side::Total,
            over: *dir == "over",
            line: parse_line(line)?,
        },
        [scope, dir, line] if is_scope(scope) && is_direction(dir) => Market::GoalLine {
            side: if *scope == "home" { Side::Home } else { Side::Away },
            over: *dir == "over",
            line: parse_line(line)?,
        },
        _ => return None,
    };

    Some(Notation { period, market })
}

fn is_direction(token: &str) -> bool {
    token == "over" || token == "under"
}

fn is_scope(token: &str) -> bool {
    token == "home" || token == "away"
}

fn parse_line(token: &str) -> Option<f64> {
    let line: f64 = token.parse().ok()?;
    if line.is_finite() && line >= 0.0 {
        Some(line)
    } else {
        None
    }
}
