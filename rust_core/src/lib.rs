//! Goalhawk Core - golden-rule football predictions and live fixture tracking.
//!
//! This crate provides:
//! - The prediction notation grammar and its parser
//! - Outcome evaluation for finished matches (won / lost / indeterminate)
//! - Proximity alerts for in-play fixtures (hot / warm / cold)
//! - Fuzzy team-identity resolution between stored fixtures and feed names
//! - The golden-rules odds matcher with ranked confidence scores
//! - The at-most-once notification ledger
//! - API-Football client behind a throttled, shared feed cache
//! - Postgres repositories for matches, predictions, rules and engine runs

pub mod alerts;
pub mod clients;
pub mod db;
pub mod ledger;
pub mod matching;
pub mod models;
pub mod notation;
pub mod outcome;
pub mod rules;

pub use models::*;
