//! Golden-rules odds matching.

pub mod engine;

pub use engine::{match_fixture, OddsVector, RankedPrediction, RuleEngineConfig};
