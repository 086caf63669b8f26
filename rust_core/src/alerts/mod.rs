//! Live alerting for in-play fixtures.

pub mod proximity;

pub use proximity::{assess, AlertLevel, AlertState};
