//! Message templates for outgoing Telegram notifications (HTML parse mode).

use goalhawk_rust_core::alerts::AlertState;
use goalhawk_rust_core::models::{PredictionRecord, Verdict};

pub fn format_alert(record: &PredictionRecord, alert: &AlertState) -> String {
    let flame = match alert.level {
        goalhawk_rust_core::alerts::AlertLevel::Hot => "🔥",
        goalhawk_rust_core::alerts::AlertLevel::Warm => "🌡",
        goalhawk_rust_core::alerts::AlertLevel::Cold => "ℹ️",
    };
    let minute = alert
        .elapsed
        .map(|m| format!(" ({m}')"))
        .unwrap_or_default();
    format!(
        "{flame} <b>{}</b>\n{}\nScore {}-{}{minute}\nPrediction: {} ({}%)",
        record.fixture_label(),
        alert.message,
        alert.home_score,
        alert.away_score,
        record.prediction,
        record.confidence,
    )
}

pub fn format_result(record: &PredictionRecord, verdict: Verdict, note: Option<&str>) -> String {
    let (icon, label) = match verdict {
        Verdict::Won => ("✅", "WON"),
        Verdict::Lost => ("❌", "LOST"),
        Verdict::Indeterminate => ("❔", "UNSETTLED"),
    };
    let note_line = note.map(|n| format!("\n{n}")).unwrap_or_default();
    format!(
        "{icon} <b>{}</b>\nPrediction <b>{}</b> {label}{note_line}",
        record.fixture_label(),
        record.prediction,
    )
}

pub fn format_kickoff(record: &PredictionRecord) -> String {
    format!(
        "⚽ <b>{}</b> is under way\nPrediction: {} ({}%)",
        record.fixture_label(),
        record.prediction,
        record.confidence,
    )
}

pub fn format_upcoming(record: &PredictionRecord, minutes_to_kickoff: i64) -> String {
    format!(
        "🕐 <b>{}</b> kicks off in {minutes_to_kickoff} min\nPrediction: {} ({}%)",
        record.fixture_label(),
        record.prediction,
        record.confidence,
    )
}
