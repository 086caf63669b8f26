//! Cycle-planning tests: state diffing, verdict settlement and notification
//! planning, all exercised without a database or network.

use chrono::{NaiveDate, TimeZone, Utc};
use goalhawk_rust_core::clients::LiveFixture;
use goalhawk_rust_core::ledger::{NotificationKind, NotificationLedger};
use goalhawk_rust_core::models::{AltPrediction, MatchPhase, PredictionRecord, Verdict};
use live_tracker_rust::config::TrackerConfig;
use live_tracker_rust::notifier::plan_notifications;
use live_tracker_rust::tracker::plan_update;

fn record() -> PredictionRecord {
    PredictionRecord {
        id: 7,
        home_team: "Galatasaray".to_string(),
        away_team: "Fenerbahce".to_string(),
        league: "Super Lig".to_string(),
        match_date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
        match_time: Some("19:00".to_string()),
        prediction: "over 2.5".to_string(),
        confidence: 90,
        alternatives: sqlx::types::Json(vec![AltPrediction {
            prediction: "1H over 0.5".to_string(),
            confidence: 88,
            rule_id: 30,
            verdict: None,
        }]),
        matched_rules: sqlx::types::Json(vec![30]),
        home_score: None,
        away_score: None,
        halftime_home: None,
        halftime_away: None,
        elapsed: None,
        is_live: false,
        is_finished: false,
        live_status: None,
        verdict: None,
        result_note: None,
        notified: String::new(),
        run_id: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn fixture(phase: MatchPhase, status: &str, home: i32, away: i32, elapsed: Option<i32>) -> LiveFixture {
    LiveFixture {
        fixture_id: 551,
        home_team: "Galatasaray SK".to_string(),
        away_team: "Fenerbahçe SK".to_string(),
        status_short: status.to_string(),
        phase,
        elapsed,
        home_goals: Some(home),
        away_goals: Some(away),
        halftime_home: None,
        halftime_away: None,
    }
}

fn tracker_config() -> TrackerConfig {
    // from_env is the only constructor; drive it through the environment the
    // way the service itself is configured.
    std::env::set_var("API_FOOTBALL_KEY", "test-key");
    std::env::remove_var("TELEGRAM_BOT_TOKEN");
    std::env::remove_var("TELEGRAM_CHAT_ID");
    TrackerConfig::from_env().expect("config")
}

fn apply(record: &mut PredictionRecord, update: &goalhawk_rust_core::db::predictions::LiveUpdate) {
    record.home_score = update.home_score;
    record.away_score = update.away_score;
    record.halftime_home = update.halftime_home;
    record.halftime_away = update.halftime_away;
    record.elapsed = update.elapsed;
    record.is_live = update.is_live;
    record.is_finished = update.is_finished;
    record.live_status = update.live_status.clone();
    record.verdict = update.verdict.map(|v| v.as_str().to_string());
    record.notified = update.ledger.clone();
}

#[test]
fn test_unchanged_feed_plans_zero_writes() {
    let mut rec = record();
    let fix = fixture(MatchPhase::Live, "1H", 1, 0, Some(23));

    let first = plan_update(&rec, &fix).expect("first sighting is a change");
    apply(&mut rec, &first);

    // Identical feed on the next poll: idempotent, no write.
    assert!(plan_update(&rec, &fix).is_none());

    // A new goal is a change again.
    let fix2 = fixture(MatchPhase::Live, "1H", 2, 0, Some(31));
    assert!(plan_update(&rec, &fix2).is_some());
}

#[test]
fn test_finished_record_is_terminal() {
    let mut rec = record();
    let done = fixture(MatchPhase::Finished, "FT", 3, 1, Some(90));
    let update = plan_update(&rec, &done).expect("finish is a change");
    apply(&mut rec, &update);
    assert!(rec.is_finished);

    // Any further feed state, however different, plans nothing.
    let weird = fixture(MatchPhase::Live, "2H", 9, 9, Some(70));
    assert!(plan_update(&rec, &weird).is_none());
}

#[test]
fn test_live_record_never_regresses_to_not_started() {
    let mut rec = record();
    let live = fixture(MatchPhase::Live, "1H", 0, 0, Some(5));
    let update = plan_update(&rec, &live).unwrap();
    apply(&mut rec, &update);

    let glitch = fixture(MatchPhase::NotStarted, "NS", 0, 0, None);
    assert!(plan_update(&rec, &glitch).is_none());
}

#[test]
fn test_verdict_settled_once_with_alternatives() {
    let rec = record();
    let mut done = fixture(MatchPhase::Finished, "FT", 2, 1, Some(90));
    done.halftime_home = Some(1);
    done.halftime_away = Some(0);

    let update = plan_update(&rec, &done).expect("finish plans a write");
    assert_eq!(update.verdict, Some(Verdict::Won)); // total 3 > 2.5
    assert_eq!(update.result_note.as_deref(), Some("FT 2-1 | HT 1-0"));

    let alts = update.alternatives.expect("alternatives settle too");
    assert_eq!(alts[0].verdict.as_deref(), Some("won")); // HT total 1 > 0.5
}

#[test]
fn test_verdict_without_halftime_is_indeterminate_for_first_half_alt() {
    let rec = record();
    let done = fixture(MatchPhase::Finished, "FT", 2, 1, Some(90));

    let update = plan_update(&rec, &done).unwrap();
    assert_eq!(update.verdict, Some(Verdict::Won));
    let alts = update.alternatives.unwrap();
    // The first-half alternative never borrows the full-time score.
    assert_eq!(alts[0].verdict.as_deref(), Some("unknown"));
}

#[test]
fn test_hot_alert_planned_once_per_score_state() {
    let cfg = tracker_config();
    let mut rec = record();
    let fix = fixture(MatchPhase::Live, "2H", 2, 0, Some(60));
    rec.is_live = true;

    let planned = plan_notifications(&rec, &fix, None, Utc::now(), &cfg);
    let hot: Vec<_> = planned
        .iter()
        .filter(|n| matches!(n.kind, NotificationKind::Hot { .. }))
        .collect();
    assert_eq!(hot.len(), 1);
    assert_eq!(hot[0].kind.token(), "hot_2-0");
    assert!(!hot[0].silent);

    // The ledger refuses the same score-state on every later cycle.
    let mut ledger = NotificationLedger::parse(&rec.notified);
    assert!(ledger.record(&hot[0].kind.token()));
    for _ in 0..3 {
        assert!(!ledger.record(&hot[0].kind.token()));
    }

    // A different score is a fresh token.
    assert!(ledger.record(&NotificationKind::Hot { home: 3, away: 0 }.token()));
}

#[test]
fn test_result_notification_silent_only_when_lost() {
    let cfg = tracker_config();
    let rec = record();

    let won_fix = fixture(MatchPhase::Finished, "FT", 2, 1, Some(90));
    let won_update = plan_update(&rec, &won_fix).unwrap();
    let planned = plan_notifications(&rec, &won_fix, Some(&won_update), Utc::now(), &cfg);
    assert_eq!(planned.len(), 1);
    assert_eq!(planned[0].kind, NotificationKind::Result(Verdict::Won));
    assert!(!planned[0].silent);

    let lost_fix = fixture(MatchPhase::Finished, "FT", 1, 0, Some(90));
    let lost_update = plan_update(&rec, &lost_fix).unwrap();
    let planned = plan_notifications(&rec, &lost_fix, Some(&lost_update), Utc::now(), &cfg);
    assert_eq!(planned[0].kind, NotificationKind::Result(Verdict::Lost));
    assert!(planned[0].silent);
}

#[test]
fn test_kickoff_planned_on_live_transition_only() {
    let cfg = tracker_config();
    let rec = record();
    let fix = fixture(MatchPhase::Live, "1H", 0, 0, Some(3));

    let planned = plan_notifications(&rec, &fix, None, Utc::now(), &cfg);
    assert!(planned
        .iter()
        .any(|n| n.kind == NotificationKind::Kickoff));

    let mut live_rec = record();
    live_rec.is_live = true;
    let planned = plan_notifications(&live_rec, &fix, None, Utc::now(), &cfg);
    assert!(!planned.iter().any(|n| n.kind == NotificationKind::Kickoff));
}

#[test]
fn test_upcoming_planned_inside_window() {
    let cfg = tracker_config();
    let rec = record(); // kickoff 19:00 on 2024-03-02
    let pre = fixture(MatchPhase::NotStarted, "NS", 0, 0, None);

    let near = Utc.with_ymd_and_hms(2024, 3, 2, 18, 40, 0).unwrap();
    let planned = plan_notifications(&rec, &pre, None, near, &cfg);
    assert!(planned.iter().any(|n| n.kind == NotificationKind::Upcoming));
    assert!(planned.iter().all(|n| n.silent));

    let early = Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap();
    let planned = plan_notifications(&rec, &pre, None, early, &cfg);
    assert!(planned.is_empty());
}
