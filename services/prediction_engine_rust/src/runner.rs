//! The matching pass: load fixtures, apply rules, persist predictions.

use crate::config::EngineServiceConfig;
use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use goalhawk_rust_core::db::matches::MatchRow;
use goalhawk_rust_core::db::predictions::NewPrediction;
use goalhawk_rust_core::db::{matches, predictions, rules as rules_repo, runs};
use goalhawk_rust_core::models::{AltPrediction, RuleDefinition};
use goalhawk_rust_core::rules::{match_fixture, OddsVector};
use log::{info, warn};
use rayon::prelude::*;
use sqlx::PgPool;
use std::time::Instant;
use uuid::Uuid;

const INSERT_CHUNK: usize = 100;

#[derive(Debug, Default)]
pub struct PassSummary {
    pub run_id: Uuid,
    pub matches_processed: usize,
    pub opportunities_found: usize,
    pub inserted: usize,
    pub skipped_existing: usize,
    pub missing_primary: usize,
    pub below_confidence: usize,
    pub cleared: u64,
    pub execution_time_ms: i64,
}

/// What became of one fixture during the pass.
enum FixtureOutcome {
    MissingPrimary,
    NoRuleMatched,
    BelowConfidence,
    Opportunity(Box<NewPrediction>),
}

/// Run one complete pass, bracketed by an engine-run audit record.
pub async fn run_pass(pool: &PgPool, cfg: &EngineServiceConfig) -> Result<PassSummary> {
    let now = Utc::now();
    let date_from = cfg.date_from.unwrap_or_else(|| now.date_naive());
    let date_to = date_from + Duration::days(cfg.days_ahead);

    let filters = serde_json::json!({
        "date_from": date_from,
        "date_to": date_to,
        "leagues": cfg.leagues,
        "min_confidence": cfg.min_confidence,
    });
    let run_id = runs::create_run(pool, &filters).await?;
    let started = Instant::now();

    match execute(pool, cfg, run_id, now, date_from, date_to).await {
        Ok(mut summary) => {
            summary.run_id = run_id;
            summary.execution_time_ms = started.elapsed().as_millis() as i64;
            runs::complete_run(
                pool,
                run_id,
                summary.matches_processed as i64,
                summary.opportunities_found as i64,
                summary.execution_time_ms,
                None,
            )
            .await?;
            Ok(summary)
        }
        Err(e) => {
            let elapsed = started.elapsed().as_millis() as i64;
            if let Err(close_err) =
                runs::complete_run(pool, run_id, 0, 0, elapsed, Some(&e.to_string())).await
            {
                warn!("Failed to close run {run_id}: {close_err}");
            }
            Err(e)
        }
    }
}

async fn execute(
    pool: &PgPool,
    cfg: &EngineServiceConfig,
    run_id: Uuid,
    now: DateTime<Utc>,
    date_from: NaiveDate,
    date_to: NaiveDate,
) -> Result<PassSummary> {
    let mut summary = PassSummary::default();

    if cfg.refresh {
        summary.cleared = predictions::clear_pending(pool, date_from, date_to).await?;
        if summary.cleared > 0 {
            info!("Cleared {} pending predictions for refresh", summary.cleared);
        }
    }

    let rules = rules_repo::fetch_active_rules(pool).await?;
    if rules.is_empty() {
        warn!("No active golden rules, nothing to match");
        return Ok(summary);
    }
    info!("Loaded {} active rules", rules.len());

    let mut fixtures = matches::fetch_matches_with_odds(pool, date_from, date_to, cfg.leagues.as_deref()).await?;
    if cfg.skip_started {
        let before = fixtures.len();
        fixtures.retain(|m| !has_kicked_off(m, now));
        info!("{} of {} fixtures not yet started", fixtures.len(), before);
    }
    summary.matches_processed = fixtures.len();

    // Rule evaluation is pure per fixture, so the pass fans out across cores.
    let outcomes: Vec<FixtureOutcome> = fixtures
        .par_iter()
        .map(|m| evaluate_fixture(m, &rules, cfg, run_id))
        .collect();

    let mut opportunities = Vec::new();
    for outcome in outcomes {
        match outcome {
            FixtureOutcome::MissingPrimary => summary.missing_primary += 1,
            FixtureOutcome::NoRuleMatched => {}
            FixtureOutcome::BelowConfidence => summary.below_confidence += 1,
            FixtureOutcome::Opportunity(new) => opportunities.push(*new),
        }
    }
    summary.opportunities_found = opportunities.len();

    for chunk in opportunities.chunks(INSERT_CHUNK) {
        for new in chunk {
            if predictions::insert_prediction(pool, new).await? {
                summary.inserted += 1;
            } else {
                summary.skipped_existing += 1;
            }
        }
        info!("Saved {}/{} predictions", summary.inserted, opportunities.len());
    }

    Ok(summary)
}

/// A fixture counts as started once its kickoff timestamp is in the past.
/// Unparseable or missing kickoff times keep the fixture in the pass.
fn has_kicked_off(m: &MatchRow, now: DateTime<Utc>) -> bool {
    let Some(time_raw) = m.match_time.as_deref() else {
        return false;
    };
    let Ok(time) = NaiveTime::parse_from_str(time_raw.trim(), "%H:%M") else {
        return false;
    };
    m.match_date.and_time(time).and_utc() <= now
}

fn evaluate_fixture(
    m: &MatchRow,
    rules: &[RuleDefinition],
    cfg: &EngineServiceConfig,
    run_id: Uuid,
) -> FixtureOutcome {
    let odds = OddsVector::from_json(&m.opening_odds);
    if odds.get(&cfg.rules.primary_market).is_none() {
        return FixtureOutcome::MissingPrimary;
    }

    let ranked = match_fixture(&odds, rules, &cfg.rules);
    let Some(best) = ranked.first() else {
        return FixtureOutcome::NoRuleMatched;
    };
    if best.confidence < cfg.min_confidence {
        return FixtureOutcome::BelowConfidence;
    }

    let mut matched_rules: Vec<i64> = Vec::new();
    for r in &ranked {
        if !matched_rules.contains(&r.rule_id) {
            matched_rules.push(r.rule_id);
        }
    }

    let alternatives: Vec<AltPrediction> = ranked[1..]
        .iter()
        .map(|r| AltPrediction {
            prediction: r.prediction.clone(),
            confidence: r.confidence,
            rule_id: r.rule_id,
            verdict: None,
        })
        .collect();

    FixtureOutcome::Opportunity(Box::new(NewPrediction {
        home_team: m.home_team.clone(),
        away_team: m.away_team.clone(),
        league: m.league.clone(),
        match_date: m.match_date,
        match_time: m.match_time.clone(),
        prediction: best.prediction.clone(),
        confidence: best.confidence,
        alternatives,
        matched_rules,
        run_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn match_row(time: Option<&str>) -> MatchRow {
        MatchRow {
            id: 1,
            home_team: "Lens".to_string(),
            away_team: "Lille".to_string(),
            league: "Ligue 1".to_string(),
            match_date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            match_time: time.map(|t| t.to_string()),
            opening_odds: serde_json::json!({"4-5": 2.10}),
        }
    }

    fn at(h: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2024, 3, 2)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn test_has_kicked_off() {
        assert!(has_kicked_off(&match_row(Some("14:00")), at(15)));
        assert!(!has_kicked_off(&match_row(Some("20:45")), at(15)));
        // Missing or unparseable kickoff keeps the fixture in the pass.
        assert!(!has_kicked_off(&match_row(None), at(15)));
        assert!(!has_kicked_off(&match_row(Some("evening")), at(15)));
    }
}
