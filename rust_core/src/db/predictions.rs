//! Prediction record repository.
//!
//! The natural key is (home_team, away_team, match_date): a second prediction
//! for an already-predicted fixture is rejected, not overwritten. Live-state
//! updates are single-row and guarded so finished fixtures stay immutable.

use crate::models::{AltPrediction, PredictionRecord, Verdict};
use anyhow::Result;
use chrono::NaiveDate;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

/// A freshly matched prediction, ready to insert.
#[derive(Debug, Clone)]
pub struct NewPrediction {
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    pub match_date: NaiveDate,
    pub match_time: Option<String>,
    pub prediction: String,
    pub confidence: u8,
    pub alternatives: Vec<AltPrediction>,
    pub matched_rules: Vec<i64>,
    pub run_id: Uuid,
}

/// Everything the tracker writes back for one fixture in one cycle.
#[derive(Debug, Clone)]
pub struct LiveUpdate {
    pub id: i64,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub halftime_home: Option<i32>,
    pub halftime_away: Option<i32>,
    pub elapsed: Option<i32>,
    pub is_live: bool,
    pub is_finished: bool,
    pub live_status: Option<String>,
    /// Set exactly once, on the transition into finished.
    pub verdict: Option<Verdict>,
    /// Alternatives rewritten with their own verdicts on finish.
    pub alternatives: Option<Vec<AltPrediction>>,
    pub result_note: Option<String>,
    pub ledger: String,
}

const SELECT_COLUMNS: &str = "id, home_team, away_team, league, match_date, match_time, \
     prediction, confidence, alternatives, matched_rules, \
     home_score, away_score, halftime_home, halftime_away, elapsed, \
     is_live, is_finished, live_status, verdict, result_note, notified, \
     run_id, created_at, updated_at";

/// First-writer-wins insert. Returns false when the fixture already has a
/// prediction for that date.
pub async fn insert_prediction(pool: &PgPool, new: &NewPrediction) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO predictions (
            home_team, away_team, league, match_date, match_time,
            prediction, confidence, alternatives, matched_rules,
            notified, run_id, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, '', $10, NOW(), NOW())
        ON CONFLICT (home_team, away_team, match_date) DO NOTHING
        "#,
    )
    .bind(&new.home_team)
    .bind(&new.away_team)
    .bind(&new.league)
    .bind(new.match_date)
    .bind(&new.match_time)
    .bind(&new.prediction)
    .bind(new.confidence as i32)
    .bind(Json(&new.alternatives))
    .bind(Json(&new.matched_rules))
    .bind(new.run_id)
    .execute(pool)
    .await?;

    let inserted = result.rows_affected() == 1;
    if !inserted {
        debug!(
            "Prediction already exists, skipping: {} vs {} on {}",
            new.home_team, new.away_team, new.match_date
        );
    }
    Ok(inserted)
}

/// Predictions still worth polling for `date`: everything not yet finished.
pub async fn fetch_trackable(pool: &PgPool, date: NaiveDate) -> Result<Vec<PredictionRecord>> {
    let rows = sqlx::query_as::<_, PredictionRecord>(&format!(
        "SELECT {SELECT_COLUMNS} FROM predictions \
         WHERE match_date = $1 AND NOT is_finished \
         ORDER BY id"
    ))
    .bind(date)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Apply one cycle's changes to a single record. The `NOT is_finished` guard
/// keeps finished fixtures immutable even if a cycle races itself.
pub async fn apply_live_update(pool: &PgPool, update: &LiveUpdate) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE predictions SET
            home_score = $2,
            away_score = $3,
            halftime_home = $4,
            halftime_away = $5,
            elapsed = $6,
            is_live = $7,
            is_finished = $8,
            live_status = $9,
            verdict = COALESCE($10, verdict),
            alternatives = COALESCE($11, alternatives),
            result_note = COALESCE($12, result_note),
            notified = $13,
            updated_at = NOW()
        WHERE id = $1 AND NOT is_finished
        "#,
    )
    .bind(update.id)
    .bind(update.home_score)
    .bind(update.away_score)
    .bind(update.halftime_home)
    .bind(update.halftime_away)
    .bind(update.elapsed)
    .bind(update.is_live)
    .bind(update.is_finished)
    .bind(&update.live_status)
    .bind(update.verdict.map(|v| v.as_str()))
    .bind(update.alternatives.as_ref().map(Json))
    .bind(&update.result_note)
    .bind(&update.ledger)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        warn!("Live update hit a finished or missing record: id={}", update.id);
    }
    Ok(())
}

/// Persist only the notification ledger, for sends with no state change.
pub async fn update_ledger(pool: &PgPool, id: i64, ledger: &str) -> Result<()> {
    sqlx::query("UPDATE predictions SET notified = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(ledger)
        .execute(pool)
        .await?;
    Ok(())
}

/// Refresh mode: drop still-pending predictions for fixtures that have not
/// kicked off inside the range, so a re-run can write fresh ones. Settled
/// history is never touched.
pub async fn clear_pending(pool: &PgPool, date_from: NaiveDate, date_to: NaiveDate) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM predictions
        WHERE match_date >= $1 AND match_date <= $2
          AND NOT is_live AND NOT is_finished AND verdict IS NULL
        "#,
    )
    .bind(date_from)
    .bind(date_to)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
