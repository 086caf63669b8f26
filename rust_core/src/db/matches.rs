//! Read access to imported fixtures and their opening odds.

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::debug;

/// One imported fixture with its opening odds JSONB, as the engine consumes it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MatchRow {
    pub id: i64,
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    pub match_date: NaiveDate,
    pub match_time: Option<String>,
    pub opening_odds: serde_json::Value,
}

const SELECT_COLUMNS: &str = "id, home_team, away_team, league, match_date, match_time, opening_odds";

/// Fixtures inside the date range that carry odds, optionally filtered by league.
pub async fn fetch_matches_with_odds(
    pool: &PgPool,
    date_from: NaiveDate,
    date_to: NaiveDate,
    leagues: Option<&[String]>,
) -> Result<Vec<MatchRow>> {
    let rows = match leagues {
        Some(leagues) if !leagues.is_empty() => {
            sqlx::query_as::<_, MatchRow>(&format!(
                "SELECT {SELECT_COLUMNS} FROM matches \
                 WHERE match_date >= $1 AND match_date <= $2 \
                   AND opening_odds IS NOT NULL AND league = ANY($3) \
                 ORDER BY match_date, id"
            ))
            .bind(date_from)
            .bind(date_to)
            .bind(leagues)
            .fetch_all(pool)
            .await?
        }
        _ => {
            sqlx::query_as::<_, MatchRow>(&format!(
                "SELECT {SELECT_COLUMNS} FROM matches \
                 WHERE match_date >= $1 AND match_date <= $2 \
                   AND opening_odds IS NOT NULL \
                 ORDER BY match_date, id"
            ))
            .bind(date_from)
            .bind(date_to)
            .fetch_all(pool)
            .await?
        }
    };

    debug!("Loaded {} matches with odds ({date_from}..{date_to})", rows.len());
    Ok(rows)
}
