//! Engine run audit records: one row per matching pass.

use anyhow::Result;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

/// Open a run in `running` state and return its id.
pub async fn create_run(pool: &PgPool, filters: &serde_json::Value) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO engine_runs (id, status, started_at, filters, matches_processed, opportunities_found)
        VALUES ($1, 'running', NOW(), $2, 0, 0)
        "#,
    )
    .bind(id)
    .bind(filters)
    .execute(pool)
    .await?;
    debug!("Engine run started: {id}");
    Ok(id)
}

/// Close a run with its statistics. A non-empty `error` marks it failed.
pub async fn complete_run(
    pool: &PgPool,
    id: Uuid,
    matches_processed: i64,
    opportunities_found: i64,
    execution_time_ms: i64,
    error: Option<&str>,
) -> Result<()> {
    let status = if error.is_some() { "failed" } else { "completed" };
    sqlx::query(
        r#"
        UPDATE engine_runs SET
            status = $2,
            completed_at = NOW(),
            matches_processed = $3,
            opportunities_found = $4,
            execution_time_ms = $5,
            error_message = $6
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(status)
    .bind(matches_processed)
    .bind(opportunities_found)
    .bind(execution_time_ms)
    .bind(error)
    .execute(pool)
    .await?;
    Ok(())
}
