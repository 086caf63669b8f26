//! Read access to the externally authored golden-rule set.

use crate::models::{Importance, RuleDefinition};
use anyhow::Result;
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, sqlx::FromRow)]
struct RuleRow {
    id: i64,
    name: String,
    primary_odds: Json<HashMap<String, f64>>,
    secondary_odds: Option<Json<HashMap<String, f64>>>,
    exclude_odds: Option<Json<HashMap<String, f64>>>,
    predictions: Json<Vec<String>>,
    confidence_base: i32,
    importance: String,
    active: bool,
}

/// All active rules, read-only for the duration of a matching pass.
pub async fn fetch_active_rules(pool: &PgPool) -> Result<Vec<RuleDefinition>> {
    let rows = sqlx::query_as::<_, RuleRow>(
        "SELECT id, name, primary_odds, secondary_odds, exclude_odds, \
                predictions, confidence_base, importance, active \
         FROM golden_rules WHERE active ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    let rules = rows
        .into_iter()
        .map(|row| {
            let importance = Importance::parse(&row.importance).unwrap_or_else(|| {
                warn!("Rule {} has unknown importance '{}', treating as normal", row.id, row.importance);
                Importance::Normal
            });
            RuleDefinition {
                id: row.id,
                name: row.name,
                primary_odds: row.primary_odds.0,
                secondary_odds: row.secondary_odds.map(|j| j.0),
                exclude_odds: row.exclude_odds.map(|j| j.0),
                predictions: row.predictions.0,
                confidence_base: row.confidence_base.clamp(0, 100) as u8,
                importance,
                active: row.active,
            }
        })
        .collect();
    Ok(rules)
}
