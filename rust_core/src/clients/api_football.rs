//! API-Football (api-sports.io) client.
//!
//! Fetches day fixtures, in-play fixtures and account usage. Responses are
//! decoded defensively: a fixture missing either team name is dropped rather
//! than propagated half-formed.

use crate::models::MatchPhase;
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://v3.football.api-sports.io";

/// One fixture as reported by the live feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveFixture {
    pub fixture_id: i64,
    pub home_team: String,
    pub away_team: String,
    /// Raw short status code, e.g. `1H`, `HT`, `FT`.
    pub status_short: String,
    pub phase: MatchPhase,
    pub elapsed: Option<i32>,
    pub home_goals: Option<i32>,
    pub away_goals: Option<i32>,
    pub halftime_home: Option<i32>,
    pub halftime_away: Option<i32>,
}

/// Account usage as reported by the provider's status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiUsage {
    pub plan: String,
    pub daily_limit: i64,
    pub used_today: i64,
    pub remaining: i64,
}

/// Map the provider's closed status-code set onto the three tracked phases.
/// Half-time, extra time and penalties are all live; only explicit
/// end-of-match codes are finished; everything else has not started.
pub fn classify_status(short: &str) -> MatchPhase {
    match short {
        "1H" | "HT" | "2H" | "ET" | "BT" | "P" | "LIVE" => MatchPhase::Live,
        "FT" | "AET" | "PEN" | "AWD" | "WO" => MatchPhase::Finished,
        _ => MatchPhase::NotStarted,
    }
}

#[derive(Clone)]
pub struct ApiFootballClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for ApiFootballClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiFootballClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ApiFootballClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    /// Test hook: point the client at a stub server.
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url,
            api_key,
        }
    }

    /// All fixtures scheduled for `date`.
    pub async fn fixtures_by_date(&self, date: NaiveDate) -> Result<Vec<LiveFixture>> {
        self.fetch_fixtures(&[("date", date.format("%Y-%m-%d").to_string())])
            .await
    }

    /// All fixtures currently in play, league-wide.
    pub async fn live_fixtures(&self) -> Result<Vec<LiveFixture>> {
        self.fetch_fixtures(&[("live", "all".to_string())]).await
    }

    /// Daily request quota, for operator visibility before a polling session.
    pub async fn usage(&self) -> Result<ApiUsage> {
        let url = format!("{}/status", self.base_url);
        let resp = self
            .client
            .get(&url)
            .header("x-apisports-key", &self.api_key)
            .send()
            .await
            .with_context(|| format!("status request failed: {url}"))?;
        if !resp.status().is_success() {
            return Err(anyhow!("status endpoint returned {}", resp.status()));
        }
        let data: serde_json::Value = resp.json().await.context("invalid status response")?;
        let response = &data["response"];
        let plan = response["subscription"]["plan"]
            .as_str()
            .unwrap_or("unknown")
            .to_string();
        let limit = response["requests"]["limit_day"].as_i64().unwrap_or(0);
        let current = response["requests"]["current"].as_i64().unwrap_or(0);
        Ok(ApiUsage {
            plan,
            daily_limit: limit,
            used_today: current,
            remaining: (limit - current).max(0),
        })
    }

    async fn fetch_fixtures(&self, params: &[(&str, String)]) -> Result<Vec<LiveFixture>> {
        let url = format!("{}/fixtures", self.base_url);
        let resp = self
            .client
            .get(&url)
            .header("x-apisports-key", &self.api_key)
            .query(params)
            .send()
            .await
            .with_context(|| format!("fixtures request failed: {url}"))?;
        if !resp.status().is_success() {
            return Err(anyhow!("fixtures endpoint returned {}", resp.status()));
        }
        let data: serde_json::Value = resp.json().await.context("invalid fixtures response")?;

        let mut fixtures = Vec::new();
        if let Some(entries) = data["response"].as_array() {
            for entry in entries {
                if let Some(fixture) = parse_fixture(entry) {
                    fixtures.push(fixture);
                }
            }
        }
        Ok(fixtures)
    }
}

fn parse_fixture(entry: &serde_json::Value) -> Option<LiveFixture> {
    let fixture_id = entry["fixture"]["id"].as_i64()?;
    let home_team = entry["teams"]["home"]["name"].as_str()?.to_string();
    let away_team = entry["teams"]["away"]["name"].as_str()?.to_string();
    if home_team.is_empty() || away_team.is_empty() {
        return None;
    }

    let status_short = entry["fixture"]["status"]["short"]
        .as_str()
        .unwrap_or("NS")
        .to_string();
    let elapsed = entry["fixture"]["status"]["elapsed"]
        .as_i64()
        .map(|v| v as i32);
    let home_goals = entry["goals"]["home"].as_i64().map(|v| v as i32);
    let away_goals = entry["goals"]["away"].as_i64().map(|v| v as i32);
    let halftime_home = entry["score"]["halftime"]["home"].as_i64().map(|v| v as i32);
    let halftime_away = entry["score"]["halftime"]["away"].as_i64().map(|v| v as i32);

    Some(LiveFixture {
        fixture_id,
        home_team,
        away_team,
        phase: classify_status(&status_short),
        status_short,
        elapsed,
        home_goals,
        away_goals,
        halftime_home,
        halftime_away,
    })
}
