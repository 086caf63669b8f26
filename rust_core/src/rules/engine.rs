//! The golden-rules engine: matches a fixture's odds vector against the
//! active rule set and produces ranked predictions with confidence scores.
//!
//! Confidence never blends additively across rules for the same notation -
//! the highest candidate wins, reduced locally within a single call.

use crate::models::RuleDefinition;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Prices outside this band are provider noise and are dropped on ingest.
pub const MIN_SANE_PRICE: f64 = 1.01;
pub const MAX_SANE_PRICE: f64 = 50.0;

/// A fixture's extracted market odds: market key -> decimal price.
/// Ephemeral - lives for one matching attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OddsVector {
    prices: HashMap<String, f64>,
}

impl OddsVector {
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        let prices = pairs
            .into_iter()
            .filter(|(_, price)| (MIN_SANE_PRICE..=MAX_SANE_PRICE).contains(price))
            .map(|(key, price)| (key.into(), price))
            .collect();
        Self { prices }
    }

    /// Build from a JSONB odds object; non-numeric and out-of-band entries
    /// are indistinguishable from absent keys.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value.as_object() {
            Some(map) => Self::from_pairs(
                map.iter()
                    .filter_map(|(k, v)| v.as_f64().map(|price| (k.clone(), price))),
            ),
            None => Self::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.prices.get(key).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct RuleEngineConfig {
    /// Market key every pass requires; a fixture missing this price is
    /// skipped before any rule is evaluated.
    pub primary_market: String,
    /// Absolute tolerance when comparing a price to a rule's ideal value.
    pub tolerance: f64,
    /// Quality boost at zero price distance; decays linearly to 0 at the
    /// tolerance edge.
    pub max_quality_boost: u8,
}

impl Default for RuleEngineConfig {
    fn default() -> Self {
        Self {
            primary_market: "4-5".to_string(),
            tolerance: 0.10,
            max_quality_boost: 2,
        }
    }
}

/// One ranked prediction produced by a matching pass. The highest-confidence
/// entry is the primary prediction; the rest are alternatives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPrediction {
    pub prediction: String,
    pub confidence: u8,
    pub rule_id: i64,
    pub rule_name: String,
}

/// Match one fixture's odds against the rule set.
///
/// Returns predictions sorted by confidence descending (ties broken by
/// notation for determinism). Empty when the primary market price is absent
/// or no rule matches - the engine abstains rather than guessing.
pub fn match_fixture(
    odds: &OddsVector,
    rules: &[RuleDefinition],
    cfg: &RuleEngineConfig,
) -> Vec<RankedPrediction> {
    if odds.get(&cfg.primary_market).is_none() {
        return Vec::new();
    }

    // Local per-notation maximum; nothing outlives this call.
    let mut best: HashMap<&str, RankedPrediction> = HashMap::new();

    for rule in rules.iter().filter(|r| r.active) {
        if rule.primary_odds.is_empty() {
            continue;
        }
        if !conditions_hold(odds, &rule.primary_odds, cfg.tolerance, false) {
            continue;
        }
        if let Some(secondary) = &rule.secondary_odds {
            if !conditions_hold(odds, secondary, cfg.tolerance, false) {
                continue;
            }
        }
        if let Some(exclude) = &rule.exclude_odds {
            if !conditions_hold(odds, exclude, cfg.tolerance, true) {
                continue;
            }
        }

        let quality = quality_boost(odds, &rule.primary_odds, cfg);
        for prediction in &rule.predictions {
            let confidence = (rule.confidence_base as u32
                + rule.importance.boost() as u32
                + quality as u32)
                .min(99) as u8;
            let candidate = RankedPrediction {
                prediction: prediction.clone(),
                confidence,
                rule_id: rule.id,
                rule_name: rule.name.clone(),
            };
            best.entry(prediction.as_str())
                .and_modify(|current| {
                    if candidate.confidence > current.confidence {
                        *current = candidate.clone();
                    }
                })
                .or_insert(candidate);
        }
    }

    let mut ranked: Vec<RankedPrediction> = best.into_values().collect();
    ranked.sort_by(|a, b| {
        b.confidence
            .cmp(&a.confidence)
            .then_with(|| a.prediction.cmp(&b.prediction))
    });
    ranked
}

/// Check a rule's condition map against the odds vector.
///
/// For regular conditions every key must be present and within tolerance.
/// For exclude conditions a missing key is fine; a price inside the band
/// disqualifies the rule.
fn conditions_hold(
    odds: &OddsVector,
    conditions: &HashMap<String, f64>,
    tolerance: f64,
    is_exclude: bool,
) -> bool {
    for (key, required) in conditions {
        match odds.get(key) {
            None => {
                if is_exclude {
                    continue;
                }
                return false;
            }
            Some(actual) => {
                // Small epsilon so prices landing exactly on the band edge
                // are not rejected by floating-point representation.
                let within = (actual - required).abs() <= tolerance + 1e-9;
                if is_exclude {
                    if within {
                        return false;
                    }
                } else if !within {
                    return false;
                }
            }
        }
    }
    true
}

/// Boost derived from how close the primary prices sit to their ideals:
/// full boost at zero distance, zero at the tolerance edge. The worst leg
/// governs multi-condition primaries.
fn quality_boost(odds: &OddsVector, primary: &HashMap<String, f64>, cfg: &RuleEngineConfig) -> u8 {
    if cfg.tolerance <= f64::EPSILON {
        return cfg.max_quality_boost;
    }
    let mut worst: f64 = 0.0;
    for (key, ideal) in primary {
        if let Some(actual) = odds.get(key) {
            worst = worst.max((actual - ideal).abs());
        }
    }
    let closeness = (1.0 - worst / cfg.tolerance).clamp(0.0, 1.0);
    (cfg.max_quality_boost as f64 * closeness).round() as u8
}
