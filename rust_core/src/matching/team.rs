//! Fuzzy fixture matching.
//!
//! Locally stored fixtures and live-feed fixtures spell team names
//! differently ("R. Madrid" vs "Real Madrid", "Besiktas JK" vs "Beşiktaş").
//! A side matches when any of three containment strategies agrees after
//! normalization; both sides must match independently for the fixture pair to
//! be linked. False negatives (failing to link a live fixture) are preferred
//! over false positives (linking the wrong match).

use super::fold_diacritics;
use std::collections::HashMap;
use strsim::jaro_winkler;

/// Seam for fixture identity resolution so the alias table and thresholds can
/// be swapped without touching the tracker.
pub trait TeamResolver: Send + Sync {
    fn fixture_matches(
        &self,
        local_home: &str,
        local_away: &str,
        feed_home: &str,
        feed_away: &str,
    ) -> bool;
}

/// Club-noise tokens stripped during normalization. Kept lowercase.
const NOISE_TOKENS: &[&str] = &[
    "fc", "cf", "sc", "ac", "afc", "sk", "fk", "bk", "jk", "cd", "club", "spor", "kulubu", "if",
    "u19", "u21", "u23", "ii", "b",
];

/// Matches a fixture by normalized team names with a three-tier containment
/// fallback plus a guarded similarity tier.
pub struct NameResolver {
    /// Normalized variant -> canonical form.
    aliases: HashMap<&'static str, &'static str>,
}

impl NameResolver {
    pub fn new() -> Self {
        Self::with_aliases(default_aliases())
    }

    pub fn with_aliases(aliases: HashMap<&'static str, &'static str>) -> Self {
        Self { aliases }
    }

    /// Lowercase, fold diacritics, drop punctuation, strip club noise,
    /// single-letter abbreviations and trailing numeric codes, then apply the
    /// alias table on the collapsed result.
    fn normalize(&self, name: &str) -> String {
        let folded = fold_diacritics(&name.to_lowercase());
        let cleaned: String = folded
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect();

        let tokens: Vec<&str> = cleaned
            .split_whitespace()
            .filter(|t| t.len() > 1)
            .filter(|t| !NOISE_TOKENS.contains(t))
            .filter(|t| !t.chars().all(|c| c.is_ascii_digit()))
            .collect();
        let joined = tokens.join(" ");

        match self.aliases.get(joined.as_str()) {
            Some(canonical) => canonical.to_string(),
            None => joined,
        }
    }

    fn side_matches(&self, local: &str, feed: &str) -> bool {
        let a = self.normalize(local);
        let b = self.normalize(feed);
        if a.is_empty() || b.is_empty() {
            return false;
        }
        if a == b {
            return true;
        }

        // Tier 1: one normalized name contains the other.
        if contains_substantial(&a, &b) {
            return true;
        }

        // Tier 2: leading tokens are mutually substring-matching. Guards
        // against abbreviation drift ("Fenerbahce SK" vs "Fenerbahçe").
        let first_a = a.split_whitespace().next().unwrap_or("");
        let first_b = b.split_whitespace().next().unwrap_or("");
        if first_a.len() > 3
            && first_b.len() > 3
            && (first_a.contains(first_b) || first_b.contains(first_a))
        {
            return true;
        }

        // Tier 3: whitespace-collapsed forms.
        let collapsed_a: String = a.split_whitespace().collect();
        let collapsed_b: String = b.split_whitespace().collect();
        if contains_substantial(&collapsed_a, &collapsed_b) {
            return true;
        }

        // Tier 4: high-threshold similarity on long collapsed names, for
        // spelling drift no containment check reaches.
        if collapsed_a.len() >= 6 && collapsed_b.len() >= 6 {
            return jaro_winkler(&collapsed_a, &collapsed_b) >= 0.93;
        }

        false
    }
}

impl Default for NameResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TeamResolver for NameResolver {
    fn fixture_matches(
        &self,
        local_home: &str,
        local_away: &str,
        feed_home: &str,
        feed_away: &str,
    ) -> bool {
        self.side_matches(local_home, feed_home) && self.side_matches(local_away, feed_away)
    }
}

/// Containment counts only when the contained side is longer than 3 chars so
/// short shared fragments never link unrelated teams.
fn contains_substantial(a: &str, b: &str) -> bool {
    (a.len() > 3 && b.contains(a)) || (b.len() > 3 && a.contains(b))
}

/// Default alias table: normalized variant -> canonical form. All entries are
/// in post-normalization shape (lowercase, no noise tokens).
fn default_aliases() -> HashMap<&'static str, &'static str> {
    let mut map = HashMap::new();
    map.insert("man utd", "manchester united");
    map.insert("man united", "manchester united");
    map.insert("man city", "manchester city");
    map.insert("spurs", "tottenham");
    map.insert("tottenham hotspur", "tottenham");
    map.insert("wolverhampton wanderers", "wolves");
    map.insert("wolverhampton", "wolves");
    map.insert("barca", "barcelona");
    map.insert("psg", "paris saint germain");
    map.insert("paris sg", "paris saint germain");
    map.insert("internazionale", "inter");
    map.insert("inter milan", "inter");
    map.insert("bayern munchen", "bayern munich");
    map.insert("borussia dortmund", "dortmund");
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> NameResolver {
        NameResolver::new()
    }

    #[test]
    fn test_exact_and_noise_stripped() {
        let r = resolver();
        assert!(r.side_matches("FC Barcelona", "Barcelona"));
        assert!(r.side_matches("Besiktas JK", "Beşiktaş"));
    }

    #[test]
    fn test_abbreviated_home_side() {
        let r = resolver();
        // Single-letter abbreviation tokens drop out, leaving a containment hit.
        assert!(r.side_matches("Real Madrid", "R. Madrid"));
    }

    #[test]
    fn test_fixture_requires_both_sides() {
        let r = resolver();
        assert!(r.fixture_matches("Real Madrid", "Barcelona", "R. Madrid", "FC Barcelona"));
        assert!(!r.fixture_matches("Real Madrid", "Barcelona", "R. Madrid", "Bayern Munich"));
    }

    #[test]
    fn test_short_fragments_do_not_match() {
        let r = resolver();
        // "AEK" vs "AE Kifisia" share only a short fragment.
        assert!(!r.side_matches("AEK", "Ajax"));
        assert!(!r.side_matches("Arsenal", "Ajax"));
        assert!(!r.fixture_matches("Arsenal", "Chelsea", "Ajax", "Celta Vigo"));
    }

    #[test]
    fn test_alias_table() {
        let r = resolver();
        assert!(r.side_matches("Man Utd", "Manchester United"));
        assert!(r.side_matches("PSG", "Paris Saint Germain FC"));
    }

    #[test]
    fn test_first_token_tier() {
        let r = resolver();
        assert!(r.side_matches("Fenerbahce SK", "Fenerbahçe Istanbul"));
    }

    #[test]
    fn test_youth_suffix_and_numeric_codes() {
        let r = resolver();
        assert!(r.side_matches("Ajax U21", "Ajax"));
        assert!(r.side_matches("Getafe CF 2004", "Getafe"));
    }

    #[test]
    fn test_similarity_tier_is_guarded() {
        let r = resolver();
        // Long names with a one-character spelling drift.
        assert!(r.side_matches("Galatasaray", "Galatasarai"));
        // Short names never reach the similarity tier.
        assert!(!r.side_matches("Gais", "Gait"));
    }
}
