//! Keyword lookup tables driving the WSJF heuristics.
//!
//! Matching is a case-insensitive substring test against the lower-cased
//! `title + description` of a work item. Each keyword counts once no matter
//! how often it occurs. The tables are plain configuration, so a change in
//! scoring behavior is a change in data, tagged by `scoringVersion`.

use serde::{Deserialize, Serialize};

const SCORE_CAP: f64 = 100.0;
const SCALE_MIN: u8 = 1;
const SCALE_MAX: u8 = 5;

// ---------------------------------------------------------------------------
// KeywordCategory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordCategory {
    pub name: String,
    /// Multiplier applied to the dimension increment for each match.
    #[serde(default = "default_weight")]
    pub weight: f64,
    pub keywords: Vec<String>,
}

fn default_weight() -> f64 {
    1.0
}

impl KeywordCategory {
    pub fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            weight: default_weight(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// DimensionTable
// ---------------------------------------------------------------------------

/// One 0–100 sub-score: `base + Σ(increment * category weight)` over matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionTable {
    pub base: f64,
    pub increment: f64,
    pub categories: Vec<KeywordCategory>,
}

impl DimensionTable {
    pub fn score(&self, text: &str) -> f64 {
        let mut score = self.base;
        for category in &self.categories {
            let matched = count_matches(&category.keywords, text);
            score += matched as f64 * self.increment * category.weight;
        }
        score.clamp(0.0, SCORE_CAP)
    }

    /// Keywords present in `text`, in table order.
    pub fn matched<'a>(&'a self, text: &str) -> Vec<&'a str> {
        self.categories
            .iter()
            .flat_map(|c| c.keywords.iter())
            .filter(|k| contains_keyword(text, k))
            .map(String::as_str)
            .collect()
    }

    pub fn keyword_count(&self) -> usize {
        self.categories.iter().map(|c| c.keywords.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// ScaleTable
// ---------------------------------------------------------------------------

/// A 1–5 level: one step up per matched keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleTable {
    pub keywords: Vec<String>,
}

impl ScaleTable {
    fn new(keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    pub fn level(&self, text: &str) -> u8 {
        let matched = count_matches(&self.keywords, text);
        let level = (SCALE_MIN as usize).saturating_add(matched);
        level.min(SCALE_MAX as usize) as u8
    }
}

// ---------------------------------------------------------------------------
// ScoringTables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringTables {
    #[serde(default = "default_business_value")]
    pub business_value: DimensionTable,
    #[serde(default = "default_time_criticality")]
    pub time_criticality: DimensionTable,
    #[serde(default = "default_risk_reduction")]
    pub risk_reduction: DimensionTable,
    #[serde(default = "default_complexity")]
    pub complexity: ScaleTable,
    #[serde(default = "default_uncertainty")]
    pub uncertainty: ScaleTable,
    #[serde(default = "default_dependency_mentions")]
    pub dependency_mentions: Vec<String>,
}

fn default_business_value() -> DimensionTable {
    DimensionTable {
        base: 30.0,
        increment: 10.0,
        categories: vec![
            KeywordCategory::new("user", &["user", "customer", "experience", "usability"]),
            KeywordCategory::new(
                "business",
                &["revenue", "sales", "conversion", "profit", "cost"],
            ),
            KeywordCategory::new(
                "tech-debt",
                &["refactor", "technical debt", "legacy", "cleanup"],
            ),
            KeywordCategory::new("strategic", &["strategic", "platform", "roadmap", "okr"]),
        ],
    }
}

fn default_time_criticality() -> DimensionTable {
    DimensionTable {
        base: 20.0,
        increment: 15.0,
        categories: vec![
            KeywordCategory::new("market", &["market", "competitor", "launch", "release"]),
            KeywordCategory::new(
                "commitment",
                &["deadline", "commitment", "contract", "promised"],
            ),
            KeywordCategory::new(
                "regulatory",
                &["compliance", "regulatory", "gdpr", "audit", "legal"],
            ),
        ],
    }
}

fn default_risk_reduction() -> DimensionTable {
    DimensionTable {
        base: 20.0,
        increment: 10.0,
        categories: vec![
            KeywordCategory::new(
                "security",
                &["security", "vulnerability", "auth", "encryption"],
            ),
            KeywordCategory::new(
                "operational",
                &["monitoring", "reliability", "outage", "backup", "scalability"],
            ),
            KeywordCategory::new(
                "technical",
                &["architecture", "infrastructure", "migration", "upgrade"],
            ),
            KeywordCategory::new("business", &["risk", "fraud", "churn"]),
        ],
    }
}

fn default_complexity() -> ScaleTable {
    ScaleTable::new(&[
        "complex",
        "algorithm",
        "distributed",
        "migration",
        "concurrency",
        "refactor",
    ])
}

fn default_uncertainty() -> ScaleTable {
    ScaleTable::new(&[
        "unknown",
        "research",
        "spike",
        "investigate",
        "prototype",
        "unclear",
    ])
}

fn default_dependency_mentions() -> Vec<String> {
    [
        "depends on",
        "dependency",
        "blocked by",
        "requires",
        "integration",
        "prerequisite",
    ]
    .iter()
    .map(|k| k.to_string())
    .collect()
}

impl Default for ScoringTables {
    fn default() -> Self {
        Self {
            business_value: default_business_value(),
            time_criticality: default_time_criticality(),
            risk_reduction: default_risk_reduction(),
            complexity: default_complexity(),
            uncertainty: default_uncertainty(),
            dependency_mentions: default_dependency_mentions(),
        }
    }
}

impl ScoringTables {
    pub fn dependency_mention_count(&self, text: &str) -> usize {
        count_matches(&self.dependency_mentions, text)
    }

    /// `(label, table)` pairs for the three numerator dimensions.
    pub fn dimensions(&self) -> [(&'static str, &DimensionTable); 3] {
        [
            ("businessValue", &self.business_value),
            ("timeCriticality", &self.time_criticality),
            ("riskReduction", &self.risk_reduction),
        ]
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

fn contains_keyword(text: &str, keyword: &str) -> bool {
    let keyword = keyword.trim();
    !keyword.is_empty() && text.contains(&keyword.to_lowercase())
}

fn count_matches(keywords: &[String], text: &str) -> usize {
    keywords.iter().filter(|k| contains_keyword(text, k)).count()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_base_when_nothing_matches() {
        let tables = ScoringTables::default();
        assert_eq!(tables.business_value.score("rename a column"), 30.0);
    }

    #[test]
    fn dimension_adds_increment_per_keyword() {
        let tables = ScoringTables::default();
        // "user" and "revenue" match, "customer" does not
        let score = tables.business_value.score("user checkout lifts revenue");
        assert_eq!(score, 50.0);
    }

    #[test]
    fn repeated_keyword_counts_once() {
        let tables = ScoringTables::default();
        let score = tables.business_value.score("user user user");
        assert_eq!(score, 40.0);
    }

    #[test]
    fn dimension_caps_at_100() {
        let table = DimensionTable {
            base: 90.0,
            increment: 50.0,
            categories: vec![KeywordCategory::new("x", &["a", "b"])],
        };
        assert_eq!(table.score("a b"), 100.0);
    }

    #[test]
    fn category_weight_scales_increment() {
        let mut cat = KeywordCategory::new("regulatory", &["gdpr"]);
        cat.weight = 2.0;
        let table = DimensionTable {
            base: 0.0,
            increment: 10.0,
            categories: vec![cat],
        };
        assert_eq!(table.score("gdpr export"), 20.0);
    }

    #[test]
    fn keywords_match_case_insensitively() {
        let table = DimensionTable {
            base: 0.0,
            increment: 5.0,
            categories: vec![KeywordCategory::new("x", &["GDPR"])],
        };
        assert_eq!(table.score("gdpr data export"), 5.0);
        assert_eq!(table.matched("gdpr data export"), vec!["GDPR"]);
    }

    #[test]
    fn scale_is_clamped_to_five() {
        let tables = ScoringTables::default();
        assert_eq!(tables.complexity.level("plain change"), 1);
        assert_eq!(tables.complexity.level("complex algorithm"), 3);
        assert_eq!(
            tables
                .complexity
                .level("complex distributed concurrency algorithm migration refactor"),
            5
        );
    }

    #[test]
    fn dependency_mentions_are_distinct_keywords() {
        let tables = ScoringTables::default();
        assert_eq!(tables.dependency_mention_count("nothing here"), 0);
        assert_eq!(
            tables.dependency_mention_count("depends on billing; requires sso; requires vpn"),
            2
        );
    }

    #[test]
    fn tables_yaml_partial_override() {
        let yaml = "dependencyMentions: [\"waits for\"]\n";
        let tables: ScoringTables = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(tables.dependency_mentions, vec!["waits for"]);
        assert_eq!(tables.business_value, default_business_value());
    }
}
