use crate::error::{PlanError, Result};
use crate::keywords::ScoringTables;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// IterationConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationConfig {
    /// Iteration length in calendar days.
    #[serde(default = "default_iteration_length")]
    pub default_iteration_length: u32,
}

fn default_iteration_length() -> u32 {
    14
}

impl Default for IterationConfig {
    fn default() -> Self {
        Self {
            default_iteration_length: default_iteration_length(),
        }
    }
}

// ---------------------------------------------------------------------------
// CapacityConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityConfig {
    /// Fraction of velocity held back for unplanned work when building iterations.
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: f64,
    /// Ceiling on allocated points as a fraction of available capacity.
    #[serde(default = "default_max_capacity_utilization")]
    pub max_capacity_utilization: f64,
    /// Utilization the capacity-balance readiness factor aims for.
    #[serde(default = "default_target_utilization")]
    pub target_utilization: f64,
}

fn default_buffer_capacity() -> f64 {
    0.2
}

fn default_max_capacity_utilization() -> f64 {
    0.85
}

fn default_target_utilization() -> f64 {
    0.75
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: default_buffer_capacity(),
            max_capacity_utilization: default_max_capacity_utilization(),
            target_utilization: default_target_utilization(),
        }
    }
}

// ---------------------------------------------------------------------------
// WsjfWeights / PriorityThresholds / RecommendationThresholds
// ---------------------------------------------------------------------------

/// Numerator weights. Their sum is not enforced; `validate` only warns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsjfWeights {
    #[serde(default = "default_business_value_weight")]
    pub business_value: f64,
    #[serde(default = "default_time_criticality_weight")]
    pub time_criticality: f64,
    #[serde(default = "default_risk_reduction_weight")]
    pub risk_reduction: f64,
}

fn default_business_value_weight() -> f64 {
    0.35
}

fn default_time_criticality_weight() -> f64 {
    0.25
}

fn default_risk_reduction_weight() -> f64 {
    0.25
}

impl Default for WsjfWeights {
    fn default() -> Self {
        Self {
            business_value: default_business_value_weight(),
            time_criticality: default_time_criticality_weight(),
            risk_reduction: default_risk_reduction_weight(),
        }
    }
}

impl WsjfWeights {
    pub fn sum(&self) -> f64 {
        self.business_value + self.time_criticality + self.risk_reduction
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityThresholds {
    #[serde(default = "default_urgent")]
    pub urgent: f64,
    #[serde(default = "default_high")]
    pub high: f64,
    #[serde(default = "default_medium")]
    pub medium: f64,
}

fn default_urgent() -> f64 {
    8.0
}

fn default_high() -> f64 {
    5.0
}

fn default_medium() -> f64 {
    2.0
}

impl Default for PriorityThresholds {
    fn default() -> Self {
        Self {
            urgent: default_urgent(),
            high: default_high(),
            medium: default_medium(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationThresholds {
    #[serde(default = "default_quick_win_min_wsjf")]
    pub quick_win_min_wsjf: f64,
    #[serde(default = "default_quick_win_max_job_size")]
    pub quick_win_max_job_size: f64,
    #[serde(default = "default_split_min_wsjf")]
    pub split_min_wsjf: f64,
    #[serde(default = "default_split_min_job_size")]
    pub split_min_job_size: f64,
}

fn default_quick_win_min_wsjf() -> f64 {
    6.0
}

fn default_quick_win_max_job_size() -> f64 {
    3.0
}

fn default_split_min_wsjf() -> f64 {
    5.0
}

fn default_split_min_job_size() -> f64 {
    8.0
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            quick_win_min_wsjf: default_quick_win_min_wsjf(),
            quick_win_max_job_size: default_quick_win_max_job_size(),
            split_min_wsjf: default_split_min_wsjf(),
            split_min_job_size: default_split_min_job_size(),
        }
    }
}

// ---------------------------------------------------------------------------
// ScoringConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringConfig {
    /// Tag stamped on every scored story.
    #[serde(default = "default_scoring_version")]
    pub scoring_version: String,
    #[serde(default)]
    pub weights: WsjfWeights,
    #[serde(default)]
    pub thresholds: PriorityThresholds,
    #[serde(default)]
    pub recommendations: RecommendationThresholds,
    /// Estimates above this are rejected as malformed.
    #[serde(default = "default_max_story_points")]
    pub max_story_points: u32,
    #[serde(default)]
    pub keywords: ScoringTables,
}

fn default_scoring_version() -> String {
    "wsjf-1.0".to_string()
}

fn default_max_story_points() -> u32 {
    100
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            scoring_version: default_scoring_version(),
            weights: WsjfWeights::default(),
            thresholds: PriorityThresholds::default(),
            recommendations: RecommendationThresholds::default(),
            max_story_points: default_max_story_points(),
            keywords: ScoringTables::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// ReadinessWeights
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessWeights {
    #[serde(default = "default_third")]
    pub dependency_integrity: f64,
    #[serde(default = "default_third")]
    pub capacity_balance: f64,
    #[serde(default = "default_third")]
    pub value_delivery: f64,
}

fn default_third() -> f64 {
    1.0 / 3.0
}

impl Default for ReadinessWeights {
    fn default() -> Self {
        Self {
            dependency_integrity: default_third(),
            capacity_balance: default_third(),
            value_delivery: default_third(),
        }
    }
}

impl ReadinessWeights {
    /// Weighted mean of the three factors. All-zero weights fall back to equal thirds.
    pub fn combine(&self, dependency: f64, capacity: f64, value: f64) -> f64 {
        let total = self.dependency_integrity + self.capacity_balance + self.value_delivery;
        if total <= 0.0 || !total.is_finite() {
            return (dependency + capacity + value) / 3.0;
        }
        (self.dependency_integrity * dependency
            + self.capacity_balance * capacity
            + self.value_delivery * value)
            / total
    }
}

// ---------------------------------------------------------------------------
// GraphConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphConfig {
    /// Items whose in+out HARD edge count exceeds this are flagged.
    #[serde(default = "default_high_dependency_threshold")]
    pub high_dependency_threshold: usize,
    /// HARD edges below this confidence draw a warning.
    #[serde(default = "default_low_confidence_threshold")]
    pub low_confidence_threshold: f64,
}

fn default_high_dependency_threshold() -> usize {
    3
}

fn default_low_confidence_threshold() -> f64 {
    0.5
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            high_dependency_threshold: default_high_dependency_threshold(),
            low_confidence_threshold: default_low_confidence_threshold(),
        }
    }
}

// ---------------------------------------------------------------------------
// PlannerConfig (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerConfig {
    #[serde(default)]
    pub iteration: IterationConfig,
    #[serde(default)]
    pub capacity: CapacityConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub readiness: ReadinessWeights,
    #[serde(default)]
    pub graph: GraphConfig,
}

impl PlannerConfig {
    /// Read a YAML (or JSON) config file. Absent keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let cfg: PlannerConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn from_yaml_str(data: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(data)?)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut error = |message: String| {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message,
            })
        };

        // 1. Iteration structure
        if self.iteration.default_iteration_length == 0 {
            error("iteration.defaultIterationLength must be at least 1 day".to_string());
        }

        // 2. Capacity ratios
        let cap = &self.capacity;
        if !(0.0..1.0).contains(&cap.buffer_capacity) {
            error(format!(
                "capacity.bufferCapacity={} must be in [0, 1)",
                cap.buffer_capacity
            ));
        }
        if !(cap.max_capacity_utilization > 0.0 && cap.max_capacity_utilization <= 1.0) {
            error(format!(
                "capacity.maxCapacityUtilization={} must be in (0, 1]",
                cap.max_capacity_utilization
            ));
        }
        if !(cap.target_utilization > 0.0 && cap.target_utilization <= 1.0) {
            error(format!(
                "capacity.targetUtilization={} must be in (0, 1]",
                cap.target_utilization
            ));
        }

        // 3. Scoring numerics
        let weights = &self.scoring.weights;
        for (name, w) in [
            ("businessValue", weights.business_value),
            ("timeCriticality", weights.time_criticality),
            ("riskReduction", weights.risk_reduction),
        ] {
            if !w.is_finite() || w < 0.0 {
                error(format!("scoring.weights.{name}={w} must be a non-negative number"));
            }
        }
        for (name, table) in self.scoring.keywords.dimensions() {
            if !table.base.is_finite() || !table.increment.is_finite() || table.increment < 0.0 {
                error(format!(
                    "scoring.keywords.{name} needs a finite base and a non-negative increment"
                ));
            }
        }
        let readiness = &self.readiness;
        for (name, w) in [
            ("dependencyIntegrity", readiness.dependency_integrity),
            ("capacityBalance", readiness.capacity_balance),
            ("valueDelivery", readiness.value_delivery),
        ] {
            if !w.is_finite() || w < 0.0 {
                error(format!("readiness.{name}={w} must be a non-negative number"));
            }
        }

        // 4. Soft checks
        let mut warn = |message: String| {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message,
            })
        };
        if weights.sum() > 1.0 + f64::EPSILON {
            warn(format!(
                "scoring.weights sum to {:.2} (>1.0); WSJF scores will be inflated",
                weights.sum()
            ));
        }
        let t = &self.scoring.thresholds;
        if !(t.urgent >= t.high && t.high >= t.medium) {
            warn(format!(
                "priority thresholds are not descending (urgent={}, high={}, medium={})",
                t.urgent, t.high, t.medium
            ));
        }
        if readiness.dependency_integrity + readiness.capacity_balance + readiness.value_delivery
            == 0.0
        {
            warn("readiness weights are all zero; equal thirds will be used".to_string());
        }
        for (name, table) in self.scoring.keywords.dimensions() {
            if table.keyword_count() == 0 {
                warn(format!(
                    "scoring.keywords.{name} has no keywords; every story gets the base score"
                ));
            }
        }

        warnings
    }

    /// Fail with `InvalidConfig` when `validate` reports any error-level finding.
    pub fn ensure_valid(&self) -> Result<()> {
        let errors: Vec<String> = self
            .validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message)
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(PlanError::InvalidConfig(errors.join("; ")))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
