//! Weighted Shortest Job First scoring.
//!
//! Each story gets three value sub-scores and a job size from the keyword
//! tables in [`crate::keywords`], then
//! `wsjf = (bv*w_bv + tc*w_tc + rr*w_rr) / jobSize`, or 0 when the job size is 0.

use crate::config::{PlannerConfig, PriorityThresholds, ScoringConfig};
use crate::model::PlanningWorkItem;
use crate::types::Priority;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;

const COMPLEXITY_STEP: f64 = 0.2;
const UNCERTAINTY_STEP: f64 = 0.2;
const DEPENDENCY_MENTION_WEIGHT: f64 = 0.5;

// ---------------------------------------------------------------------------
// ScoredStory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredStory {
    #[serde(flatten)]
    pub story: PlanningWorkItem,
    pub business_value: f64,
    pub time_criticality: f64,
    pub risk_reduction: f64,
    pub job_size: f64,
    /// 1–5 heuristics feeding the job size.
    pub complexity: u8,
    pub uncertainty: u8,
    pub dependency_mentions: usize,
    pub wsjf_score: f64,
    /// WSJF relative to the urgent threshold, 0–100.
    pub priority_score: f64,
    pub recommended_priority: Priority,
    pub scoring_version: String,
}

// ---------------------------------------------------------------------------
// ScoringError
// ---------------------------------------------------------------------------

/// A single story that could not be scored. Collected, never fatal to a batch.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("failed to score story '{story_id}' (position {index}): {message}")]
pub struct ScoringError {
    pub story_id: String,
    pub index: usize,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Batch outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityUpdate {
    pub story_id: String,
    pub title: String,
    pub current_priority: Option<Priority>,
    pub recommended_priority: Priority,
    pub wsjf_score: f64,
    pub rationale: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    QuickWin,
    SplitCandidate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationRecommendation {
    pub kind: RecommendationKind,
    pub story_id: String,
    pub wsjf_score: f64,
    pub job_size: f64,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityDistribution {
    pub urgent: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl PriorityDistribution {
    fn record(&mut self, priority: Priority) {
        match priority {
            Priority::Urgent => self.urgent += 1,
            Priority::High => self.high += 1,
            Priority::Medium => self.medium += 1,
            Priority::Low => self.low += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringSummary {
    pub total_stories: usize,
    pub scored_stories: usize,
    pub failed_stories: usize,
    pub average_wsjf: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_story_id: Option<String>,
    pub priority_distribution: PriorityDistribution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringResult {
    /// Sorted by `wsjfScore` descending; ties keep input order.
    pub scored_stories: Vec<ScoredStory>,
    pub priority_updates: Vec<PriorityUpdate>,
    pub recommendations: Vec<OptimizationRecommendation>,
    pub summary: ScoringSummary,
    pub processing_time_ms: u64,
    pub errors: Vec<ScoringError>,
}

impl ScoringResult {
    pub fn score_of(&self, story_id: &str) -> Option<f64> {
        self.scored_stories
            .iter()
            .find(|s| s.story.id == story_id)
            .map(|s| s.wsjf_score)
    }
}

// ---------------------------------------------------------------------------
// WsjfScorer
// ---------------------------------------------------------------------------

pub struct WsjfScorer<'a> {
    config: &'a ScoringConfig,
}

impl<'a> WsjfScorer<'a> {
    pub fn new(config: &'a ScoringConfig) -> Self {
        Self { config }
    }

    /// Score one story. `index` only labels the error.
    fn score_at(&self, index: usize, story: &PlanningWorkItem) -> Result<ScoredStory, ScoringError> {
        self.check(story).map_err(|message| ScoringError {
            story_id: story.id.clone(),
            index,
            message,
        })?;

        let tables = &self.config.keywords;
        let weights = &self.config.weights;
        let text = story.search_text();

        let business_value = tables.business_value.score(&text);
        let time_criticality = tables.time_criticality.score(&text);
        let risk_reduction = tables.risk_reduction.score(&text);

        let complexity = tables.complexity.level(&text);
        let uncertainty = tables.uncertainty.level(&text);
        let dependency_mentions = tables.dependency_mention_count(&text);

        let scale = 1.0
            + COMPLEXITY_STEP * f64::from(complexity - 1)
            + UNCERTAINTY_STEP * f64::from(uncertainty - 1);
        let job_size = f64::from(story.points()) * scale
            + DEPENDENCY_MENTION_WEIGHT * dependency_mentions as f64;

        let numerator = business_value * weights.business_value
            + time_criticality * weights.time_criticality
            + risk_reduction * weights.risk_reduction;
        let wsjf_score = if job_size > 0.0 {
            numerator / job_size
        } else {
            0.0
        };
        if !wsjf_score.is_finite() {
            return Err(ScoringError {
                story_id: story.id.clone(),
                index,
                message: format!("WSJF score is not finite (numerator {numerator})"),
            });
        }

        let thresholds = &self.config.thresholds;
        let priority_score = if thresholds.urgent > 0.0 {
            (wsjf_score / thresholds.urgent * 100.0).clamp(0.0, 100.0)
        } else {
            100.0
        };

        Ok(ScoredStory {
            story: story.clone(),
            business_value,
            time_criticality,
            risk_reduction,
            job_size,
            complexity,
            uncertainty,
            dependency_mentions,
            wsjf_score,
            priority_score,
            recommended_priority: priority_for(wsjf_score, thresholds),
            scoring_version: self.config.scoring_version.clone(),
        })
    }

    pub fn score_story(&self, story: &PlanningWorkItem) -> Result<ScoredStory, ScoringError> {
        self.score_at(0, story)
    }

    /// Score a batch. Stories are scored in parallel; one bad story only adds
    /// an entry to `errors`. Ordering happens after every score exists.
    pub fn score_stories(&self, stories: &[PlanningWorkItem]) -> ScoringResult {
        let started = Instant::now();

        let outcomes: Vec<Result<ScoredStory, ScoringError>> = stories
            .par_iter()
            .enumerate()
            .map(|(i, story)| self.score_at(i, story))
            .collect();

        let mut scored = Vec::with_capacity(outcomes.len());
        let mut errors = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(s) => scored.push(s),
                Err(e) => {
                    tracing::warn!(story = %e.story_id, error = %e.message, "story scoring failed");
                    errors.push(e);
                }
            }
        }

        // stable: equal scores keep input order
        scored.sort_by(|a, b| b.wsjf_score.total_cmp(&a.wsjf_score));

        let priority_updates = self.priority_updates(&scored);
        let recommendations = self.recommendations(&scored);
        let summary = summarize(stories.len(), &scored, errors.len());

        tracing::debug!(
            scored = scored.len(),
            failed = errors.len(),
            "story batch scored"
        );

        ScoringResult {
            scored_stories: scored,
            priority_updates,
            recommendations,
            summary,
            processing_time_ms: started.elapsed().as_millis() as u64,
            errors,
        }
    }

    fn check(&self, story: &PlanningWorkItem) -> Result<(), String> {
        if story.id.trim().is_empty() {
            return Err("story id is empty".to_string());
        }
        if story.title.trim().is_empty() {
            return Err("story title is empty".to_string());
        }
        if story.points() > self.config.max_story_points {
            return Err(format!(
                "{} story points exceed the maximum of {}",
                story.points(),
                self.config.max_story_points
            ));
        }
        Ok(())
    }

    fn priority_updates(&self, scored: &[ScoredStory]) -> Vec<PriorityUpdate> {
        scored
            .iter()
            .filter(|s| s.story.priority != Some(s.recommended_priority))
            .map(|s| {
                let current = s
                    .story
                    .priority
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "unset".to_string());
                let text = s.story.search_text();
                let matched: Vec<&str> = self
                    .config
                    .keywords
                    .dimensions()
                    .into_iter()
                    .flat_map(|(_, table)| table.matched(&text))
                    .collect();
                let signals = if matched.is_empty() {
                    String::new()
                } else {
                    format!("; signals: {}", matched.join(", "))
                };
                PriorityUpdate {
                    story_id: s.story.id.clone(),
                    title: s.story.title.clone(),
                    current_priority: s.story.priority,
                    recommended_priority: s.recommended_priority,
                    wsjf_score: s.wsjf_score,
                    rationale: format!(
                        "WSJF {:.2} (business value {:.0}, time criticality {:.0}, risk reduction {:.0}, job size {:.1}) maps to {} instead of {current}{signals}",
                        s.wsjf_score,
                        s.business_value,
                        s.time_criticality,
                        s.risk_reduction,
                        s.job_size,
                        s.recommended_priority,
                    ),
                }
            })
            .collect()
    }

    fn recommendations(&self, scored: &[ScoredStory]) -> Vec<OptimizationRecommendation> {
        let limits = &self.config.recommendations;
        let mut out = Vec::new();

        for s in scored {
            if s.wsjf_score > limits.quick_win_min_wsjf && s.job_size <= limits.quick_win_max_job_size {
                out.push(OptimizationRecommendation {
                    kind: RecommendationKind::QuickWin,
                    story_id: s.story.id.clone(),
                    wsjf_score: s.wsjf_score,
                    job_size: s.job_size,
                    message: format!(
                        "'{}' is a quick win: high value for a job size of {:.1}; pull it forward",
                        s.story.title, s.job_size
                    ),
                });
            }
        }
        for s in scored {
            if s.wsjf_score > limits.split_min_wsjf && s.job_size > limits.split_min_job_size {
                out.push(OptimizationRecommendation {
                    kind: RecommendationKind::SplitCandidate,
                    story_id: s.story.id.clone(),
                    wsjf_score: s.wsjf_score,
                    job_size: s.job_size,
                    message: format!(
                        "'{}' carries high value but a job size of {:.1}; split it to deliver sooner",
                        s.story.title, s.job_size
                    ),
                });
            }
        }
        out
    }
}

/// Map a WSJF score to its tier. Thresholds are inclusive lower bounds.
pub fn priority_for(wsjf_score: f64, thresholds: &PriorityThresholds) -> Priority {
    if wsjf_score >= thresholds.urgent {
        Priority::Urgent
    } else if wsjf_score >= thresholds.high {
        Priority::High
    } else if wsjf_score >= thresholds.medium {
        Priority::Medium
    } else {
        Priority::Low
    }
}

fn summarize(total: usize, scored: &[ScoredStory], failed: usize) -> ScoringSummary {
    let mut distribution = PriorityDistribution::default();
    for s in scored {
        distribution.record(s.recommended_priority);
    }
    let average_wsjf = if scored.is_empty() {
        0.0
    } else {
        scored.iter().map(|s| s.wsjf_score).sum::<f64>() / scored.len() as f64
    };
    ScoringSummary {
        total_stories: total,
        scored_stories: scored.len(),
        failed_stories: failed,
        average_wsjf,
        top_story_id: scored.first().map(|s| s.story.id.clone()),
        priority_distribution: distribution,
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

pub fn score_story(
    story: &PlanningWorkItem,
    config: &PlannerConfig,
) -> Result<ScoredStory, ScoringError> {
    WsjfScorer::new(&config.scoring).score_story(story)
}

pub fn score_stories(stories: &[PlanningWorkItem], config: &PlannerConfig) -> ScoringResult {
    WsjfScorer::new(&config.scoring).score_stories(stories)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
