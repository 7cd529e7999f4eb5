//! The planner's output document.

use crate::config::PlannerConfig;
use crate::graph::DependencyGraph;
use crate::iteration::Iteration;
use crate::model::{PlanningWorkItem, ProgramIncrement};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PlannedWorkItem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedWorkItem {
    #[serde(flatten)]
    pub item: PlanningWorkItem,
    /// Index of the iteration holding the item. Unplanned items sit on the last one.
    pub iteration: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_team: Option<String>,
    pub wsjf_score: f64,
    pub unplanned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

// ---------------------------------------------------------------------------
// Readiness
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockerKind {
    CircularDependency,
    UnplannedItem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blocker {
    pub kind: BlockerKind,
    pub item_ids: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtReadiness {
    /// Weighted mean of the three ratios below, 0–1.
    pub readiness_score: f64,
    pub dependency_integrity: f64,
    pub capacity_balance: f64,
    pub value_delivery_confidence: f64,
    pub critical_blockers: Vec<Blocker>,
    pub recommendations: Vec<String>,
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanMetrics {
    pub planning_confidence: f64,
    pub percent_planned: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub total_items: usize,
    /// Includes zero-point and unplanned items.
    pub total_story_points: u64,
    pub planned_items: usize,
    pub unplanned_items: usize,
    pub planned_story_points: u64,
    pub average_capacity_utilization: f64,
    pub value_delivery_confidence: f64,
    pub metrics: PlanMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanMetadata {
    pub scoring_version: String,
    /// Effective configuration, so a plan can be reproduced.
    pub configuration: PlannerConfig,
}

// ---------------------------------------------------------------------------
// ArtPlan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtPlan {
    pub program_increment: ProgramIncrement,
    pub iterations: Vec<Iteration>,
    /// In allocation order.
    pub work_items: Vec<PlannedWorkItem>,
    pub dependencies: DependencyGraph,
    pub art_readiness: ArtReadiness,
    pub summary: PlanSummary,
    pub metadata: PlanMetadata,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ArtPlan {
    pub fn item(&self, id: &str) -> Option<&PlannedWorkItem> {
        self.work_items.iter().find(|w| w.item.id == id)
    }

    /// Iteration index of a planned item; `None` when unknown or unplanned.
    pub fn iteration_of(&self, id: &str) -> Option<usize> {
        self.item(id)
            .filter(|w| !w.unplanned)
            .map(|w| w.iteration)
    }

    pub fn unplanned(&self) -> impl Iterator<Item = &PlannedWorkItem> {
        self.work_items.iter().filter(|w| w.unplanned)
    }
}
