//! Dependency graph data model.
//!
//! Plain records only: nodes are addressed by id, edges by their position in
//! `edges`. Traversal lives in [`crate::analyzer`].

use crate::model::PlanningWorkItem;
use crate::types::{DependencyStrength, DependencyType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DependencyEdge
// ---------------------------------------------------------------------------

/// `source` depends on `target`: the target has to be available first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdge {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    #[serde(rename = "type", default = "default_dependency_type")]
    pub dependency_type: DependencyType,
    #[serde(default = "default_strength")]
    pub strength: DependencyStrength,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_at: Option<DateTime<Utc>>,
}

fn default_dependency_type() -> DependencyType {
    DependencyType::Requires
}

fn default_strength() -> DependencyStrength {
    DependencyStrength::Hard
}

fn default_confidence() -> f64 {
    1.0
}

impl DependencyEdge {
    pub fn new(
        id: impl Into<String>,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        strength: DependencyStrength,
    ) -> Self {
        Self {
            id: id.into(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            dependency_type: default_dependency_type(),
            strength,
            confidence: default_confidence(),
            rationale: String::new(),
            detected_at: None,
        }
    }

    pub fn hard(
        id: impl Into<String>,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        Self::new(id, source_id, target_id, DependencyStrength::Hard)
    }

    pub fn soft(
        id: impl Into<String>,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        let mut edge = Self::new(id, source_id, target_id, DependencyStrength::Soft);
        edge.dependency_type = DependencyType::Related;
        edge
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    pub fn is_hard(&self) -> bool {
        self.strength == DependencyStrength::Hard
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    DanglingReference,
    SelfReference,
    DuplicateNode,
    DuplicateEdge,
    CircularDependency,
    ConfidenceOutOfRange,
    LowConfidence,
    HighDependencyItem,
    SoftDependencies,
    IndependentItems,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub code: IssueCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item_ids: Vec<String>,
}

impl ValidationIssue {
    pub fn new(code: IssueCode, message: impl Into<String>, item_ids: Vec<String>) -> Self {
        Self {
            code,
            message: message.into(),
            item_ids,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphValidation {
    pub is_valid: bool,
    #[serde(default)]
    pub errors: Vec<ValidationIssue>,
    #[serde(default)]
    pub warnings: Vec<ValidationIssue>,
    #[serde(default)]
    pub info: Vec<ValidationIssue>,
}

impl Default for GraphValidation {
    fn default() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            info: Vec::new(),
        }
    }
}

impl GraphValidation {
    pub fn issues_with(&self, code: IssueCode) -> impl Iterator<Item = &ValidationIssue> {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .chain(self.info.iter())
            .filter(move |i| i.code == code)
    }
}

// ---------------------------------------------------------------------------
// GraphStatistics
// ---------------------------------------------------------------------------

/// Derived from the graph; never set independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStatistics {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub hard_dependencies: usize,
    pub soft_dependencies: usize,
    pub average_dependencies: f64,
    pub independent_items: usize,
    #[serde(default)]
    pub high_dependency_items: Vec<String>,
    pub longest_path_length: usize,
    /// Cumulative story-point weight along the critical path.
    pub estimated_total_duration: u64,
}

// ---------------------------------------------------------------------------
// DependencyGraph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGraph {
    pub nodes: Vec<PlanningWorkItem>,
    pub edges: Vec<DependencyEdge>,
    #[serde(default)]
    pub critical_path: Vec<String>,
    #[serde(default)]
    pub circular_dependencies: Vec<Vec<String>>,
    #[serde(default)]
    pub validation: GraphValidation,
    #[serde(default)]
    pub statistics: GraphStatistics,
    /// Positions in `edges` ignored for ordering (dangling, self, duplicate).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_edges: Vec<usize>,
    /// Positions in `edges` dropped to break circular dependencies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub broken_edges: Vec<usize>,
}

impl DependencyGraph {
    /// An unanalyzed graph; run it through [`crate::analyzer::analyze`] before use.
    pub fn new(nodes: Vec<PlanningWorkItem>, edges: Vec<DependencyEdge>) -> Self {
        Self {
            nodes,
            edges,
            ..Self::default()
        }
    }

    pub fn node(&self, id: &str) -> Option<&PlanningWorkItem> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn has_cycles(&self) -> bool {
        !self.circular_dependencies.is_empty()
    }

    /// HARD edges that passed validation, cycle-breaking edges included.
    pub fn valid_hard_edges(&self) -> impl Iterator<Item = (usize, &DependencyEdge)> {
        self.edges
            .iter()
            .enumerate()
            .filter(move |(i, e)| e.is_hard() && !self.excluded_edges.contains(i))
    }

    /// HARD edges that constrain ordering: valid and not dropped to break a cycle.
    pub fn constraining_edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.valid_hard_edges()
            .filter(move |(i, _)| !self.broken_edges.contains(i))
            .map(|(_, e)| e)
    }

    /// Ids of the items `id` must wait for under the constraining edges.
    pub fn hard_dependencies_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.constraining_edges()
            .filter(move |e| e.source_id == id)
            .map(|e| e.target_id.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
