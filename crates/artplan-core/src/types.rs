use crate::error::PlanError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// WorkItemType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemType {
    Story,
    Enabler,
    Feature,
    Epic,
}

impl WorkItemType {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkItemType::Story => "story",
            WorkItemType::Enabler => "enabler",
            WorkItemType::Feature => "feature",
            WorkItemType::Epic => "epic",
        }
    }
}

impl fmt::Display for WorkItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkItemType {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "story" => Ok(WorkItemType::Story),
            "enabler" => Ok(WorkItemType::Enabler),
            "feature" => Ok(WorkItemType::Feature),
            "epic" => Ok(WorkItemType::Epic),
            _ => Err(PlanError::UnknownVariant {
                kind: "work item type",
                value: s.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// EnablerType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnablerType {
    Infrastructure,
    Architecture,
    Exploration,
    Compliance,
}

impl EnablerType {
    pub fn as_str(self) -> &'static str {
        match self {
            EnablerType::Infrastructure => "infrastructure",
            EnablerType::Architecture => "architecture",
            EnablerType::Exploration => "exploration",
            EnablerType::Compliance => "compliance",
        }
    }
}

impl fmt::Display for EnablerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// DependencyType / DependencyStrength
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DependencyType {
    Requires,
    Blocks,
    Enables,
    Related,
    Duplicates,
}

impl DependencyType {
    pub fn as_str(self) -> &'static str {
        match self {
            DependencyType::Requires => "REQUIRES",
            DependencyType::Blocks => "BLOCKS",
            DependencyType::Enables => "ENABLES",
            DependencyType::Related => "RELATED",
            DependencyType::Duplicates => "DUPLICATES",
        }
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only `Hard` edges constrain ordering and the critical path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DependencyStrength {
    Hard,
    Soft,
}

impl DependencyStrength {
    pub fn as_str(self) -> &'static str {
        match self {
            DependencyStrength::Hard => "HARD",
            DependencyStrength::Soft => "SOFT",
        }
    }
}

impl fmt::Display for DependencyStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DependencyStrength {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HARD" => Ok(DependencyStrength::Hard),
            "SOFT" => Ok(DependencyStrength::Soft),
            _ => Err(PlanError::UnknownVariant {
                kind: "dependency strength",
                value: s.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Ordinal priority tier. Ordering is ascending urgency (`Low < Urgent`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn all() -> &'static [Priority] {
        &[
            Priority::Urgent,
            Priority::High,
            Priority::Medium,
            Priority::Low,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Urgent => "URGENT",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOW" => Ok(Priority::Low),
            "MEDIUM" => Ok(Priority::Medium),
            "HIGH" => Ok(Priority::High),
            "URGENT" => Ok(Priority::Urgent),
            _ => Err(PlanError::UnknownVariant {
                kind: "priority",
                value: s.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// PiStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiStatus {
    #[default]
    Planning,
    Active,
    Completed,
    Cancelled,
}

impl fmt::Display for PiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PiStatus::Planning => "planning",
            PiStatus::Active => "active",
            PiStatus::Completed => "completed",
            PiStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
