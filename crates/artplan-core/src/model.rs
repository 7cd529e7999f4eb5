//! Caller-owned planning inputs: work items, teams and the program increment.
//!
//! These types are plain data. The engine borrows them read-only and never
//! mutates them; every output structure is freshly allocated.

use crate::error::{PlanError, Result};
use crate::types::{EnablerType, PiStatus, Priority, WorkItemType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// PlanningWorkItem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningWorkItem {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: WorkItemType,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_points: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Back-reference only; the parent is not owned or resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acceptance_criteria: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabler_type: Option<EnablerType>,
    /// Team expected to deliver the item. `None` lets the allocator choose.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
}

impl PlanningWorkItem {
    pub fn new(id: impl Into<String>, item_type: WorkItemType, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            item_type,
            title: title.into(),
            description: String::new(),
            story_points: None,
            priority: None,
            parent_id: None,
            acceptance_criteria: Vec::new(),
            enabler_type: None,
            team_id: None,
        }
    }

    pub fn story(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(id, WorkItemType::Story, title)
    }

    pub fn enabler(id: impl Into<String>, title: impl Into<String>, kind: EnablerType) -> Self {
        let mut item = Self::new(id, WorkItemType::Enabler, title);
        item.enabler_type = Some(kind);
        item
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_points(mut self, points: u32) -> Self {
        self.story_points = Some(points);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_team(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = Some(team_id.into());
        self
    }

    pub fn with_acceptance_criteria<I, S>(mut self, criteria: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.acceptance_criteria = criteria.into_iter().map(Into::into).collect();
        self
    }

    /// Story points, treating an absent estimate as zero.
    pub fn points(&self) -> u32 {
        self.story_points.unwrap_or(0)
    }

    /// Weight used on the critical path: story points, never less than 1.
    pub fn effort_weight(&self) -> u32 {
        self.points().max(1)
    }

    pub fn has_acceptance_criteria(&self) -> bool {
        self.acceptance_criteria.iter().any(|c| !c.trim().is_empty())
    }

    /// Lower-cased `title + " " + description`, the haystack for keyword scoring.
    pub fn search_text(&self) -> String {
        format!("{} {}", self.title, self.description).to_lowercase()
    }
}

// ---------------------------------------------------------------------------
// ProgramIncrement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramIncrement {
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: PiStatus,
}

impl ProgramIncrement {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            start_date,
            end_date,
            description: String::new(),
            status: PiStatus::Planning,
        }
    }

    /// A PI needs an id and must end strictly after it starts.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(PlanError::MissingInput("program increment id".to_string()));
        }
        if self.end_date <= self.start_date {
            return Err(PlanError::InvalidProgramIncrement {
                id: self.id.clone(),
                reason: format!(
                    "end date {} is not after start date {}",
                    self.end_date, self.start_date
                ),
            });
        }
        Ok(())
    }

    /// Calendar days covered by the PI, both endpoints included.
    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

// ---------------------------------------------------------------------------
// ArtTeam
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtTeam {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub member_count: u32,
    /// Story points per iteration. Missing data means no usable capacity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_velocity: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub specializations: BTreeSet<String>,
    #[serde(default = "default_capacity_factor")]
    pub capacity_factor: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

fn default_capacity_factor() -> f64 {
    1.0
}

/// Velocity and capacity factor after sanitizing, plus what was wrong with them.
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityInputs {
    pub velocity: f64,
    pub capacity_factor: f64,
    pub warnings: Vec<String>,
}

impl ArtTeam {
    pub fn new(id: impl Into<String>, name: impl Into<String>, velocity: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            member_count: 0,
            average_velocity: Some(velocity),
            specializations: BTreeSet::new(),
            capacity_factor: default_capacity_factor(),
            timezone: None,
        }
    }

    /// Zero-capacity stand-in for a team the caller referenced but did not describe.
    pub fn placeholder(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            member_count: 0,
            average_velocity: Some(0.0),
            specializations: BTreeSet::new(),
            capacity_factor: 0.0,
            timezone: None,
        }
    }

    pub fn with_capacity_factor(mut self, factor: f64) -> Self {
        self.capacity_factor = factor;
        self
    }

    pub fn with_members(mut self, count: u32) -> Self {
        self.member_count = count;
        self
    }

    pub fn capacity_inputs(&self) -> CapacityInputs {
        let mut warnings = Vec::new();

        let velocity = match self.average_velocity {
            Some(v) if v.is_finite() && v >= 0.0 => v,
            Some(v) => {
                warnings.push(format!(
                    "team '{}' has invalid velocity {v}; treating it as zero capacity",
                    self.name
                ));
                0.0
            }
            None => {
                warnings.push(format!(
                    "team '{}' has no velocity data; treating it as zero capacity",
                    self.name
                ));
                0.0
            }
        };

        let capacity_factor = if !self.capacity_factor.is_finite() {
            warnings.push(format!(
                "team '{}' has non-finite capacity factor; using 0",
                self.name
            ));
            0.0
        } else if !(0.0..=1.0).contains(&self.capacity_factor) {
            let clamped = self.capacity_factor.clamp(0.0, 1.0);
            warnings.push(format!(
                "team '{}' capacity factor {} clamped to {clamped}",
                self.name, self.capacity_factor
            ));
            clamped
        } else {
            self.capacity_factor
        };

        CapacityInputs {
            velocity,
            capacity_factor,
            warnings,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn pi_rejects_end_before_start() {
        let pi = ProgramIncrement::new("pi-1", "PI 1", date(2025, 3, 31), date(2025, 1, 1));
        let err = pi.validate().unwrap_err();
        assert!(matches!(err, PlanError::InvalidProgramIncrement { .. }));
        assert!(err.to_string().contains("pi-1"));
    }

    #[test]
    fn pi_rejects_same_day() {
        let pi = ProgramIncrement::new("pi-1", "PI 1", date(2025, 1, 1), date(2025, 1, 1));
        assert!(pi.validate().is_err());
    }

    #[test]
    fn pi_requires_id() {
        let pi = ProgramIncrement::new(" ", "PI", date(2025, 1, 1), date(2025, 3, 31));
        assert!(matches!(pi.validate(), Err(PlanError::MissingInput(_))));
    }

    #[test]
    fn pi_duration_is_inclusive() {
        let pi = ProgramIncrement::new("pi-1", "PI 1", date(2025, 1, 1), date(2025, 3, 31));
        assert!(pi.validate().is_ok());
        assert_eq!(pi.duration_days(), 90);
    }

    #[test]
    fn work_item_points_default_to_zero() {
        let item = PlanningWorkItem::story("s-1", "Login");
        assert_eq!(item.points(), 0);
        assert_eq!(item.effort_weight(), 1);
        let item = item.with_points(8);
        assert_eq!(item.effort_weight(), 8);
    }

    #[test]
    fn work_item_deserializes_camel_case() {
        let json = r#"{
            "id": "enabler-1",
            "type": "enabler",
            "title": "Provision cluster",
            "storyPoints": 0,
            "enablerType": "infrastructure",
            "acceptanceCriteria": ["cluster reachable"]
        }"#;
        let item: PlanningWorkItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.item_type, WorkItemType::Enabler);
        assert_eq!(item.enabler_type, Some(EnablerType::Infrastructure));
        assert_eq!(item.story_points, Some(0));
        assert!(item.has_acceptance_criteria());
        assert!(item.team_id.is_none());
    }

    #[test]
    fn parent_and_team_serialize_only_when_set() {
        let bare = serde_json::to_value(PlanningWorkItem::story("s-1", "Login")).unwrap();
        assert!(bare.get("parentId").is_none());
        assert!(bare.get("teamId").is_none());

        let item = PlanningWorkItem::story("s-1", "Login")
            .with_parent("feature-7")
            .with_team("backend");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["parentId"], "feature-7");
        assert_eq!(json["teamId"], "backend");
    }

    #[test]
    fn blank_acceptance_criteria_do_not_count() {
        let item = PlanningWorkItem::story("s-1", "x").with_acceptance_criteria(["  "]);
        assert!(!item.has_acceptance_criteria());
    }

    #[test]
    fn search_text_is_lower_case() {
        let item = PlanningWorkItem::story("s-1", "Improve USER Login")
            .with_description("Reduce Churn");
        assert_eq!(item.search_text(), "improve user login reduce churn");
    }

    #[test]
    fn missing_velocity_is_zero_capacity() {
        let mut team = ArtTeam::new("t-1", "Backend", 25.0);
        team.average_velocity = None;
        let inputs = team.capacity_inputs();
        assert_eq!(inputs.velocity, 0.0);
        assert_eq!(inputs.warnings.len(), 1);
        assert!(inputs.warnings[0].contains("no velocity data"));
    }

    #[test]
    fn capacity_factor_is_clamped() {
        let team = ArtTeam::new("t-1", "Backend", 25.0).with_capacity_factor(1.4);
        let inputs = team.capacity_inputs();
        assert_eq!(inputs.capacity_factor, 1.0);
        assert_eq!(inputs.warnings.len(), 1);
    }

    #[test]
    fn team_round_trips_member_count() {
        let team = ArtTeam::new("t-1", "Backend", 25.0).with_members(7);
        let json = serde_json::to_string(&team).unwrap();
        assert!(json.contains("\"memberCount\":7"));
        let back: ArtTeam = serde_json::from_str(&json).unwrap();
        assert_eq!(back, team);
    }

    #[test]
    fn placeholder_has_no_capacity() {
        let team = ArtTeam::placeholder("ghost");
        let inputs = team.capacity_inputs();
        assert_eq!(inputs.velocity * inputs.capacity_factor, 0.0);
        assert!(inputs.warnings.is_empty());
    }
}
