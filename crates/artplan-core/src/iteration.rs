//! Slicing a program increment into fixed-length iterations with per-team capacity.

use crate::config::PlannerConfig;
use crate::error::{PlanError, Result};
use crate::model::{ArtTeam, ProgramIncrement};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// TeamCapacity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamCapacity {
    pub team_id: String,
    pub team_name: String,
    /// `velocity * capacityFactor * (1 - bufferCapacity)`.
    pub available: f64,
    /// `maxCapacityUtilization * available`; allocation never exceeds it.
    pub ceiling: f64,
    pub used: u64,
    pub utilization: f64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub placeholder: bool,
}

impl TeamCapacity {
    fn new(team: &ArtTeam, velocity: f64, factor: f64, config: &PlannerConfig) -> Self {
        let available = velocity * factor * (1.0 - config.capacity.buffer_capacity);
        Self {
            team_id: team.id.clone(),
            team_name: team.name.clone(),
            available,
            ceiling: available * config.capacity.max_capacity_utilization,
            used: 0,
            utilization: 0.0,
            placeholder: false,
        }
    }

    pub fn headroom(&self) -> f64 {
        self.ceiling - self.used as f64
    }

    pub fn fits(&self, points: u32) -> bool {
        self.used as f64 + f64::from(points) <= self.ceiling
    }

    fn consume(&mut self, points: u32) {
        self.used = self.used.saturating_add(u64::from(points));
        self.utilization = if self.available > 0.0 {
            self.used as f64 / self.available
        } else {
            0.0
        };
    }
}

// ---------------------------------------------------------------------------
// Iteration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Iteration {
    /// Zero-based position within the PI.
    pub index: usize,
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Shorter than the configured length because it was clamped to the PI end.
    pub partial: bool,
    pub work_items: Vec<String>,
    /// Items that fit nowhere. Only ever populated on the final iteration.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unplanned_items: Vec<String>,
    pub team_capacity: Vec<TeamCapacity>,
}

impl Iteration {
    pub fn team(&self, team_id: &str) -> Option<&TeamCapacity> {
        self.team_capacity.iter().find(|t| t.team_id == team_id)
    }

    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    pub(crate) fn assign(&mut self, item_id: &str, team_id: &str, points: u32) {
        if let Some(team) = self.team_capacity.iter_mut().find(|t| t.team_id == team_id) {
            team.consume(points);
        }
        self.work_items.push(item_id.to_string());
    }

    pub(crate) fn add_team(&mut self, capacity: TeamCapacity) {
        self.team_capacity.push(capacity);
    }

    pub fn total_used(&self) -> u64 {
        self.team_capacity.iter().map(|t| t.used).sum()
    }

    pub fn total_available(&self) -> f64 {
        self.team_capacity.iter().map(|t| t.available).sum()
    }
}

/// Iterations plus non-fatal findings about the team data they were built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationSchedule {
    pub iterations: Vec<Iteration>,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// Split `pi` into `ceil(days / length)` contiguous iterations from its start
/// date. The last one ends on the PI end date.
pub fn build_iterations(
    pi: &ProgramIncrement,
    teams: &[ArtTeam],
    config: &PlannerConfig,
) -> Result<IterationSchedule> {
    pi.validate()?;
    let length = config.iteration.default_iteration_length;
    if length == 0 {
        return Err(PlanError::InvalidConfig(
            "iteration.defaultIterationLength must be at least 1 day".to_string(),
        ));
    }

    let (capacities, warnings) = team_capacities(teams, config);

    let days = pi.duration_days() as u64;
    let length = u64::from(length);
    let count = days.div_ceil(length);

    let mut iterations = Vec::with_capacity(count as usize);
    for n in 0..count {
        let start = offset(pi, n * length)?;
        let full_end = offset(pi, n * length + length - 1)?;
        let end = full_end.min(pi.end_date);
        iterations.push(Iteration {
            index: n as usize,
            id: format!("{}-it{}", pi.id, n + 1),
            name: format!("Iteration {}", n + 1),
            start_date: start,
            end_date: end,
            partial: end < full_end,
            work_items: Vec::new(),
            unplanned_items: Vec::new(),
            team_capacity: capacities.clone(),
        });
    }

    tracing::debug!(
        pi = %pi.id,
        iterations = iterations.len(),
        teams = capacities.len(),
        "iterations built"
    );

    Ok(IterationSchedule {
        iterations,
        warnings,
    })
}

fn offset(pi: &ProgramIncrement, days: u64) -> Result<NaiveDate> {
    pi.start_date
        .checked_add_days(Days::new(days))
        .ok_or_else(|| PlanError::InvalidProgramIncrement {
            id: pi.id.clone(),
            reason: format!("date {} + {days} days is out of range", pi.start_date),
        })
}

/// One capacity row per distinct team, in input order.
pub(crate) fn team_capacities(
    teams: &[ArtTeam],
    config: &PlannerConfig,
) -> (Vec<TeamCapacity>, Vec<String>) {
    let mut seen = HashSet::new();
    let mut rows = Vec::with_capacity(teams.len());
    let mut warnings = Vec::new();

    for team in teams {
        if !seen.insert(team.id.as_str()) {
            warnings.push(format!(
                "duplicate team id '{}'; keeping the first definition",
                team.id
            ));
            continue;
        }
        let inputs = team.capacity_inputs();
        warnings.extend(inputs.warnings);
        rows.push(TeamCapacity::new(
            team,
            inputs.velocity,
            inputs.capacity_factor,
            config,
        ));
    }

    for w in &warnings {
        tracing::warn!("{w}");
    }
    (rows, warnings)
}

/// Capacity row for a team referenced by work items but never defined.
pub(crate) fn placeholder_capacity(team_id: &str) -> TeamCapacity {
    let team = ArtTeam::placeholder(team_id);
    TeamCapacity {
        team_id: team.id,
        team_name: team.name,
        available: 0.0,
        ceiling: 0.0,
        used: 0,
        utilization: 0.0,
        placeholder: true,
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

    fn q1() -> ProgramIncrement {
        ProgramIncrement::new("pi-2025-q1", "PI 2025 Q1", date(2025, 1, 1), date(2025, 3, 31))
    }

    fn teams() -> Vec<ArtTeam> {
        vec![
            ArtTeam::new("backend", "Backend Team", 25.0).with_capacity_factor(0.85),
            ArtTeam::new("frontend", "Frontend Team", 20.0).with_capacity_factor(0.8),
        ]
    }

    #[test]
    fn quarter_splits_into_seven_iterations() {
        let schedule = build_iterations(&q1(), &teams(), &PlannerConfig::default()).unwrap();
        let its = &schedule.iterations;

        assert_eq!(its.len(), 7);
        assert_eq!(its[0].start_date, date(2025, 1, 1));
        assert_eq!(its[0].end_date, date(2025, 1, 14));
        assert_eq!(its[6].start_date, date(2025, 3, 26));
        assert_eq!(its[6].end_date, date(2025, 3, 31));
        assert!(its[6].partial);
        assert!(its[..6].iter().all(|i| !i.partial));
        assert_eq!(its[2].name, "Iteration 3");
        assert_eq!(its[2].id, "pi-2025-q1-it3");
    }

    #[test]
    fn iterations_are_contiguous_and_bounded() {
        let pi = q1();
        let schedule = build_iterations(&pi, &[], &PlannerConfig::default()).unwrap();
        for pair in schedule.iterations.windows(2) {
            assert_eq!(pair[0].end_date.succ_opt().unwrap(), pair[1].start_date);
        }
        assert!(schedule.iterations.iter().all(|i| i.end_date <= pi.end_date));
        let covered: i64 = schedule.iterations.iter().map(Iteration::days).sum();
        assert_eq!(covered, pi.duration_days());
    }

    #[test]
    fn exact_multiple_has_no_partial_iteration() {
        let pi = ProgramIncrement::new("pi", "PI", date(2025, 1, 1), date(2025, 1, 28));
        let schedule = build_iterations(&pi, &[], &PlannerConfig::default()).unwrap();
        assert_eq!(schedule.iterations.len(), 2);
        assert!(!schedule.iterations[1].partial);
    }

    #[test]
    fn capacity_applies_factor_and_buffer() {
        let schedule = build_iterations(&q1(), &teams(), &PlannerConfig::default()).unwrap();
        let backend = schedule.iterations[0].team("backend").unwrap();
        // 25 * 0.85 * 0.8
        assert!((backend.available - 17.0).abs() < 1e-9);
        assert!((backend.ceiling - 17.0 * 0.85).abs() < 1e-9);
        let frontend = schedule.iterations[0].team("frontend").unwrap();
        assert!((frontend.available - 12.8).abs() < 1e-9);
        assert!(schedule.warnings.is_empty());
    }

    #[test]
    fn missing_velocity_is_zero_capacity_with_warning() {
        let mut team = ArtTeam::new("data", "Data Team", 0.0);
        team.average_velocity = None;
        let schedule = build_iterations(&q1(), &[team], &PlannerConfig::default()).unwrap();
        assert_eq!(schedule.iterations[0].team("data").unwrap().available, 0.0);
        assert_eq!(schedule.warnings.len(), 1);
        assert!(schedule.warnings[0].contains("no velocity data"));
    }

    #[test]
    fn duplicate_team_keeps_first() {
        let mut ts = teams();
        ts.push(ArtTeam::new("backend", "Shadow Backend", 99.0));
        let schedule = build_iterations(&q1(), &ts, &PlannerConfig::default()).unwrap();
        assert_eq!(schedule.iterations[0].team_capacity.len(), 2);
        assert_eq!(
            schedule.iterations[0].team("backend").unwrap().team_name,
            "Backend Team"
        );
        assert!(schedule.warnings[0].contains("duplicate team id 'backend'"));
    }

    #[test]
    fn malformed_pi_is_fatal() {
        let pi = ProgramIncrement::new("bad", "Bad", date(2025, 3, 1), date(2025, 1, 1));
        let err = build_iterations(&pi, &[], &PlannerConfig::default()).unwrap_err();
        assert!(matches!(err, PlanError::InvalidProgramIncrement { .. }));
    }

    #[test]
    fn zero_length_is_fatal() {
        let mut cfg = PlannerConfig::default();
        cfg.iteration.default_iteration_length = 0;
        let err = build_iterations(&q1(), &[], &cfg).unwrap_err();
        assert!(matches!(err, PlanError::InvalidConfig(_)));
    }

    #[test]
    fn assigning_tracks_utilization() {
        let schedule = build_iterations(&q1(), &teams(), &PlannerConfig::default()).unwrap();
        let mut it = schedule.iterations[0].clone();
        assert!(it.team("backend").unwrap().fits(14));
        assert!(!it.team("backend").unwrap().fits(15));
        it.assign("story-1", "backend", 5);
        let backend = it.team("backend").unwrap();
        assert_eq!(backend.used, 5);
        assert!((backend.utilization - 5.0 / 17.0).abs() < 1e-9);
        assert_eq!(it.work_items, vec!["story-1"]);
    }

    #[test]
    fn placeholder_only_fits_zero_points() {
        let cap = placeholder_capacity("ghost");
        assert!(cap.placeholder);
        assert!(cap.fits(0));
        assert!(!cap.fits(1));
    }
}
