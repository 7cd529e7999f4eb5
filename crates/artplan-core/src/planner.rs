//! PI planning: order work items by hard dependencies and WSJF, then fill
//! iterations greedily under per-team capacity.
//!
//! Precedence is strict. An item lands in an iteration with a higher index
//! than every HARD dependency it has, never the same one.

use crate::analyzer::build_graph;
use crate::config::PlannerConfig;
use crate::error::Result;
use crate::graph::DependencyGraph;
use crate::iteration::{build_iterations, placeholder_capacity, Iteration, TeamCapacity};
use crate::model::{ArtTeam, PlanningWorkItem, ProgramIncrement};
use crate::plan::{
    ArtPlan, ArtReadiness, Blocker, BlockerKind, PlanMetadata, PlanMetrics, PlanSummary,
    PlannedWorkItem,
};
use crate::wsjf::WsjfScorer;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};

/// Team id used when the ART defines no teams at all.
pub const UNASSIGNED_TEAM: &str = "unassigned";

const NEAR_CAPACITY: f64 = 0.95;

/// Recommendation label for items that no team could take.
const ANY_TEAM: &str = "every team";

// ---------------------------------------------------------------------------
// ArtPlanner
// ---------------------------------------------------------------------------

pub struct ArtPlanner<'a> {
    config: &'a PlannerConfig,
}

impl<'a> ArtPlanner<'a> {
    pub fn new(config: &'a PlannerConfig) -> Self {
        Self { config }
    }

    /// Score `work_items` with the configured WSJF tables, then plan.
    pub fn plan(
        &self,
        pi: &ProgramIncrement,
        work_items: &[PlanningWorkItem],
        graph: &DependencyGraph,
        teams: &[ArtTeam],
    ) -> Result<ArtPlan> {
        let scoring = WsjfScorer::new(&self.config.scoring).score_stories(work_items);
        let scores: BTreeMap<String, f64> = scoring
            .scored_stories
            .iter()
            .map(|s| (s.story.id.clone(), s.wsjf_score))
            .collect();
        for err in &scoring.errors {
            tracing::debug!(story = %err.story_id, "unscored item ordered with WSJF 0");
        }
        self.plan_with_scores(pi, work_items, graph, teams, &scores)
    }

    /// Plan with caller-supplied WSJF scores. Items without a score order as 0.
    pub fn plan_with_scores(
        &self,
        pi: &ProgramIncrement,
        work_items: &[PlanningWorkItem],
        graph: &DependencyGraph,
        teams: &[ArtTeam],
        scores: &BTreeMap<String, f64>,
    ) -> Result<ArtPlan> {
        let config = self.config;
        config.ensure_valid()?;
        pi.validate()?;

        let mut warnings = Vec::new();

        // -- 1. Inputs and graph --

        let items = dedupe(work_items, &mut warnings);
        let dependencies = reanalyze(&items, graph, config);

        // -- 2. Order --

        let order = ordered(&items, &dependencies, scores);

        // -- 3. Iterations --

        let schedule = build_iterations(pi, teams, config)?;
        warnings.extend(schedule.warnings);
        let mut iterations = schedule.iterations;
        add_placeholders(&mut iterations, &items, teams, &mut warnings);

        // -- 4. Allocation --

        let allocation = allocate(&items, &order, &dependencies, &mut iterations, scores);
        warnings.extend(allocation.warnings.iter().cloned());

        // -- 5. Readiness --

        let art_readiness = readiness(&items, &dependencies, &iterations, &allocation, config);

        // -- 6. Summary --

        let summary = summarize(&items, &iterations, &allocation, &art_readiness);

        tracing::debug!(
            pi = %pi.id,
            planned = summary.planned_items,
            unplanned = summary.unplanned_items,
            readiness = art_readiness.readiness_score,
            "plan complete"
        );

        Ok(ArtPlan {
            program_increment: pi.clone(),
            iterations,
            work_items: allocation.placed,
            dependencies,
            art_readiness,
            summary,
            metadata: PlanMetadata {
                scoring_version: config.scoring.scoring_version.clone(),
                configuration: config.clone(),
            },
            warnings,
        })
    }
}

/// `PlanART`: the one-call entry point.
pub fn plan_art(
    pi: &ProgramIncrement,
    work_items: &[PlanningWorkItem],
    graph: &DependencyGraph,
    teams: &[ArtTeam],
    config: &PlannerConfig,
) -> Result<ArtPlan> {
    ArtPlanner::new(config).plan(pi, work_items, graph, teams)
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

fn dedupe(work_items: &[PlanningWorkItem], warnings: &mut Vec<String>) -> Vec<PlanningWorkItem> {
    let mut seen = HashSet::new();
    let mut items = Vec::with_capacity(work_items.len());
    for item in work_items {
        if seen.insert(item.id.as_str()) {
            items.push(item.clone());
        } else {
            let msg = format!(
                "duplicate work item id '{}'; keeping the first occurrence",
                item.id
            );
            tracing::warn!("{msg}");
            warnings.push(msg);
        }
    }
    items
}

/// Analyze the work items plus any extra graph nodes against the graph's edges.
/// Work items win over graph nodes with the same id.
fn reanalyze(
    items: &[PlanningWorkItem],
    graph: &DependencyGraph,
    config: &PlannerConfig,
) -> DependencyGraph {
    let ids: HashSet<&str> = items.iter().map(|i| i.id.as_str()).collect();
    let mut nodes = items.to_vec();
    nodes.extend(
        graph
            .nodes
            .iter()
            .filter(|n| !ids.contains(n.id.as_str()))
            .cloned(),
    );
    build_graph(&nodes, &graph.edges, &config.graph)
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Heap entry: highest WSJF first, then earliest input position.
struct Ready {
    score: f64,
    index: usize,
}

impl Ord for Ready {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for Ready {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ready {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ready {}

/// Kahn's algorithm over the constraining HARD edges between work items.
/// Returns positions into `items`.
fn ordered(
    items: &[PlanningWorkItem],
    graph: &DependencyGraph,
    scores: &BTreeMap<String, f64>,
) -> Vec<usize> {
    let position: HashMap<&str, usize> = items
        .iter()
        .enumerate()
        .map(|(i, item)| (item.id.as_str(), i))
        .collect();

    let mut waiting_on = vec![0usize; items.len()];
    let mut unlocks: Vec<Vec<usize>> = vec![Vec::new(); items.len()];
    for edge in graph.constraining_edges() {
        let (Some(&source), Some(&target)) = (
            position.get(edge.source_id.as_str()),
            position.get(edge.target_id.as_str()),
        ) else {
            continue;
        };
        waiting_on[source] += 1;
        unlocks[target].push(source);
    }

    let score = |i: usize| scores.get(&items[i].id).copied().unwrap_or(0.0);

    let mut ready: BinaryHeap<Ready> = waiting_on
        .iter()
        .enumerate()
        .filter(|(_, &n)| n == 0)
        .map(|(index, _)| Ready {
            score: score(index),
            index,
        })
        .collect();

    let mut order = Vec::with_capacity(items.len());
    while let Some(Ready { index, .. }) = ready.pop() {
        order.push(index);
        for &dependent in &unlocks[index] {
            waiting_on[dependent] -= 1;
            if waiting_on[dependent] == 0 {
                ready.push(Ready {
                    score: score(dependent),
                    index: dependent,
                });
            }
        }
    }

    // Constraining edges are acyclic after analysis; anything left over still
    // gets a slot, in input order.
    if order.len() < items.len() {
        let placed: HashSet<usize> = order.iter().copied().collect();
        order.extend((0..items.len()).filter(|i| !placed.contains(i)));
    }
    order
}

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

/// Zero-capacity rows for teams items reference but nobody defined, and the
/// `unassigned` row when the ART has no teams.
fn add_placeholders(
    iterations: &mut [Iteration],
    items: &[PlanningWorkItem],
    teams: &[ArtTeam],
    warnings: &mut Vec<String>,
) {
    let known: HashSet<&str> = teams.iter().map(|t| t.id.as_str()).collect();
    let mut missing: Vec<&str> = Vec::new();

    if teams.is_empty() {
        let msg = format!("no teams defined; using zero-capacity team '{UNASSIGNED_TEAM}'");
        tracing::warn!("{msg}");
        warnings.push(msg);
        missing.push(UNASSIGNED_TEAM);
    }
    for item in items {
        let Some(team_id) = item.team_id.as_deref() else {
            continue;
        };
        if known.contains(team_id) || missing.contains(&team_id) {
            continue;
        }
        let msg = format!(
            "work item '{}' references unknown team '{team_id}'; treating it as zero capacity",
            item.id
        );
        tracing::warn!("{msg}");
        warnings.push(msg);
        missing.push(team_id);
    }

    for team_id in missing {
        for it in iterations.iter_mut() {
            it.add_team(placeholder_capacity(team_id));
        }
    }
}

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shortfall {
    /// A HARD dependency was itself left unplanned.
    Dependency,
    /// Dependencies finish in the final iteration.
    Precedence,
    Capacity,
}

struct Allocation {
    placed: Vec<PlannedWorkItem>,
    iteration_of: HashMap<String, usize>,
    /// Unplanned items that ran out of capacity: team id → (count, points).
    capacity_misses: BTreeMap<String, (usize, u64)>,
    warnings: Vec<String>,
}

fn allocate(
    items: &[PlanningWorkItem],
    order: &[usize],
    graph: &DependencyGraph,
    iterations: &mut [Iteration],
    scores: &BTreeMap<String, f64>,
) -> Allocation {
    let in_plan: HashSet<&str> = items.iter().map(|i| i.id.as_str()).collect();
    let last = iterations.len().saturating_sub(1);

    let mut alloc = Allocation {
        placed: Vec::with_capacity(items.len()),
        iteration_of: HashMap::new(),
        capacity_misses: BTreeMap::new(),
        warnings: Vec::new(),
    };

    for &pos in order {
        let item = &items[pos];
        let points = item.points();
        let wsjf_score = scores.get(&item.id).copied().unwrap_or(0.0);

        let mut earliest = 0usize;
        let mut blocked_by: Option<&str> = None;
        for dep in graph
            .hard_dependencies_of(&item.id)
            .filter(|d| in_plan.contains(d))
        {
            match alloc.iteration_of.get(dep) {
                Some(&i) => earliest = earliest.max(i + 1),
                None => {
                    blocked_by = Some(dep);
                    break;
                }
            }
        }

        let outcome = match blocked_by {
            Some(_) => Err(Shortfall::Dependency),
            None if earliest > last || iterations.is_empty() => Err(Shortfall::Precedence),
            None => place(item, points, earliest, iterations),
        };

        match outcome {
            Ok((index, team_id)) => {
                iterations[index].assign(&item.id, &team_id, points);
                alloc.iteration_of.insert(item.id.clone(), index);
                alloc.placed.push(PlannedWorkItem {
                    item: item.clone(),
                    iteration: index,
                    assigned_team: Some(team_id),
                    wsjf_score,
                    unplanned: false,
                    warning: None,
                });
            }
            Err(shortfall) => {
                let reason = match shortfall {
                    Shortfall::Dependency => format!(
                        "hard dependency '{}' is unplanned",
                        blocked_by.unwrap_or_default()
                    ),
                    Shortfall::Precedence => {
                        "its hard dependencies finish in the final iteration".to_string()
                    }
                    Shortfall::Capacity => format!(
                        "no iteration from {} onward has {points} points of team capacity left",
                        earliest + 1
                    ),
                };
                let msg = format!("work item '{}' left unplanned: {reason}", item.id);
                tracing::warn!("{msg}");
                alloc.warnings.push(msg.clone());

                if shortfall == Shortfall::Capacity {
                    let team = shortfall_team(item, iterations);
                    let entry = alloc.capacity_misses.entry(team).or_insert((0, 0));
                    entry.0 += 1;
                    entry.1 += u64::from(points);
                }

                if let Some(final_iteration) = iterations.last_mut() {
                    final_iteration.unplanned_items.push(item.id.clone());
                }
                alloc.placed.push(PlannedWorkItem {
                    item: item.clone(),
                    iteration: last,
                    assigned_team: item.team_id.clone(),
                    wsjf_score,
                    unplanned: true,
                    warning: Some(msg),
                });
            }
        }
    }

    alloc
}

/// Team an out-of-capacity item is charged to in recommendations.
fn shortfall_team(item: &PlanningWorkItem, iterations: &[Iteration]) -> String {
    if let Some(team_id) = &item.team_id {
        return team_id.clone();
    }
    match iterations.last().map(|it| it.team_capacity.as_slice()) {
        Some([only]) => only.team_id.clone(),
        _ => ANY_TEAM.to_string(),
    }
}

/// Earliest iteration from `earliest` with room for `points`. A fixed team must
/// fit; otherwise the team with the most headroom that fits is taken, earlier
/// teams winning ties.
fn place(
    item: &PlanningWorkItem,
    points: u32,
    earliest: usize,
    iterations: &[Iteration],
) -> std::result::Result<(usize, String), Shortfall> {
    for it in &iterations[earliest..] {
        let chosen = match item.team_id.as_deref() {
            Some(team_id) => it.team(team_id).filter(|t| t.fits(points)),
            None => it
                .team_capacity
                .iter()
                .filter(|t| t.fits(points))
                .fold(None, |best: Option<&TeamCapacity>, t| match best {
                    Some(b) if b.headroom() >= t.headroom() => Some(b),
                    _ => Some(t),
                }),
        };
        if let Some(team) = chosen {
            return Ok((it.index, team.team_id.clone()));
        }
    }
    Err(Shortfall::Capacity)
}

// ---------------------------------------------------------------------------
// Readiness
// ---------------------------------------------------------------------------

/// Mean utilization over every (iteration, team) pair that has capacity.
fn average_utilization(iterations: &[Iteration]) -> f64 {
    let rows: Vec<f64> = iterations
        .iter()
        .flat_map(|it| it.team_capacity.iter())
        .filter(|t| t.available > 0.0)
        .map(|t| t.utilization)
        .collect();
    if rows.is_empty() {
        0.0
    } else {
        rows.iter().sum::<f64>() / rows.len() as f64
    }
}

fn readiness(
    items: &[PlanningWorkItem],
    graph: &DependencyGraph,
    iterations: &[Iteration],
    alloc: &Allocation,
    config: &PlannerConfig,
) -> ArtReadiness {
    let mut critical_blockers = Vec::new();
    let mut recommendations = Vec::new();

    for cycle in &graph.circular_dependencies {
        critical_blockers.push(Blocker {
            kind: BlockerKind::CircularDependency,
            item_ids: cycle.clone(),
            message: format!("circular dependency: {}", cycle_path(cycle)),
        });
    }
    for w in alloc.placed.iter().filter(|w| w.unplanned) {
        critical_blockers.push(Blocker {
            kind: BlockerKind::UnplannedItem,
            item_ids: vec![w.item.id.clone()],
            message: w
                .warning
                .clone()
                .unwrap_or_else(|| format!("work item '{}' left unplanned", w.item.id)),
        });
    }

    if items.is_empty() {
        recommendations.push("No work items supplied for this program increment".to_string());
        return ArtReadiness {
            readiness_score: 0.0,
            dependency_integrity: 0.0,
            capacity_balance: 0.0,
            value_delivery_confidence: 0.0,
            critical_blockers,
            recommendations,
        };
    }

    // -- Dependency integrity --

    let in_plan: HashSet<&str> = items.iter().map(|i| i.id.as_str()).collect();
    let mut total = 0usize;
    let mut satisfied = 0usize;
    let mut outside = 0usize;
    for (_, edge) in graph.valid_hard_edges() {
        if !in_plan.contains(edge.source_id.as_str()) {
            continue;
        }
        total += 1;
        if !in_plan.contains(edge.target_id.as_str()) {
            outside += 1;
            continue;
        }
        if let (Some(s), Some(t)) = (
            alloc.iteration_of.get(&edge.source_id),
            alloc.iteration_of.get(&edge.target_id),
        ) {
            if t < s {
                satisfied += 1;
            }
        }
    }
    let dependency_integrity = if total == 0 {
        1.0
    } else {
        satisfied as f64 / total as f64
    };

    // -- Capacity balance --

    let target = config.capacity.target_utilization;
    let average = average_utilization(iterations);
    let capacity_balance = (1.0 - (average - target).abs() / target).clamp(0.0, 1.0);

    // -- Value delivery --

    let value_delivery_confidence = value_delivery(items, alloc);

    let readiness_score = config
        .readiness
        .combine(dependency_integrity, capacity_balance, value_delivery_confidence)
        .clamp(0.0, 1.0);

    // -- Recommendations --

    if let Some(final_iteration) = iterations.last() {
        for (team_id, (count, points)) in &alloc.capacity_misses {
            let team_name = final_iteration
                .team(team_id)
                .map(|t| t.team_name.as_str())
                .unwrap_or(team_id.as_str());
            recommendations.push(format!(
                "{} over capacity for {team_name}: {count} item(s) totalling {points} points left unplanned",
                final_iteration.name
            ));
        }
    }
    for it in iterations {
        for team in &it.team_capacity {
            if team.ceiling > 0.0 && team.used as f64 >= NEAR_CAPACITY * team.ceiling {
                recommendations.push(format!(
                    "{} is at {:.0}% of the capacity ceiling for {}",
                    it.name,
                    team.used as f64 / team.ceiling * 100.0,
                    team.team_name
                ));
            }
        }
    }
    let unplanned = alloc.placed.iter().filter(|w| w.unplanned).count();
    if unplanned > 0 {
        recommendations.push(format!(
            "{unplanned} work item(s) could not be planned; rebalance scope or add capacity"
        ));
    }
    if graph.has_cycles() {
        recommendations.push(format!(
            "Resolve {} circular dependenc{} before committing the plan",
            graph.circular_dependencies.len(),
            if graph.circular_dependencies.len() == 1 { "y" } else { "ies" }
        ));
    }
    let dangling = graph
        .validation
        .issues_with(crate::graph::IssueCode::DanglingReference)
        .count();
    if dangling > 0 {
        recommendations.push(format!(
            "{dangling} dependency edge(s) reference unknown work items"
        ));
    }
    if outside > 0 {
        recommendations.push(format!(
            "{outside} hard dependenc{} point outside this program increment's work items",
            if outside == 1 { "y" } else { "ies" }
        ));
    }
    let missing_criteria = items.iter().filter(|i| !i.has_acceptance_criteria()).count();
    if missing_criteria > 0 {
        recommendations.push(format!(
            "{missing_criteria} work item(s) lack acceptance criteria"
        ));
    }
    if graph.critical_path.len() > iterations.len() {
        recommendations.push(format!(
            "Critical path spans {} items but the PI has only {} iterations",
            graph.critical_path.len(),
            iterations.len()
        ));
    }

    ArtReadiness {
        readiness_score,
        dependency_integrity,
        capacity_balance,
        value_delivery_confidence,
        critical_blockers,
        recommendations,
    }
}

fn value_delivery(items: &[PlanningWorkItem], alloc: &Allocation) -> f64 {
    if items.is_empty() {
        return 0.0;
    }
    let delivered = alloc
        .placed
        .iter()
        .filter(|w| !w.unplanned && w.item.has_acceptance_criteria())
        .count();
    delivered as f64 / items.len() as f64
}

fn cycle_path(cycle: &[String]) -> String {
    let mut parts: Vec<&str> = cycle.iter().map(String::as_str).collect();
    if let Some(first) = cycle.first() {
        parts.push(first);
    }
    parts.join(" -> ")
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

fn summarize(
    items: &[PlanningWorkItem],
    iterations: &[Iteration],
    alloc: &Allocation,
    readiness: &ArtReadiness,
) -> PlanSummary {
    let total_items = items.len();
    let unplanned_items = alloc.placed.iter().filter(|w| w.unplanned).count();
    let planned_items = total_items - unplanned_items;
    let percent_planned = if total_items == 0 {
        0.0
    } else {
        planned_items as f64 / total_items as f64
    };

    PlanSummary {
        total_items,
        total_story_points: items.iter().map(|i| u64::from(i.points())).sum(),
        planned_items,
        unplanned_items,
        planned_story_points: iterations.iter().map(Iteration::total_used).sum(),
        average_capacity_utilization: average_utilization(iterations),
        value_delivery_confidence: readiness.value_delivery_confidence,
        metrics: PlanMetrics {
            planning_confidence: 0.5 * readiness.readiness_score + 0.5 * percent_planned,
            percent_planned,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlanError;
    use crate::graph::DependencyEdge;
    use crate::types::EnablerType;
    use chrono::NaiveDate;

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

    fn scenario() -> (Vec<PlanningWorkItem>, DependencyGraph) {
        let items = vec![
            PlanningWorkItem::enabler("enabler-1", "Provision message queue", EnablerType::Infrastructure)
                .with_points(0),
            PlanningWorkItem::story("story-1", "Publish order events")
                .with_points(5)
                .with_acceptance_criteria(["events land on the queue"]),
            PlanningWorkItem::story("story-2", "Customer order history page")
                .with_points(3)
                .with_acceptance_criteria(["history lists the last 50 orders"]),
            PlanningWorkItem::story("story-3", "Revenue report").with_points(4),
        ];
        let edges = vec![
            DependencyEdge::hard("d-1", "story-1", "enabler-1"),
            DependencyEdge::hard("d-2", "story-2", "story-1"),
            DependencyEdge::hard("d-3", "story-3", "story-1"),
        ];
        (items, DependencyGraph::new(vec![], edges))
    }

    fn plan(items: &[PlanningWorkItem], graph: &DependencyGraph, teams: &[ArtTeam]) -> ArtPlan {
        plan_art(&q1(), items, graph, teams, &PlannerConfig::default()).unwrap()
    }

    /// Every HARD edge between planned items has its target strictly earlier.
    fn assert_precedence(plan: &ArtPlan) {
        for edge in plan.dependencies.constraining_edges() {
            if let (Some(s), Some(t)) = (
                plan.iteration_of(&edge.source_id),
                plan.iteration_of(&edge.target_id),
            ) {
                assert!(t < s, "{} (it {s}) must follow {} (it {t})", edge.source_id, edge.target_id);
            }
        }
    }

    fn assert_capacity_bound(plan: &ArtPlan) {
        for it in &plan.iterations {
            for team in &it.team_capacity {
                assert!(
                    team.used as f64 <= team.ceiling + 1e-9,
                    "{} over ceiling for {}",
                    it.name,
                    team.team_id
                );
            }
        }
    }

    #[test]
    fn scenario_respects_dependencies() {
        let (items, graph) = scenario();
        let plan = plan(&items, &graph, &teams());

        let it = |id: &str| plan.iteration_of(id).unwrap();
        assert!(it("enabler-1") < it("story-1"));
        assert!(it("story-1") < it("story-2"));
        assert!(it("story-1") < it("story-3"));
        assert_eq!(plan.summary.total_story_points, 12);
        assert_eq!(plan.summary.unplanned_items, 0);
        assert!(!plan.iterations.is_empty());
        let score = plan.art_readiness.readiness_score;
        assert!((0.0..=1.0).contains(&score));
        assert_eq!(plan.art_readiness.dependency_integrity, 1.0);
        assert_precedence(&plan);
        assert_capacity_bound(&plan);
    }

    #[test]
    fn scenario_critical_path_and_metadata() {
        let (items, graph) = scenario();
        let plan = plan(&items, &graph, &teams());
        assert_eq!(plan.dependencies.critical_path, vec!["enabler-1", "story-1", "story-3"]);
        assert_eq!(plan.metadata.configuration, PlannerConfig::default());
        assert_eq!(plan.metadata.scoring_version, "wsjf-1.0");
        // two of four items carry acceptance criteria
        assert!((plan.art_readiness.value_delivery_confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn independent_items_order_by_wsjf_then_input() {
        let items = vec![
            PlanningWorkItem::story("low", "Tidy logs").with_points(1),
            PlanningWorkItem::story("high", "Security fix for customer revenue").with_points(1),
            PlanningWorkItem::story("tie", "Tidy docs").with_points(1),
        ];
        let scores = BTreeMap::from([
            ("low".to_string(), 2.0),
            ("high".to_string(), 9.0),
            ("tie".to_string(), 2.0),
        ]);
        let cfg = PlannerConfig::default();
        let plan = ArtPlanner::new(&cfg)
            .plan_with_scores(&q1(), &items, &DependencyGraph::default(), &teams(), &scores)
            .unwrap();
        let ids: Vec<&str> = plan.work_items.iter().map(|w| w.item.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "low", "tie"]);
    }

    #[test]
    fn capacity_bound_spills_to_later_iterations() {
        let team = vec![ArtTeam::new("core", "Core Team", 10.0)];
        // available 8, ceiling 6.8 → two 3-point items per iteration
        let items: Vec<PlanningWorkItem> = (1..=6)
            .map(|n| PlanningWorkItem::story(format!("s-{n}"), format!("Story {n}")).with_points(3))
            .collect();
        let plan = plan(&items, &DependencyGraph::default(), &team);

        assert_capacity_bound(&plan);
        assert_eq!(plan.iterations[0].work_items, vec!["s-1", "s-2"]);
        assert_eq!(plan.iterations[1].work_items, vec!["s-3", "s-4"]);
        assert_eq!(plan.iterations[2].work_items, vec!["s-5", "s-6"]);
        assert_eq!(plan.summary.planned_story_points, 18);
    }

    #[test]
    fn huge_estimates_total_without_overflow() {
        let items = vec![
            PlanningWorkItem::story("big-1", "Replatform").with_points(3_000_000_000),
            PlanningWorkItem::story("big-2", "Rewrite").with_points(3_000_000_000),
        ];
        let plan = plan(&items, &DependencyGraph::default(), &teams());

        assert_eq!(plan.summary.unplanned_items, 2);
        assert_eq!(plan.summary.total_story_points, 6_000_000_000);
        assert_eq!(plan.summary.planned_story_points, 0);
        assert!(plan
            .art_readiness
            .recommendations
            .iter()
            .any(|r| r.contains("2 item(s) totalling 6000000000 points")));
    }

    #[test]
    fn oversized_item_is_unplanned_not_fatal() {
        let team = vec![ArtTeam::new("core", "Core Team", 10.0)];
        let items = vec![
            PlanningWorkItem::story("huge", "Rewrite billing").with_points(40),
            PlanningWorkItem::story("after", "Bill export").with_points(1),
        ];
        let graph = DependencyGraph::new(vec![], vec![DependencyEdge::hard("d", "after", "huge")]);
        let plan = plan(&items, &graph, &team);

        let huge = plan.item("huge").unwrap();
        assert!(huge.unplanned);
        assert_eq!(huge.iteration, plan.iterations.len() - 1);
        let after = plan.item("after").unwrap();
        assert!(after.unplanned);
        assert!(after.warning.as_deref().unwrap().contains("'huge' is unplanned"));

        let last = plan.iterations.last().unwrap();
        assert_eq!(last.unplanned_items, vec!["huge", "after"]);
        assert!(last.work_items.is_empty());

        let blocked: Vec<&str> = plan
            .art_readiness
            .critical_blockers
            .iter()
            .filter(|b| b.kind == BlockerKind::UnplannedItem)
            .flat_map(|b| b.item_ids.iter().map(String::as_str))
            .collect();
        assert_eq!(blocked, vec!["huge", "after"]);
        assert!(plan
            .art_readiness
            .recommendations
            .iter()
            .any(|r| r.starts_with("Iteration 7 over capacity for")));
        assert_eq!(plan.summary.unplanned_items, 2);
        assert_eq!(plan.art_readiness.dependency_integrity, 0.0);
    }

    #[test]
    fn cycle_is_reported_and_broken() {
        let items = vec![
            PlanningWorkItem::story("A", "A").with_points(1),
            PlanningWorkItem::story("B", "B").with_points(1),
            PlanningWorkItem::story("C", "C").with_points(1),
        ];
        let graph = DependencyGraph::new(
            vec![],
            vec![
                DependencyEdge::hard("d-1", "A", "B"),
                DependencyEdge::hard("d-2", "B", "C"),
                DependencyEdge::hard("d-3", "C", "A"),
            ],
        );
        let plan = plan(&items, &graph, &teams());

        assert_eq!(plan.dependencies.circular_dependencies, vec![vec!["A", "B", "C"]]);
        let cycle = plan
            .art_readiness
            .critical_blockers
            .iter()
            .find(|b| b.kind == BlockerKind::CircularDependency)
            .unwrap();
        assert_eq!(cycle.item_ids, vec!["A", "B", "C"]);
        assert_eq!(cycle.message, "circular dependency: A -> B -> C -> A");

        // C -> A dropped, so C, B, A in consecutive iterations
        assert_eq!(plan.iteration_of("C"), Some(0));
        assert_eq!(plan.iteration_of("B"), Some(1));
        assert_eq!(plan.iteration_of("A"), Some(2));
        assert_eq!(plan.summary.unplanned_items, 0);
        assert!(plan
            .art_readiness
            .recommendations
            .iter()
            .any(|r| r == "Resolve 1 circular dependency before committing the plan"));
    }

    #[test]
    fn identical_inputs_give_identical_plans() {
        let (items, graph) = scenario();
        let a = serde_json::to_string(&plan(&items, &graph, &teams())).unwrap();
        let b = serde_json::to_string(&plan(&items, &graph, &teams())).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_plan_is_valid_with_zero_readiness() {
        let plan = plan(&[], &DependencyGraph::default(), &teams());
        assert_eq!(plan.iterations.len(), 7);
        assert!(plan.work_items.is_empty());
        assert_eq!(plan.art_readiness.readiness_score, 0.0);
        assert_eq!(
            plan.art_readiness.recommendations,
            vec!["No work items supplied for this program increment"]
        );
        assert_eq!(plan.summary.total_story_points, 0);
        assert_eq!(plan.summary.metrics.planning_confidence, 0.0);
    }

    #[test]
    fn malformed_pi_is_fatal() {
        let pi = ProgramIncrement::new("bad", "Bad", date(2025, 2, 1), date(2025, 2, 1));
        let err = plan_art(&pi, &[], &DependencyGraph::default(), &teams(), &PlannerConfig::default())
            .unwrap_err();
        assert!(matches!(err, PlanError::InvalidProgramIncrement { .. }));
    }

    #[test]
    fn invalid_config_is_fatal() {
        let mut cfg = PlannerConfig::default();
        cfg.capacity.buffer_capacity = 1.5;
        let err = plan_art(&q1(), &[], &DependencyGraph::default(), &teams(), &cfg).unwrap_err();
        assert!(matches!(err, PlanError::InvalidConfig(_)));
    }

    #[test]
    fn unknown_team_becomes_zero_capacity_placeholder() {
        let items = vec![
            PlanningWorkItem::story("spike", "Timebox").with_points(0).with_team("ghost"),
            PlanningWorkItem::story("real", "Real work").with_points(2).with_team("ghost"),
        ];
        let plan = plan(&items, &DependencyGraph::default(), &teams());

        assert!(plan.warnings.iter().any(|w| w.contains("unknown team 'ghost'")));
        let ghost = plan.iterations[0].team("ghost").unwrap();
        assert!(ghost.placeholder);
        assert_eq!(ghost.available, 0.0);
        assert!(!plan.item("spike").unwrap().unplanned);
        assert!(plan.item("real").unwrap().unplanned);
    }

    #[test]
    fn no_teams_uses_unassigned_placeholder() {
        let items = vec![PlanningWorkItem::story("s", "Story").with_points(1)];
        let plan = plan(&items, &DependencyGraph::default(), &[]);
        assert!(plan.iterations[0].team(UNASSIGNED_TEAM).is_some());
        assert!(plan.item("s").unwrap().unplanned);
        assert!(plan
            .art_readiness
            .recommendations
            .iter()
            .any(|r| r.contains("over capacity for unassigned")));
    }

    #[test]
    fn fixed_team_is_respected() {
        let items = vec![PlanningWorkItem::story("ui", "Checkout page")
            .with_points(4)
            .with_team("frontend")];
        let plan = plan(&items, &DependencyGraph::default(), &teams());
        let ui = plan.item("ui").unwrap();
        assert_eq!(ui.assigned_team.as_deref(), Some("frontend"));
        assert_eq!(plan.iterations[0].team("frontend").unwrap().used, 4);
        assert_eq!(plan.iterations[0].team("backend").unwrap().used, 0);
    }

    #[test]
    fn unassigned_items_go_to_most_headroom() {
        let items = vec![
            PlanningWorkItem::story("a", "A").with_points(10),
            PlanningWorkItem::story("b", "B").with_points(10),
        ];
        let plan = plan(&items, &DependencyGraph::default(), &teams());
        // backend ceiling 14.45, frontend 10.88
        assert_eq!(plan.item("a").unwrap().assigned_team.as_deref(), Some("backend"));
        assert_eq!(plan.item("b").unwrap().assigned_team.as_deref(), Some("frontend"));
        assert_eq!(plan.iteration_of("b"), Some(0));
    }

    #[test]
    fn duplicate_items_keep_first() {
        let items = vec![
            PlanningWorkItem::story("s", "First").with_points(1),
            PlanningWorkItem::story("s", "Second").with_points(8),
        ];
        let plan = plan(&items, &DependencyGraph::default(), &teams());
        assert_eq!(plan.work_items.len(), 1);
        assert_eq!(plan.item("s").unwrap().item.title, "First");
        assert_eq!(plan.summary.total_story_points, 1);
        assert!(plan.warnings.iter().any(|w| w.contains("duplicate work item id 's'")));
        assert!(plan.dependencies.validation.is_valid);
    }

    #[test]
    fn soft_edges_do_not_constrain() {
        let items = vec![
            PlanningWorkItem::story("a", "A").with_points(1),
            PlanningWorkItem::story("b", "B").with_points(1),
        ];
        let graph = DependencyGraph::new(vec![], vec![DependencyEdge::soft("d", "a", "b")]);
        let plan = plan(&items, &graph, &teams());
        assert_eq!(plan.iteration_of("a"), Some(0));
        assert_eq!(plan.iteration_of("b"), Some(0));
        assert_eq!(plan.art_readiness.dependency_integrity, 1.0);
    }

    #[test]
    fn dependency_outside_work_items_counts_against_integrity() {
        let outside = PlanningWorkItem::story("platform-7", "Shared platform work");
        let items = vec![PlanningWorkItem::story("s", "Story").with_points(1)];
        let graph = DependencyGraph::new(
            vec![outside],
            vec![DependencyEdge::hard("d", "s", "platform-7")],
        );
        let plan = plan(&items, &graph, &teams());
        assert_eq!(plan.iteration_of("s"), Some(0));
        assert_eq!(plan.art_readiness.dependency_integrity, 0.0);
        assert!(plan
            .art_readiness
            .recommendations
            .iter()
            .any(|r| r.contains("outside this program increment")));
    }

    #[test]
    fn dependencies_in_final_iteration_leave_item_unplanned() {
        let pi = ProgramIncrement::new("short", "Short", date(2025, 1, 1), date(2025, 1, 14));
        let items = vec![
            PlanningWorkItem::story("base", "Base").with_points(1),
            PlanningWorkItem::story("top", "Top").with_points(1),
        ];
        let graph = DependencyGraph::new(vec![], vec![DependencyEdge::hard("d", "top", "base")]);
        let plan = plan_art(&pi, &items, &graph, &teams(), &PlannerConfig::default()).unwrap();
        assert_eq!(plan.iterations.len(), 1);
        assert_eq!(plan.iteration_of("base"), Some(0));
        let top = plan.item("top").unwrap();
        assert!(top.unplanned);
        assert!(top.warning.as_deref().unwrap().contains("final iteration"));
    }
}
