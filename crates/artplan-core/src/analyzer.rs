//! Builds and validates a [`DependencyGraph`] from flat node and edge lists.
//!
//! Everything here is a free function over the arena: node ids map to
//! positions in the node list, edges are referenced by position. Only HARD
//! edges take part in cycle detection, layering and the critical path.

use crate::config::GraphConfig;
use crate::graph::{
    DependencyEdge, DependencyGraph, GraphStatistics, GraphValidation, IssueCode,
    ValidationIssue,
};
use crate::model::PlanningWorkItem;
use std::collections::{HashMap, HashSet};

// ---------------------------------------------------------------------------
// Arena
// ---------------------------------------------------------------------------

/// HARD adjacency over node positions: `deps[n]` holds `(target, edge)` pairs
/// in edge order, i.e. what `n` waits for.
struct Arena {
    len: usize,
    deps: Vec<Vec<(usize, usize)>>,
}

impl Arena {
    fn new(len: usize, edges: &[(usize, usize, usize)]) -> Self {
        let mut deps = vec![Vec::new(); len];
        for &(source, target, edge) in edges {
            deps[source].push((target, edge));
        }
        Self { len, deps }
    }
}

struct Cycle {
    nodes: Vec<usize>,
    edges: Vec<usize>,
}

// ---------------------------------------------------------------------------
// build_graph()
// ---------------------------------------------------------------------------

/// Re-run analysis over an existing graph's nodes and edges.
pub fn analyze(graph: &DependencyGraph, config: &GraphConfig) -> DependencyGraph {
    build_graph(&graph.nodes, &graph.edges, config)
}

/// Validate `edges` against `nodes`, detect and break cycles, compute the
/// critical path and statistics.
///
/// Never fails: bad references, duplicates and cycles are reported through
/// `validation` and the offending edges are kept out of ordering.
pub fn build_graph(
    nodes: &[PlanningWorkItem],
    edges: &[DependencyEdge],
    config: &GraphConfig,
) -> DependencyGraph {
    let mut validation = GraphValidation::default();

    // -- Nodes (first occurrence wins) --

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut unique_nodes: Vec<PlanningWorkItem> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if index.contains_key(node.id.as_str()) {
            validation.errors.push(ValidationIssue::new(
                IssueCode::DuplicateNode,
                format!("work item '{}' appears more than once; later copies ignored", node.id),
                vec![node.id.clone()],
            ));
            continue;
        }
        index.insert(node.id.as_str(), unique_nodes.len());
        unique_nodes.push(node.clone());
    }

    // -- Edges --

    let mut out_edges: Vec<DependencyEdge> = Vec::with_capacity(edges.len());
    let mut excluded: Vec<usize> = Vec::new();
    let mut hard: Vec<(usize, usize, usize)> = Vec::new();
    let mut seen_pairs: HashSet<(usize, usize, bool)> = HashSet::new();
    let mut soft_count = 0usize;

    for (i, edge) in edges.iter().enumerate() {
        let mut edge = edge.clone();

        if !(0.0..=1.0).contains(&edge.confidence) {
            let clamped = if edge.confidence.is_nan() {
                0.0
            } else {
                edge.confidence.clamp(0.0, 1.0)
            };
            validation.warnings.push(ValidationIssue::new(
                IssueCode::ConfidenceOutOfRange,
                format!(
                    "dependency '{}' has confidence {} outside [0, 1]; clamped to {clamped}",
                    edge.id, edge.confidence
                ),
                vec![edge.source_id.clone(), edge.target_id.clone()],
            ));
            edge.confidence = clamped;
        }

        let source = index.get(edge.source_id.as_str()).copied();
        let target = index.get(edge.target_id.as_str()).copied();

        let (source, target) = match (source, target) {
            (Some(s), Some(t)) => (s, t),
            _ => {
                let missing: Vec<String> = [(&edge.source_id, source), (&edge.target_id, target)]
                    .into_iter()
                    .filter(|(_, pos)| pos.is_none())
                    .map(|(id, _)| id.clone())
                    .collect();
                validation.errors.push(ValidationIssue::new(
                    IssueCode::DanglingReference,
                    format!(
                        "dependency '{}' references unknown item(s): {}",
                        edge.id,
                        missing.join(", ")
                    ),
                    missing,
                ));
                excluded.push(i);
                out_edges.push(edge);
                continue;
            }
        };

        if source == target {
            validation.errors.push(ValidationIssue::new(
                IssueCode::SelfReference,
                format!("dependency '{}' makes '{}' depend on itself", edge.id, edge.source_id),
                vec![edge.source_id.clone()],
            ));
            excluded.push(i);
            out_edges.push(edge);
            continue;
        }

        if !seen_pairs.insert((source, target, edge.is_hard())) {
            validation.warnings.push(ValidationIssue::new(
                IssueCode::DuplicateEdge,
                format!(
                    "dependency '{}' duplicates an earlier {} edge {} -> {}",
                    edge.id, edge.strength, edge.source_id, edge.target_id
                ),
                vec![edge.source_id.clone(), edge.target_id.clone()],
            ));
            excluded.push(i);
            out_edges.push(edge);
            continue;
        }

        if edge.is_hard() {
            if edge.confidence < config.low_confidence_threshold {
                validation.warnings.push(ValidationIssue::new(
                    IssueCode::LowConfidence,
                    format!(
                        "HARD dependency '{}' ({} -> {}) has low confidence {:.2}",
                        edge.id, edge.source_id, edge.target_id, edge.confidence
                    ),
                    vec![edge.source_id.clone(), edge.target_id.clone()],
                ));
            }
            hard.push((source, target, i));
        } else {
            soft_count += 1;
        }
        out_edges.push(edge);
    }

    let arena = Arena::new(unique_nodes.len(), &hard);

    // -- Cycles --

    let (cycles, broken) = break_cycles(&arena, &out_edges);
    let id_of = |n: usize| unique_nodes[n].id.clone();
    let circular_dependencies: Vec<Vec<String>> = cycles
        .iter()
        .map(|c| c.iter().map(|&n| id_of(n)).collect())
        .collect();
    for cycle in &circular_dependencies {
        let mut shown = cycle.clone();
        if let Some(first) = cycle.first() {
            shown.push(first.clone());
        }
        validation.errors.push(ValidationIssue::new(
            IssueCode::CircularDependency,
            format!("circular dependency: {}", shown.join(" -> ")),
            cycle.clone(),
        ));
    }
    if !broken.is_empty() {
        tracing::warn!(
            cycles = circular_dependencies.len(),
            dropped = broken.len(),
            "broke circular dependencies by dropping lowest-confidence edges"
        );
    }

    // -- Critical path over the acyclic remainder --

    let dag_edges: Vec<(usize, usize, usize)> = hard
        .iter()
        .copied()
        .filter(|(_, _, e)| !broken.contains(e))
        .collect();
    let dag = Arena::new(unique_nodes.len(), &dag_edges);
    let weights: Vec<u64> = unique_nodes
        .iter()
        .map(|n| u64::from(n.effort_weight()))
        .collect();
    let path = critical_path(&dag, &weights);
    let critical_path: Vec<String> = path.iter().map(|&n| id_of(n)).collect();
    let estimated_total_duration: u64 = path.iter().map(|&n| weights[n]).sum();

    // -- Statistics --

    let mut degree = vec![0usize; unique_nodes.len()];
    for &(s, t, _) in &hard {
        degree[s] += 1;
        degree[t] += 1;
    }
    let independent_items = degree.iter().filter(|&&d| d == 0).count();
    let high_dependency_items: Vec<String> = degree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d > config.high_dependency_threshold)
        .map(|(n, _)| id_of(n))
        .collect();

    for (n, &d) in degree.iter().enumerate() {
        if d > config.high_dependency_threshold {
            validation.warnings.push(ValidationIssue::new(
                IssueCode::HighDependencyItem,
                format!(
                    "'{}' has {d} HARD dependency links (threshold {})",
                    unique_nodes[n].id, config.high_dependency_threshold
                ),
                vec![id_of(n)],
            ));
        }
    }
    if soft_count > 0 {
        validation.info.push(ValidationIssue::new(
            IssueCode::SoftDependencies,
            format!("{soft_count} SOFT dependency edge(s) do not constrain ordering"),
            vec![],
        ));
    }
    if independent_items > 0 {
        validation.info.push(ValidationIssue::new(
            IssueCode::IndependentItems,
            format!("{independent_items} item(s) have no HARD dependencies"),
            vec![],
        ));
    }

    let statistics = GraphStatistics {
        total_nodes: unique_nodes.len(),
        total_edges: out_edges.len(),
        hard_dependencies: hard.len(),
        soft_dependencies: soft_count,
        average_dependencies: out_edges.len() as f64 / unique_nodes.len().max(1) as f64,
        independent_items,
        high_dependency_items,
        longest_path_length: critical_path.len(),
        estimated_total_duration,
    };

    validation.is_valid = validation.errors.is_empty();

    tracing::debug!(
        nodes = statistics.total_nodes,
        edges = statistics.total_edges,
        cycles = circular_dependencies.len(),
        valid = validation.is_valid,
        "dependency graph analyzed"
    );

    let mut broken: Vec<usize> = broken.into_iter().collect();
    broken.sort_unstable();

    DependencyGraph {
        nodes: unique_nodes,
        edges: out_edges,
        critical_path,
        circular_dependencies,
        validation,
        statistics,
        excluded_edges: excluded,
        broken_edges: broken,
    }
}

// ---------------------------------------------------------------------------
// Cycle detection (DFS colour marking)
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq)]
enum Colour {
    White,
    Grey,
    Black,
}

/// Every back edge found by one DFS pass yields one cycle, listed in
/// dependency order and rotated to start at its lowest node position.
fn find_cycles(arena: &Arena, skip: &HashSet<usize>) -> Vec<Cycle> {
    let mut colour = vec![Colour::White; arena.len];
    let mut cycles = Vec::new();

    for root in 0..arena.len {
        if colour[root] != Colour::White {
            continue;
        }
        // (node, next child to visit); path_edges[i] enters path[i + 1]
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        let mut path_edges: Vec<usize> = Vec::new();
        colour[root] = Colour::Grey;

        while let Some(&(node, cursor)) = stack.last() {
            let children = &arena.deps[node];
            if cursor >= children.len() {
                colour[node] = Colour::Black;
                stack.pop();
                path_edges.pop();
                continue;
            }
            let (child, edge) = children[cursor];
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }
            if skip.contains(&edge) {
                continue;
            }
            match colour[child] {
                Colour::White => {
                    colour[child] = Colour::Grey;
                    stack.push((child, 0));
                    path_edges.push(edge);
                }
                Colour::Grey => {
                    if let Some(start) = stack.iter().position(|&(n, _)| n == child) {
                        let nodes: Vec<usize> = stack[start..].iter().map(|&(n, _)| n).collect();
                        let mut edges: Vec<usize> = path_edges[start..].to_vec();
                        edges.push(edge);
                        cycles.push(canonical(Cycle { nodes, edges }));
                    }
                }
                Colour::Black => {}
            }
        }
    }

    cycles
}

fn canonical(cycle: Cycle) -> Cycle {
    let Cycle { mut nodes, mut edges } = cycle;
    if let Some(min_at) = nodes
        .iter()
        .enumerate()
        .min_by_key(|(_, &n)| n)
        .map(|(i, _)| i)
    {
        nodes.rotate_left(min_at);
        edges.rotate_left(min_at);
    }
    Cycle { nodes, edges }
}

/// Report every cycle and pick the edges to drop so the HARD subgraph
/// becomes acyclic. Each cycle loses its lowest-confidence edge; ties go to
/// the edge that appears last in the input. Detection repeats until no
/// cycle remains, so cycles hidden behind an earlier one are reported too.
fn break_cycles(arena: &Arena, edges: &[DependencyEdge]) -> (Vec<Vec<usize>>, HashSet<usize>) {
    let mut reported: Vec<Vec<usize>> = Vec::new();
    let mut known: HashSet<Vec<usize>> = HashSet::new();
    let mut broken: HashSet<usize> = HashSet::new();

    // each round drops at least one edge
    for _ in 0..=edges.len() {
        let cycles = find_cycles(arena, &broken);
        if cycles.is_empty() {
            break;
        }
        for cycle in cycles {
            if known.insert(cycle.nodes.clone()) {
                reported.push(cycle.nodes.clone());
            }
            if cycle.edges.iter().any(|e| broken.contains(e)) {
                continue;
            }
            let victim = cycle.edges.iter().copied().min_by(|&a, &b| {
                edges[a]
                    .confidence
                    .total_cmp(&edges[b].confidence)
                    .then(b.cmp(&a))
            });
            if let Some(victim) = victim {
                broken.insert(victim);
            }
        }
    }

    (reported, broken)
}

// ---------------------------------------------------------------------------
// Topological layering / critical path
// ---------------------------------------------------------------------------

/// Kahn layering: layer 0 holds nodes with no HARD dependencies, layer k
/// nodes whose dependencies all sit in earlier layers. Nodes left over by
/// a cycle are not returned.
fn layers(arena: &Arena) -> Vec<Vec<usize>> {
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); arena.len];
    let mut pending: Vec<usize> = vec![0; arena.len];
    for (node, deps) in arena.deps.iter().enumerate() {
        for &(target, _) in deps {
            dependents[target].push(node);
            pending[node] += 1;
        }
    }

    let mut result = Vec::new();
    let mut current: Vec<usize> = (0..arena.len).filter(|&n| pending[n] == 0).collect();
    while !current.is_empty() {
        let mut next = Vec::new();
        for &node in &current {
            for &dependent in &dependents[node] {
                pending[dependent] -= 1;
                if pending[dependent] == 0 {
                    next.push(dependent);
                }
            }
        }
        next.sort_unstable();
        result.push(current);
        current = next;
    }
    result
}

/// Heaviest chain of HARD dependencies, first-to-deliver item first.
/// Empty when the graph has no HARD edges.
fn critical_path(arena: &Arena, weights: &[u64]) -> Vec<usize> {
    if arena.deps.iter().all(Vec::is_empty) {
        return Vec::new();
    }

    let mut best: Vec<u64> = weights.to_vec();
    let mut via: Vec<Option<usize>> = vec![None; arena.len];
    for layer in layers(arena) {
        for node in layer {
            for &(target, _) in &arena.deps[node] {
                let candidate = best[target].saturating_add(weights[node]);
                if via[node].is_none() || candidate > best[node] {
                    best[node] = candidate;
                    via[node] = Some(target);
                }
            }
        }
    }

    let Some(end) = (0..arena.len)
        .filter(|&n| via[n].is_some())
        .max_by(|&a, &b| best[a].cmp(&best[b]).then(b.cmp(&a)))
    else {
        return Vec::new();
    };

    let mut path = vec![end];
    let mut cursor = end;
    while let Some(prev) = via[cursor] {
        path.push(prev);
        cursor = prev;
    }
    path.reverse();
    path
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
