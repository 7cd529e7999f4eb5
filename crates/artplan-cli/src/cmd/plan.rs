use crate::output::{percent, print_json, print_table};
use anyhow::Context;
use artplan_cli::input::{self, PlanInput};
use artplan_cli::settings::load_config;
use artplan_core::graph::DependencyGraph;
use artplan_core::plan::ArtPlan;
use artplan_core::plan_art;
use std::path::Path;

pub fn run(input_path: &Path, config_path: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let input: PlanInput = input::load(input_path)?;

    let graph = DependencyGraph::new(input.external_items, input.dependencies);
    let plan = plan_art(
        &input.program_increment,
        &input.work_items,
        &graph,
        &input.teams,
        &config,
    )
    .with_context(|| format!("failed to plan {}", input.program_increment.id))?;

    if json {
        return print_json(&plan);
    }
    print_plan(&plan);
    Ok(())
}

fn print_plan(plan: &ArtPlan) {
    let pi = &plan.program_increment;
    println!("{} ({} to {})", pi.name, pi.start_date, pi.end_date);
    println!();

    let rows: Vec<Vec<String>> = plan
        .iterations
        .iter()
        .map(|it| {
            let capacity = if it.total_available() > 0.0 {
                percent(it.total_used() as f64 / it.total_available())
            } else {
                "-".to_string()
            };
            vec![
                it.name.clone(),
                format!("{} to {}", it.start_date, it.end_date),
                it.work_items.join(", "),
                it.total_used().to_string(),
                capacity,
            ]
        })
        .collect();
    print_table(&["ITERATION", "DATES", "ITEMS", "POINTS", "LOAD"], &rows);

    let unplanned: Vec<&str> = plan.unplanned().map(|w| w.item.id.as_str()).collect();
    if !unplanned.is_empty() {
        println!();
        println!("Unplanned: {}", unplanned.join(", "));
    }

    let r = &plan.art_readiness;
    println!();
    println!(
        "Readiness: {:.2} (dependencies {:.2}, capacity {:.2}, value {:.2})",
        r.readiness_score, r.dependency_integrity, r.capacity_balance, r.value_delivery_confidence
    );
    println!(
        "Points: {} total, {} planned; planning confidence {:.2}",
        plan.summary.total_story_points,
        plan.summary.planned_story_points,
        plan.summary.metrics.planning_confidence
    );

    if !r.critical_blockers.is_empty() {
        println!();
        println!("Blockers:");
        for b in &r.critical_blockers {
            println!("  - {}", b.message);
        }
    }
    if !r.recommendations.is_empty() {
        println!();
        println!("Recommendations:");
        for rec in &r.recommendations {
            println!("  - {rec}");
        }
    }
    for w in &plan.warnings {
        eprintln!("[warning] {w}");
    }
}
