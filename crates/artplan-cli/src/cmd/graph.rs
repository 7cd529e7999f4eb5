use crate::output::{print_json, print_table};
use artplan_cli::input::{self, GraphInput};
use artplan_cli::settings::load_config;
use artplan_core::build_graph;
use artplan_core::graph::DependencyGraph;
use std::path::Path;

pub fn run(input_path: &Path, config_path: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let input: GraphInput = input::load(input_path)?;
    let graph = build_graph(&input.work_items, &input.dependencies, &config.graph);

    if json {
        return print_json(&graph);
    }
    print_graph(&graph);
    Ok(())
}

fn print_graph(graph: &DependencyGraph) {
    let v = &graph.validation;
    println!("Graph is {}.", if v.is_valid { "valid" } else { "invalid" });
    for (prefix, issues) in [("error", &v.errors), ("warning", &v.warnings), ("info", &v.info)] {
        for issue in issues {
            println!("[{prefix}] {}", issue.message);
        }
    }

    println!();
    if graph.critical_path.is_empty() {
        println!("Critical path: (none)");
    } else {
        println!(
            "Critical path: {} ({} points)",
            graph.critical_path.join(" -> "),
            graph.statistics.estimated_total_duration
        );
    }

    let s = &graph.statistics;
    println!();
    print_table(
        &["NODES", "EDGES", "HARD", "SOFT", "AVG DEPS", "INDEPENDENT", "LONGEST"],
        &[vec![
            s.total_nodes.to_string(),
            s.total_edges.to_string(),
            s.hard_dependencies.to_string(),
            s.soft_dependencies.to_string(),
            format!("{:.2}", s.average_dependencies),
            s.independent_items.to_string(),
            s.longest_path_length.to_string(),
        ]],
    );
}
