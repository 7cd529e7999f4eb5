use crate::output::{print_json, print_table};
use artplan_cli::input::{self, IterationsInput};
use artplan_cli::settings::load_config;
use artplan_core::build_iterations;
use std::path::Path;

pub fn run(input_path: &Path, config_path: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let input: IterationsInput = input::load(input_path)?;
    let schedule = build_iterations(&input.program_increment, &input.teams, &config)?;

    if json {
        return print_json(&schedule);
    }

    let rows: Vec<Vec<String>> = schedule
        .iterations
        .iter()
        .map(|it| {
            vec![
                it.name.clone(),
                it.start_date.to_string(),
                it.end_date.to_string(),
                format!("{}{}", it.days(), if it.partial { " (partial)" } else { "" }),
            ]
        })
        .collect();
    print_table(&["ITERATION", "START", "END", "DAYS"], &rows);

    if let Some(first) = schedule.iterations.first() {
        if !first.team_capacity.is_empty() {
            println!();
            let rows: Vec<Vec<String>> = first
                .team_capacity
                .iter()
                .map(|t| {
                    vec![
                        t.team_name.clone(),
                        format!("{:.1}", t.available),
                        format!("{:.1}", t.ceiling),
                    ]
                })
                .collect();
            print_table(&["TEAM", "AVAILABLE", "CEILING"], &rows);
        }
    }
    for w in &schedule.warnings {
        eprintln!("[warning] {w}");
    }
    Ok(())
}
