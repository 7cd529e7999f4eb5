use crate::output::{print_json, print_table};
use artplan_cli::input::{self, ScoreInput};
use artplan_cli::settings::load_config;
use artplan_core::score_stories;
use std::path::Path;

/// Per-story failures are reported but never fail the command.
pub fn run(input_path: &Path, config_path: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let input: ScoreInput = input::load(input_path)?;
    let result = score_stories(&input.stories, &config);

    if json {
        return print_json(&result);
    }

    if result.scored_stories.is_empty() {
        println!("No stories scored.");
    } else {
        let rows: Vec<Vec<String>> = result
            .scored_stories
            .iter()
            .enumerate()
            .map(|(rank, s)| {
                vec![
                    (rank + 1).to_string(),
                    s.story.id.clone(),
                    s.story.title.clone(),
                    format!("{:.2}", s.wsjf_score),
                    format!("{:.1}", s.job_size),
                    s.story
                        .priority
                        .map(|p| p.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    s.recommended_priority.to_string(),
                ]
            })
            .collect();
        print_table(
            &["#", "ID", "TITLE", "WSJF", "JOB", "PRIORITY", "RECOMMENDED"],
            &rows,
        );
    }

    if !result.recommendations.is_empty() {
        println!();
        for rec in &result.recommendations {
            println!("  - {}", rec.message);
        }
    }
    for e in &result.errors {
        eprintln!("[error] {e}");
    }
    println!();
    println!(
        "{} scored, {} failed, average WSJF {:.2}",
        result.summary.scored_stories, result.summary.failed_stories, result.summary.average_wsjf
    );
    Ok(())
}
