pub mod analyzer;
pub mod config;
pub mod error;
pub mod graph;
pub mod iteration;
pub mod keywords;
pub mod model;
pub mod plan;
pub mod planner;
pub mod types;
pub mod wsjf;

pub use analyzer::build_graph;
pub use config::PlannerConfig;
pub use error::{PlanError, Result};
pub use iteration::build_iterations;
pub use planner::{plan_art, ArtPlanner};
pub use wsjf::{score_stories, score_story, WsjfScorer};
