//! Input documents read by the CLI commands. Files ending in `.json` are
//! parsed as JSON, anything else as YAML.

use anyhow::Context;
use artplan_core::graph::DependencyEdge;
use artplan_core::model::{ArtTeam, PlanningWorkItem, ProgramIncrement};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;

/// `artplan plan`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanInput {
    pub program_increment: ProgramIncrement,
    #[serde(default)]
    pub work_items: Vec<PlanningWorkItem>,
    #[serde(default)]
    pub dependencies: Vec<DependencyEdge>,
    #[serde(default)]
    pub teams: Vec<ArtTeam>,
    /// Graph nodes outside this PI's work items (e.g. other trains' items).
    #[serde(default)]
    pub external_items: Vec<PlanningWorkItem>,
}

/// `artplan score`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreInput {
    #[serde(default)]
    pub stories: Vec<PlanningWorkItem>,
}

/// `artplan graph`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphInput {
    #[serde(default)]
    pub work_items: Vec<PlanningWorkItem>,
    #[serde(default)]
    pub dependencies: Vec<DependencyEdge>,
}

/// `artplan iterations`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationsInput {
    pub program_increment: ProgramIncrement,
    #[serde(default)]
    pub teams: Vec<ArtTeam>,
}

pub fn load<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse(path, &data).with_context(|| format!("failed to parse {}", path.display()))
}

fn parse<T: DeserializeOwned>(path: &Path, data: &str) -> anyhow::Result<T> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        Ok(serde_json::from_str(data)?)
    } else {
        Ok(serde_yaml::from_str(data)?)
    }
}
