use anyhow::Context;
use artplan_core::config::PlannerConfig;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "artplan.yaml";

/// Locate the planner config file.
///
/// Priority:
/// 1. `--config` flag / `ARTPLAN_CONFIG` env var (passed in as `explicit`)
/// 2. Walk upward from `start` looking for `artplan.yaml`
/// 3. None: built-in defaults apply
pub fn resolve_config_path(explicit: Option<&Path>, start: &Path) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}

pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<PlannerConfig> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    match resolve_config_path(explicit, &cwd) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading planner config");
            PlannerConfig::load(&path)
                .with_context(|| format!("failed to load config {}", path.display()))
        }
        None => Ok(PlannerConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_path_wins() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{}").unwrap();
        let explicit = dir.path().join("other.yaml");
        let found = resolve_config_path(Some(&explicit), dir.path());
        assert_eq!(found, Some(explicit));
    }

    #[test]
    fn finds_config_in_parent() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{}").unwrap();
        let deep = dir.path().join("plans/q1");
        std::fs::create_dir_all(&deep).unwrap();

        let found = resolve_config_path(None, &deep);
        assert_eq!(found, Some(dir.path().join(CONFIG_FILE)));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = load_config(Some(&dir.path().join("nope.yaml"))).unwrap_err();
        assert!(format!("{err:#}").contains("failed to load config"));
    }
}
