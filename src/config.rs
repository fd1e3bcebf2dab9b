//! Application configuration, read from the environment.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::dashboard::{presets, DashboardConfig};

pub const DATA_DIR_VAR: &str = "DASH_DATA_DIR";
pub const DASHBOARD_VAR: &str = "DASH_DASHBOARD";
pub const DASHBOARDS_FILE_VAR: &str = "DASH_DASHBOARDS_FILE";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Base directory for relative source paths and logos.
    pub data_dir: PathBuf,
    /// Dashboard shown at startup.
    pub initial_dashboard: Option<String>,
    /// JSON array of extra or replacement dashboards.
    pub dashboards_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            initial_dashboard: None,
            dashboards_file: None,
        }
    }
}

impl AppConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `DASH_DATA_DIR`: data directory (default `.`)
    /// - `DASH_DASHBOARD`: id of the dashboard to open first
    /// - `DASH_DASHBOARDS_FILE`: JSON file with more dashboards
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = non_empty(DATA_DIR_VAR) {
            cfg.data_dir = PathBuf::from(dir);
        }
        cfg.initial_dashboard = non_empty(DASHBOARD_VAR);
        cfg.dashboards_file = non_empty(DASHBOARDS_FILE_VAR).map(PathBuf::from);
        cfg
    }

    /// Built-in dashboards merged with the ones from `dashboards_file`. An
    /// entry whose id matches a built-in replaces it; others are appended.
    pub fn dashboards(&self) -> anyhow::Result<Vec<DashboardConfig>> {
        let mut all = presets::all();
        if let Some(path) = &self.dashboards_file {
            for extra in read_dashboards(path)? {
                match all.iter_mut().find(|d| d.id == extra.id) {
                    Some(slot) => *slot = extra,
                    None => all.push(extra),
                }
            }
        }
        Ok(all)
    }

    /// Index of the dashboard to open first.
    pub fn initial_index(&self, dashboards: &[DashboardConfig]) -> usize {
        self.initial_dashboard
            .as_deref()
            .and_then(|id| dashboards.iter().position(|d| d.id == id))
            .unwrap_or(0)
    }
}

fn read_dashboards(path: &Path) -> anyhow::Result<Vec<DashboardConfig>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading dashboards file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("parsing dashboards file {}", path.display()))
}
