use std::path::PathBuf;

use chrono::NaiveDate;

use crate::config::AppConfig;
use crate::dashboard::selection::FilterSelections;
use crate::dashboard::view::{evaluate_dashboard, DashboardView};
use crate::dashboard::DashboardConfig;
use crate::data::cache::TableCache;
use crate::data::filter::filter;
use crate::data::model::{CellValue, Table};
use crate::data::pipeline::load_source;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: AppConfig,
    pub dashboards: Vec<DashboardConfig>,
    /// Index into `dashboards` of the one on screen.
    pub active: usize,

    cache: TableCache,

    /// Loaded and derived table of the active dashboard (None if loading failed).
    pub table: Option<Table>,

    /// Side-panel selections of the active dashboard.
    pub selections: FilterSelections,

    /// Rows passing the current selections.
    pub visible_rows: usize,

    /// Metrics and charts for the current selections.
    pub view: Option<DashboardView>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: AppConfig, dashboards: Vec<DashboardConfig>) -> Self {
        let active = config.initial_index(&dashboards);
        let mut state = Self {
            config,
            dashboards,
            active,
            cache: TableCache::new(),
            table: None,
            selections: FilterSelections::default(),
            visible_rows: 0,
            view: None,
            status_message: None,
        };
        state.reload();
        state
    }

    pub fn dashboard(&self) -> Option<&DashboardConfig> {
        self.dashboards.get(self.active)
    }

    /// Switch to another dashboard and load its data.
    pub fn activate(&mut self, index: usize) {
        if index < self.dashboards.len() && index != self.active {
            self.active = index;
            self.reload();
        }
    }

    /// (Re)load the active dashboard's source and reset its selections.
    pub fn reload(&mut self) {
        self.table = None;
        self.view = None;
        self.visible_rows = 0;
        self.selections = FilterSelections::default();

        let Some(dashboard) = self.dashboards.get(self.active) else {
            self.status_message = Some("No dashboards configured.".to_string());
            return;
        };

        match load_source(
            &mut self.cache,
            &self.config.data_dir,
            &dashboard.source,
            &dashboard.derived,
        ) {
            Ok(table) => {
                log::info!(
                    "dashboard '{}': {} rows ({} dropped)",
                    dashboard.id,
                    table.len(),
                    table.dropped_rows()
                );
                self.selections = FilterSelections::init(&dashboard.filters, &table);
                self.table = Some(table);
                self.status_message = None;
                self.refilter();
            }
            Err(e) => {
                log::error!("dashboard '{}': {e}", dashboard.id);
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Point the active dashboard at another file and reload it.
    pub fn open_file(&mut self, path: PathBuf) {
        if let Some(dashboard) = self.dashboards.get_mut(self.active) {
            dashboard.source.path = path;
            dashboard.source.generate_if_missing = None;
        }
        self.reload();
    }

    /// Recompute the filtered view after a selection change.
    pub fn refilter(&mut self) {
        let (Some(table), Some(dashboard)) = (&self.table, self.dashboards.get(self.active)) else {
            return;
        };
        let filtered = filter(table, &self.selections.to_predicates());
        self.visible_rows = filtered.len();
        self.view = Some(evaluate_dashboard(dashboard, &filtered));
    }

    pub fn loaded_rows(&self) -> usize {
        self.table.as_ref().map_or(0, Table::len)
    }

    pub fn dropped_rows(&self) -> usize {
        self.table.as_ref().map_or(0, Table::dropped_rows)
    }

    /// `file://` URI of the active dashboard's logo, if the file exists.
    pub fn logo_uri(&self) -> Option<String> {
        let logo = self.dashboard()?.logo.as_ref()?;
        let path = self.config.data_dir.join(logo);
        let path = path.canonicalize().ok()?;
        Some(format!("file://{}", path.display()))
    }

    // -- selection edits, each followed by a refilter --

    /// Toggle a single value in a column's multi-select.
    pub fn toggle_filter_value(&mut self, column: &str, value: &CellValue) {
        self.selections.toggle(column, value);
        self.refilter();
    }

    /// Select all values in a column.
    pub fn select_all(&mut self, column: &str) {
        self.selections.select_all(column);
        self.refilter();
    }

    /// Deselect all values in a column.
    pub fn select_none(&mut self, column: &str) {
        self.selections.select_none(column);
        self.refilter();
    }

    pub fn set_dates(&mut self, column: &str, start: NaiveDate, end: NaiveDate) {
        self.selections.set_dates(column, start, end);
        self.refilter();
    }

    pub fn set_numbers(&mut self, column: &str, min: f64, max: f64) {
        self.selections.set_numbers(column, min, max);
        self.refilter();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::presets;
    use crate::synth::SampleKind;

    fn state_in(dir: &std::path::Path) -> AppState {
        let mut credit = presets::credit();
        credit.source.generate_if_missing = Some(SampleKind::credit(120).with_seed(42));
        let config = AppConfig {
            data_dir: dir.to_path_buf(),
            ..AppConfig::default()
        };
        AppState::new(config, vec![credit, presets::sales_questions()])
    }

    #[test]
    fn loads_and_filters_active_dashboard() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state_in(dir.path());
        assert_eq!(state.loaded_rows(), 120);
        assert_eq!(state.visible_rows, 120);
        assert!(matches!(state.view, Some(DashboardView::Ready { .. })));

        state.select_none("ESTADO_CIVIL");
        assert_eq!(state.visible_rows, 0);
        assert!(matches!(state.view, Some(DashboardView::NoData(_))));

        state.select_all("ESTADO_CIVIL");
        state.set_numbers("IDADE", 18.0, 30.0);
        assert!(state.visible_rows < 120);
    }

    #[test]
    fn missing_file_halts_with_one_message() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state_in(dir.path());
        state.activate(1);
        assert!(state.table.is_none());
        assert!(state.view.is_none());
        let msg = state.status_message.clone().unwrap();
        assert!(msg.contains("vendas_eletronicos.csv"), "{msg}");

        state.activate(0);
        assert!(state.status_message.is_none());
        assert_eq!(state.loaded_rows(), 120);
    }
}
