//! Dashboards as data: each one is a source, its derived columns, the filter
//! controls shown in the side panel and the metrics and charts evaluated over
//! the filtered table.

pub mod chart;
pub mod metric;
pub mod presets;
pub mod selection;
pub mod view;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::data::derive::DerivedColumn;
use crate::data::pipeline::SourceSpec;
use chart::ChartSpec;
use metric::MetricSpec;

/// A side-panel control bound to one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterControl {
    /// Checkbox per distinct value, all ticked initially.
    MultiSelect { column: String, label: String },
    /// Start/end day pickers spanning the column's dates.
    DateRange { column: String, label: String },
    /// Min/max drag values spanning the column's numbers.
    NumericRange { column: String, label: String },
}

impl FilterControl {
    pub fn multi_select(column: &str, label: &str) -> Self {
        FilterControl::MultiSelect {
            column: column.to_string(),
            label: label.to_string(),
        }
    }

    pub fn date_range(column: &str, label: &str) -> Self {
        FilterControl::DateRange {
            column: column.to_string(),
            label: label.to_string(),
        }
    }

    pub fn numeric_range(column: &str, label: &str) -> Self {
        FilterControl::NumericRange {
            column: column.to_string(),
            label: label.to_string(),
        }
    }

    pub fn column(&self) -> &str {
        match self {
            FilterControl::MultiSelect { column, .. }
            | FilterControl::DateRange { column, .. }
            | FilterControl::NumericRange { column, .. } => column,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            FilterControl::MultiSelect { label, .. }
            | FilterControl::DateRange { label, .. }
            | FilterControl::NumericRange { label, .. } => label,
        }
    }
}

fn default_empty_message() -> String {
    "Nenhum dado encontrado para os filtros selecionados.".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    /// Image shown at the top of the side panel, relative to the data directory.
    #[serde(default)]
    pub logo: Option<PathBuf>,
    pub source: SourceSpec,
    #[serde(default)]
    pub derived: Vec<DerivedColumn>,
    #[serde(default)]
    pub filters: Vec<FilterControl>,
    #[serde(default)]
    pub metrics: Vec<MetricSpec>,
    #[serde(default)]
    pub charts: Vec<ChartSpec>,
    /// Show only `empty_message` when the filters leave no rows.
    #[serde(default)]
    pub halt_on_empty: bool,
    #[serde(default = "default_empty_message")]
    pub empty_message: String,
}

impl DashboardConfig {
    pub fn new(id: &str, title: &str, source: SourceSpec) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            subtitle: None,
            logo: None,
            source,
            derived: Vec::new(),
            filters: Vec::new(),
            metrics: Vec::new(),
            charts: Vec::new(),
            halt_on_empty: false,
            empty_message: default_empty_message(),
        }
    }
}
