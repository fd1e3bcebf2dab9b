//! Table dashboards: load a spreadsheet or CSV, derive columns, filter by the
//! side-panel selections and aggregate into charts and metrics.

pub mod app;
pub mod color;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod state;
pub mod synth;
pub mod ui;
