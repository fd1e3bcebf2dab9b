use chrono::{Datelike, NaiveDate};
use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::dashboard::selection::Selection;
use crate::data::model::CellValue;
use crate::state::AppState;

/// A change requested by a side-panel widget, applied after drawing.
enum Edit {
    Toggle(String, CellValue),
    SelectAll(String),
    Clear(String),
    Dates(String, NaiveDate, NaiveDate),
    Numbers(String, f64, f64),
}

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    // ---- Logo (centered) ----
    if let Some(uri) = state.logo_uri() {
        ui.vertical_centered(|ui: &mut Ui| {
            ui.add(
                egui::Image::new(uri)
                    .max_width(ui.available_width() * 0.8)
                    .max_height(120.0)
                    .corner_radius(4.0),
            );
        });
        ui.add_space(4.0);
    }

    ui.heading("Filtros");
    ui.separator();

    if state.table.is_none() {
        ui.label("Nenhum dado carregado.");
        return;
    }

    let mut edits = Vec::new();
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for (control, selection) in state.selections.entries() {
                let column = control.column().to_string();
                match selection {
                    Selection::Values { options, selected } => {
                        let header = format!(
                            "{}  ({}/{})",
                            control.label(),
                            selected.len(),
                            options.len()
                        );
                        egui::CollapsingHeader::new(RichText::new(header).strong())
                            .id_salt(&column)
                            .default_open(options.len() <= 6)
                            .show(ui, |ui: &mut Ui| {
                                ui.horizontal(|ui: &mut Ui| {
                                    if ui.small_button("Todos").clicked() {
                                        edits.push(Edit::SelectAll(column.clone()));
                                    }
                                    if ui.small_button("Nenhum").clicked() {
                                        edits.push(Edit::Clear(column.clone()));
                                    }
                                });
                                for val in options {
                                    let mut checked = selected.contains(val);
                                    if ui.checkbox(&mut checked, val.to_string()).changed() {
                                        edits.push(Edit::Toggle(column.clone(), val.clone()));
                                    }
                                }
                            });
                    }
                    Selection::Dates { bounds, start, end } => {
                        ui.strong(control.label());
                        let (mut from, mut to) = (*start, *end);
                        // Picks outside the data's first and last day are clamped on apply.
                        let years = bounds.0.year()..=bounds.1.year();
                        let (from_id, to_id) = (format!("{column}_from"), format!("{column}_to"));
                        let mut changed = false;
                        ui.horizontal(|ui: &mut Ui| {
                            ui.label("De");
                            let picker = DatePickerButton::new(&mut from)
                                .id_salt(&from_id)
                                .start_end_years(years.clone());
                            changed |= ui.add(picker).changed();
                        });
                        ui.horizontal(|ui: &mut Ui| {
                            ui.label("Até");
                            let picker = DatePickerButton::new(&mut to)
                                .id_salt(&to_id)
                                .start_end_years(years.clone());
                            changed |= ui.add(picker).changed();
                        });
                        ui.small(format!("{} – {}", bounds.0, bounds.1));
                        if changed {
                            edits.push(Edit::Dates(column.clone(), from, to));
                        }
                    }
                    Selection::Numbers { bounds, min, max } => {
                        ui.strong(control.label());
                        let (mut lo, mut hi) = (*min, *max);
                        let speed = ((bounds.1 - bounds.0) / 200.0).max(0.01);
                        let changed = ui
                            .horizontal(|ui: &mut Ui| {
                                let a = ui.add(
                                    egui::DragValue::new(&mut lo).range(bounds.0..=hi).speed(speed),
                                );
                                ui.label("até");
                                let b = ui.add(
                                    egui::DragValue::new(&mut hi).range(lo..=bounds.1).speed(speed),
                                );
                                a.changed() || b.changed()
                            })
                            .inner;
                        if changed {
                            edits.push(Edit::Numbers(column.clone(), lo, hi));
                        }
                    }
                    Selection::Unavailable => {
                        ui.label(RichText::new(format!("{}: sem valores", control.label())).weak());
                    }
                }
                ui.add_space(6.0);
            }
        });

    for edit in edits {
        match edit {
            Edit::Toggle(col, val) => state.toggle_filter_value(&col, &val),
            Edit::SelectAll(col) => state.select_all(&col),
            Edit::Clear(col) => state.select_none(&col),
            Edit::Dates(col, from, to) => state.set_dates(&col, from, to),
            Edit::Numbers(col, lo, hi) => state.set_numbers(&col, lo, hi),
        }
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Reload").clicked() {
                state.reload();
                ui.close_menu();
            }
        });

        ui.separator();

        let current = state.dashboard().map(|d| d.title.clone()).unwrap_or_default();
        let mut chosen = None;
        egui::ComboBox::from_id_salt("dashboard")
            .selected_text(current)
            .show_ui(ui, |ui: &mut Ui| {
                for (i, d) in state.dashboards.iter().enumerate() {
                    if ui.selectable_label(i == state.active, &d.title).clicked() {
                        chosen = Some(i);
                    }
                }
            });
        if let Some(i) = chosen {
            state.activate(i);
        }

        ui.separator();

        if state.table.is_some() {
            ui.label(format!(
                "{} rows loaded, {} visible, {} dropped",
                state.loaded_rows(),
                state.visible_rows,
                state.dropped_rows()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open table data")
        .add_filter(
            "Supported files",
            &["csv", "xlsx", "xlsm", "xls", "ods", "json", "parquet", "pq"],
        )
        .add_filter("Spreadsheet", &["xlsx", "xlsm", "xls", "ods"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .set_directory(&state.config.data_dir)
        .pick_file();

    if let Some(path) = file {
        log::info!("opening {}", path.display());
        state.open_file(path);
    }
}
