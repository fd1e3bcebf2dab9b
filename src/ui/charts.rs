use std::f32::consts::TAU;
use std::ops::RangeInclusive;

use eframe::egui::{self, Align2, Color32, FontId, RichText, ScrollArea, Sense, Shape, Stroke, Ui};
use egui_plot::{
    Bar, BarChart, BoxElem, BoxPlot, BoxSpread, GridMark, Legend, Line, Plot, PlotPoints, Points,
    VLine,
};

use crate::color::{self, ColorMap};
use crate::dashboard::chart::{BoxEntry, ChartData, GroupedStyle, Series};
use crate::dashboard::metric::MetricReading;
use crate::dashboard::view::{DashboardView, RenderedChart};
use crate::data::aggregate::GroupedResult;
use crate::data::error::QueryError;
use crate::data::model::Table;
use crate::data::stats::{Histogram, Matrix};
use crate::state::AppState;

const CHART_HEIGHT: f32 = 300.0;

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render the active dashboard: title, metric cards, then every chart.
pub fn dashboard(ui: &mut Ui, state: &AppState) {
    let Some(config) = state.dashboard() else {
        centered_message(ui, "Nenhum dashboard configurado.");
        return;
    };

    ui.heading(&config.title);
    if let Some(subtitle) = &config.subtitle {
        ui.label(RichText::new(subtitle).weak());
    }
    ui.separator();

    let view = match &state.view {
        Some(view) => view,
        None => {
            let msg = state
                .status_message
                .clone()
                .unwrap_or_else(|| "Abra um arquivo  (File → Open…)".to_string());
            centered_message(ui, &msg);
            return;
        }
    };

    match view {
        DashboardView::NoData(message) => {
            ui.label(RichText::new(message).color(Color32::from_rgb(230, 160, 20)).strong());
        }
        DashboardView::Ready { metrics, charts } => {
            ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui: &mut Ui| {
                    if !metrics.is_empty() {
                        metric_row(ui, metrics);
                        ui.separator();
                    }
                    for (i, chart) in charts.iter().enumerate() {
                        chart_section(ui, i, chart);
                        ui.add_space(12.0);
                    }
                });
        }
    }
}

fn centered_message(ui: &mut Ui, text: &str) {
    ui.centered_and_justified(|ui: &mut Ui| {
        ui.heading(text);
    });
}

fn metric_row(ui: &mut Ui, metrics: &[Result<MetricReading, QueryError>]) {
    ui.columns(metrics.len(), |cols: &mut [Ui]| {
        for (col, metric) in cols.iter_mut().zip(metrics) {
            col.group(|ui: &mut Ui| match metric {
                Ok(m) => {
                    let label = ui.label(&m.label);
                    if let Some(help) = &m.help {
                        label.on_hover_text(help);
                    }
                    ui.label(RichText::new(&m.text).size(26.0).strong());
                }
                Err(e) => {
                    ui.label(RichText::new(e.to_string()).color(Color32::RED));
                }
            });
        }
    });
}

fn chart_section(ui: &mut Ui, index: usize, chart: &RenderedChart) {
    ui.strong(&chart.title);
    let id = format!("chart_{index}");
    match &chart.data {
        Err(e) => {
            ui.label(RichText::new(format!("Erro: {e}")).color(Color32::RED));
        }
        Ok(ChartData::Empty(message)) => {
            ui.label(RichText::new(message).italics());
        }
        Ok(ChartData::Grouped { style, result }) => match style {
            GroupedStyle::Bar => bar_chart(ui, &id, result, false),
            GroupedStyle::HorizontalBar => bar_chart(ui, &id, result, true),
            GroupedStyle::Line => line_chart(ui, &id, result),
            GroupedStyle::Pie => pie_chart(ui, result),
            GroupedStyle::Table => grouped_table(ui, &id, result),
        },
        Ok(ChartData::Heatmap(matrix)) => heatmap(ui, &id, matrix, false),
        Ok(ChartData::Correlation(matrix)) => heatmap(ui, &id, matrix, true),
        Ok(ChartData::Histogram { series, reference }) => histogram(ui, &id, series, *reference),
        Ok(ChartData::Points {
            x_label,
            y_label,
            series,
        }) => scatter(ui, &id, x_label, y_label, series),
        Ok(ChartData::Boxes(entries)) => box_plot(ui, &id, entries),
        Ok(ChartData::Preview(table)) => preview(ui, &id, table),
    }
}

// ---------------------------------------------------------------------------
// Category axes
// ---------------------------------------------------------------------------

/// Category labels and series of a grouped result. One key: a single series.
/// Two keys: one series per first-key value, second key on the axis.
struct Categorical {
    categories: Vec<String>,
    /// (series name, value per category)
    series: Vec<(String, Vec<Option<f64>>)>,
}

fn categorical(result: &GroupedResult) -> Categorical {
    let split = result.group_by.len() >= 2;
    let category_of = |key: &[crate::data::model::CellValue]| {
        if split {
            key[1..].iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" / ")
        } else {
            key.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" / ")
        }
    };

    let mut categories: Vec<String> = Vec::new();
    for g in &result.groups {
        let c = category_of(&g.key);
        if !categories.contains(&c) {
            categories.push(c);
        }
    }

    let mut series: Vec<(String, Vec<Option<f64>>)> = Vec::new();
    for g in &result.groups {
        let name = if split { g.key[0].to_string() } else { String::new() };
        let idx = match series.iter().position(|(n, _)| *n == name) {
            Some(i) => i,
            None => {
                series.push((name, vec![None; categories.len()]));
                series.len() - 1
            }
        };
        if let Some(pos) = categories.iter().position(|c| *c == category_of(&g.key)) {
            series[idx].1[pos] = g.value.as_f64();
        }
    }
    Categorical { categories, series }
}

fn category_formatter(labels: Vec<String>) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String {
    move |mark: GridMark, _range: &RangeInclusive<f64>| {
        let i = mark.value.round();
        if (mark.value - i).abs() > 1e-6 || i < 0.0 {
            return String::new();
        }
        labels.get(i as usize).cloned().unwrap_or_default()
    }
}

fn bar_chart(ui: &mut Ui, id: &str, result: &GroupedResult, horizontal: bool) {
    let data = categorical(result);
    let colors = ColorMap::new(data.series.iter().map(|(n, _)| n.as_str()));
    let n_series = data.series.len().max(1) as f64;
    let width = 0.8 / n_series;

    let mut plot = Plot::new(id.to_string())
        .height(CHART_HEIGHT)
        .allow_scroll(false)
        .allow_drag(false);
    if n_series > 1.0 {
        plot = plot.legend(Legend::default());
    }
    plot = if horizontal {
        plot.y_axis_formatter(category_formatter(data.categories.clone()))
    } else {
        plot.x_axis_formatter(category_formatter(data.categories.clone()))
    };

    plot.show(ui, |plot_ui| {
        for (s, (name, values)) in data.series.iter().enumerate() {
            let offset = (s as f64 - (n_series - 1.0) / 2.0) * width;
            let bars: Vec<Bar> = values
                .iter()
                .enumerate()
                .filter_map(|(c, v)| {
                    Some(
                        Bar::new(c as f64 + offset, (*v)?)
                            .name(&data.categories[c])
                            .width(width * 0.95),
                    )
                })
                .collect();
            let mut chart = BarChart::new(name, bars).color(colors.color_for(name));
            if horizontal {
                chart = chart.horizontal();
            }
            plot_ui.bar_chart(chart);
        }
    });
}

fn line_chart(ui: &mut Ui, id: &str, result: &GroupedResult) {
    let data = categorical(result);
    let colors = ColorMap::new(data.series.iter().map(|(n, _)| n.as_str()));
    Plot::new(id.to_string())
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .x_axis_formatter(category_formatter(data.categories.clone()))
        .show(ui, |plot_ui| {
            for (name, values) in &data.series {
                let points: Vec<[f64; 2]> = values
                    .iter()
                    .enumerate()
                    .filter_map(|(c, v)| Some([c as f64, (*v)?]))
                    .collect();
                let color = colors.color_for(name);
                plot_ui.line(
                    Line::new(name, PlotPoints::new(points.clone()))
                        .color(color)
                        .width(2.0),
                );
                plot_ui.points(Points::new("", PlotPoints::new(points)).radius(3.0).color(color));
            }
        });
}

fn pie_chart(ui: &mut Ui, result: &GroupedResult) {
    let slices: Vec<(String, f64)> = result
        .groups
        .iter()
        .filter_map(|g| Some((g.label(), g.value.as_f64()?)))
        .filter(|(_, v)| *v > 0.0)
        .collect();
    let total: f64 = slices.iter().map(|(_, v)| v).sum();
    if total <= 0.0 {
        ui.label(RichText::new("Sem valores positivos para exibir.").italics());
        return;
    }
    let colors = ColorMap::new(slices.iter().map(|(l, _)| l.as_str()));

    ui.horizontal(|ui: &mut Ui| {
        let size = CHART_HEIGHT * 0.8;
        let (rect, _) = ui.allocate_exact_size(egui::vec2(size, size), Sense::hover());
        let painter = ui.painter_at(rect);
        let center = rect.center();
        let radius = size * 0.48;

        let mut start = -TAU / 4.0;
        for (label, value) in &slices {
            let sweep = (value / total) as f32 * TAU;
            let steps = ((sweep / 0.05).ceil() as usize).max(1);
            let color = colors.color_for(label);
            for s in 0..steps {
                let a0 = start + sweep * s as f32 / steps as f32;
                let a1 = start + sweep * (s + 1) as f32 / steps as f32;
                let p0 = center + radius * egui::vec2(a0.cos(), a0.sin());
                let p1 = center + radius * egui::vec2(a1.cos(), a1.sin());
                painter.add(Shape::convex_polygon(vec![center, p0, p1], color, Stroke::NONE));
            }
            start += sweep;
        }
        // Donut hole.
        painter.circle_filled(center, radius * 0.3, ui.visuals().panel_fill);

        ui.vertical(|ui: &mut Ui| {
            for (label, value) in &slices {
                ui.horizontal(|ui: &mut Ui| {
                    let (swatch, _) =
                        ui.allocate_exact_size(egui::vec2(12.0, 12.0), Sense::hover());
                    ui.painter().rect_filled(swatch, 2.0, colors.color_for(label));
                    ui.label(format!("{label}  {:.1}%", value / total * 100.0));
                });
            }
        });
    });
}

fn grouped_table(ui: &mut Ui, id: &str, result: &GroupedResult) {
    let measure = match &result.measure {
        Some(m) => format!("{} ({})", m, result.op),
        None => result.op.to_string(),
    };
    ScrollArea::vertical()
        .id_salt(id)
        .max_height(CHART_HEIGHT)
        .show(ui, |ui: &mut Ui| {
            egui::Grid::new(id).striped(true).show(ui, |ui: &mut Ui| {
                for column in &result.group_by {
                    ui.strong(column);
                }
                ui.strong(measure);
                ui.end_row();
                for g in &result.groups {
                    for v in &g.key {
                        ui.label(v.to_string());
                    }
                    ui.label(g.value.to_string());
                    ui.end_row();
                }
            });
        });
}

// ---------------------------------------------------------------------------
// Matrices
// ---------------------------------------------------------------------------

fn heatmap(ui: &mut Ui, id: &str, matrix: &Matrix, diverging: bool) {
    let (lo, hi) = matrix.range().unwrap_or((0.0, 1.0));
    let cell = egui::vec2(72.0, 28.0);
    ScrollArea::horizontal().id_salt(id).show(ui, |ui: &mut Ui| {
        egui::Grid::new(id).spacing([2.0, 2.0]).show(ui, |ui: &mut Ui| {
            ui.label("");
            for col in &matrix.col_labels {
                ui.strong(col);
            }
            ui.end_row();
            for (r, row_label) in matrix.row_labels.iter().enumerate() {
                ui.strong(row_label);
                for value in &matrix.values[r] {
                    let (rect, resp) = ui.allocate_exact_size(cell, Sense::hover());
                    let (fill, text) = match value {
                        Some(v) => {
                            let fill = if diverging {
                                color::diverging(*v)
                            } else if hi > lo {
                                color::sequential((v - lo) / (hi - lo))
                            } else {
                                color::sequential(0.5)
                            };
                            (fill, format!("{v:.2}"))
                        }
                        None => (Color32::TRANSPARENT, "–".to_string()),
                    };
                    ui.painter().rect_filled(rect, 2.0, fill);
                    ui.painter().text(
                        rect.center(),
                        Align2::CENTER_CENTER,
                        &text,
                        FontId::proportional(12.0),
                        Color32::BLACK,
                    );
                    resp.on_hover_text(text);
                }
                ui.end_row();
            }
        });
    });
}

// ---------------------------------------------------------------------------
// Distributions
// ---------------------------------------------------------------------------

fn histogram(ui: &mut Ui, id: &str, series: &[Series<Histogram>], reference: Option<f64>) {
    let colors = ColorMap::new(series.iter().map(|s| s.name.as_str()));
    Plot::new(id.to_string())
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .show(ui, |plot_ui| {
            let mut stacked: Vec<f64> = Vec::new();
            for s in series {
                let width = s.data.bin_width();
                if stacked.len() < s.data.counts.len() {
                    stacked.resize(s.data.counts.len(), 0.0);
                }
                let bars: Vec<Bar> = s
                    .data
                    .counts
                    .iter()
                    .enumerate()
                    .map(|(i, &count)| {
                        let mid = s.data.edges[i] + width / 2.0;
                        let bar = Bar::new(mid, count as f64).width(width).base_offset(stacked[i]);
                        stacked[i] += count as f64;
                        bar
                    })
                    .collect();
                plot_ui.bar_chart(
                    BarChart::new(&s.name, bars)
                        .color(colors.color_for(&s.name)),
                );
            }
            if let Some(x) = reference {
                plot_ui.vline(VLine::new(format!("referência = {x}"), x).color(Color32::RED));
            }
        });
}

fn scatter(ui: &mut Ui, id: &str, x_label: &str, y_label: &str, series: &[Series<Vec<[f64; 2]>>]) {
    let colors = ColorMap::new(series.iter().map(|s| s.name.as_str()));
    Plot::new(id.to_string())
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .x_axis_label(x_label)
        .y_axis_label(y_label)
        .show(ui, |plot_ui| {
            for s in series {
                plot_ui.points(
                    Points::new(&s.name, PlotPoints::new(s.data.clone()))
                        .radius(2.0)
                        .color(colors.color_for(&s.name).gamma_multiply(0.7)),
                );
            }
        });
}

fn box_plot(ui: &mut Ui, id: &str, entries: &[BoxEntry]) {
    let mut groups: Vec<&str> = Vec::new();
    let mut series: Vec<&str> = Vec::new();
    for e in entries {
        if !groups.contains(&e.group.as_str()) {
            groups.push(&e.group);
        }
        let s = e.series.as_deref().unwrap_or("");
        if !series.contains(&s) {
            series.push(s);
        }
    }
    let colors = ColorMap::new(series.iter().copied());
    let n_series = series.len().max(1) as f64;
    let width = 0.8 / n_series;

    Plot::new(id.to_string())
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .x_axis_formatter(category_formatter(groups.iter().map(|g| g.to_string()).collect()))
        .show(ui, |plot_ui| {
            for (s, name) in series.iter().enumerate() {
                let offset = (s as f64 - (n_series - 1.0) / 2.0) * width;
                let elems: Vec<BoxElem> = entries
                    .iter()
                    .filter(|e| e.series.as_deref().unwrap_or("") == *name)
                    .filter_map(|e| {
                        let g = groups.iter().position(|g| *g == e.group)?;
                        let f = e.summary;
                        let spread = BoxSpread::new(f.min, f.q1, f.median, f.q3, f.max);
                        Some(
                            BoxElem::new(g as f64 + offset, spread)
                                .name(&e.group)
                                .box_width(width * 0.9),
                        )
                    })
                    .collect();
                plot_ui.box_plot(BoxPlot::new(*name, elems).color(colors.color_for(name)));
            }
        });
}

// ---------------------------------------------------------------------------
// Raw rows
// ---------------------------------------------------------------------------

fn preview(ui: &mut Ui, id: &str, table: &Table) {
    ScrollArea::horizontal().id_salt(id).show(ui, |ui: &mut Ui| {
        egui::Grid::new(id).striped(true).show(ui, |ui: &mut Ui| {
            for name in table.column_names() {
                ui.strong(name);
            }
            ui.end_row();
            for row in 0..table.len() {
                for name in table.column_names() {
                    ui.label(table.value(row, name).to_string());
                }
                ui.end_row();
            }
        });
    });
}
