use serde::{Deserialize, Serialize};

use crate::data::aggregate::{AggOp, AggValue, Aggregation, GroupOrder, GroupedResult};
use crate::data::error::QueryError;
use crate::data::filter::{filter, PredicateSet};
use crate::data::model::{cell, CellValue, Table};
use crate::data::stats::{self, FiveNumber, Histogram, Matrix};

fn default_bins() -> usize {
    30
}

fn default_preview_rows() -> usize {
    5
}

/// What to draw and from which aggregation.
///
/// Grouped kinds with two group-by columns draw one series per value of the
/// first column, with the second column along the category axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartKind {
    Bar {
        aggregation: Aggregation,
    },
    HorizontalBar {
        aggregation: Aggregation,
    },
    Line {
        aggregation: Aggregation,
    },
    Pie {
        aggregation: Aggregation,
    },
    Table {
        aggregation: Aggregation,
        /// List every combination of observed key values, zero-filled.
        #[serde(default)]
        complete: bool,
    },
    /// Two-key aggregation laid out as a matrix.
    Heatmap {
        aggregation: Aggregation,
    },
    Histogram {
        column: String,
        #[serde(default = "default_bins")]
        bins: usize,
        /// Vertical marker drawn at this value.
        #[serde(default)]
        reference: Option<f64>,
        #[serde(default)]
        split_by: Option<String>,
    },
    Scatter {
        x: String,
        y: String,
        #[serde(default)]
        color_by: Option<String>,
    },
    BoxPlot {
        column: String,
        group_by: String,
        #[serde(default)]
        split_by: Option<String>,
    },
    Correlation {
        columns: Vec<String>,
    },
    /// First rows of the table as-is.
    Preview {
        #[serde(default = "default_preview_rows")]
        rows: usize,
        #[serde(default)]
        columns: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub title: String,
    /// Narrows the dashboard's filtered table for this chart only.
    #[serde(default)]
    pub filter: PredicateSet,
    pub kind: ChartKind,
    /// Shown instead of the chart when no rows reach it.
    #[serde(default)]
    pub empty_message: Option<String>,
}

impl ChartSpec {
    pub fn new(title: &str, kind: ChartKind) -> Self {
        Self {
            title: title.to_string(),
            filter: PredicateSet::new(),
            kind,
            empty_message: None,
        }
    }

    pub fn filtered(mut self, filter: PredicateSet) -> Self {
        self.filter = filter;
        self
    }

    pub fn when_empty(mut self, message: &str) -> Self {
        self.empty_message = Some(message.to_string());
        self
    }
}

// ---------------------------------------------------------------------------
// Evaluated chart data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupedStyle {
    Bar,
    HorizontalBar,
    Line,
    Pie,
    Table,
}

/// One named series of a split chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Series<T> {
    pub name: String,
    pub data: T,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxEntry {
    pub group: String,
    pub series: Option<String>,
    pub summary: FiveNumber,
}

/// Everything the UI needs to draw one chart.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    /// No rows reached the chart.
    Empty(String),
    Grouped {
        style: GroupedStyle,
        result: GroupedResult,
    },
    Heatmap(Matrix),
    Histogram {
        series: Vec<Series<Histogram>>,
        reference: Option<f64>,
    },
    Points {
        x_label: String,
        y_label: String,
        series: Vec<Series<Vec<[f64; 2]>>>,
    },
    Boxes(Vec<BoxEntry>),
    Correlation(Matrix),
    Preview(Table),
}

pub const NO_DATA: &str = "Sem dados para exibir com os filtros atuais.";

/// Evaluate one chart over the dashboard's filtered table: chart filter,
/// empty check, then the kind's aggregation or statistic.
pub fn evaluate_chart(spec: &ChartSpec, table: &Table) -> Result<ChartData, QueryError> {
    let table = filter(table, &spec.filter);
    if table.is_empty() {
        let message = spec.empty_message.as_deref().unwrap_or(NO_DATA);
        return Ok(ChartData::Empty(message.to_string()));
    }

    let grouped = |style: GroupedStyle, aggregation: &Aggregation| {
        aggregation
            .evaluate(&table)
            .map(|result| ChartData::Grouped { style, result })
    };

    match &spec.kind {
        ChartKind::Bar { aggregation } => grouped(GroupedStyle::Bar, aggregation),
        ChartKind::HorizontalBar { aggregation } => {
            grouped(GroupedStyle::HorizontalBar, aggregation)
        }
        ChartKind::Line { aggregation } => grouped(GroupedStyle::Line, aggregation),
        ChartKind::Pie { aggregation } => grouped(GroupedStyle::Pie, aggregation),
        ChartKind::Table {
            aggregation,
            complete,
        } => {
            let mut result = aggregation.evaluate(&table)?;
            if *complete {
                result = result.complete(AggValue::Number(0.0));
            }
            Ok(ChartData::Grouped {
                style: GroupedStyle::Table,
                result,
            })
        }
        ChartKind::Heatmap { aggregation } => {
            Ok(ChartData::Heatmap(aggregation.evaluate(&table)?.pivot()?))
        }
        ChartKind::Histogram {
            column,
            bins,
            reference,
            split_by,
        } => histogram_chart(&table, column, *bins, *reference, split_by.as_deref()),
        ChartKind::Scatter { x, y, color_by } => scatter_chart(&table, x, y, color_by.as_deref()),
        ChartKind::BoxPlot {
            column,
            group_by,
            split_by,
        } => box_chart(&table, column, group_by, split_by.as_deref()),
        ChartKind::Correlation { columns } => {
            Ok(ChartData::Correlation(stats::correlation(&table, columns)?))
        }
        ChartKind::Preview { rows, columns } => preview(&table, *rows, columns),
    }
}

fn require_numeric(table: &Table, column: &str) -> Result<(), QueryError> {
    match table.column_type(column) {
        None => Err(QueryError::UnknownColumn(column.to_string())),
        Some(ty) if !ty.is_numeric() => Err(QueryError::NonNumeric(column.to_string())),
        Some(_) => Ok(()),
    }
}

fn require_column(table: &Table, column: &str) -> Result<(), QueryError> {
    if table.has_column(column) {
        Ok(())
    } else {
        Err(QueryError::UnknownColumn(column.to_string()))
    }
}

/// Row indices per value of `column`, in first-seen order; one unnamed
/// partition when `column` is `None`.
fn partitions(table: &Table, column: Option<&str>) -> Vec<(String, Vec<usize>)> {
    let Some(column) = column else {
        return vec![(String::new(), (0..table.len()).collect())];
    };
    let mut out: Vec<(CellValue, Vec<usize>)> = Vec::new();
    for (i, row) in table.rows().iter().enumerate() {
        let key = cell(row, column);
        match out.iter_mut().find(|(k, _)| k == key) {
            Some((_, idx)) => idx.push(i),
            None => out.push((key.clone(), vec![i])),
        }
    }
    out.into_iter().map(|(k, idx)| (k.to_string(), idx)).collect()
}

fn histogram_chart(
    table: &Table,
    column: &str,
    bins: usize,
    reference: Option<f64>,
    split_by: Option<&str>,
) -> Result<ChartData, QueryError> {
    require_numeric(table, column)?;
    if let Some(split) = split_by {
        require_column(table, split)?;
    }
    let Some(overall) = stats::histogram(&table.numeric_values(column), bins) else {
        return Ok(ChartData::Empty(NO_DATA.to_string()));
    };
    let series = partitions(table, split_by)
        .into_iter()
        .map(|(name, idx)| {
            let values: Vec<f64> = idx
                .iter()
                .filter_map(|&i| table.value(i, column).as_f64())
                .collect();
            Series {
                name,
                data: stats::histogram_on(&overall.edges, &values),
            }
        })
        .collect();
    Ok(ChartData::Histogram { series, reference })
}

fn scatter_chart(
    table: &Table,
    x: &str,
    y: &str,
    color_by: Option<&str>,
) -> Result<ChartData, QueryError> {
    require_numeric(table, x)?;
    require_numeric(table, y)?;
    if let Some(color) = color_by {
        require_column(table, color)?;
    }
    let series = partitions(table, color_by)
        .into_iter()
        .map(|(name, idx)| Series {
            name,
            data: idx
                .iter()
                .filter_map(|&i| Some([table.value(i, x).as_f64()?, table.value(i, y).as_f64()?]))
                .collect(),
        })
        .collect();
    Ok(ChartData::Points {
        x_label: x.to_string(),
        y_label: y.to_string(),
        series,
    })
}

fn box_chart(
    table: &Table,
    column: &str,
    group_by: &str,
    split_by: Option<&str>,
) -> Result<ChartData, QueryError> {
    require_numeric(table, column)?;
    let mut keys = vec![group_by];
    keys.extend(split_by);
    let key_columns: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
    let groups = Aggregation {
        group_by: key_columns,
        measure: None,
        op: AggOp::Count,
        order: GroupOrder::KeyAsc,
        limit: None,
    }
    .evaluate(table)?;

    let entries = groups
        .groups
        .iter()
        .filter_map(|g| {
            let values: Vec<f64> = table
                .rows()
                .iter()
                .filter(|row| keys.iter().zip(&g.key).all(|(k, v)| cell(row, k) == v))
                .filter_map(|row| cell(row, column).as_f64())
                .collect();
            Some(BoxEntry {
                group: g.key[0].to_string(),
                series: g.key.get(1).map(|v| v.to_string()),
                summary: stats::five_number_summary(&values)?,
            })
        })
        .collect();
    Ok(ChartData::Boxes(entries))
}

fn preview(table: &Table, rows: usize, columns: &[String]) -> Result<ChartData, QueryError> {
    if let Some(missing) = columns.iter().find(|c| !table.has_column(c)) {
        return Err(QueryError::UnknownColumn(missing.clone()));
    }
    let head = table.head(rows);
    if columns.is_empty() {
        Ok(ChartData::Preview(head))
    } else {
        Ok(ChartData::Preview(head.select_columns(columns)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::Predicate;
    use crate::data::model::tests::cat_val_table;

    fn bar(aggregation: Aggregation) -> ChartSpec {
        ChartSpec::new("t", ChartKind::Bar { aggregation })
    }

    #[test]
    fn grouped_chart_over_rows() {
        let t = cat_val_table();
        let data = evaluate_chart(&bar(Aggregation::sum(&["cat"], "val").top(1)), &t).unwrap();
        match data {
            ChartData::Grouped { style, result } => {
                assert_eq!(style, GroupedStyle::Bar);
                assert_eq!(result.groups.len(), 1);
                assert_eq!(result.groups[0].label(), "B");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_input_short_circuits() {
        let t = cat_val_table();
        let spec = bar(Aggregation::mean(&["cat"], "val"))
            .filtered(PredicateSet::new().with("cat", Predicate::one_of(["Z"])))
            .when_empty("nothing here");
        assert_eq!(
            evaluate_chart(&spec, &t).unwrap(),
            ChartData::Empty("nothing here".into())
        );
        // Even a misconfigured chart reports emptiness first.
        let broken = bar(Aggregation::sum(&["nope"], "val"))
            .filtered(PredicateSet::new().with("cat", Predicate::one_of(["Z"])));
        assert_eq!(
            evaluate_chart(&broken, &t).unwrap(),
            ChartData::Empty(NO_DATA.into())
        );
    }

    #[test]
    fn configuration_errors_surface() {
        let t = cat_val_table();
        let err = evaluate_chart(&bar(Aggregation::sum(&["nope"], "val")), &t).unwrap_err();
        assert_eq!(err, QueryError::UnknownColumn("nope".into()));
        let heat = ChartSpec::new(
            "h",
            ChartKind::Heatmap {
                aggregation: Aggregation::count(&["cat"]),
            },
        );
        assert_eq!(evaluate_chart(&heat, &t).unwrap_err(), QueryError::NotTwoKeys(1));
    }

    #[test]
    fn scatter_splits_by_colour() {
        let t = cat_val_table();
        let spec = ChartSpec::new(
            "s",
            ChartKind::Scatter {
                x: "val".into(),
                y: "val".into(),
                color_by: Some("cat".into()),
            },
        );
        match evaluate_chart(&spec, &t).unwrap() {
            ChartData::Points { series, .. } => {
                assert_eq!(series.len(), 2);
                assert_eq!(series[0].name, "A");
                assert_eq!(series[0].data, vec![[10.0, 10.0], [5.0, 5.0]]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn histogram_series_share_edges() {
        let t = cat_val_table();
        let spec = ChartSpec::new(
            "h",
            ChartKind::Histogram {
                column: "val".into(),
                bins: 3,
                reference: Some(5.0),
                split_by: Some("cat".into()),
            },
        );
        match evaluate_chart(&spec, &t).unwrap() {
            ChartData::Histogram { series, reference } => {
                assert_eq!(reference, Some(5.0));
                assert_eq!(series[0].data.edges, series[1].data.edges);
                let total: usize = series.iter().map(|s| s.data.total()).sum();
                assert_eq!(total, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn boxes_per_group() {
        let t = cat_val_table();
        let spec = ChartSpec::new(
            "b",
            ChartKind::BoxPlot {
                column: "val".into(),
                group_by: "cat".into(),
                split_by: None,
            },
        );
        match evaluate_chart(&spec, &t).unwrap() {
            ChartData::Boxes(entries) => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0].group, "A");
                assert_eq!(entries[0].summary.median, 7.5);
                assert_eq!(entries[1].summary.max, 20.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn completed_table_fills_zeroes() {
        let t = cat_val_table();
        let spec = ChartSpec::new(
            "t",
            ChartKind::Table {
                aggregation: Aggregation::new(&["cat", "val"], None, AggOp::Count),
                complete: true,
            },
        );
        match evaluate_chart(&spec, &t).unwrap() {
            ChartData::Grouped { result, .. } => assert_eq!(result.len(), 6),
            other => panic!("unexpected {other:?}"),
        }
    }
}
