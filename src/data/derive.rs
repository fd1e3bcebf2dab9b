//! Derived columns: pure functions of columns already present in a row.

use chrono::{Datelike, Weekday};
use serde::{Deserialize, Serialize};

use super::model::{cell, CellValue, ColumnType, Field, Row, Table};

/// A column computed from other columns rather than read from the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedColumn {
    pub name: String,
    pub derivation: Derivation,
    /// Rows where this column comes out missing are dropped from the table.
    #[serde(default)]
    pub required: bool,
}

impl DerivedColumn {
    pub fn new(name: &str, derivation: Derivation) -> Self {
        Self {
            name: name.to_string(),
            derivation,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Language of weekday labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekdayNames {
    #[default]
    English,
    Portuguese,
}

impl WeekdayNames {
    fn label(self, day: Weekday) -> &'static str {
        match self {
            WeekdayNames::English => match day {
                Weekday::Mon => "Monday",
                Weekday::Tue => "Tuesday",
                Weekday::Wed => "Wednesday",
                Weekday::Thu => "Thursday",
                Weekday::Fri => "Friday",
                Weekday::Sat => "Saturday",
                Weekday::Sun => "Sunday",
            },
            WeekdayNames::Portuguese => match day {
                Weekday::Mon => "Segunda-feira",
                Weekday::Tue => "Terça-feira",
                Weekday::Wed => "Quarta-feira",
                Weekday::Thu => "Quinta-feira",
                Weekday::Fri => "Sexta-feira",
                Weekday::Sat => "Sábado",
                Weekday::Sun => "Domingo",
            },
        }
    }
}

fn default_scale() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Derivation {
    /// Calendar year of a date column.
    Year { source: String },
    /// Month number (1–12).
    Month { source: String },
    /// Quarter number (1–4).
    Quarter { source: String },
    /// `YYYY-MM` text bucket.
    MonthBucket { source: String },
    Weekday {
        source: String,
        #[serde(default)]
        names: WeekdayNames,
    },
    /// `numerator / (denominator * denominator_scale)`; a zero divisor is missing.
    Ratio {
        numerator: String,
        denominator: String,
        #[serde(default = "default_scale")]
        denominator_scale: f64,
    },
    /// Right-closed intervals `(edges[i], edges[i + 1]]` labelled `labels[i]`.
    Bins {
        source: String,
        edges: Vec<f64>,
        labels: Vec<String>,
        /// Close the first interval on the left as well.
        #[serde(default)]
        include_lowest: bool,
    },
    /// Look the source value up in a fixed table; unmatched values are missing.
    MapValues {
        source: String,
        mapping: Vec<(CellValue, CellValue)>,
    },
    /// 1 when the source equals `value`, else 0 (missing stays missing).
    Equals { source: String, value: CellValue },
}

impl Derivation {
    pub fn output_type(&self) -> ColumnType {
        match self {
            Derivation::Year { .. }
            | Derivation::Month { .. }
            | Derivation::Quarter { .. }
            | Derivation::Equals { .. } => ColumnType::Int,
            Derivation::MonthBucket { .. }
            | Derivation::Weekday { .. }
            | Derivation::Bins { .. } => ColumnType::Str,
            Derivation::Ratio { .. } => ColumnType::Float,
            Derivation::MapValues { mapping, .. } => match mapping.first().map(|(_, v)| v) {
                Some(CellValue::Int(_)) => ColumnType::Int,
                Some(CellValue::Float(_)) => ColumnType::Float,
                Some(CellValue::Date(_)) => ColumnType::Date,
                _ => ColumnType::Str,
            },
        }
    }

    /// Compute the value for one row. Never fails: bad input gives `Null`.
    pub fn apply(&self, row: &Row) -> CellValue {
        match self {
            Derivation::Year { source } => date_part(row, source, |d| d.year() as i64),
            Derivation::Month { source } => date_part(row, source, |d| d.month() as i64),
            Derivation::Quarter { source } => {
                date_part(row, source, |d| ((d.month() - 1) / 3 + 1) as i64)
            }
            Derivation::MonthBucket { source } => match cell(row, source).as_date() {
                Some(d) => CellValue::Str(d.format("%Y-%m").to_string()),
                None => CellValue::Null,
            },
            Derivation::Weekday { source, names } => match cell(row, source).as_date() {
                Some(d) => CellValue::from(names.label(d.weekday())),
                None => CellValue::Null,
            },
            Derivation::Ratio {
                numerator,
                denominator,
                denominator_scale,
            } => {
                let (Some(n), Some(d)) = (
                    cell(row, numerator).as_f64(),
                    cell(row, denominator).as_f64(),
                ) else {
                    return CellValue::Null;
                };
                let divisor = d * denominator_scale;
                if divisor == 0.0 {
                    CellValue::Null
                } else {
                    CellValue::from(n / divisor)
                }
            }
            Derivation::Bins {
                source,
                edges,
                labels,
                include_lowest,
            } => {
                let Some(v) = cell(row, source).as_f64() else {
                    return CellValue::Null;
                };
                edges
                    .windows(2)
                    .zip(labels)
                    .enumerate()
                    .find(|(i, (w, _))| {
                        let above = v > w[0] || (*include_lowest && *i == 0 && v == w[0]);
                        above && v <= w[1]
                    })
                    .map(|(_, (_, label))| CellValue::Str(label.clone()))
                    .unwrap_or(CellValue::Null)
            }
            Derivation::MapValues { source, mapping } => {
                let v = cell(row, source);
                mapping
                    .iter()
                    .find(|(from, _)| from == v)
                    .map(|(_, to)| to.clone())
                    .unwrap_or(CellValue::Null)
            }
            Derivation::Equals { source, value } => match cell(row, source) {
                CellValue::Null => CellValue::Null,
                v => CellValue::Int((v == value) as i64),
            },
        }
    }
}

fn date_part(row: &Row, source: &str, f: impl Fn(&chrono::NaiveDateTime) -> i64) -> CellValue {
    match cell(row, source).as_date() {
        Some(d) => CellValue::Int(f(&d)),
        None => CellValue::Null,
    }
}

/// Add (or recompute) `derived` columns, in order, on a copy of `table`.
///
/// Later derivations can read earlier ones. Rows with a missing value in a
/// required derived column are dropped from the result and counted.
/// Re-deriving an already-derived table drops nothing further.
pub fn derive(table: &Table, derived: &[DerivedColumn]) -> Table {
    let mut fields: Vec<Field> = table
        .fields()
        .iter()
        .filter(|f| !derived.iter().any(|d| d.name == f.name))
        .cloned()
        .collect();
    fields.extend(
        derived
            .iter()
            .map(|d| Field::new(&d.name, d.derivation.output_type())),
    );

    let mut rows = Vec::with_capacity(table.len());
    let mut dropped = 0;
    for source in table.rows() {
        let mut row = source.clone();
        let mut keep = true;
        for column in derived {
            let value = column.derivation.apply(&row);
            if column.required && value.is_null() {
                keep = false;
                break;
            }
            row.insert(column.name.clone(), value);
        }
        if keep {
            rows.push(row);
        } else {
            dropped += 1;
        }
    }

    if dropped > 0 {
        log::debug!("derive dropped {dropped} rows with missing required derived values");
    }
    Table::new(fields, rows).with_dropped(table.dropped_rows() + dropped)
}
