use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CellValue – a single typed cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring the dtypes a dashboard cares about.
/// Using `BTreeMap` / `BTreeSet` downstream so `CellValue` must be `Ord`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CellValue {
    Str(String),
    Int(i64),
    Float(f64),
    Date(NaiveDateTime),
    /// Missing marker: absent cell or a value that failed to coerce.
    Null,
}

// -- Manual Eq/Ord/Hash so we can put CellValue in BTreeSet and HashMap keys --

/// `-0.0` folds into `0.0`; equality, ordering and hashing all go through this.
fn canonical(v: f64) -> f64 {
    v + 0.0
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Int(_) => 1,
                Float(_) => 2,
                Str(_) => 3,
                Date(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => canonical(*a).total_cmp(&canonical(*b)),
            (Str(a), Str(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Str(s) => s.hash(state),
            CellValue::Int(i) => i.hash(state),
            CellValue::Float(f) => canonical(*f).to_bits().hash(state),
            CellValue::Date(d) => d.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Str(s) => write!(f, "{s}"),
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v:.2}"),
            CellValue::Date(d) if d.time() == NaiveTime::MIN => {
                write!(f, "{}", d.format("%Y-%m-%d"))
            }
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Str(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Str(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<i32> for CellValue {
    fn from(i: i32) -> Self {
        CellValue::Int(i as i64)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(canonical(v))
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(d: NaiveDateTime) -> Self {
        CellValue::Date(d)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        CellValue::Date(d.and_time(NaiveTime::MIN))
    }
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Interpret the value as an `f64` (integers widen, everything else is `None`).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Ordering used by range predicates and min/max.
    ///
    /// Integers and floats compare numerically with each other; strings and
    /// dates compare within their own type. Anything else (including `Null`)
    /// is incomparable.
    pub fn compare(&self, other: &CellValue) -> Option<Ordering> {
        match (self, other) {
            (CellValue::Str(a), CellValue::Str(b)) => Some(a.cmp(b)),
            (CellValue::Date(a), CellValue::Date(b)) => Some(a.cmp(b)),
            (CellValue::Int(a), CellValue::Int(b)) => Some(a.cmp(b)),
            _ => {
                let a = self.as_f64()?;
                let b = other.as_f64()?;
                a.partial_cmp(&b)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Semantic type of a column after coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Str,
    Int,
    Float,
    Date,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Int | ColumnType::Float)
    }
}

/// Declared column of a source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
    /// Rows whose value fails to coerce are dropped when this is set.
    #[serde(default)]
    pub required: bool,
}

impl ColumnSpec {
    pub fn required(name: &str, ty: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            required: true,
        }
    }

    pub fn optional(name: &str, ty: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            required: false,
        }
    }
}

/// What a loader expects to find in a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub columns: Vec<ColumnSpec>,
    /// Upper-case every text cell after loading.
    #[serde(default)]
    pub uppercase_text: bool,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self {
            columns,
            uppercase_text: false,
        }
    }

    pub fn with_uppercase_text(mut self) -> Self {
        self.uppercase_text = true;
        self
    }

    pub fn spec(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// A column of a materialised table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: ColumnType,
}

impl Field {
    pub fn new(name: &str, ty: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            ty,
        }
    }
}

// ---------------------------------------------------------------------------
// Table – rows sharing a column schema
// ---------------------------------------------------------------------------

/// One row: column name → value. Absent keys read as `Null`.
pub type Row = BTreeMap<String, CellValue>;

static NULL: CellValue = CellValue::Null;

/// An immutable, ordered collection of typed rows.
///
/// Every transformation (derive, filter, aggregate) builds a new value; the
/// number of rows discarded on the way from the raw file is carried along so
/// it stays inspectable.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    fields: Vec<Field>,
    rows: Vec<Row>,
    dropped_rows: usize,
}

impl Table {
    pub fn new(fields: Vec<Field>, rows: Vec<Row>) -> Self {
        Table {
            fields,
            rows,
            dropped_rows: 0,
        }
    }

    /// Same table with `n` more rows counted as dropped.
    pub fn with_dropped(mut self, n: usize) -> Self {
        self.dropped_rows += n;
        self
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Rows discarded so far because a required value was missing or malformed.
    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.ty)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Cell at (`row`, `column`); `Null` when absent.
    pub fn value(&self, row: usize, column: &str) -> &CellValue {
        self.rows
            .get(row)
            .map(|r| cell(r, column))
            .unwrap_or(&NULL)
    }

    /// Sorted set of distinct values of a column (including `Null` if present).
    pub fn unique_values(&self, column: &str) -> BTreeSet<CellValue> {
        self.rows.iter().map(|r| cell(r, column).clone()).collect()
    }

    /// Smallest and largest non-null value of a column.
    pub fn min_max(&self, column: &str) -> Option<(CellValue, CellValue)> {
        let mut bounds: Option<(CellValue, CellValue)> = None;
        for row in &self.rows {
            let v = cell(row, column);
            if v.is_null() {
                continue;
            }
            bounds = Some(match bounds {
                None => (v.clone(), v.clone()),
                Some((lo, hi)) => {
                    let lo = if v.compare(&lo) == Some(Ordering::Less) { v.clone() } else { lo };
                    let hi = if v.compare(&hi) == Some(Ordering::Greater) { v.clone() } else { hi };
                    (lo, hi)
                }
            });
        }
        bounds
    }

    /// Non-null numeric values of a column, in row order.
    pub fn numeric_values(&self, column: &str) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|r| cell(r, column).as_f64())
            .collect()
    }

    /// New table holding the rows at `indices`, in that order.
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        Table {
            fields: self.fields.clone(),
            rows: indices.iter().filter_map(|&i| self.rows.get(i).cloned()).collect(),
            dropped_rows: self.dropped_rows,
        }
    }

    /// Same rows restricted to `columns`, in that order. Unknown names are skipped.
    pub fn select_columns(&self, columns: &[String]) -> Table {
        let fields: Vec<Field> = columns
            .iter()
            .filter_map(|c| self.fields.iter().find(|f| &f.name == c).cloned())
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                fields
                    .iter()
                    .map(|f| (f.name.clone(), cell(row, &f.name).clone()))
                    .collect()
            })
            .collect();
        Table {
            fields,
            rows,
            dropped_rows: self.dropped_rows,
        }
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> Table {
        let indices: Vec<usize> = (0..n.min(self.len())).collect();
        self.select_rows(&indices)
    }
}

/// Read a cell from a row, treating an absent column as `Null`.
pub fn cell<'a>(row: &'a Row, column: &str) -> &'a CellValue {
    row.get(column).unwrap_or(&NULL)
}
