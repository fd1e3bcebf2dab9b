use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::QueryError;
use super::model::{cell, CellValue, Table};
use super::stats::Matrix;

// ---------------------------------------------------------------------------
// Operations and their results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggOp {
    Sum,
    Mean,
    /// Rows in the group, or non-missing measure values when a measure is given.
    Count,
    DistinctCount,
    Min,
    Max,
}

impl AggOp {
    fn needs_numeric(self) -> bool {
        matches!(self, AggOp::Sum | AggOp::Mean | AggOp::Min | AggOp::Max)
    }
}

impl fmt::Display for AggOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggOp::Sum => "sum",
            AggOp::Mean => "mean",
            AggOp::Count => "count",
            AggOp::DistinctCount => "distinct_count",
            AggOp::Min => "min",
            AggOp::Max => "max",
        };
        f.write_str(name)
    }
}

/// Result of one reduction. Mean/min/max over nothing is `NotAvailable`;
/// sum and counts over nothing are zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AggValue {
    Number(f64),
    NotAvailable,
}

impl AggValue {
    pub fn as_f64(self) -> Option<f64> {
        match self {
            AggValue::Number(v) => Some(v),
            AggValue::NotAvailable => None,
        }
    }

    /// Ordering with `NotAvailable` below every number.
    fn rank(self, other: AggValue) -> Ordering {
        match (self, other) {
            (AggValue::Number(a), AggValue::Number(b)) => a.total_cmp(&b),
            (AggValue::Number(_), AggValue::NotAvailable) => Ordering::Greater,
            (AggValue::NotAvailable, AggValue::Number(_)) => Ordering::Less,
            (AggValue::NotAvailable, AggValue::NotAvailable) => Ordering::Equal,
        }
    }
}

impl fmt::Display for AggValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggValue::Number(v) if v.fract() == 0.0 => write!(f, "{v:.0}"),
            AggValue::Number(v) => write!(f, "{v:.2}"),
            AggValue::NotAvailable => f.write_str("N/A"),
        }
    }
}

/// One output row of a grouped aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: Vec<CellValue>,
    pub value: AggValue,
    /// Input rows that fell into the group.
    pub rows: usize,
}

impl Group {
    /// Key values joined for display.
    pub fn label(&self) -> String {
        self.key
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupedResult {
    pub group_by: Vec<String>,
    pub measure: Option<String>,
    pub op: AggOp,
    pub groups: Vec<Group>,
}

impl GroupedResult {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Value of the group whose key is `key`.
    pub fn get(&self, key: &[CellValue]) -> Option<AggValue> {
        self.groups.iter().find(|g| g.key == key).map(|g| g.value)
    }

    /// Stable re-ordering; ties keep their current (first-seen) order.
    pub fn sorted(mut self, order: GroupOrder) -> Self {
        match order {
            GroupOrder::FirstSeen => {}
            GroupOrder::ValueDesc => self.groups.sort_by(|a, b| b.value.rank(a.value)),
            GroupOrder::ValueAsc => self.groups.sort_by(|a, b| a.value.rank(b.value)),
            GroupOrder::KeyAsc => self.groups.sort_by(|a, b| a.key.cmp(&b.key)),
        }
        self
    }

    /// The `n` largest groups by value, descending. Asking for more groups
    /// than exist returns all of them.
    pub fn top_n(self, n: usize) -> Self {
        let mut out = self.sorted(GroupOrder::ValueDesc);
        out.groups.truncate(n);
        out
    }

    /// Add a group for every combination of observed key values that has no
    /// row, valued `fill`. Key values combine in first-seen order.
    pub fn complete(&self, fill: AggValue) -> Self {
        let width = self.group_by.len();
        let mut axes: Vec<Vec<CellValue>> = vec![Vec::new(); width];
        for group in &self.groups {
            for (axis, value) in axes.iter_mut().zip(&group.key) {
                if !axis.contains(value) {
                    axis.push(value.clone());
                }
            }
        }

        let mut keys: Vec<Vec<CellValue>> = if self.groups.is_empty() {
            Vec::new()
        } else {
            vec![Vec::new()]
        };
        for axis in &axes {
            keys = keys
                .iter()
                .flat_map(|prefix| {
                    axis.iter().map(move |v| {
                        let mut k = prefix.clone();
                        k.push(v.clone());
                        k
                    })
                })
                .collect();
        }

        let groups = keys
            .into_iter()
            .map(|key| match self.groups.iter().find(|g| g.key == key) {
                Some(existing) => existing.clone(),
                None => Group {
                    key,
                    value: fill,
                    rows: 0,
                },
            })
            .collect();

        GroupedResult {
            groups,
            ..self.clone()
        }
    }

    /// Two-key result as a matrix: first key down the rows, second across,
    /// both sorted. Missing combinations are `None`.
    pub fn pivot(&self) -> Result<Matrix, QueryError> {
        if self.group_by.len() != 2 {
            return Err(QueryError::NotTwoKeys(self.group_by.len()));
        }
        let row_keys: BTreeSet<&CellValue> = self.groups.iter().map(|g| &g.key[0]).collect();
        let col_keys: BTreeSet<&CellValue> = self.groups.iter().map(|g| &g.key[1]).collect();

        let values = row_keys
            .iter()
            .map(|r| {
                col_keys
                    .iter()
                    .map(|c| {
                        self.groups
                            .iter()
                            .find(|g| &g.key[0] == *r && &g.key[1] == *c)
                            .and_then(|g| g.value.as_f64())
                    })
                    .collect()
            })
            .collect();

        Ok(Matrix {
            row_labels: row_keys.iter().map(|v| v.to_string()).collect(),
            col_labels: col_keys.iter().map(|v| v.to_string()).collect(),
            values,
        })
    }
}

// ---------------------------------------------------------------------------
// Aggregation request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupOrder {
    #[default]
    FirstSeen,
    ValueDesc,
    ValueAsc,
    KeyAsc,
}

/// A (group-by, measure, operation) triple plus presentation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    #[serde(default)]
    pub group_by: Vec<String>,
    #[serde(default)]
    pub measure: Option<String>,
    pub op: AggOp,
    #[serde(default)]
    pub order: GroupOrder,
    /// Keep only the first `limit` groups after ordering.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl Aggregation {
    pub fn new(group_by: &[&str], measure: Option<&str>, op: AggOp) -> Self {
        Self {
            group_by: group_by.iter().map(|s| s.to_string()).collect(),
            measure: measure.map(str::to_string),
            op,
            order: GroupOrder::FirstSeen,
            limit: None,
        }
    }

    pub fn sum(group_by: &[&str], measure: &str) -> Self {
        Self::new(group_by, Some(measure), AggOp::Sum)
    }

    pub fn mean(group_by: &[&str], measure: &str) -> Self {
        Self::new(group_by, Some(measure), AggOp::Mean)
    }

    /// Rows per group.
    pub fn count(group_by: &[&str]) -> Self {
        Self::new(group_by, None, AggOp::Count)
    }

    pub fn ordered(mut self, order: GroupOrder) -> Self {
        self.order = order;
        self
    }

    /// Top `n` groups by value, descending.
    pub fn top(mut self, n: usize) -> Self {
        self.order = GroupOrder::ValueDesc;
        self.limit = Some(n);
        self
    }

    pub fn evaluate(&self, table: &Table) -> Result<GroupedResult, QueryError> {
        let mut result = aggregate(table, &self.group_by, self.measure.as_deref(), self.op)?
            .sorted(self.order);
        if let Some(limit) = self.limit {
            result.groups.truncate(limit);
        }
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Core reduction
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Accumulator {
    rows: usize,
    present: usize,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
    distinct: BTreeSet<CellValue>,
}

impl Accumulator {
    fn push(&mut self, value: Option<&CellValue>) {
        self.rows += 1;
        let Some(value) = value else {
            return;
        };
        if value.is_null() {
            return;
        }
        self.present += 1;
        if let Some(v) = value.as_f64() {
            self.sum += v;
            self.min = Some(self.min.map_or(v, |m| m.min(v)));
            self.max = Some(self.max.map_or(v, |m| m.max(v)));
        }
        self.distinct.insert(value.clone());
    }

    fn finish(&self, op: AggOp, has_measure: bool) -> AggValue {
        match op {
            AggOp::Sum => AggValue::Number(self.sum),
            AggOp::Mean if self.present == 0 => AggValue::NotAvailable,
            AggOp::Mean => AggValue::Number(self.sum / self.present as f64),
            AggOp::Count if has_measure => AggValue::Number(self.present as f64),
            AggOp::Count => AggValue::Number(self.rows as f64),
            AggOp::DistinctCount => AggValue::Number(self.distinct.len() as f64),
            AggOp::Min => self.min.map_or(AggValue::NotAvailable, AggValue::Number),
            AggOp::Max => self.max.map_or(AggValue::NotAvailable, AggValue::Number),
        }
    }
}

/// Group `table` by the tuple of `group_by` values and reduce `measure` with `op`.
///
/// Groups come out in order of first appearance. An empty `group_by` gives
/// exactly one group (with an empty key) even when the table is empty, so
/// whole-table totals always have a value. Missing measure values are skipped.
pub fn aggregate(
    table: &Table,
    group_by: &[String],
    measure: Option<&str>,
    op: AggOp,
) -> Result<GroupedResult, QueryError> {
    if let Some(unknown) = group_by.iter().find(|c| !table.has_column(c)) {
        return Err(QueryError::UnknownColumn(unknown.clone()));
    }
    match measure {
        Some(m) => {
            let ty = table
                .column_type(m)
                .ok_or_else(|| QueryError::UnknownColumn(m.to_string()))?;
            if op.needs_numeric() && !ty.is_numeric() {
                return Err(QueryError::NonNumeric(m.to_string()));
            }
        }
        None if op != AggOp::Count => return Err(QueryError::MissingMeasure(op.to_string())),
        None => {}
    }

    let mut order: Vec<(Vec<CellValue>, Accumulator)> = Vec::new();
    let mut index: HashMap<Vec<CellValue>, usize> = HashMap::new();
    if group_by.is_empty() {
        order.push((Vec::new(), Accumulator::default()));
        index.insert(Vec::new(), 0);
    }

    for row in table.rows() {
        let key: Vec<CellValue> = group_by.iter().map(|c| cell(row, c).clone()).collect();
        let slot = match index.get(&key) {
            Some(&i) => i,
            None => {
                order.push((key.clone(), Accumulator::default()));
                index.insert(key, order.len() - 1);
                order.len() - 1
            }
        };
        order[slot].1.push(measure.map(|m| cell(row, m)));
    }

    let groups = order
        .into_iter()
        .map(|(key, acc)| Group {
            key,
            value: acc.finish(op, measure.is_some()),
            rows: acc.rows,
        })
        .collect();

    Ok(GroupedResult {
        group_by: group_by.to_vec(),
        measure: measure.map(str::to_string),
        op,
        groups,
    })
}

/// Whole-table reduction.
pub fn scalar(table: &Table, measure: Option<&str>, op: AggOp) -> Result<AggValue, QueryError> {
    let result = aggregate(table, &[], measure, op)?;
    Ok(result
        .groups
        .first()
        .map(|g| g.value)
        .unwrap_or(AggValue::NotAvailable))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{filter, Predicate, PredicateSet};
    use crate::data::model::tests::cat_val_table;
    use crate::data::model::{ColumnType, Field, Row};

    fn key(s: &str) -> Vec<CellValue> {
        vec![CellValue::from(s)]
    }

    #[test]
    fn sum_by_category_in_first_seen_order() {
        let t = cat_val_table();
        let out = Aggregation::sum(&["cat"], "val").evaluate(&t).unwrap();
        let pairs: Vec<_> = out.groups.iter().map(|g| (g.label(), g.value)).collect();
        assert_eq!(
            pairs,
            vec![
                ("A".to_string(), AggValue::Number(15.0)),
                ("B".to_string(), AggValue::Number(20.0)),
            ]
        );
        assert_eq!(out.groups[0].rows, 2);
    }

    #[test]
    fn top_one_picks_largest() {
        let t = cat_val_table();
        let grouped = Aggregation::sum(&["cat"], "val").evaluate(&t).unwrap();
        let top = grouped.clone().top_n(1);
        assert_eq!(top.groups.len(), 1);
        assert_eq!(top.groups[0].key, key("B"));
        assert_eq!(top.groups[0].value, AggValue::Number(20.0));
        // More than there are: everything, no error.
        assert_eq!(grouped.top_n(10).len(), 2);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let rows = ["x", "y", "z", "y"]
            .iter()
            .zip([1, 2, 3, 1])
            .map(|(c, v)| {
                let mut r = Row::new();
                r.insert("cat".into(), CellValue::from(*c));
                r.insert("val".into(), CellValue::Int(v));
                r
            })
            .collect();
        let t = Table::new(
            vec![Field::new("cat", ColumnType::Str), Field::new("val", ColumnType::Int)],
            rows,
        );
        let top = Aggregation::sum(&["cat"], "val").top(2).evaluate(&t).unwrap();
        let labels: Vec<_> = top.groups.iter().map(Group::label).collect();
        assert_eq!(labels, vec!["y", "z"]);
    }

    #[test]
    fn whole_table_sum_matches_column_total() {
        let t = cat_val_table();
        let total: f64 = t.numeric_values("val").iter().sum();
        assert_eq!(
            scalar(&t, Some("val"), AggOp::Sum).unwrap(),
            AggValue::Number(total)
        );
    }

    #[test]
    fn empty_input_gives_sentinels() {
        let t = cat_val_table();
        let empty = filter(&t, &PredicateSet::new().with("cat", Predicate::one_of(["C"])));
        assert!(empty.is_empty());

        assert_eq!(scalar(&empty, Some("val"), AggOp::Sum).unwrap(), AggValue::Number(0.0));
        assert_eq!(scalar(&empty, None, AggOp::Count).unwrap(), AggValue::Number(0.0));
        assert_eq!(
            scalar(&empty, Some("val"), AggOp::DistinctCount).unwrap(),
            AggValue::Number(0.0)
        );
        assert_eq!(scalar(&empty, Some("val"), AggOp::Mean).unwrap(), AggValue::NotAvailable);
        assert_eq!(AggValue::NotAvailable.to_string(), "N/A");

        let grouped = Aggregation::sum(&["cat"], "val").evaluate(&empty).unwrap();
        assert!(grouped.is_empty());
    }

    #[test]
    fn counts_and_distincts() {
        let t = cat_val_table();
        let counts = Aggregation::count(&["cat"])
            .ordered(GroupOrder::ValueAsc)
            .evaluate(&t)
            .unwrap();
        assert_eq!(counts.get(&key("A")), Some(AggValue::Number(2.0)));
        assert_eq!(counts.groups[0].key, key("B"));
        assert_eq!(
            scalar(&t, Some("cat"), AggOp::DistinctCount).unwrap(),
            AggValue::Number(2.0)
        );
        assert_eq!(scalar(&t, Some("val"), AggOp::Mean).unwrap(), AggValue::Number(35.0 / 3.0));
        assert_eq!(scalar(&t, Some("val"), AggOp::Max).unwrap(), AggValue::Number(20.0));
    }

    #[test]
    fn bad_requests_are_query_errors() {
        let t = cat_val_table();
        assert_eq!(
            aggregate(&t, &["nope".to_string()], None, AggOp::Count).unwrap_err(),
            QueryError::UnknownColumn("nope".into())
        );
        assert_eq!(
            scalar(&t, Some("cat"), AggOp::Sum).unwrap_err(),
            QueryError::NonNumeric("cat".into())
        );
        assert_eq!(
            scalar(&t, None, AggOp::Mean).unwrap_err(),
            QueryError::MissingMeasure("mean".into())
        );
    }

    #[test]
    fn complete_fills_missing_combinations() {
        let mut rows = Vec::new();
        for (a, b) in [("18-30", "CLT"), ("31-40", "AUTÔNOMO")] {
            let mut r = Row::new();
            r.insert("faixa".into(), CellValue::from(a));
            r.insert("emprego".into(), CellValue::from(b));
            rows.push(r);
        }
        let t = Table::new(
            vec![Field::new("faixa", ColumnType::Str), Field::new("emprego", ColumnType::Str)],
            rows,
        );
        let counts = Aggregation::count(&["faixa", "emprego"]).evaluate(&t).unwrap();
        let full = counts.complete(AggValue::Number(0.0));
        assert_eq!(full.len(), 4);
        assert_eq!(
            full.get(&[CellValue::from("18-30"), CellValue::from("AUTÔNOMO")]),
            Some(AggValue::Number(0.0))
        );
        assert_eq!(
            full.get(&[CellValue::from("31-40"), CellValue::from("AUTÔNOMO")]),
            Some(AggValue::Number(1.0))
        );

        let matrix = counts.pivot().unwrap();
        assert_eq!(matrix.row_labels, vec!["18-30", "31-40"]);
        assert_eq!(matrix.col_labels, vec!["AUTÔNOMO", "CLT"]);
        assert_eq!(matrix.values[0], vec![None, Some(1.0)]);
    }
}
