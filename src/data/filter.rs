use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::model::{cell, CellValue, Row, Table};

// ---------------------------------------------------------------------------
// Predicates: what a single column is allowed to hold
// ---------------------------------------------------------------------------

/// Inclusive range; an absent bound is unbounded on that side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: Option<CellValue>,
    pub max: Option<CellValue>,
}

impl ValueRange {
    pub fn between(min: CellValue, max: CellValue) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn contains(&self, value: &CellValue) -> bool {
        if value.is_null() {
            return false;
        }
        let above = match &self.min {
            Some(min) => matches!(value.compare(min), Some(Ordering::Greater | Ordering::Equal)),
            None => true,
        };
        let below = match &self.max {
            Some(max) => matches!(value.compare(max), Some(Ordering::Less | Ordering::Equal)),
            None => true,
        };
        above && below
    }

    /// Tighter of the two bounds on each side.
    fn intersect(&self, other: &ValueRange) -> ValueRange {
        let pick = |a: &Option<CellValue>, b: &Option<CellValue>, keep: Ordering| match (a, b) {
            (Some(x), Some(y)) => {
                if y.compare(x) == Some(keep) {
                    Some(y.clone())
                } else {
                    Some(x.clone())
                }
            }
            (Some(x), None) | (None, Some(x)) => Some(x.clone()),
            (None, None) => None,
        };
        ValueRange {
            min: pick(&self.min, &other.min, Ordering::Greater),
            max: pick(&self.max, &other.max, Ordering::Less),
        }
    }
}

/// Constraint on one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Value must be in the set. An empty set matches nothing.
    OneOf(BTreeSet<CellValue>),
    /// Value must not be in the set.
    NoneOf(BTreeSet<CellValue>),
    Range(ValueRange),
    /// Every inner predicate must hold.
    All(Vec<Predicate>),
}

impl Predicate {
    pub fn one_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        Predicate::OneOf(values.into_iter().map(Into::into).collect())
    }

    pub fn none_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        Predicate::NoneOf(values.into_iter().map(Into::into).collect())
    }

    pub fn between(min: impl Into<CellValue>, max: impl Into<CellValue>) -> Self {
        Predicate::Range(ValueRange::between(min.into(), max.into()))
    }

    /// Whether `value` satisfies the predicate. `Null` only passes a `OneOf`
    /// that lists it, or a `NoneOf` that doesn't.
    pub fn matches(&self, value: &CellValue) -> bool {
        match self {
            Predicate::OneOf(set) => set.contains(value),
            Predicate::NoneOf(set) => !set.contains(value),
            Predicate::Range(range) => range.contains(value),
            Predicate::All(preds) => preds.iter().all(|p| p.matches(value)),
        }
    }

    /// Conjunction of two predicates on the same column.
    pub fn and(&self, other: &Predicate) -> Predicate {
        use Predicate::*;
        match (self, other) {
            (OneOf(a), OneOf(b)) => OneOf(a.intersection(b).cloned().collect()),
            (NoneOf(a), NoneOf(b)) => NoneOf(a.union(b).cloned().collect()),
            (OneOf(a), NoneOf(b)) | (NoneOf(b), OneOf(a)) => {
                OneOf(a.difference(b).cloned().collect())
            }
            (OneOf(a), Range(r)) | (Range(r), OneOf(a)) => {
                OneOf(a.iter().filter(|v| r.contains(v)).cloned().collect())
            }
            (Range(a), Range(b)) => Range(a.intersect(b)),
            (All(a), All(b)) => All(a.iter().chain(b).cloned().collect()),
            (All(a), p) | (p, All(a)) => {
                let mut preds = a.clone();
                preds.push(p.clone());
                All(preds)
            }
            (a, b) => All(vec![a.clone(), b.clone()]),
        }
    }
}

// ---------------------------------------------------------------------------
// Predicate set: the conjunction across columns
// ---------------------------------------------------------------------------

/// Column name → constraint. All constraints must hold for a row to pass.
/// A column absent from the set is unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredicateSet {
    constraints: BTreeMap<String, Predicate>,
}

impl PredicateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constraint, combining with any existing one on the same column.
    pub fn with(mut self, column: &str, predicate: Predicate) -> Self {
        self.insert(column, predicate);
        self
    }

    pub fn insert(&mut self, column: &str, predicate: Predicate) {
        let merged = match self.constraints.get(column) {
            Some(existing) => existing.and(&predicate),
            None => predicate,
        };
        self.constraints.insert(column.to_string(), merged);
    }

    /// Conjunction of two predicate sets.
    pub fn and(&self, other: &PredicateSet) -> PredicateSet {
        let mut out = self.clone();
        for (column, predicate) in &other.constraints {
            out.insert(column, predicate.clone());
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&Predicate> {
        self.constraints.get(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Predicate)> {
        self.constraints.iter()
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.constraints
            .iter()
            .all(|(column, predicate)| predicate.matches(cell(row, column)))
    }
}

/// Return indices of rows that pass every constraint.
pub fn filtered_indices(table: &Table, predicates: &PredicateSet) -> Vec<usize> {
    table
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| predicates.matches(row))
        .map(|(i, _)| i)
        .collect()
}

/// Rows of `table` satisfying `predicates`, as a new table.
/// No match is an empty table, not an error.
pub fn filter(table: &Table, predicates: &PredicateSet) -> Table {
    if predicates.is_empty() {
        return table.clone();
    }
    table.select_rows(&filtered_indices(table, predicates))
}
