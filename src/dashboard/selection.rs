use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveTime};

use super::FilterControl;
use crate::data::filter::{Predicate, PredicateSet};
use crate::data::model::{CellValue, Table};

// ---------------------------------------------------------------------------
// Per-control state
// ---------------------------------------------------------------------------

/// Current value of one filter control.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Values {
        options: Vec<CellValue>,
        selected: BTreeSet<CellValue>,
    },
    Dates {
        bounds: (NaiveDate, NaiveDate),
        start: NaiveDate,
        end: NaiveDate,
    },
    Numbers {
        bounds: (f64, f64),
        min: f64,
        max: f64,
    },
    /// The column is absent or has no usable values; the control is inert.
    Unavailable,
}

impl Selection {
    fn init(control: &FilterControl, table: &Table) -> Self {
        let column = control.column();
        if !table.has_column(column) {
            return Selection::Unavailable;
        }
        match control {
            FilterControl::MultiSelect { .. } => {
                let options: Vec<CellValue> = table
                    .unique_values(column)
                    .into_iter()
                    .filter(|v| !v.is_null())
                    .collect();
                if options.is_empty() {
                    return Selection::Unavailable;
                }
                Selection::Values {
                    selected: options.iter().cloned().collect(),
                    options,
                }
            }
            FilterControl::DateRange { .. } => match table.min_max(column) {
                Some((CellValue::Date(lo), CellValue::Date(hi))) => Selection::Dates {
                    bounds: (lo.date(), hi.date()),
                    start: lo.date(),
                    end: hi.date(),
                },
                _ => Selection::Unavailable,
            },
            FilterControl::NumericRange { .. } => {
                let bounds = table
                    .min_max(column)
                    .and_then(|(lo, hi)| Some((lo.as_f64()?, hi.as_f64()?)));
                match bounds {
                    Some((lo, hi)) => Selection::Numbers {
                        bounds: (lo, hi),
                        min: lo,
                        max: hi,
                    },
                    None => Selection::Unavailable,
                }
            }
        }
    }

    /// Constraint this selection puts on its column. A multi-select with
    /// every option ticked constrains nothing; one with nothing ticked
    /// excludes every row.
    pub fn predicate(&self) -> Option<Predicate> {
        match self {
            Selection::Values { options, selected } => {
                if options.iter().all(|o| selected.contains(o)) {
                    None
                } else {
                    Some(Predicate::OneOf(selected.clone()))
                }
            }
            Selection::Dates { start, end, .. } => {
                let last_instant = NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999)
                    .unwrap_or(NaiveTime::MIN);
                Some(Predicate::between(
                    start.and_time(NaiveTime::MIN),
                    end.and_time(last_instant),
                ))
            }
            Selection::Numbers { min, max, .. } => Some(Predicate::between(*min, *max)),
            Selection::Unavailable => None,
        }
    }
}

// ---------------------------------------------------------------------------
// All controls of a dashboard
// ---------------------------------------------------------------------------

/// The side-panel state of one dashboard, in control order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSelections {
    entries: Vec<(FilterControl, Selection)>,
}

impl FilterSelections {
    /// Everything selected, ranges spanning the observed values.
    pub fn init(controls: &[FilterControl], table: &Table) -> Self {
        Self {
            entries: controls
                .iter()
                .map(|c| (c.clone(), Selection::init(c, table)))
                .collect(),
        }
    }

    pub fn entries(&self) -> &[(FilterControl, Selection)] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [(FilterControl, Selection)] {
        &mut self.entries
    }

    fn selection_mut(&mut self, column: &str) -> Option<&mut Selection> {
        self.entries
            .iter_mut()
            .find(|(c, _)| c.column() == column)
            .map(|(_, s)| s)
    }

    /// Tick or untick one value of a multi-select.
    pub fn toggle(&mut self, column: &str, value: &CellValue) {
        if let Some(Selection::Values { selected, .. }) = self.selection_mut(column) {
            if !selected.remove(value) {
                selected.insert(value.clone());
            }
        }
    }

    pub fn select_all(&mut self, column: &str) {
        if let Some(Selection::Values { options, selected }) = self.selection_mut(column) {
            *selected = options.iter().cloned().collect();
        }
    }

    pub fn select_none(&mut self, column: &str) {
        if let Some(Selection::Values { selected, .. }) = self.selection_mut(column) {
            selected.clear();
        }
    }

    /// Set a date range, clamped to the column's observed first and last day.
    pub fn set_dates(&mut self, column: &str, from: NaiveDate, to: NaiveDate) {
        if let Some(Selection::Dates { bounds, start, end }) = self.selection_mut(column) {
            *start = from.clamp(bounds.0, bounds.1);
            *end = to.clamp(bounds.0, bounds.1);
        }
    }

    pub fn set_numbers(&mut self, column: &str, lo: f64, hi: f64) {
        if let Some(Selection::Numbers { min, max, .. }) = self.selection_mut(column) {
            *min = lo;
            *max = hi;
        }
    }

    /// Conjunction of every control's constraint.
    pub fn to_predicates(&self) -> PredicateSet {
        let mut set = PredicateSet::new();
        for (control, selection) in &self.entries {
            if let Some(p) = selection.predicate() {
                set.insert(control.column(), p);
            }
        }
        set
    }
}
