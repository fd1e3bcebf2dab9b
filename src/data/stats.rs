use super::error::QueryError;
use super::model::{cell, Table};

/// Labelled 2-D grid of optional numbers (heatmaps, correlation).
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    /// `values[row][col]`; `None` where a cell is undefined.
    pub values: Vec<Vec<Option<f64>>>,
}

impl Matrix {
    /// Smallest and largest defined value.
    pub fn range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .flatten()
            .flatten()
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// `counts.len() + 1` ascending bin edges.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn bin_width(&self) -> f64 {
        match self.edges.as_slice() {
            [first, second, ..] => second - first,
            _ => 0.0,
        }
    }
}

/// Equal-width histogram over `[min, max]` of `values`. Bins are half-open
/// except the last, which includes `max`. A single distinct value gets a
/// unit-wide range centred on it. `None` for no values or zero bins.
pub fn histogram(values: &[f64], bins: usize) -> Option<Histogram> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return None;
    }
    let mut lo = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
    Some(histogram_on(&edges, &finite))
}

/// Count `values` into the bins given by equal-width `edges`. Values outside
/// the edges are ignored.
pub fn histogram_on(edges: &[f64], values: &[f64]) -> Histogram {
    let bins = edges.len().saturating_sub(1);
    let mut counts = vec![0usize; bins];
    if let (Some(&lo), Some(&hi)) = (edges.first(), edges.last()) {
        let width = (hi - lo) / bins.max(1) as f64;
        for &v in values {
            if !(lo..=hi).contains(&v) || width <= 0.0 {
                continue;
            }
            let idx = (((v - lo) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }
    }
    Histogram {
        edges: edges.to_vec(),
        counts,
    }
}

// ---------------------------------------------------------------------------
// Five-number summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiveNumber {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// Quantile of sorted data with linear interpolation between order statistics.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

pub fn five_number_summary(values: &[f64]) -> Option<FiveNumber> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    Some(FiveNumber {
        min: sorted[0],
        q1: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q3: quantile(&sorted, 0.75),
        max: sorted[sorted.len() - 1],
    })
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Pairwise Pearson correlation of numeric `columns`, using the rows where
/// both values are present.
pub fn correlation(table: &Table, columns: &[String]) -> Result<Matrix, QueryError> {
    for column in columns {
        match table.column_type(column) {
            None => return Err(QueryError::UnknownColumn(column.clone())),
            Some(ty) if !ty.is_numeric() => return Err(QueryError::NonNumeric(column.clone())),
            Some(_) => {}
        }
    }

    let values = columns
        .iter()
        .map(|a| {
            columns
                .iter()
                .map(|b| {
                    let pairs: Vec<(f64, f64)> = table
                        .rows()
                        .iter()
                        .filter_map(|row| Some((cell(row, a).as_f64()?, cell(row, b).as_f64()?)))
                        .collect();
                    pearson(&pairs)
                })
                .collect()
        })
        .collect();

    Ok(Matrix {
        row_labels: columns.to_vec(),
        col_labels: columns.to_vec(),
        values,
    })
}
