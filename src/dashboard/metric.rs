use serde::{Deserialize, Serialize};

use crate::data::aggregate::{scalar, AggOp, AggValue};
use crate::data::error::QueryError;
use crate::data::filter::{filter, PredicateSet};
use crate::data::model::Table;

/// A whole-table reduction: `op` over `column` (rows, for a bare count).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    #[serde(default)]
    pub column: Option<String>,
    pub op: AggOp,
}

impl Measure {
    pub fn of(column: &str, op: AggOp) -> Self {
        Self {
            column: Some(column.to_string()),
            op,
        }
    }

    pub fn rows() -> Self {
        Self {
            column: None,
            op: AggOp::Count,
        }
    }

    fn evaluate(&self, table: &Table) -> Result<AggValue, QueryError> {
        scalar(table, self.column.as_deref(), self.op)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricValue {
    Aggregate(Measure),
    /// `numerator / denominator`, 0 when the denominator is 0 or undefined.
    Ratio { numerator: Measure, denominator: Measure },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricFormat {
    /// `R$ 1,234.56`
    Currency,
    /// Rounded, `.` between thousands: `10.000`.
    Integer,
    /// Fraction shown as a percentage with `decimals` places.
    Percent { decimals: usize },
    #[default]
    Plain,
    Decimal { decimals: usize },
}

/// Group the integer digits of `digits` in threes with `sep`.
fn group_thousands(digits: &str, sep: char) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(ch);
    }
    out
}

impl MetricFormat {
    pub fn format(self, value: AggValue) -> String {
        let AggValue::Number(v) = value else {
            return value.to_string();
        };
        let sign = if v < 0.0 { "-" } else { "" };
        match self {
            MetricFormat::Currency => {
                let fixed = format!("{:.2}", v.abs());
                let (int, frac) = fixed.split_once('.').unwrap_or((&fixed, "00"));
                format!("{sign}R$ {}.{frac}", group_thousands(int, ','))
            }
            MetricFormat::Integer => {
                format!("{sign}{}", group_thousands(&format!("{:.0}", v.abs()), '.'))
            }
            MetricFormat::Percent { decimals } => format!("{:.*}%", decimals, v * 100.0),
            MetricFormat::Decimal { decimals } => format!("{v:.decimals$}"),
            MetricFormat::Plain => value.to_string(),
        }
    }
}

/// A labelled number shown as a card above the charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub label: String,
    /// Narrows the dashboard's filtered table for this metric only.
    #[serde(default)]
    pub filter: PredicateSet,
    pub value: MetricValue,
    #[serde(default)]
    pub format: MetricFormat,
    #[serde(default)]
    pub help: Option<String>,
}

impl MetricSpec {
    pub fn new(label: &str, value: MetricValue, format: MetricFormat) -> Self {
        Self {
            label: label.to_string(),
            filter: PredicateSet::new(),
            value,
            format,
            help: None,
        }
    }

    pub fn filtered(mut self, filter: PredicateSet) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }
}

/// An evaluated metric, ready to display.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricReading {
    pub label: String,
    pub value: AggValue,
    pub text: String,
    pub help: Option<String>,
}

pub fn evaluate_metric(spec: &MetricSpec, table: &Table) -> Result<MetricReading, QueryError> {
    let table = filter(table, &spec.filter);
    let value = match &spec.value {
        MetricValue::Aggregate(measure) => measure.evaluate(&table)?,
        MetricValue::Ratio {
            numerator,
            denominator,
        } => {
            let num = numerator.evaluate(&table)?;
            match (num, denominator.evaluate(&table)?) {
                (_, AggValue::NotAvailable) => AggValue::Number(0.0),
                (_, AggValue::Number(d)) if d == 0.0 => AggValue::Number(0.0),
                (AggValue::NotAvailable, _) => AggValue::NotAvailable,
                (AggValue::Number(n), AggValue::Number(d)) => AggValue::Number(n / d),
            }
        }
    };
    Ok(MetricReading {
        label: spec.label.clone(),
        value,
        text: spec.format.format(value),
        help: spec.help.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::Predicate;
    use crate::data::model::tests::cat_val_table;

    #[test]
    fn formats() {
        let n = AggValue::Number;
        assert_eq!(MetricFormat::Currency.format(n(1234.5)), "R$ 1,234.50");
        assert_eq!(MetricFormat::Currency.format(n(0.0)), "R$ 0.00");
        assert_eq!(MetricFormat::Currency.format(n(1_000_000.0)), "R$ 1,000,000.00");
        assert_eq!(MetricFormat::Integer.format(n(10000.0)), "10.000");
        assert_eq!(MetricFormat::Integer.format(n(999.0)), "999");
        assert_eq!(MetricFormat::Percent { decimals: 1 }.format(n(0.4567)), "45.7%");
        assert_eq!(MetricFormat::Decimal { decimals: 0 }.format(n(612.6)), "613");
        assert_eq!(MetricFormat::Currency.format(AggValue::NotAvailable), "N/A");
    }

    #[test]
    fn ratio_of_sum_and_count() {
        let t = cat_val_table();
        let ticket = MetricSpec::new(
            "Ticket",
            MetricValue::Ratio {
                numerator: Measure::of("val", AggOp::Sum),
                denominator: Measure::rows(),
            },
            MetricFormat::Currency,
        )
        .filtered(PredicateSet::new().with("cat", Predicate::one_of(["A"])));
        let r = evaluate_metric(&ticket, &t).unwrap();
        assert_eq!(r.value, AggValue::Number(7.5));
        assert_eq!(r.text, "R$ 7.50");
    }

    #[test]
    fn empty_input_sentinels() {
        let t = cat_val_table();
        let nothing = PredicateSet::new().with("cat", Predicate::one_of(["Z"]));
        let ticket = MetricSpec::new(
            "Ticket",
            MetricValue::Ratio {
                numerator: Measure::of("val", AggOp::Sum),
                denominator: Measure::rows(),
            },
            MetricFormat::Currency,
        )
        .filtered(nothing.clone());
        assert_eq!(evaluate_metric(&ticket, &t).unwrap().text, "R$ 0.00");

        let mean = MetricSpec::new(
            "Mean",
            MetricValue::Aggregate(Measure::of("val", AggOp::Mean)),
            MetricFormat::Decimal { decimals: 0 },
        )
        .filtered(nothing);
        let r = evaluate_metric(&mean, &t).unwrap();
        assert_eq!(r.value, AggValue::NotAvailable);
        assert_eq!(r.text, "N/A");
    }
}
