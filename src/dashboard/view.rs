use super::chart::{evaluate_chart, ChartData};
use super::metric::{evaluate_metric, MetricReading};
use super::DashboardConfig;
use crate::data::error::QueryError;
use crate::data::model::Table;

/// One chart after evaluation. A misconfigured chart carries its error so
/// the rest of the dashboard still renders.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedChart {
    pub title: String,
    pub data: Result<ChartData, QueryError>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardView {
    /// Filters removed every row and the dashboard halts on that.
    NoData(String),
    Ready {
        metrics: Vec<Result<MetricReading, QueryError>>,
        charts: Vec<RenderedChart>,
    },
}

/// Evaluate every metric and chart of `config` over the already filtered table.
pub fn evaluate_dashboard(config: &DashboardConfig, filtered: &Table) -> DashboardView {
    if config.halt_on_empty && filtered.is_empty() {
        return DashboardView::NoData(config.empty_message.clone());
    }
    let metrics = config
        .metrics
        .iter()
        .map(|m| evaluate_metric(m, filtered))
        .collect();
    let charts = config
        .charts
        .iter()
        .map(|c| {
            let data = evaluate_chart(c, filtered);
            if let Err(e) = &data {
                log::error!("chart '{}' of '{}': {e}", c.title, config.id);
            }
            RenderedChart {
                title: c.title.clone(),
                data,
            }
        })
        .collect();
    DashboardView::Ready { metrics, charts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::chart::{ChartKind, ChartSpec};
    use crate::dashboard::metric::{Measure, MetricFormat, MetricSpec, MetricValue};
    use crate::data::aggregate::{AggOp, Aggregation};
    use crate::data::filter::{filter, Predicate, PredicateSet};
    use crate::data::model::tests::cat_val_table;
    use crate::data::model::TableSchema;
    use crate::data::pipeline::SourceSpec;

    fn config(halt: bool) -> DashboardConfig {
        let source = SourceSpec::new("t.csv", TableSchema::default());
        let mut cfg = DashboardConfig::new("t", "Test", source);
        cfg.halt_on_empty = halt;
        cfg.metrics.push(MetricSpec::new(
            "Total",
            MetricValue::Aggregate(Measure::of("val", AggOp::Sum)),
            MetricFormat::Plain,
        ));
        cfg.charts.push(ChartSpec::new(
            "By cat",
            ChartKind::Bar {
                aggregation: Aggregation::sum(&["cat"], "val"),
            },
        ));
        cfg.charts.push(ChartSpec::new(
            "Broken",
            ChartKind::Bar {
                aggregation: Aggregation::sum(&["cat"], "cat"),
            },
        ));
        cfg
    }

    fn empty() -> Table {
        filter(
            &cat_val_table(),
            &PredicateSet::new().with("cat", Predicate::one_of(["Z"])),
        )
    }

    #[test]
    fn halting_dashboard_shows_one_message() {
        assert!(matches!(
            evaluate_dashboard(&config(true), &empty()),
            DashboardView::NoData(_)
        ));
    }

    #[test]
    fn non_halting_dashboard_shows_sentinels() {
        match evaluate_dashboard(&config(false), &empty()) {
            DashboardView::Ready { metrics, charts } => {
                assert_eq!(metrics[0].as_ref().unwrap().text, "0");
                assert!(matches!(charts[0].data, Ok(ChartData::Empty(_))));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn one_broken_chart_does_not_hide_the_others() {
        match evaluate_dashboard(&config(true), &cat_val_table()) {
            DashboardView::Ready { charts, .. } => {
                assert!(charts[0].data.is_ok());
                assert_eq!(charts[1].data, Err(QueryError::NonNumeric("cat".into())));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
