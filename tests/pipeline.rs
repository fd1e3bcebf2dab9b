use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use rusty_dash::dashboard::chart::{ChartData, ChartKind, ChartSpec};
use rusty_dash::dashboard::metric::{Measure, MetricFormat, MetricSpec, MetricValue};
use rusty_dash::dashboard::selection::FilterSelections;
use rusty_dash::dashboard::view::{evaluate_dashboard, DashboardView};
use rusty_dash::dashboard::{DashboardConfig, FilterControl};
use rusty_dash::data::aggregate::{aggregate, scalar, AggOp, AggValue, Aggregation};
use rusty_dash::data::cache::TableCache;
use rusty_dash::data::derive::{Derivation, DerivedColumn};
use rusty_dash::data::error::LoadError;
use rusty_dash::data::filter::{filter, Predicate, PredicateSet};
use rusty_dash::data::loader::load;
use rusty_dash::data::model::{CellValue, ColumnSpec, ColumnType, TableSchema};
use rusty_dash::data::pipeline::{load_source, SourceSpec};

const ORDERS: &str = "\
Data,Categoria,Valor
2024-01-05,A,10
not a date,B,20
2024-02-10,A,5
2024-02-11,B,7.5
";

fn orders_schema() -> TableSchema {
    TableSchema::new(vec![
        ColumnSpec::required("Data", ColumnType::Date),
        ColumnSpec::required("Categoria", ColumnType::Str),
        ColumnSpec::required("Valor", ColumnType::Float),
    ])
}

fn write_orders(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("orders.csv");
    fs::write(&path, ORDERS).unwrap();
    path
}

#[test]
fn malformed_required_date_drops_the_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_orders(dir.path());

    let table = load(&path, &orders_schema()).unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.dropped_rows(), 1);
    assert!(!table.unique_values("Categoria").is_empty());
    assert_eq!(
        table.value(0, "Data").as_date().map(|d| d.date()),
        NaiveDate::from_ymd_opt(2024, 1, 5)
    );
}

#[test]
fn load_derive_filter_aggregate() {
    let dir = tempfile::tempdir().unwrap();
    write_orders(dir.path());
    let source = SourceSpec::new("orders.csv", orders_schema());
    let derived = vec![DerivedColumn::new(
        "Mes",
        Derivation::MonthBucket {
            source: "Data".to_string(),
        },
    )];

    let mut cache = TableCache::new();
    let table = load_source(&mut cache, dir.path(), &source, &derived).unwrap();
    assert_eq!(table.column_type("Mes"), Some(ColumnType::Str));

    let by_cat = aggregate(&table, &["Categoria".to_string()], Some("Valor"), AggOp::Sum).unwrap();
    assert_eq!(by_cat.get(&[CellValue::from("A")]), Some(AggValue::Number(15.0)));
    assert_eq!(by_cat.get(&[CellValue::from("B")]), Some(AggValue::Number(7.5)));

    let feb = filter(
        &table,
        &PredicateSet::new().with("Mes", Predicate::one_of(["2024-02"])),
    );
    assert_eq!(feb.len(), 2);
    assert_eq!(scalar(&feb, Some("Valor"), AggOp::Mean).unwrap(), AggValue::Number(6.25));
}

#[test]
fn empty_selection_gives_sentinels_not_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_orders(dir.path());
    let table = load(&path, &orders_schema()).unwrap();

    let none = filter(
        &table,
        &PredicateSet::new().with("Categoria", Predicate::one_of(["Z"])),
    );
    assert!(none.is_empty());
    assert_eq!(scalar(&none, Some("Valor"), AggOp::Mean).unwrap(), AggValue::NotAvailable);
    assert_eq!(scalar(&none, Some("Valor"), AggOp::Sum).unwrap(), AggValue::Number(0.0));
    assert_eq!(scalar(&none, None, AggOp::Count).unwrap(), AggValue::Number(0.0));
    assert_eq!(AggValue::NotAvailable.to_string(), "N/A");
}

#[test]
fn dashboard_over_a_csv_file() {
    let dir = tempfile::tempdir().unwrap();
    write_orders(dir.path());

    let mut config = DashboardConfig::new(
        "orders",
        "Pedidos",
        SourceSpec::new("orders.csv", orders_schema()),
    );
    config.filters = vec![FilterControl::multi_select("Categoria", "Categoria")];
    config.metrics = vec![MetricSpec::new(
        "Total",
        MetricValue::Aggregate(Measure::of("Valor", AggOp::Sum)),
        MetricFormat::Currency,
    )];
    config.charts = vec![
        ChartSpec::new(
            "Valor por categoria",
            ChartKind::Bar {
                aggregation: Aggregation::sum(&["Categoria"], "Valor"),
            },
        ),
        ChartSpec::new(
            "Coluna inexistente",
            ChartKind::Bar {
                aggregation: Aggregation::sum(&["Nope"], "Valor"),
            },
        ),
    ];
    config.halt_on_empty = true;

    let mut cache = TableCache::new();
    let table = load_source(&mut cache, dir.path(), &config.source, &config.derived).unwrap();
    let mut selections = FilterSelections::init(&config.filters, &table);

    match evaluate_dashboard(&config, &filter(&table, &selections.to_predicates())) {
        DashboardView::Ready { metrics, charts } => {
            assert_eq!(metrics[0].as_ref().unwrap().text, "R$ 22.50");
            assert!(matches!(charts[0].data, Ok(ChartData::Grouped { .. })));
            // A broken chart does not take the rest of the dashboard down.
            assert!(charts[1].data.is_err());
        }
        other => panic!("expected a ready dashboard, got {other:?}"),
    }

    selections.select_none("Categoria");
    let view = evaluate_dashboard(&config, &filter(&table, &selections.to_predicates()));
    assert_eq!(view, DashboardView::NoData(config.empty_message.clone()));
}

#[test]
fn missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = load(&dir.path().join("absent.csv"), &orders_schema()).unwrap_err();
    assert!(matches!(err, LoadError::NotFound(_)));
}

#[test]
fn negative_zero_groups_with_zero() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("descontos.csv");
    fs::write(&path, "Desconto\n0\n-0\n0.0\n").unwrap();
    let schema = TableSchema::new(vec![ColumnSpec::required("Desconto", ColumnType::Float)]);
    let table = load(&path, &schema).unwrap();

    let result = Aggregation::count(&["Desconto"]).evaluate(&table).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.groups[0].rows, 3);
    assert_eq!(result.groups[0].label(), "0.00");
}
