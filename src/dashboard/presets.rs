//! The built-in dashboards.

use super::chart::{ChartKind, ChartSpec};
use super::metric::{Measure, MetricFormat, MetricSpec, MetricValue};
use super::{DashboardConfig, FilterControl};
use crate::data::aggregate::{AggOp, Aggregation, GroupOrder};
use crate::data::derive::{Derivation, DerivedColumn, WeekdayNames};
use crate::data::filter::{Predicate, PredicateSet};
use crate::data::model::{CellValue, ColumnSpec, ColumnType, TableSchema};
use crate::data::pipeline::SourceSpec;
use crate::synth::SampleKind;

pub fn all() -> Vec<DashboardConfig> {
    vec![barbershop(), sales(), sales_questions(), credit()]
}

fn bar(title: &str, aggregation: Aggregation) -> ChartSpec {
    ChartSpec::new(title, ChartKind::Bar { aggregation })
}

fn hbar(title: &str, aggregation: Aggregation) -> ChartSpec {
    ChartSpec::new(title, ChartKind::HorizontalBar { aggregation })
}

fn year(source: &str) -> Derivation {
    Derivation::Year {
        source: source.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Barbershop bookings
// ---------------------------------------------------------------------------

pub const BOOKING_SLOTS: [&str; 14] = [
    "09:00:00", "09:40:00", "10:20:00", "11:00:00", "13:00:00", "13:40:00", "14:20:00",
    "15:00:00", "15:40:00", "16:20:00", "17:00:00", "17:40:00", "18:20:00", "19:00:00",
];

pub fn barbershop() -> DashboardConfig {
    let schema = TableSchema::new(vec![
        ColumnSpec::required("Data", ColumnType::Date),
        ColumnSpec::optional("Valor", ColumnType::Float),
        ColumnSpec::optional("Profissional", ColumnType::Str),
        ColumnSpec::optional("Serviço", ColumnType::Str),
        ColumnSpec::optional("Status_descrito", ColumnType::Str),
        ColumnSpec::optional("Cliente", ColumnType::Str),
        ColumnSpec::optional("Horário", ColumnType::Str),
    ]);
    let mut cfg = DashboardConfig::new(
        "barbearia",
        "Análise de Situação da Barbearia",
        SourceSpec::new("AGENDAMENTOS.xlsx", schema),
    );
    cfg.logo = Some("logo_DonMunhoz_semFundo.png".into());
    cfg.derived = vec![
        DerivedColumn::new("Ano", year("Data")),
        DerivedColumn::new("Mês", Derivation::MonthBucket { source: "Data".into() }),
        DerivedColumn::new(
            "Dia da Semana",
            Derivation::Weekday {
                source: "Data".into(),
                names: WeekdayNames::Portuguese,
            },
        ),
    ];
    cfg.filters = vec![
        FilterControl::multi_select("Ano", "Selecione o(s) Ano(s)"),
        FilterControl::multi_select("Profissional", "Selecione o Profissional"),
        FilterControl::multi_select("Serviço", "Selecione o(s) Serviço(s)"),
        FilterControl::multi_select("Status_descrito", "Selecione o Status"),
        FilterControl::date_range("Data", "Selecione o Período Específico"),
    ];

    let done = || PredicateSet::new().with("Status_descrito", Predicate::one_of(["Realizado"]));
    let no_revenue = "Não há faturamento para exibir com os filtros atuais.";

    cfg.metrics = vec![
        MetricSpec::new(
            "Faturamento Total",
            MetricValue::Aggregate(Measure::of("Valor", AggOp::Sum)),
            MetricFormat::Currency,
        )
        .filtered(done()),
        MetricSpec::new(
            "Agendamentos Realizados",
            MetricValue::Aggregate(Measure::rows()),
            MetricFormat::Plain,
        )
        .filtered(done()),
        MetricSpec::new(
            "Ticket Médio",
            MetricValue::Ratio {
                numerator: Measure::of("Valor", AggOp::Sum),
                denominator: Measure::rows(),
            },
            MetricFormat::Currency,
        )
        .filtered(done()),
    ];

    cfg.charts = vec![
        bar(
            "Faturamento por Profissional e Serviço",
            Aggregation::sum(&["Serviço", "Profissional"], "Valor"),
        )
        .filtered(done())
        .when_empty(no_revenue),
        hbar(
            "Faturamento por Serviço no Período",
            Aggregation::sum(&["Serviço"], "Valor").ordered(GroupOrder::ValueAsc),
        )
        .filtered(done())
        .when_empty(no_revenue),
        ChartSpec::new(
            "Distribuição Geral de Status dos Agendamentos",
            ChartKind::Pie {
                aggregation: Aggregation::count(&["Status_descrito"])
                    .ordered(GroupOrder::ValueDesc),
            },
        )
        .when_empty("Nenhum dado de status encontrado para os filtros selecionados."),
        bar(
            "Total de Cancelamentos por Profissional",
            Aggregation::count(&["Profissional"]).ordered(GroupOrder::ValueDesc),
        )
        .filtered(PredicateSet::new().with("Status_descrito", Predicate::one_of(["Cancelado"])))
        .when_empty("Nenhum cancelamento registrado para os filtros selecionados."),
        bar(
            "Agendamentos por Dia da Semana",
            Aggregation::count(&["Dia da Semana"]).ordered(GroupOrder::ValueDesc),
        )
        .when_empty("Nenhum dado de fluxo de clientes encontrado para os filtros selecionados."),
        bar(
            "Agendamentos por Horário (Horas Selecionadas)",
            Aggregation::count(&["Horário"]).ordered(GroupOrder::KeyAsc),
        )
        .filtered(PredicateSet::new().with("Horário", Predicate::one_of(BOOKING_SLOTS)))
        .when_empty("Sem dados de agendamento para os horários selecionados."),
        ChartSpec::new(
            "Top Clientes por Período",
            ChartKind::Table {
                aggregation: Aggregation::count(&["Cliente"]).top(10),
                complete: false,
            },
        )
        .filtered(done().with("Cliente", Predicate::none_of(["Sem Cadastro"])))
        .when_empty("Nenhum cliente (exceto 'Sem Cadastro') encontrado com os filtros atuais."),
    ];
    cfg
}

// ---------------------------------------------------------------------------
// Electronics sales
// ---------------------------------------------------------------------------

fn sales_schema() -> TableSchema {
    TableSchema::new(vec![
        ColumnSpec::optional("ID_Venda", ColumnType::Int),
        ColumnSpec::required("Data_Venda", ColumnType::Date),
        ColumnSpec::optional("ID_Cliente", ColumnType::Str),
        ColumnSpec::optional("Nome_Cliente", ColumnType::Str),
        ColumnSpec::optional("Email_Cliente", ColumnType::Str),
        ColumnSpec::optional("País", ColumnType::Str),
        ColumnSpec::optional("Categoria_Produto", ColumnType::Str),
        ColumnSpec::optional("Produto", ColumnType::Str),
        ColumnSpec::optional("Preço_Unitário", ColumnType::Float),
        ColumnSpec::optional("Quantidade", ColumnType::Int),
        ColumnSpec::optional("Total_Venda", ColumnType::Float),
    ])
}

fn top_products(by: &str, title: &str) -> ChartSpec {
    bar(title, Aggregation::sum(&["Produto"], by).top(5))
}

/// Sales dashboard with year and quarter filters.
pub fn sales() -> DashboardConfig {
    let mut cfg = DashboardConfig::new(
        "vendas",
        "Dashboard de Análise de Vendas",
        SourceSpec::new("dados/vendas_eletronicos.csv", sales_schema())
            .generated(SampleKind::sales(crate::synth::DEFAULT_RECORDS)),
    );
    cfg.subtitle = Some("Uma análise interativa dos dados de vendas de eletrônicos.".into());
    cfg.derived = vec![
        DerivedColumn::new("Ano", year("Data_Venda")),
        DerivedColumn::new("Mês", Derivation::Month { source: "Data_Venda".into() }),
        DerivedColumn::new("Trimestre", Derivation::Quarter { source: "Data_Venda".into() }),
    ];
    cfg.filters = vec![
        FilterControl::multi_select("Ano", "Selecione o(s) Ano(s)"),
        FilterControl::multi_select("Trimestre", "Selecione o(s) Trimestre(s)"),
    ];
    cfg.halt_on_empty = true;
    cfg.charts = vec![
        bar(
            "Vendas Totais por Mês",
            Aggregation::sum(&["Ano", "Mês"], "Total_Venda").ordered(GroupOrder::KeyAsc),
        ),
        top_products("Total_Venda", "Top 5 Produtos por Vendas"),
        top_products("Quantidade", "Top 5 Produtos por Quantidade Vendida"),
        hbar(
            "Top 5 Clientes por Vendas",
            Aggregation::sum(&["Nome_Cliente"], "Total_Venda").top(5),
        ),
        hbar(
            "Vendas Totais por País",
            Aggregation::sum(&["País"], "Total_Venda").ordered(GroupOrder::ValueDesc),
        ),
        bar(
            "Preço Unitário Médio por Categoria",
            Aggregation::mean(&["Categoria_Produto"], "Preço_Unitário")
                .ordered(GroupOrder::ValueDesc),
        ),
    ];
    cfg
}

/// The same sales data answering fixed business questions, unfiltered.
pub fn sales_questions() -> DashboardConfig {
    let mut cfg = DashboardConfig::new(
        "vendas_perguntas",
        "Análise de Vendas de Eletrônicos",
        SourceSpec::new("vendas_eletronicos.csv", sales_schema()),
    );
    cfg.derived = vec![DerivedColumn::new(
        "Mês",
        Derivation::MonthBucket {
            source: "Data_Venda".into(),
        },
    )];
    cfg.metrics = vec![MetricSpec::new(
        "Total de Registros",
        MetricValue::Aggregate(Measure::rows()),
        MetricFormat::Integer,
    )];
    cfg.charts = vec![
        ChartSpec::new(
            "Primeiras Linhas",
            ChartKind::Preview {
                rows: 5,
                columns: Vec::new(),
            },
        ),
        bar(
            "1. Receita Total por Categoria",
            Aggregation::sum(&["Categoria_Produto"], "Total_Venda"),
        ),
        top_products("Total_Venda", "2. Top 5 Produtos por Receita"),
        top_products("Quantidade", "2. Top 5 Produtos por Quantidade Vendida"),
        bar(
            "3. Receita Total por País",
            Aggregation::sum(&["País"], "Total_Venda").ordered(GroupOrder::ValueDesc),
        ),
        ChartSpec::new(
            "4. Tendência de Receita ao Longo do Tempo",
            ChartKind::Line {
                aggregation: Aggregation::sum(&["Mês"], "Total_Venda").ordered(GroupOrder::KeyAsc),
            },
        ),
        bar(
            "5. Ticket Médio por Categoria de Produto",
            Aggregation::mean(&["Categoria_Produto"], "Total_Venda"),
        ),
    ];
    cfg
}

// ---------------------------------------------------------------------------
// Credit analysis
// ---------------------------------------------------------------------------

pub const AGE_BANDS: [&str; 5] = ["18-30", "31-40", "41-50", "51-60", "61-80"];

pub const SCORE_BANDS: [&str; 5] = [
    "Muito Baixo (300-499)",
    "Baixo (500-699)",
    "Médio (700-849)",
    "Bom (850-999)",
    "Excelente (1000)",
];

fn bins(source: &str, edges: &[f64], labels: &[&str]) -> Derivation {
    Derivation::Bins {
        source: source.to_string(),
        edges: edges.to_vec(),
        labels: labels.iter().map(|l| l.to_string()).collect(),
        include_lowest: true,
    }
}

pub fn credit() -> DashboardConfig {
    use ColumnType::*;
    let schema = TableSchema::new(vec![
        ColumnSpec::optional("ID_CLIENTE", Int),
        ColumnSpec::required("IDADE", Int),
        ColumnSpec::optional("RENDA_MENSAL", Float),
        ColumnSpec::required("SCORE_CREDITO", Int),
        ColumnSpec::optional("TEMPO_RESIDENCIA", Int),
        ColumnSpec::optional("DIVIDA_ATUAL", Float),
        ColumnSpec::optional("HISTORICO_INADIMPLENCIA", Str),
        ColumnSpec::optional("EMPREGO", Str),
        ColumnSpec::optional("ESTADO_CIVIL", Str),
        ColumnSpec::optional("TEMPO_EMPREGO", Int),
        ColumnSpec::optional("VALOR_SOLICITADO", Float),
        ColumnSpec::optional("APROVADO", Str),
    ])
    .with_uppercase_text();

    let mut cfg = DashboardConfig::new(
        "credito",
        "Dashboard de Análise de Crédito",
        SourceSpec::new("base_credito_ficticia.csv", schema)
            .generated(SampleKind::credit(crate::synth::DEFAULT_RECORDS).with_seed(42)),
    );
    cfg.subtitle = Some("Versão 3.0 - Julho 2024".into());
    cfg.derived = vec![
        DerivedColumn::new(
            "APROVADO_NUM",
            Derivation::MapValues {
                source: "APROVADO".into(),
                mapping: vec![
                    (CellValue::from("APROVADO"), CellValue::Int(1)),
                    (CellValue::from("REPROVADO"), CellValue::Int(0)),
                ],
            },
        ),
        DerivedColumn::new(
            "INADIMPLENTE",
            Derivation::Equals {
                source: "HISTORICO_INADIMPLENCIA".into(),
                value: CellValue::from("SIM"),
            },
        ),
        DerivedColumn::new(
            "FAIXA_ETARIA",
            bins("IDADE", &[18.0, 30.0, 40.0, 50.0, 60.0, 80.0], &AGE_BANDS),
        )
        .required(),
        DerivedColumn::new(
            "FAIXA_SCORE",
            bins("SCORE_CREDITO", &[0.0, 300.0, 500.0, 700.0, 850.0, 1000.0], &SCORE_BANDS),
        )
        .required(),
        DerivedColumn::new(
            "RAZAO_VALOR_RENDA",
            Derivation::Ratio {
                numerator: "VALOR_SOLICITADO".into(),
                denominator: "RENDA_MENSAL".into(),
                denominator_scale: 12.0,
            },
        ),
    ];
    cfg.filters = vec![
        FilterControl::multi_select("ESTADO_CIVIL", "ESTADO CIVIL"),
        FilterControl::multi_select("EMPREGO", "TIPO DE EMPREGO"),
        FilterControl::numeric_range("IDADE", "FAIXA ETÁRIA"),
        FilterControl::numeric_range("SCORE_CREDITO", "SCORE DE CRÉDITO"),
    ];
    cfg.halt_on_empty = true;
    cfg.empty_message =
        "Nenhum dado encontrado com os filtros atuais. Ajuste os filtros e tente novamente.".into();

    cfg.metrics = vec![
        MetricSpec::new(
            "Total de Clientes",
            MetricValue::Aggregate(Measure::rows()),
            MetricFormat::Integer,
        ),
        MetricSpec::new(
            "Taxa de Aprovação",
            MetricValue::Aggregate(Measure::of("APROVADO_NUM", AggOp::Mean)),
            MetricFormat::Percent { decimals: 1 },
        )
        .with_help("Percentual de clientes aprovados no crédito"),
        MetricSpec::new(
            "Inadimplência",
            MetricValue::Aggregate(Measure::of("INADIMPLENTE", AggOp::Mean)),
            MetricFormat::Percent { decimals: 1 },
        )
        .with_help("Percentual de clientes com histórico de inadimplência"),
        MetricSpec::new(
            "Score Médio",
            MetricValue::Aggregate(Measure::of("SCORE_CREDITO", AggOp::Mean)),
            MetricFormat::Decimal { decimals: 0 },
        )
        .with_help("Média do score de crédito dos clientes filtrados"),
    ];

    let approval = Some("APROVADO".to_string());
    cfg.charts = vec![
        ChartSpec::new(
            "Distribuição Percentual por Faixa Etária",
            ChartKind::Pie {
                aggregation: Aggregation::count(&["FAIXA_ETARIA"]).ordered(GroupOrder::KeyAsc),
            },
        ),
        ChartSpec::new(
            "Taxa de Aprovação por Estado Civil e Tipo de Emprego",
            ChartKind::Heatmap {
                aggregation: Aggregation::mean(&["ESTADO_CIVIL", "EMPREGO"], "APROVADO_NUM"),
            },
        )
        .when_empty("Dados insuficientes para calcular taxas de aprovação."),
        ChartSpec::new(
            "Scores de Crédito por Faixa Etária e Status de Aprovação",
            ChartKind::BoxPlot {
                column: "SCORE_CREDITO".into(),
                group_by: "FAIXA_ETARIA".into(),
                split_by: approval.clone(),
            },
        ),
        ChartSpec::new(
            "Relação entre Renda Mensal e Valor Solicitado",
            ChartKind::Scatter {
                x: "RENDA_MENSAL".into(),
                y: "VALOR_SOLICITADO".into(),
                color_by: approval.clone(),
            },
        ),
        ChartSpec::new(
            "Razão entre Valor Solicitado e Renda Anual",
            ChartKind::Histogram {
                column: "RAZAO_VALOR_RENDA".into(),
                bins: 30,
                reference: Some(5.0),
                split_by: approval.clone(),
            },
        ),
        ChartSpec::new(
            "Relação entre Dívida Atual e Score de Crédito",
            ChartKind::Scatter {
                x: "DIVIDA_ATUAL".into(),
                y: "SCORE_CREDITO".into(),
                color_by: approval.clone(),
            },
        ),
        ChartSpec::new(
            "Inadimplência por Segmento",
            ChartKind::Table {
                aggregation: Aggregation::count(&[
                    "FAIXA_ETARIA",
                    "EMPREGO",
                    "HISTORICO_INADIMPLENCIA",
                ])
                .ordered(GroupOrder::KeyAsc),
                complete: true,
            },
        )
        .when_empty("Dados insuficientes para o gráfico de segmentos."),
        ChartSpec::new(
            "Scores por Categoria e Status de Aprovação",
            ChartKind::BoxPlot {
                column: "SCORE_CREDITO".into(),
                group_by: "FAIXA_SCORE".into(),
                split_by: approval,
            },
        ),
        ChartSpec::new(
            "Correlação entre Variáveis Numéricas",
            ChartKind::Correlation {
                columns: [
                    "IDADE",
                    "RENDA_MENSAL",
                    "SCORE_CREDITO",
                    "TEMPO_RESIDENCIA",
                    "DIVIDA_ATUAL",
                    "TEMPO_EMPREGO",
                    "VALOR_SOLICITADO",
                    "APROVADO_NUM",
                    "RAZAO_VALOR_RENDA",
                ]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            },
        ),
    ];
    cfg
}

/// Look a preset up by id.
pub fn by_id(id: &str) -> Option<DashboardConfig> {
    all().into_iter().find(|d| d.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::chart::{evaluate_chart, ChartData};
    use crate::dashboard::selection::FilterSelections;
    use crate::dashboard::view::{evaluate_dashboard, DashboardView};
    use crate::data::cache::TableCache;
    use crate::data::filter::filter;
    use crate::data::pipeline::load_source;

    #[test]
    fn ids_are_unique() {
        let ids: std::collections::BTreeSet<_> = all().into_iter().map(|d| d.id).collect();
        assert_eq!(ids.len(), all().len());
        assert!(by_id("credito").is_some());
        assert!(by_id("nope").is_none());
    }

    #[test]
    fn credit_dashboard_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = credit();
        cfg.source.generate_if_missing = Some(SampleKind::credit(300).with_seed(42));
        let mut cache = TableCache::new();
        let table = load_source(&mut cache, dir.path(), &cfg.source, &cfg.derived).unwrap();
        assert_eq!(table.len(), 300);
        assert_eq!(table.dropped_rows(), 0);

        let mut selections = FilterSelections::init(&cfg.filters, &table);
        let filtered = filter(&table, &selections.to_predicates());
        assert_eq!(filtered.len(), 300);

        match evaluate_dashboard(&cfg, &filtered) {
            DashboardView::Ready { metrics, charts } => {
                assert_eq!(metrics[0].as_ref().unwrap().text, "300");
                assert!(charts.iter().all(|c| c.data.is_ok()), "{charts:?}");
            }
            other => panic!("unexpected {other:?}"),
        }

        selections.select_none("EMPREGO");
        let none = filter(&table, &selections.to_predicates());
        assert!(matches!(evaluate_dashboard(&cfg, &none), DashboardView::NoData(_)));
    }

    #[test]
    fn segment_table_lists_every_combination() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = credit();
        cfg.source.generate_if_missing = Some(SampleKind::credit(2000).with_seed(42));
        let mut cache = TableCache::new();
        let table = load_source(&mut cache, dir.path(), &cfg.source, &cfg.derived).unwrap();
        let segments = cfg
            .charts
            .iter()
            .find(|c| c.title == "Inadimplência por Segmento")
            .unwrap();
        match evaluate_chart(segments, &table).unwrap() {
            ChartData::Grouped { result, .. } => assert_eq!(result.len(), 5 * 3 * 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn youngest_applicants_fall_in_the_first_age_band() {
        use crate::data::derive::derive;
        use crate::data::model::{Field, Row, Table};

        let bands: Vec<_> = credit()
            .derived
            .into_iter()
            .filter(|d| d.name == "FAIXA_ETARIA")
            .collect();
        let rows = [18, 30, 31, 80]
            .iter()
            .map(|age| {
                let mut row = Row::new();
                row.insert("IDADE".into(), CellValue::Int(*age));
                row
            })
            .collect();
        let table = Table::new(vec![Field::new("IDADE", ColumnType::Int)], rows);

        let banded = derive(&table, &bands);
        assert_eq!(banded.dropped_rows(), 0);
        let labels: Vec<_> = (0..banded.len())
            .map(|i| banded.value(i, "FAIXA_ETARIA").to_string())
            .collect();
        assert_eq!(labels, ["18-30", "18-30", "31-40", "61-80"]);
    }

    #[test]
    fn only_the_filtered_sales_dashboard_generates_its_file() {
        assert!(matches!(
            sales().source.generate_if_missing,
            Some(SampleKind::Sales { .. })
        ));
        assert_eq!(sales_questions().source.generate_if_missing, None);

        let dir = tempfile::tempdir().unwrap();
        let mut cache = TableCache::new();
        let questions = sales_questions();
        let err = load_source(&mut cache, dir.path(), &questions.source, &questions.derived)
            .unwrap_err();
        assert!(err.to_string().contains("vendas_eletronicos.csv"), "{err}");
    }
}
