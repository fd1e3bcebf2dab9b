use rand::distributions::WeightedIndex;
use rand::Rng;
use rand_distr::{Distribution, Exp, Normal};
use serde::Serialize;

use super::round_cents;

const DEFAULT_HISTORY: [(&str, f64); 2] = [("NÃO", 0.8), ("SIM", 0.2)];
const EMPLOYMENT: [(&str, f64); 3] = [("CLT", 0.7), ("AUTÔNOMO", 0.2), ("DESEMPREGADO", 0.1)];
const MARITAL_STATUS: [(&str, f64); 3] = [("SOLTEIRO", 0.4), ("CASADO", 0.5), ("DIVORCIADO", 0.1)];

/// One applicant as written to `base_credito_ficticia.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Applicant {
    pub id_cliente: u64,
    pub idade: u32,
    pub renda_mensal: f64,
    pub score_credito: u32,
    pub tempo_residencia: u32,
    pub divida_atual: f64,
    pub historico_inadimplencia: &'static str,
    pub emprego: &'static str,
    pub estado_civil: &'static str,
    pub tempo_emprego: u32,
    pub valor_solicitado: f64,
    pub aprovado: &'static str,
}

/// Weighted choice over labelled options.
struct Choice {
    labels: Vec<&'static str>,
    index: WeightedIndex<f64>,
}

impl Choice {
    fn new(options: &[(&'static str, f64)]) -> anyhow::Result<Self> {
        Ok(Choice {
            labels: options.iter().map(|(l, _)| *l).collect(),
            index: WeightedIndex::new(options.iter().map(|(_, w)| *w))?,
        })
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> &'static str {
        self.labels[self.index.sample(rng)]
    }
}

/// `records` fictitious credit applicants.
///
/// Approval is decided from a score and an income drawn independently of
/// the reported ones, so the reported columns carry no signal about it.
pub fn generate<R: Rng + ?Sized>(rng: &mut R, records: usize) -> anyhow::Result<Vec<Applicant>> {
    let income = Normal::<f64>::new(2000.0, 20001.0)?;
    let debt = Exp::<f64>::new(1.0 / 1000.0)?;
    let hidden_income = Normal::<f64>::new(5000.0, 2000.0)?;
    let history = Choice::new(&DEFAULT_HISTORY)?;
    let employment = Choice::new(&EMPLOYMENT)?;
    let marital = Choice::new(&MARITAL_STATUS)?;

    let mut out = Vec::with_capacity(records);
    for id in 1..=records as u64 {
        let hidden_score = rng.gen_range(300..=850);
        let approved = hidden_score > 600 && hidden_income.sample(rng) > 3000.0;
        out.push(Applicant {
            id_cliente: id,
            idade: rng.gen_range(18..=80),
            renda_mensal: round_cents(income.sample(rng).clamp(1000.0, 20000.0)),
            score_credito: rng.gen_range(190..=998),
            tempo_residencia: rng.gen_range(0..=40),
            divida_atual: round_cents(debt.sample(rng).min(50000.0)),
            historico_inadimplencia: history.sample(rng),
            emprego: employment.sample(rng),
            estado_civil: marital.sample(rng),
            tempo_emprego: rng.gen_range(0..=40),
            valor_solicitado: rng.gen_range(5000..=300_000u32) as f64,
            aprovado: if approved { "APROVADO" } else { "REPROVADO" },
        });
    }
    Ok(out)
}
