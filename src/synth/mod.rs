//! Fake datasets for trying the dashboards without real data.
//!
//! Both generators draw from an explicit `Rng`; passing a seed makes the
//! output reproducible.

pub mod credit;
pub mod sales;

use std::path::Path;

use anyhow::Context;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

pub const DEFAULT_RECORDS: usize = 10_000;

fn default_records() -> usize {
    DEFAULT_RECORDS
}

/// Which dataset to synthesize, and how much of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SampleKind {
    Sales {
        #[serde(default = "default_records")]
        records: usize,
        #[serde(default)]
        seed: Option<u64>,
    },
    Credit {
        #[serde(default = "default_records")]
        records: usize,
        #[serde(default)]
        seed: Option<u64>,
    },
}

impl SampleKind {
    pub fn sales(records: usize) -> Self {
        SampleKind::Sales { records, seed: None }
    }

    pub fn credit(records: usize) -> Self {
        SampleKind::Credit { records, seed: None }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        match self {
            SampleKind::Sales { records, .. } => SampleKind::Sales { records, seed: Some(seed) },
            SampleKind::Credit { records, .. } => SampleKind::Credit { records, seed: Some(seed) },
        }
    }

    pub fn records(&self) -> usize {
        match self {
            SampleKind::Sales { records, .. } | SampleKind::Credit { records, .. } => *records,
        }
    }

    fn rng(&self) -> StdRng {
        let seed = match self {
            SampleKind::Sales { seed, .. } | SampleKind::Credit { seed, .. } => *seed,
        };
        match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        }
    }
}

/// Generate the dataset described by `kind` and write it as CSV to `path`,
/// creating parent directories as needed. Returns the number of rows written.
pub fn write_sample(kind: &SampleKind, path: &Path) -> anyhow::Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }

    let mut rng = kind.rng();
    let written = match kind {
        SampleKind::Sales { records, .. } => {
            let now = chrono::Local::now().naive_local();
            let rows = sales::generate(&mut rng, *records, now);
            write_csv(path, &rows)?
        }
        SampleKind::Credit { records, .. } => {
            let rows = credit::generate(&mut rng, *records)?;
            write_csv(path, &rows)?
        }
    };
    log::info!("wrote {written} sample rows to {}", path.display());
    Ok(written)
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> anyhow::Result<usize> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(rows.len())
}

fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
