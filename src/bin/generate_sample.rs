//! Write one of the synthetic datasets to CSV.
//!
//! Usage: `generate_sample [sales|credit] [records] [output]`

use std::path::PathBuf;

use anyhow::{bail, Context};
use rusty_dash::synth::{write_sample, SampleKind, DEFAULT_RECORDS};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let which = args.next().unwrap_or_else(|| "sales".to_string());
    let records = match args.next() {
        Some(n) => n.parse::<usize>().with_context(|| format!("invalid record count '{n}'"))?,
        None => DEFAULT_RECORDS,
    };

    let (kind, default_output) = match which.as_str() {
        "sales" => (SampleKind::sales(records), "vendas_eletronicos.csv"),
        // Seeded so the credit dashboard's numbers are reproducible.
        "credit" => (SampleKind::credit(records).with_seed(42), "base_credito_ficticia.csv"),
        other => bail!("unknown dataset '{other}' (expected 'sales' or 'credit')"),
    };
    let output = args.next().map_or_else(|| PathBuf::from(default_output), PathBuf::from);

    let written = write_sample(&kind, &output)?;
    log::info!("wrote {written} rows to {}", output.display());
    Ok(())
}
