/// Data layer: typed tables, loading, derivation, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .xlsx / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file, coerce cells → Table   (cache: reuse by mtime/len)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  derive   │  year / quarter / bins / ratios … → Table
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  PredicateSet (AND across columns) → Table
///   └──────────┘
///        │
///        ▼
///   ┌────────────────┐
///   │ aggregate/stats │  grouped sums, counts, histograms … per chart
///   └────────────────┘
/// ```

pub mod aggregate;
pub mod cache;
pub mod coerce;
pub mod derive;
pub mod error;
pub mod filter;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod stats;
