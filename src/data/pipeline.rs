use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::cache::TableCache;
use super::derive::{derive, DerivedColumn};
use super::error::LoadError;
use super::model::{Table, TableSchema};
use crate::synth::{self, SampleKind};

/// Where a dashboard's data comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Relative paths resolve against the configured data directory.
    pub path: PathBuf,
    #[serde(default)]
    pub schema: TableSchema,
    /// Synthesize this dataset at `path` when the file does not exist yet.
    #[serde(default)]
    pub generate_if_missing: Option<SampleKind>,
}

impl SourceSpec {
    pub fn new(path: impl Into<PathBuf>, schema: TableSchema) -> Self {
        Self {
            path: path.into(),
            schema,
            generate_if_missing: None,
        }
    }

    pub fn generated(mut self, kind: SampleKind) -> Self {
        self.generate_if_missing = Some(kind);
        self
    }

    pub fn resolve(&self, data_dir: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            data_dir.join(&self.path)
        }
    }
}

/// Create the source file from its sample generator if it is missing.
/// Returns the resolved path either way.
pub fn ensure_source(source: &SourceSpec, data_dir: &Path) -> Result<PathBuf, LoadError> {
    let path = source.resolve(data_dir);
    if path.exists() {
        return Ok(path);
    }
    if let Some(kind) = &source.generate_if_missing {
        log::info!("{} not found, generating sample data", path.display());
        synth::write_sample(kind, &path).map_err(|e| LoadError::Generate {
            path: path.clone(),
            reason: format!("{e:#}"),
        })?;
    }
    Ok(path)
}

/// Load the source (through `cache`) and add derived columns.
pub fn load_source(
    cache: &mut TableCache,
    data_dir: &Path,
    source: &SourceSpec,
    derived: &[DerivedColumn],
) -> Result<Table, LoadError> {
    let path = ensure_source(source, data_dir)?;
    let raw = cache.load(&path, &source.schema).map_err(|e| {
        log::error!("loading {} failed: {e}", path.display());
        e
    })?;
    let table = derive(&raw, derived);
    if table.dropped_rows() > raw.dropped_rows() {
        log::warn!(
            "{}: {} rows dropped for missing derived values",
            path.display(),
            table.dropped_rows() - raw.dropped_rows()
        );
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::derive::Derivation;
    use crate::data::model::{ColumnSpec, ColumnType};

    #[test]
    fn relative_paths_join_data_dir() {
        let spec = SourceSpec::new("dados/x.csv", TableSchema::default());
        assert_eq!(spec.resolve(Path::new("/srv")), PathBuf::from("/srv/dados/x.csv"));
        let abs = SourceSpec::new("/tmp/x.csv", TableSchema::default());
        assert_eq!(abs.resolve(Path::new("/srv")), PathBuf::from("/tmp/x.csv"));
    }

    #[test]
    fn missing_source_without_generator_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = TableCache::new();
        let spec = SourceSpec::new("nope.csv", TableSchema::default());
        let err = load_source(&mut cache, dir.path(), &spec, &[]).unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[test]
    fn missing_source_is_generated_then_derived() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = TableCache::new();
        let schema = TableSchema::new(vec![ColumnSpec::required("IDADE", ColumnType::Int)])
            .with_uppercase_text();
        let spec = SourceSpec::new("credito.csv", schema)
            .generated(SampleKind::credit(50).with_seed(42));
        let derived = [DerivedColumn::new(
            "APROVADO_NUM",
            Derivation::Equals {
                source: "APROVADO".into(),
                value: "APROVADO".into(),
            },
        )];

        let table = load_source(&mut cache, dir.path(), &spec, &derived).unwrap();
        assert!(dir.path().join("credito.csv").exists());
        assert_eq!(table.len(), 50);
        assert_eq!(table.column_type("APROVADO_NUM"), Some(ColumnType::Int));

        // Second call reuses the file and the cached load.
        let again = load_source(&mut cache, dir.path(), &spec, &derived).unwrap();
        assert_eq!(again, table);
        assert_eq!(cache.len(), 1);
    }
}
