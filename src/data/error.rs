use std::path::PathBuf;

use thiserror::Error;

/// Why a source file could not be turned into a [`Table`](super::model::Table).
///
/// Row-level coercion failures are not errors: those rows are dropped and
/// counted on the table instead.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file '{}' not found", .0.display())]
    NotFound(PathBuf),

    #[error("cannot decode '{}': {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("required column '{column}' missing from '{}'", .path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("generating sample data for '{}' failed: {reason}", .path.display())]
    Generate { path: PathBuf, reason: String },
}

impl LoadError {
    pub fn parse(path: &std::path::Path, reason: impl ToString) -> Self {
        LoadError::Parse {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Map an I/O error, keeping "not found" as its own variant.
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            LoadError::NotFound(path.to_path_buf())
        } else {
            LoadError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// A chart or metric asked for something the table cannot answer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("column '{0}' is not numeric")]
    NonNumeric(String),

    #[error("operation '{0}' needs a measure column")]
    MissingMeasure(String),

    #[error("a heatmap needs exactly two group-by columns, got {0}")]
    NotTwoKeys(usize),
}
