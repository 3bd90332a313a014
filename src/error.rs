use std::path::PathBuf;

use thiserror::Error;

/// Every failure a pipeline component can report.
///
/// Components return these unmodified; the orchestrator attaches the stage
/// it was in (see [`crate::pipeline::PipelineFailure`]) and never rewrites
/// the inner error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot connect to '{uri}': {reason}")]
    Connection { uri: String, reason: String },

    #[error("query failed: {0}")]
    Query(String),

    #[error("malformed tabular data: {0}")]
    Format(String),

    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    #[error("column '{0}' requested more than once")]
    DuplicateColumn(String),

    #[error("invalid missing-value policy '{0}' (expected mean, median or drop)")]
    InvalidPolicy(String),

    #[error("invalid log level '{0}' (expected debug, info, warning or error)")]
    InvalidLogLevel(String),

    #[error("column '{column}', row {row}: {reason}")]
    DateParse {
        column: String,
        row: usize,
        reason: String,
    },

    #[error("column '{column}': {reason}")]
    Type { column: String, reason: String },

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("model fit failed: {0}")]
    Fit(String),

    #[error("feature columns {actual:?} do not match the model's {expected:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn type_error(column: &str, reason: impl Into<String>) -> Self {
        Self::Type {
            column: column.to_string(),
            reason: reason.into(),
        }
    }

    /// Stable snake_case name of the error kind, for logs and exit reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io { .. } => "io_error",
            Error::Connection { .. } => "connection_error",
            Error::Query(_) => "query_error",
            Error::Format(_) => "format_error",
            Error::ColumnNotFound(_) => "column_not_found",
            Error::DuplicateColumn(_) => "duplicate_column",
            Error::InvalidPolicy(_) => "invalid_policy",
            Error::InvalidLogLevel(_) => "invalid_log_level",
            Error::DateParse { .. } => "date_parse_error",
            Error::Type { .. } => "type_error",
            Error::InsufficientData(_) => "insufficient_data",
            Error::Fit(_) => "fit_error",
            Error::SchemaMismatch { .. } => "schema_mismatch",
            Error::Config(_) => "config_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_column() {
        let err = Error::ColumnNotFound("stock_level".into());
        assert_eq!(err.to_string(), "column 'stock_level' not found");
        assert_eq!(err.kind(), "column_not_found");
    }

    #[test]
    fn io_error_keeps_its_source() {
        let err = Error::io(
            "missing.csv",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("missing.csv"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
