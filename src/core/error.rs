use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalcError {
    #[error("invalid input: {field} {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("invalid tax configuration: {0}")]
    Configuration(String),

    #[error("unknown tax year: {0}")]
    UnknownTaxYear(String),

    #[error("failed to read tax config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse tax config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize output: {0}")]
    Output(#[source] serde_json::Error),
}

impl CalcError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        CalcError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}
