use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipdexError {
    #[error("Invalid timestamp {text:?}: expected H:MM:SS or H:MM:SS.fff")]
    InvalidTimestamp { text: String },

    #[error("Malformed {category}: missing required field `{field}`")]
    MissingField {
        category: String,
        field: String,
    },

    #[error("Malformed {category}: field `{field}` must be {expected}")]
    InvalidField {
        category: String,
        field: String,
        expected: &'static str,
    },

    #[error("Report is not valid UTF-8: {reason}")]
    InvalidEncoding { reason: String },

    #[error("Report {name:?} contains no videos")]
    EmptyReport { name: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Report is missing its `state` field")]
    MissingState,

    #[error("Could not read index schema {path}: {reason}")]
    SchemaFileFailed { path: PathBuf, reason: String },

    #[error("Search request to {url} failed with status {status}: {body}")]
    SearchRequestFailed {
        url: String,
        status: u16,
        body: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] object_store::Error),
}

impl ClipdexError {
    /// True for errors that make a single report unparseable, as opposed to
    /// failures of the surrounding I/O.
    pub fn is_malformed_report(&self) -> bool {
        matches!(
            self,
            ClipdexError::InvalidTimestamp { .. }
                | ClipdexError::InvalidEncoding { .. }
                | ClipdexError::MissingField { .. }
                | ClipdexError::InvalidField { .. }
                | ClipdexError::EmptyReport { .. }
                | ClipdexError::MissingState
                | ClipdexError::JsonError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ClipdexError>;
