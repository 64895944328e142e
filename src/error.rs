//! Error types for RGS log parsing

use thiserror::Error;

use crate::validator::ValidationError;

/// Errors that can occur between receiving an uploaded log and handing back
/// a typed tree
#[derive(Debug, Error)]
pub enum LogFileError {
    #[error("Failed to decode log file: {0}")]
    DecodeError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Log file failed validation: {0}")]
    Validation(#[from] ValidationError),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
