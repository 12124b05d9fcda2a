//! Error taxonomy for the loan document pipeline.
//!
//! Per-item errors are isolated by the `PipelineDriver` and reported as
//! `ItemOutcome::Failed`/`Skipped`; only `Configuration` aborts a run.

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Missing or invalid connection settings. Fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unsupported file format: {name}")]
    UnsupportedFormat { name: String },

    /// A network call failed in a way that may succeed on retry.
    #[error("Transient transport failure during {operation}: {message}")]
    TransientTransport { operation: String, message: String },

    /// A network call failed for good (retries exhausted or non-retryable status).
    #[error("{operation} failed after {attempts} attempt(s): {message}")]
    ItemProcessing {
        operation: String,
        attempts: u32,
        message: String,
    },

    #[error("Analysis provider returned no usable result: {0}")]
    ProviderAnalysis(String),

    #[error("Schema extraction failed: {0}")]
    SchemaExtraction(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Copyable discriminant used in structured diagnostics and batch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    UnsupportedFormat,
    TransientTransport,
    ItemProcessing,
    ProviderAnalysis,
    SchemaExtraction,
    Io,
    Json,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Configuration(_) => ErrorKind::Configuration,
            PipelineError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            PipelineError::TransientTransport { .. } => ErrorKind::TransientTransport,
            PipelineError::ItemProcessing { .. } => ErrorKind::ItemProcessing,
            PipelineError::ProviderAnalysis(_) => ErrorKind::ProviderAnalysis,
            PipelineError::SchemaExtraction(_) => ErrorKind::SchemaExtraction,
            PipelineError::Io(_) => ErrorKind::Io,
            PipelineError::Json(_) => ErrorKind::Json,
        }
    }

    /// Only transport-level failures are worth retrying; semantic failures never are.
    pub fn is_transient(&self) -> bool {
        matches!(self, PipelineError::TransientTransport { .. })
    }

    pub fn transient(operation: &str, message: impl Into<String>) -> Self {
        PipelineError::TransientTransport {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub fn item_processing(operation: &str, attempts: u32, message: impl Into<String>) -> Self {
        PipelineError::ItemProcessing {
            operation: operation.to_string(),
            attempts,
            message: message.into(),
        }
    }
}
