//! Error taxonomy for the ETL pipeline.
//!
//! Validation errors reject the whole batch; there is no partial acceptance
//! and no internal retry. Everything propagates to the caller of
//! [`crate::pipeline::Pipeline::run`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Required columns absent from the input header. Lists every missing
    /// column, not just the first.
    #[error("missing required columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    /// A declared-numeric column held a value that does not parse as a
    /// finite float.
    #[error("row {row}: column '{column}' is not numeric: '{value}'")]
    TypeCoercion {
        column: String,
        value: String,
        row: usize,
    },

    /// A timestamp value could not be parsed.
    #[error("row {row}: unparseable timestamp '{value}'")]
    Timestamp { value: String, row: usize },

    /// Underlying store write or index creation failed.
    #[error("persistence failed: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("csv read failed: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
