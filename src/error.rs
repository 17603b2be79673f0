//! Error taxonomy for the aggregation core

use thiserror::Error;

/// Errors raised while normalizing order rows or computing aggregate views
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// A global scalar (review mode, RFM snapshot) has no qualifying row
    #[error("cannot compute {what}: no qualifying rows in input")]
    EmptyInput { what: &'static str },

    /// A timestamp could not be parsed during normalization
    #[error("row {row}: malformed timestamp {value:?}")]
    MalformedTimestamp { row: usize, value: String },

    /// A numeric column held a value that could not be coerced
    #[error("row {row}: malformed {column} value {value:?}")]
    MalformedValue {
        row: usize,
        column: &'static str,
        value: String,
    },
}
