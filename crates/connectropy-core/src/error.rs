//! Error types for connectropy-core.

use thiserror::Error;

/// Error type for fingerprint and specialization operations.
///
/// Sparse connectivity is not an error: nodes without edges of a direction,
/// or whose partners carry no known category, produce undefined (`None`)
/// values instead. Only conditions that leave nothing to compute end up here.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader/writer error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Bincode serialization error.
    #[cfg(feature = "binary")]
    #[error("binary encoding error: {0}")]
    Binary(String),

    /// A named column was not present in a table header.
    #[error("missing column '{column}' in {table} header")]
    MissingColumn {
        /// Column that was requested.
        column: String,
        /// Which input was being read ("edge", "metadata").
        table: &'static str,
    },

    /// Edge weight was negative, NaN or infinite.
    #[error("invalid weight {weight} on edge {from} -> {to}")]
    InvalidWeight { from: String, to: String, weight: f64 },

    /// Weight cell could not be parsed as a number.
    #[error("unparseable weight '{value}' on line {line}")]
    ParseWeight { value: String, line: u64 },

    /// The category axis would be empty.
    #[error("no categories: metadata has no non-null category and no explicit list was given, or the explicit list was empty")]
    EmptyCategories,

    /// A requested node subset resolved to nothing.
    #[error("no valid input: {0}")]
    NoValidNodes(String),

    /// Invalid configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type for connectropy operations.
pub type Result<T> = std::result::Result<T, Error>;
