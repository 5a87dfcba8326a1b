//! Error types for osmtab.

use thiserror::Error;

/// Result type alias for osmtab operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading OSM data, tables, or writing output.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed OSM XML structure or an unparseable TSV value.
    #[error("parse error: {0}")]
    Parse(String),

    /// TSV header or record shape does not match what the reader expects.
    #[error("TSV schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A string that is not one of `node`, `way` or `relation`.
    #[error("invalid OSM object type: {0:?}")]
    InvalidKind(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Low-level TSV error from the csv reader or writer.
    #[error("TSV error: {0}")]
    Tsv(#[from] csv::Error),
}
