//! Error types for the FAQ retrieval engine.

use thiserror::Error;

/// Top-level error type.
///
/// None of these are transient: every operation is deterministic and local,
/// so callers should surface them as-is.
#[derive(Error, Debug)]
pub enum Error {
    /// Build was called with zero records.
    #[error("corpus has no records to index")]
    EmptyCorpus,

    /// Method selector outside {tfidf, bow, bm25, boolean}.
    #[error("unsupported method '{0}'. Supported methods: bm25, boolean, bow, tfidf")]
    UnknownMethod(String),

    /// Scoring against an artifact without records.
    #[error("index artifact holds no records")]
    EmptyIndex,

    /// A loaded artifact failed its consistency checks.
    #[error("corrupt index artifact: {0}")]
    Corrupt(String),

    /// Configuration values out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration sources could not be merged or extracted.
    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CBOR error: {0}")]
    Cbor(#[from] serde_cbor::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
