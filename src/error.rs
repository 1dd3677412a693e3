//! Rich diagnostic error types for the kindred engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text so operators know exactly what went wrong
//! and how to fix it. Degenerate *input* (empty batches, zero-item users) is never
//! an error — those follow the empty-result contract in the pipeline instead.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the kindred engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full
/// diagnostic chain through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum KindredError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Table errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TableError {
    #[error("failed to read table file: {path}")]
    #[diagnostic(
        code(kindred::table::io),
        help("Ensure the file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse category tables: {message}")]
    #[diagnostic(
        code(kindred::table::parse),
        help(
            "Check the TOML syntax. Each `[[category]]` entry needs a `name`, \
             a `keywords` list, and exactly five `expected_minutes` values \
             (difficulty buckets 1 through 5)."
        )
    )]
    Parse { message: String },

    #[error("category table is empty")]
    #[diagnostic(
        code(kindred::table::empty),
        help(
            "At least one `[[category]]` entry is required — the classifier \
             has nothing to match titles against otherwise."
        )
    )]
    Empty,
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error: {source}")]
    #[diagnostic(
        code(kindred::store::io),
        help(
            "A filesystem operation failed. Check that the data directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("redb transaction error: {message}")]
    #[diagnostic(
        code(kindred::store::redb),
        help(
            "The embedded history database encountered a transaction error. \
             This may indicate corruption — try running with a fresh data directory."
        )
    )]
    Redb { message: String },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(kindred::store::serde),
        help(
            "Failed to serialize or deserialize a history entry. This usually \
             means the stored format changed between versions. The history table \
             is rebuilt every batch, so deleting the database file is safe."
        )
    )]
    Serialization { message: String },
}

/// Convenience alias for functions returning kindred results.
pub type KindredResult<T> = std::result::Result<T, KindredError>;
