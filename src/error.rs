// Error types for the loader, one enum per layer.
// Record errors are line-scoped, load errors are file-scoped, and store or
// config errors decide whether the run can start at all.

use std::path::PathBuf;
use thiserror::Error;

/// A single record could not be turned into a row.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("field {index} requested but record has {len} fields")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("malformed timestamp '{value}': {reason}")]
    MalformedTimestamp { value: String, reason: String },
}

/// Errors raised by a destination store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot connect to database {database}: {source}")]
    Connection {
        database: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("query failed: {sql}: {source}")]
    Query {
        sql: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("cannot write SQL script: {0}")]
    Write(#[from] std::io::Error),

    #[error("cannot close database connection: {0}")]
    Close(#[source] rusqlite::Error),
}

/// Errors that fail the load of one input file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} has no header line", .path.display())]
    EmptyFile { path: PathBuf },

    #[error("'{name}' is not a valid table name")]
    InvalidTableName { name: String },

    #[error("line {line}: {source}")]
    Record {
        line: usize,
        #[source]
        source: RecordError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors while assembling the run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no database configured: pass --database or set POPULATE_DATABASE")]
    MissingDatabase,

    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}
