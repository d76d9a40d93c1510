use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
/// Pipe error
pub enum PipeError {
    /// A stage was built with settings it cannot work with.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The input breaks the quoting rules of the delimited format.
    #[error("Malformed quoting at line {line}: {reason}")]
    MalformedQuoting { line: usize, reason: &'static str },

    /// A row does not carry one value per header column.
    #[error("Malformed row {row}: expected {expected} values, found {found}")]
    MalformedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    /// Failure of the underlying source or sink, passed through as is.
    #[error(transparent)]
    Io(#[from] io::Error),
}
