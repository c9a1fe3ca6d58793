//! Error types for the JSON value engine and JSONPath evaluator.

use thiserror::Error;

/// Errors raised while turning bytes into a [`Value`](crate::Value).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected end of input at byte {pos}")]
    UnexpectedEof { pos: usize },

    #[error("unexpected byte {byte:#04x} at position {pos}")]
    UnexpectedByte { pos: usize, byte: u8 },

    #[error("unterminated string starting at byte {pos}")]
    UnterminatedString { pos: usize },

    #[error("invalid escape sequence at byte {pos}")]
    InvalidEscape { pos: usize },

    #[error("invalid number literal at byte {pos}")]
    InvalidNumber { pos: usize },

    #[error("expected ':' after object key at byte {pos}")]
    ExpectedColon { pos: usize },

    #[error("expected ',' or closing bracket at byte {pos}")]
    ExpectedCommaOrClose { pos: usize },

    #[error("input exceeds the {limit}-byte size limit")]
    TooLarge { limit: usize },

    #[error("nesting exceeds the maximum depth of {limit}")]
    NestingTooDeep { limit: usize },

    #[error("failed to read '{path}': {message}")]
    Io { path: std::path::PathBuf, message: String },
}

/// Errors raised while serializing a [`Value`](crate::Value) to canonical form.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerializeError {
    #[error("nesting exceeds the maximum depth of {limit}")]
    NestingTooDeep { limit: usize },
}

/// Errors raised by the dot-path accessor (`get_nested` / `set_nested`).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PathError {
    #[error("path segment '{segment}' is not a valid array index")]
    InvalidIndex { segment: String },

    #[error("cannot traverse into a non-object, non-array value at segment '{segment}'")]
    NotContainer { segment: String },

    #[error("path is empty")]
    EmptyPath,
}

/// Errors raised while parsing or evaluating a JSONPath expression.
///
/// In `strict` evaluation these surface to the caller; in lenient evaluation
/// they are swallowed and an empty result set is returned instead (see
/// [`crate::jsonpath::evaluate`]).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum JsonPathError {
    #[error("jsonpath expression must start with '$' (at byte {pos})")]
    ExpectedRoot { pos: usize },

    #[error("unexpected end of jsonpath expression")]
    UnexpectedEof,

    #[error("expected property name at byte {pos}")]
    ExpectedName { pos: usize },

    #[error("malformed bracket selector at byte {pos}")]
    MalformedSelector { pos: usize },

    #[error("malformed filter expression at byte {pos}")]
    MalformedFilter { pos: usize },

    #[error("negative indices are not supported (at byte {pos})")]
    NegativeIndex { pos: usize },

    #[error("'@..' inside a filter expression is not supported")]
    UnsupportedRecursiveFilter,

    #[error("trailing characters after a complete jsonpath expression (at byte {pos})")]
    TrailingInput { pos: usize },
}

/// Errors raised by the atomic persistence layer.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to serialize value: {0}")]
    Serialize(#[from] SerializeError),

    #[error("failed to write temporary file {path}: {source}")]
    WriteTemp {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to rename {from} to {to}: {source}")]
    Rename {
        from: std::path::PathBuf,
        to: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to copy {from} to {to} during cross-device fallback: {source}")]
    CopyFallback {
        from: std::path::PathBuf,
        to: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}
