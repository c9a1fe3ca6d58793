//! The JSON value engine and JSONPath evaluator backing the `jct`
//! configuration tool.
//!
//! This crate carries no process-level behavior — no stdout writes, no exit
//! codes, no filesystem path resolution beyond `parse_file`/`save` reading
//! and writing the exact path they are given. The `jct` binary (see the
//! `cli` crate) is a thin adapter over the operations exported here.

pub mod dotpath;
pub mod error;
pub mod jsonpath;
pub mod kernel;
pub mod parser;
pub mod persist;
pub mod serializer;
pub mod value;

pub use dotpath::{get_nested, set_nested};
pub use error::{JsonPathError, ParseError, PathError, PersistError, SerializeError};
pub use jsonpath::{evaluate, EvalOptions, OutputMode};
pub use kernel::{diff, merge_into};
pub use parser::{parse, parse_file, ParseOutcome};
pub use persist::{load, save};
pub use serializer::serialize;
pub use value::Value;
