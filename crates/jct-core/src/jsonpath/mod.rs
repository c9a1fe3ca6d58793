//! Goessner-style JSONPath evaluator.
//!
//! Public entry point: [`evaluate`]. An expression is compiled once into a
//! [`CompiledPath`](ast::CompiledPath) (see [`parser`]), then walked once
//! per step against a working set of candidate nodes (see [`eval`]).

pub mod ast;
mod eval;
mod parser;

use crate::error::JsonPathError;
use crate::value::Value;

/// How a result set is assembled into a final [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// A JSON array of deep-cloned values.
    Values,
    /// A JSON array of path strings.
    Paths,
    /// A JSON array of `{"value": ..., "path": ...}` objects.
    Pairs,
}

/// Options governing a single JSONPath evaluation.
#[derive(Debug, Clone)]
pub struct EvalOptions {
    pub mode: OutputMode,
    /// `<= 0` means no limit.
    pub limit: i64,
    /// `true`: parse errors and unsupported constructs abort the whole
    /// evaluation with `Err`. `false`: the same conditions yield an empty
    /// result set (`Ok` with zero elements).
    pub strict: bool,
    /// In [`OutputMode::Values`] mode, emit the single value directly
    /// (not wrapped in a one-element array) when there is exactly one result.
    pub unwrap_single: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions {
            mode: OutputMode::Values,
            limit: 0,
            strict: false,
            unwrap_single: false,
        }
    }
}

/// Evaluate a JSONPath expression against `root` and assemble the result set
/// per `options.mode`.
///
/// In lenient mode (`options.strict == false`) any parse error or
/// unsupported-feature error collapses to an empty result set rather than
/// propagating.
pub fn evaluate(root: &Value, expression: &str, options: &EvalOptions) -> Result<Value, JsonPathError> {
    match eval::run(root, expression, options.strict) {
        Ok(pairs) => Ok(assemble(pairs, options)),
        Err(e) if options.strict => Err(e),
        Err(_) => Ok(assemble(Vec::new(), options)),
    }
}

fn assemble(mut pairs: Vec<(String, Value)>, options: &EvalOptions) -> Value {
    if options.limit > 0 && (pairs.len() as i64) > options.limit {
        pairs.truncate(options.limit as usize);
    }

    match options.mode {
        OutputMode::Values => {
            if options.unwrap_single && pairs.len() == 1 {
                pairs.into_iter().next().expect("checked len == 1").1
            } else {
                Value::Array(pairs.into_iter().map(|(_, v)| v).collect())
            }
        }
        OutputMode::Paths => Value::Array(pairs.into_iter().map(|(p, _)| Value::String(p)).collect()),
        OutputMode::Pairs => Value::Array(
            pairs
                .into_iter()
                .map(|(p, v)| {
                    Value::Object(vec![("value".to_string(), v), ("path".to_string(), Value::String(p))])
                })
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn v(src: &str) -> Value {
        parse(src.as_bytes()).unwrap().value
    }

    #[test]
    fn values_mode_returns_array() {
        let root = v(r#"{"a":[1,2,3]}"#);
        let result = evaluate(&root, "$.a[*]", &EvalOptions::default()).unwrap();
        assert_eq!(result, v("[1,2,3]"));
    }

    #[test]
    fn paths_mode_returns_path_strings() {
        let root = v(r#"{"a":[1,2]}"#);
        let opts = EvalOptions {
            mode: OutputMode::Paths,
            ..EvalOptions::default()
        };
        let result = evaluate(&root, "$.a[*]", &opts).unwrap();
        assert_eq!(result, v(r#"["$.a[0]", "$.a[1]"]"#));
    }

    #[test]
    fn pairs_mode_returns_value_and_path() {
        let root = v(r#"{"a":1}"#);
        let opts = EvalOptions {
            mode: OutputMode::Pairs,
            ..EvalOptions::default()
        };
        let result = evaluate(&root, "$.a", &opts).unwrap();
        assert_eq!(result, v(r#"[{"value": 1, "path": "$.a"}]"#));
    }

    #[test]
    fn limit_caps_result_count() {
        let root = v(r#"{"a":[1,2,3,4,5]}"#);
        let opts = EvalOptions {
            limit: 2,
            ..EvalOptions::default()
        };
        let result = evaluate(&root, "$.a[*]", &opts).unwrap();
        assert_eq!(result, v("[1,2]"));
    }

    #[test]
    fn unwrap_single_emits_bare_value() {
        let root = v(r#"{"a":42}"#);
        let opts = EvalOptions {
            unwrap_single: true,
            ..EvalOptions::default()
        };
        let result = evaluate(&root, "$.a", &opts).unwrap();
        assert_eq!(result, Value::Number(42.0));
    }

    #[test]
    fn unwrap_single_leaves_multiple_results_wrapped() {
        let root = v(r#"{"a":[1,2]}"#);
        let opts = EvalOptions {
            unwrap_single: true,
            ..EvalOptions::default()
        };
        let result = evaluate(&root, "$.a[*]", &opts).unwrap();
        assert_eq!(result, v("[1,2]"));
    }

    #[test]
    fn strict_mode_propagates_parse_errors() {
        let root = v("{}");
        let opts = EvalOptions {
            strict: true,
            ..EvalOptions::default()
        };
        assert!(evaluate(&root, "not-a-path", &opts).is_err());
    }

    #[test]
    fn lenient_mode_swallows_parse_errors() {
        let root = v("{}");
        let result = evaluate(&root, "not-a-path", &EvalOptions::default()).unwrap();
        assert_eq!(result, Value::Array(vec![]));
    }

    #[test]
    fn determinism_repeated_evaluation_matches() {
        let root = v(r#"{"a":{"b":[1,2,3]},"c":{"b":[4,5]}}"#);
        let first = evaluate(&root, "$..b", &EvalOptions::default()).unwrap();
        let second = evaluate(&root, "$..b", &EvalOptions::default()).unwrap();
        assert_eq!(first, second);
    }
}
