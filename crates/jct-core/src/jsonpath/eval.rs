//! Evaluates a compiled [`CompiledPath`] against a value tree.
//!
//! The working set is a list of candidate nodes, each holding a borrowed
//! reference into the source tree plus a stack of path segments (per the
//! Design Notes' "Path-string construction" recommendation, the segment
//! stack is materialized into a `String` only when a result is finally
//! emitted, never on every descent).

use super::ast::{CompareOp, CompiledPath, CurrentStep, FilterExpr, FilterTerm, Step};
use super::parser::compile;
use crate::error::JsonPathError;
use crate::value::Value;

#[derive(Clone)]
enum Segment {
    Name(String),
    Index(usize),
}

#[derive(Clone)]
struct Candidate<'a> {
    value: &'a Value,
    segments: Vec<Segment>,
}

/// Compile `expr` and evaluate it against `root`, returning deep-cloned
/// `(path, value)` pairs in document order. `strict` governs whether
/// negative indices, `@..`, and parse errors abort the whole evaluation
/// (`Err`) or are treated as no-ops / per-node skips.
pub fn run(root: &Value, expr: &str, strict: bool) -> Result<Vec<(String, Value)>, JsonPathError> {
    let _span = tracing::trace_span!("jsonpath::run", expr, strict).entered();

    let compiled: CompiledPath = compile(expr)?;
    tracing::trace!(steps = compiled.steps.len(), "jsonpath: compiled");

    let mut candidates = vec![Candidate {
        value: root,
        segments: Vec::new(),
    }];
    for step in &compiled.steps {
        candidates = apply_step(step, &candidates, strict)?;
    }

    tracing::trace!(matches = candidates.len(), "jsonpath: evaluated");
    Ok(candidates
        .into_iter()
        .map(|c| (path_string(&c.segments), c.value.clone()))
        .collect())
}

fn apply_step<'a>(
    step: &Step,
    candidates: &[Candidate<'a>],
    strict: bool,
) -> Result<Vec<Candidate<'a>>, JsonPathError> {
    match step {
        Step::Child(name) => Ok(apply_child(candidates, name)),
        Step::Wildcard => Ok(apply_wildcard(candidates)),
        Step::Indices(idxs) => apply_indices(candidates, idxs, strict),
        Step::Keys(keys) => Ok(apply_keys(candidates, keys)),
        Step::Slice { start, end, step } => apply_slice(candidates, *start, *end, *step, strict),
        Step::Filter(expr) => apply_filter(candidates, expr, strict),
        Step::RecursiveDescent(inner) => {
            let mut descendants = Vec::new();
            for c in candidates {
                collect_descendants(c, &mut descendants);
            }
            apply_step(inner, &descendants, strict)
        }
    }
}

fn apply_child<'a>(candidates: &[Candidate<'a>], name: &str) -> Vec<Candidate<'a>> {
    let mut out = Vec::new();
    for c in candidates {
        if let Some(child) = c.value.get_object_item(name) {
            let mut segments = c.segments.clone();
            segments.push(Segment::Name(name.to_string()));
            out.push(Candidate { value: child, segments });
        }
    }
    out
}

fn apply_wildcard<'a>(candidates: &[Candidate<'a>]) -> Vec<Candidate<'a>> {
    let mut out = Vec::new();
    for c in candidates {
        match c.value {
            Value::Object(members) => {
                for (k, v) in members {
                    let mut segments = c.segments.clone();
                    segments.push(Segment::Name(k.clone()));
                    out.push(Candidate { value: v, segments });
                }
            }
            Value::Array(items) => {
                for (i, v) in items.iter().enumerate() {
                    let mut segments = c.segments.clone();
                    segments.push(Segment::Index(i));
                    out.push(Candidate { value: v, segments });
                }
            }
            _ => {}
        }
    }
    out
}

fn apply_indices<'a>(
    candidates: &[Candidate<'a>],
    indices: &[i64],
    strict: bool,
) -> Result<Vec<Candidate<'a>>, JsonPathError> {
    let mut out = Vec::new();
    for c in candidates {
        if let Value::Array(items) = c.value {
            for &idx in indices {
                if idx < 0 {
                    if strict {
                        return Err(JsonPathError::NegativeIndex { pos: 0 });
                    }
                    continue;
                }
                if let Some(v) = items.get(idx as usize) {
                    let mut segments = c.segments.clone();
                    segments.push(Segment::Index(idx as usize));
                    out.push(Candidate { value: v, segments });
                }
            }
        }
    }
    Ok(out)
}

fn apply_keys<'a>(candidates: &[Candidate<'a>], keys: &[String]) -> Vec<Candidate<'a>> {
    let mut out = Vec::new();
    for c in candidates {
        if let Value::Object(_) = c.value {
            for key in keys {
                if let Some(child) = c.value.get_object_item(key) {
                    let mut segments = c.segments.clone();
                    segments.push(Segment::Name(key.clone()));
                    out.push(Candidate { value: child, segments });
                }
            }
        }
    }
    out
}

fn apply_slice<'a>(
    candidates: &[Candidate<'a>],
    start: Option<i64>,
    end: Option<i64>,
    step: i64,
    strict: bool,
) -> Result<Vec<Candidate<'a>>, JsonPathError> {
    let mut out = Vec::new();
    let eff_step = if step <= 0 { 1 } else { step };
    for c in candidates {
        if let Value::Array(items) = c.value {
            let n = items.len() as i64;
            let s = start.unwrap_or(0);
            let e = end.unwrap_or(n);
            if s < 0 || e < 0 {
                if strict {
                    return Err(JsonPathError::NegativeIndex { pos: 0 });
                }
                continue;
            }
            let e = e.min(n);
            let mut idx = s;
            while idx < e {
                if let Some(v) = items.get(idx as usize) {
                    let mut segments = c.segments.clone();
                    segments.push(Segment::Index(idx as usize));
                    out.push(Candidate { value: v, segments });
                }
                idx += eff_step;
            }
        }
    }
    Ok(out)
}

fn apply_filter<'a>(
    candidates: &[Candidate<'a>],
    expr: &FilterExpr,
    strict: bool,
) -> Result<Vec<Candidate<'a>>, JsonPathError> {
    let mut out = Vec::new();
    for c in candidates {
        match c.value {
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if eval_filter(expr, item, strict)? {
                        let mut segments = c.segments.clone();
                        segments.push(Segment::Index(i));
                        out.push(Candidate { value: item, segments });
                    }
                }
            }
            other => {
                if eval_filter(expr, other, strict)? {
                    out.push(c.clone());
                }
            }
        }
    }
    Ok(out)
}

fn collect_descendants<'a>(c: &Candidate<'a>, out: &mut Vec<Candidate<'a>>) {
    match c.value {
        Value::Object(members) => {
            for (k, v) in members {
                let mut segments = c.segments.clone();
                segments.push(Segment::Name(k.clone()));
                let child = Candidate { value: v, segments };
                out.push(child.clone());
                collect_descendants(&child, out);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                let mut segments = c.segments.clone();
                segments.push(Segment::Index(i));
                let child = Candidate { value: v, segments };
                out.push(child.clone());
                collect_descendants(&child, out);
            }
        }
        _ => {}
    }
}

fn eval_filter(expr: &FilterExpr, ctx: &Value, strict: bool) -> Result<bool, JsonPathError> {
    match expr {
        FilterExpr::Or(l, r) => Ok(eval_filter(l, ctx, strict)? || eval_filter(r, ctx, strict)?),
        FilterExpr::And(l, r) => Ok(eval_filter(l, ctx, strict)? && eval_filter(r, ctx, strict)?),
        FilterExpr::Not(e) => Ok(!eval_filter(e, ctx, strict)?),
        FilterExpr::Compare(op, lhs, rhs) => {
            let lv = resolve_term(lhs, ctx, strict)?;
            let rv = resolve_term(rhs, ctx, strict)?;
            Ok(compare_values(&lv, &rv, *op))
        }
        FilterExpr::Truthy(term) => {
            let v = resolve_term(term, ctx, strict)?;
            Ok(truthy(&v))
        }
    }
}

fn resolve_term(term: &FilterTerm, ctx: &Value, strict: bool) -> Result<Value, JsonPathError> {
    match term {
        FilterTerm::Literal(v) => Ok(v.clone()),
        FilterTerm::Current(steps) => Ok(resolve_current(steps, ctx).cloned().unwrap_or(Value::Null)),
        FilterTerm::UnsupportedRecursive => {
            if strict {
                Err(JsonPathError::UnsupportedRecursiveFilter)
            } else {
                Ok(Value::Bool(false))
            }
        }
    }
}

fn resolve_current<'a>(steps: &[CurrentStep], ctx: &'a Value) -> Option<&'a Value> {
    let mut cur = ctx;
    for step in steps {
        cur = match step {
            CurrentStep::Name(name) => cur.get_object_item(name)?,
            CurrentStep::Index(i) => {
                if *i < 0 {
                    return None;
                }
                cur.get_array_item(*i as usize)?
            }
        };
    }
    Some(cur)
}

fn truthy(v: &Value) -> bool {
    !matches!(v, Value::Null | Value::Bool(false))
}

/// Structural comparison for filter predicates. Numbers compare numerically,
/// strings lexicographically by byte, booleans by value; `null` compares
/// only via `==`/`!=`; any other type mismatch is `false` for every
/// operator.
fn compare_values(a: &Value, b: &Value, op: CompareOp) -> bool {
    use CompareOp::*;
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match op {
            Eq => x == y,
            Ne => x != y,
            Lt => x < y,
            Le => x <= y,
            Gt => x > y,
            Ge => x >= y,
        },
        (Value::String(x), Value::String(y)) => match op {
            Eq => x == y,
            Ne => x != y,
            Lt => x.as_bytes() < y.as_bytes(),
            Le => x.as_bytes() <= y.as_bytes(),
            Gt => x.as_bytes() > y.as_bytes(),
            Ge => x.as_bytes() >= y.as_bytes(),
        },
        (Value::Bool(x), Value::Bool(y)) => match op {
            Eq => x == y,
            Ne => x != y,
            Lt => !x && *y,
            Le => x <= y,
            Gt => *x && !y,
            Ge => x >= y,
        },
        _ if matches!(a, Value::Null) || matches!(b, Value::Null) => {
            let both_null = matches!(a, Value::Null) && matches!(b, Value::Null);
            match op {
                Eq => both_null,
                Ne => !both_null,
                _ => false,
            }
        }
        _ => false,
    }
}

fn path_string(segments: &[Segment]) -> String {
    let mut out = String::from("$");
    for segment in segments {
        match segment {
            Segment::Name(name) if is_identifier(name) => {
                out.push('.');
                out.push_str(name);
            }
            Segment::Name(name) => {
                out.push_str("['");
                out.push_str(name);
                out.push_str("']");
            }
            Segment::Index(i) => {
                out.push('[');
                out.push_str(&i.to_string());
                out.push(']');
            }
        }
    }
    out
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn v(src: &str) -> Value {
        parse(src.as_bytes()).unwrap().value
    }

    const STORE: &str = r#"{
        "store": {
            "book": [
                {"category": "fiction", "author": "A", "price": 8.95},
                {"category": "fiction", "author": "B", "price": 12.99},
                {"category": "reference", "author": "C", "price": 8.99}
            ],
            "bicycle": {"color": "red", "price": 19.95}
        }
    }"#;

    #[test]
    fn recursive_descent_collects_every_author() {
        let root = v(STORE);
        let results = run(&root, "$..author", false).unwrap();
        let authors: Vec<&str> = results.iter().map(|(_, v)| v.as_str().unwrap()).collect();
        assert_eq!(authors, vec!["A", "B", "C"]);
    }

    #[test]
    fn filter_selects_cheap_books() {
        let root = v(STORE);
        let results = run(&root, "$.store.book[?(@.price<10)].title", false).unwrap();
        // no book has a "title" field in this fixture, but the filter itself
        // must still select the two cheap books before the missing .title
        // drops them — exercised via author instead, below.
        assert_eq!(results.len(), 0);

        let results = run(&root, "$.store.book[?(@.price<10)].author", false).unwrap();
        let authors: Vec<&str> = results.iter().map(|(_, v)| v.as_str().unwrap()).collect();
        assert_eq!(authors, vec!["A", "C"]);
    }

    #[test]
    fn slice_preserves_order() {
        let root = v(STORE);
        let results = run(&root, "$.store.book[0:2]", false).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "$.store.book[0]");
        assert_eq!(results[1].0, "$.store.book[1]");
    }

    #[test]
    fn slice_with_omitted_start_defaults_to_the_beginning() {
        let root = v(STORE);
        let results = run(&root, "$.store.book[:2]", false).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "$.store.book[0]");
        assert_eq!(results[1].0, "$.store.book[1]");
    }

    #[test]
    fn slice_with_omitted_start_and_end_honors_step() {
        let root = v(STORE);
        let results = run(&root, "$.store.book[::2]", false).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "$.store.book[0]");
        assert_eq!(results[1].0, "$.store.book[2]");
    }

    #[test]
    fn wildcard_paths_in_order() {
        let root = v(STORE);
        let results = run(&root, "$.store.book[*]", false).unwrap();
        let paths: Vec<&str> = results.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, vec!["$.store.book[0]", "$.store.book[1]", "$.store.book[2]"]);
    }

    #[test]
    fn negative_index_strict_errors() {
        let root = v(STORE);
        assert!(run(&root, "$.store.book[-1]", true).is_err());
    }

    #[test]
    fn negative_index_lenient_skips() {
        let root = v(STORE);
        let results = run(&root, "$.store.book[-1]", false).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn at_dotdot_in_filter_is_false_when_lenient() {
        let root = v(r#"{"a":[{"x":1},{"x":2}]}"#);
        let results = run(&root, "$.a[?(@..y == 1)]", false).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn at_dotdot_in_filter_errors_when_strict() {
        let root = v(r#"{"a":[{"x":1}]}"#);
        assert!(run(&root, "$.a[?(@..y == 1)]", true).is_err());
    }

    #[test]
    fn bare_truthy_traversal() {
        let root = v(r#"{"a":[{"flag":true},{"flag":false},{"other":1}]}"#);
        let results = run(&root, "$.a[?(@.flag)]", false).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn and_or_precedence() {
        let root = v(r#"{"a":[{"x":1,"y":1},{"x":1,"y":2},{"x":2,"y":1}]}"#);
        let results = run(&root, "$.a[?(@.x==1 && @.y==1 || @.x==2)]", false).unwrap();
        assert_eq!(results.len(), 2);
    }
}
