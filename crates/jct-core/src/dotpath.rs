//! Dot-notation nested get/set.
//!
//! A dot-path is a non-empty string split on ASCII `.`; each segment is
//! either an object member name or, when the current node is an array, a
//! base-10 non-negative index. This is deliberately a much smaller
//! language than JSONPath (module [`crate::jsonpath`]) — it exists for the
//! `get`/`set` CLI commands, which only ever need to name one slot.

use crate::error::PathError;
use crate::value::Value;

/// Walk `path` from `root`, returning a borrowed reference to the target
/// value, or `None` if any segment is missing or the wrong kind of
/// container is encountered along the way.
pub fn get_nested<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(_) => current.get_object_item(segment)?,
            Value::Array(_) => {
                let index: usize = segment.parse().ok()?;
                current.get_array_item(index)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Walk all but the last segment of `path` from `root`, auto-creating
/// missing objects and extending arrays as needed, then set the final
/// segment to a value inferred from `literal`.
///
/// Inference order: `true`/`false`/`null` exact matches, then a full float
/// parse, then a verbatim string as the fallback. Traversing through (or
/// landing on) an existing scalar — a non-object, non-array value — is a
/// structural mismatch and fails with [`PathError::NotContainer`] rather
/// than silently overwriting it.
pub fn set_nested(root: &mut Value, path: &str, literal: &str) -> Result<(), PathError> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.is_empty() || segments.iter().any(|s| s.is_empty()) {
        return Err(PathError::EmptyPath);
    }

    let (last, init) = segments.split_last().expect("checked non-empty above");

    let mut current = root;
    for segment in init {
        current = step_into_or_create(current, segment)?;
    }

    set_final_segment(current, last, infer_literal(literal))
}

fn step_into_or_create<'a>(current: &'a mut Value, segment: &str) -> Result<&'a mut Value, PathError> {
    if !current.is_container() {
        return Err(PathError::NotContainer { segment: segment.to_string() });
    }

    match current {
        Value::Object(_) => {
            if current.get_object_item(segment).is_none() {
                current.set_object_item(segment, Value::Object(Vec::new()));
            }
            Ok(current
                .get_object_item_mut(segment)
                .expect("just inserted or already present"))
        }
        Value::Array(_) => {
            let index: usize = segment
                .parse()
                .map_err(|_| PathError::InvalidIndex { segment: segment.to_string() })?;
            let items = current.as_array_mut().expect("matched Array above");
            while items.len() <= index {
                items.push(Value::Object(Vec::new()));
            }
            Ok(&mut items[index])
        }
        _ => unreachable!("checked is_container above"),
    }
}

fn set_final_segment(current: &mut Value, segment: &str, value: Value) -> Result<(), PathError> {
    if !current.is_container() {
        return Err(PathError::NotContainer { segment: segment.to_string() });
    }

    match current {
        Value::Object(_) => {
            current.set_object_item(segment, value);
            Ok(())
        }
        Value::Array(_) => {
            let index: usize = segment
                .parse()
                .map_err(|_| PathError::InvalidIndex { segment: segment.to_string() })?;
            let items = current.as_array_mut().expect("matched Array above");
            while items.len() <= index {
                items.push(Value::Null);
            }
            items[index] = value;
            Ok(())
        }
        _ => unreachable!("checked is_container above"),
    }
}

fn infer_literal(literal: &str) -> Value {
    match literal {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        _ => {
            if !literal.is_empty() {
                if let Ok(n) = literal.parse::<f64>() {
                    return Value::Number(n);
                }
            }
            Value::String(literal.to_string())
        }
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
    fn get_nested_walks_objects_and_arrays() {
        let root = v(r#"{"a":{"b":[1,2,3]}}"#);
        assert_eq!(get_nested(&root, "a.b.1"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn get_nested_returns_none_on_missing_member() {
        let root = v(r#"{"a":1}"#);
        assert_eq!(get_nested(&root, "b"), None);
    }

    #[test]
    fn get_nested_returns_none_on_structural_mismatch() {
        let root = v(r#"{"a":1}"#);
        assert_eq!(get_nested(&root, "a.b"), None);
    }

    #[test]
    fn set_nested_adds_sibling_key() {
        let mut root = v(r#"{"a":{"b":3}}"#);
        set_nested(&mut root, "a.c", "true").unwrap();
        assert_eq!(root, v(r#"{"a":{"b":3,"c":true}}"#));
    }

    #[test]
    fn set_nested_auto_creates_intermediate_objects() {
        let mut root = v("{}");
        set_nested(&mut root, "x.y.z", "hello").unwrap();
        assert_eq!(root, v(r#"{"x":{"y":{"z":"hello"}}}"#));
    }

    #[test]
    fn set_nested_infers_literal_types() {
        let mut root = v("{}");
        set_nested(&mut root, "a", "true").unwrap();
        set_nested(&mut root, "b", "null").unwrap();
        set_nested(&mut root, "c", "3.5").unwrap();
        set_nested(&mut root, "d", "hello").unwrap();
        assert_eq!(
            root,
            v(r#"{"a":true,"b":null,"c":3.5,"d":"hello"}"#)
        );
    }

    #[test]
    fn set_nested_extends_array_with_nulls() {
        let mut root = v(r#"{"a":[1]}"#);
        set_nested(&mut root, "a.3", "x").unwrap();
        assert_eq!(root, v(r#"{"a":[1,null,null,"x"]}"#));
    }

    #[test]
    fn set_nested_fails_traversing_through_existing_scalar() {
        let mut root = v(r#"{"a":1}"#);
        let err = set_nested(&mut root, "a.b", "true").unwrap_err();
        assert!(matches!(err, PathError::NotContainer { .. }));
        // the failed attempt leaves the tree untouched
        assert_eq!(root, v(r#"{"a":1}"#));
    }

    #[test]
    fn set_nested_fails_when_root_itself_is_a_scalar() {
        let mut root = v("42");
        let err = set_nested(&mut root, "a", "true").unwrap_err();
        assert!(matches!(err, PathError::NotContainer { .. }));
    }
}
