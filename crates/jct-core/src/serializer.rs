//! Canonical pretty-print serializer.
//!
//! Output is deterministic: object keys are sorted lexicographically by
//! byte regardless of insertion order, indentation is a fixed two spaces
//! per level, and the whole document ends with a trailing newline. Two
//! serializations of structurally-equal values are always byte-identical.

use crate::error::SerializeError;
use crate::parser::MAX_NESTING_DEPTH;
use crate::value::Value;

/// Serialize a value to its canonical pretty-printed form, including the
/// trailing newline.
pub fn serialize(value: &Value) -> Result<String, SerializeError> {
    let mut out = String::new();
    write_value(&mut out, value, 0, 0)?;
    out.push('\n');
    Ok(out)
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn write_value(out: &mut String, value: &Value, depth: usize, recursion: usize) -> Result<(), SerializeError> {
    if recursion > MAX_NESTING_DEPTH {
        return Err(SerializeError::NestingTooDeep {
            limit: MAX_NESTING_DEPTH,
        });
    }
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => out.push_str(&format_number(*n)),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => write_array(out, items, depth, recursion)?,
        Value::Object(members) => write_object(out, members, depth, recursion)?,
    }
    Ok(())
}

fn write_array(out: &mut String, items: &[Value], depth: usize, recursion: usize) -> Result<(), SerializeError> {
    if items.is_empty() {
        out.push_str("[]");
        return Ok(());
    }
    out.push('[');
    out.push('\n');
    for (i, item) in items.iter().enumerate() {
        indent(out, depth + 1);
        write_value(out, item, depth + 1, recursion + 1)?;
        if i + 1 < items.len() {
            out.push(',');
        }
        out.push('\n');
    }
    indent(out, depth);
    out.push(']');
    Ok(())
}

fn write_object(
    out: &mut String,
    members: &[(String, Value)],
    depth: usize,
    recursion: usize,
) -> Result<(), SerializeError> {
    if members.is_empty() {
        out.push_str("{}");
        return Ok(());
    }
    let mut sorted: Vec<&(String, Value)> = members.iter().collect();
    sorted.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    out.push('{');
    out.push('\n');
    for (i, (key, val)) in sorted.iter().enumerate() {
        indent(out, depth + 1);
        write_string(out, key);
        out.push_str(": ");
        write_value(out, val, depth + 1, recursion + 1)?;
        if i + 1 < sorted.len() {
            out.push(',');
        }
        out.push('\n');
    }
    indent(out, depth);
    out.push('}');
    Ok(())
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Integral floats within `i64` range print without a decimal point;
/// everything else prints via a shortest-round-trip float format.
fn format_number(n: f64) -> String {
    format_number_for_display(n)
}

/// Same integer-vs-float rule as [`format_number`], exposed for callers
/// (such as the CLI's bare-scalar display mode) that format a single
/// number outside of a full document serialization.
pub fn format_number_for_display(n: f64) -> String {
    if n.is_finite() && n.trunc() == n && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn obj(members: Vec<(&str, Value)>) -> Value {
        Value::Object(members.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    #[test]
    fn empty_containers_are_one_line() {
        assert_eq!(serialize(&Value::Object(vec![])).unwrap(), "{}\n");
        assert_eq!(serialize(&Value::Array(vec![])).unwrap(), "[]\n");
    }

    #[test]
    fn keys_are_sorted_regardless_of_insertion_order() {
        let v = obj(vec![("b", Value::Number(2.0)), ("a", Value::Number(1.0))]);
        assert_eq!(serialize(&v).unwrap(), "{\n  \"a\": 1,\n  \"b\": 2\n}\n");
    }

    #[test]
    fn integers_print_without_decimal_point() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-7.0), "-7");
        assert_eq!(format_number(1.5), "1.5");
    }

    #[test]
    fn escapes_control_characters() {
        let v = Value::String("a\u{0001}b".to_string());
        assert_eq!(serialize(&v).unwrap(), "\"a\\u0001b\"\n");
    }

    #[test]
    fn nested_structure_matches_spec_example() {
        let v = obj(vec![(
            "a",
            obj(vec![("b", Value::Number(3.0)), ("c", Value::Bool(true))]),
        )]);
        assert_eq!(
            serialize(&v).unwrap(),
            "{\n  \"a\": {\n    \"b\": 3,\n    \"c\": true\n  }\n}\n"
        );
    }

    #[test]
    fn round_trip_preserves_structural_equality() {
        let src = r#"{"b": [1, 2, 3], "a": {"x": true, "y": null}}"#;
        let parsed = parse(src.as_bytes()).unwrap().value;
        let serialized = serialize(&parsed).unwrap();
        let reparsed = parse(serialized.as_bytes()).unwrap().value;
        assert_eq!(parsed, reparsed);
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let src = r#"{"b": [1, 2, 3], "a": {"x": true}}"#;
        let parsed = parse(src.as_bytes()).unwrap().value;
        let once = serialize(&parsed).unwrap();
        let twice = serialize(&parse(once.as_bytes()).unwrap().value).unwrap();
        assert_eq!(once, twice);
    }
}
