//! Deep clone, structural equality, merge, and diff over the value tree.
//!
//! Clone and equality are already provided by [`Value`]'s `Clone` and
//! `PartialEq` impls; this module holds the two operations that combine
//! trees: [`merge_into`] and [`diff`].

use crate::value::Value;

/// Merge `src` into `dest` in place.
///
/// If either side is not an object, `dest` becomes a clone of `src`
/// outright — merging a scalar or array simply replaces. When both sides
/// are objects, each member of `src` is merged recursively into the
/// matching member of `dest` if both are objects, or overwrites it
/// otherwise; members present only in `dest` are left untouched.
pub fn merge_into(dest: &mut Value, src: &Value) {
    match (dest.is_object(), src) {
        (true, Value::Object(src_members)) => {
            for (key, src_val) in src_members {
                let recurse = matches!(
                    (dest.get_object_item(key), src_val),
                    (Some(Value::Object(_)), Value::Object(_))
                );
                if recurse {
                    let dest_val = dest.get_object_item_mut(key).expect("checked above");
                    merge_into(dest_val, src_val);
                } else {
                    dest.set_object_item(key, src_val.clone());
                }
            }
        }
        _ => {
            *dest = src.clone();
        }
    }
}

/// Compute the structural diff of `modified` against `original`.
///
/// Returns a value that, merged into a clone of `original`, reproduces
/// `modified` (see the `diff + merge` property tested below). When both
/// sides are objects the result is itself an object containing only the
/// keys that changed or were added; unchanged keys are omitted entirely.
/// Anything else — a scalar or array difference, or a key missing from
/// `original` — is inlined as a full clone of the `modified` side.
pub fn diff(modified: &Value, original: Option<&Value>) -> Value {
    let original = match original {
        None => return modified.clone(),
        Some(o) => o,
    };

    match (modified, original) {
        (Value::Object(mod_members), Value::Object(_)) => {
            let mut out = Vec::new();
            for (key, mod_val) in mod_members {
                match original.get_object_item(key) {
                    None => out.push((key.clone(), mod_val.clone())),
                    Some(orig_val) => {
                        if let (Value::Object(_), Value::Object(_)) = (mod_val, orig_val) {
                            let sub = diff(mod_val, Some(orig_val));
                            if !is_empty_object(&sub) {
                                out.push((key.clone(), sub));
                            }
                        } else if mod_val != orig_val {
                            out.push((key.clone(), mod_val.clone()));
                        }
                    }
                }
            }
            Value::Object(out)
        }
        _ => {
            if modified == original {
                Value::Object(Vec::new())
            } else {
                modified.clone()
            }
        }
    }
}

fn is_empty_object(v: &Value) -> bool {
    matches!(v, Value::Object(members) if members.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::serializer::serialize;

    fn v(src: &str) -> Value {
        parse(src.as_bytes()).unwrap().value
    }

    #[test]
    fn merge_combines_disjoint_keys() {
        let mut dest = v(r#"{"a":{"x":1},"b":2}"#);
        let src = v(r#"{"a":{"y":9},"c":3}"#);
        merge_into(&mut dest, &src);
        assert_eq!(serialize(&dest).unwrap(), serialize(&v(r#"{"a":{"x":1,"y":9},"b":2,"c":3}"#)).unwrap());
    }

    #[test]
    fn merge_replaces_non_object_with_clone_of_src() {
        let mut dest = v(r#"{"a":1}"#);
        let src = v("42");
        merge_into(&mut dest, &src);
        assert_eq!(dest, Value::Number(42.0));
    }

    #[test]
    fn merge_is_associative_on_disjoint_keys() {
        let a = v(r#"{"a":1}"#);
        let b = v(r#"{"b":2}"#);
        let c = v(r#"{"c":3}"#);

        let mut left = a.clone();
        merge_into(&mut left, &b);
        merge_into(&mut left, &c);

        let mut bc = b.clone();
        merge_into(&mut bc, &c);
        let mut right = a;
        merge_into(&mut right, &bc);

        assert_eq!(left, right);
    }

    #[test]
    fn diff_against_none_is_full_clone() {
        let modified = v(r#"{"a":1}"#);
        assert_eq!(diff(&modified, None), modified);
    }

    #[test]
    fn diff_reports_only_changed_keys() {
        let modified = v(r#"{"a":1,"b":{"c":2,"d":3}}"#);
        let original = v(r#"{"a":1,"b":{"c":2,"d":4}}"#);
        let d = diff(&modified, Some(&original));
        assert_eq!(d, v(r#"{"b":{"d":3}}"#));
    }

    #[test]
    fn diff_then_merge_reproduces_modified() {
        let modified = v(r#"{"a":1,"b":{"c":2,"d":3},"e":"new"}"#);
        let original = v(r#"{"a":1,"b":{"c":2,"d":4}}"#);
        let d = diff(&modified, Some(&original));
        let mut reconstructed = original.clone();
        merge_into(&mut reconstructed, &d);
        assert_eq!(reconstructed, modified);
    }

    #[test]
    fn diff_of_equal_scalars_is_empty_object() {
        let v1 = v("5");
        assert_eq!(diff(&v1, Some(&v1)), Value::Object(vec![]));
    }
}
