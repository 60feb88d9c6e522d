//! The five explicit shaping operations (spec §4.5), applied after the
//! view preset: include, exclude, redact, max_depth, max_items. Each walks
//! a `ParsedPath` against the value tree; unknown paths during include are
//! silently dropped, during exclude they are no-ops (nothing to remove).

use serde_json::{Map, Value};

use super::path::{PathError, PathSegment, parse_path};

const REDACTED: &str = "[REDACTED]";
const TRUNCATED: &str = "<truncated>";

/// Rebuild a pruned object containing only the listed paths, preserving
/// structure along the way.
pub(crate) fn include_fields(value: &Value, paths: &[impl AsRef<str>]) -> Result<Value, PathError> {
    let mut out = Value::Null;
    for raw in paths {
        let parsed = parse_path(raw.as_ref())?;
        if let Some(found) = get_path(value, &parsed.segments) {
            set_path(&mut out, &parsed.segments, found.clone());
        }
    }
    Ok(out)
}

pub(crate) fn exclude_fields(value: &Value, paths: &[impl AsRef<str>]) -> Result<Value, PathError> {
    let mut out = value.clone();
    for raw in paths {
        let parsed = parse_path(raw.as_ref())?;
        remove_path(&mut out, &parsed.segments);
    }
    Ok(out)
}

pub(crate) fn redact_fields(value: &Value, paths: &[impl AsRef<str>]) -> Result<Value, PathError> {
    let mut out = value.clone();
    for raw in paths {
        let parsed = parse_path(raw.as_ref())?;
        if let Some(slot) = get_path_mut(&mut out, &parsed.segments) {
            *slot = Value::String(REDACTED.to_string());
        }
    }
    Ok(out)
}

/// Anything strictly below `max_depth` is preserved; containers sitting
/// exactly at the cap collapse to the literal `<truncated>`.
pub(crate) fn cap_depth(value: &Value, max_depth: usize) -> Value {
    fn walk(value: &Value, remaining: usize) -> Value {
        match value {
            Value::Object(map) => {
                if remaining == 0 {
                    return Value::String(TRUNCATED.to_string());
                }
                let mut out = Map::new();
                for (k, v) in map {
                    out.insert(k.clone(), walk(v, remaining - 1));
                }
                Value::Object(out)
            }
            Value::Array(items) => {
                if remaining == 0 {
                    return Value::String(TRUNCATED.to_string());
                }
                Value::Array(items.iter().map(|v| walk(v, remaining - 1)).collect())
            }
            other => other.clone(),
        }
    }
    walk(value, max_depth)
}

/// Truncate arrays to `max_items`, recursing into map values (spec §4.5).
pub(crate) fn cap_items(value: &Value, max_items: usize) -> Value {
    match value {
        Value::Array(items) => {
            Value::Array(items.iter().take(max_items).map(|v| cap_items(v, max_items)).collect())
        }
        Value::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                out.insert(k.clone(), cap_items(v, max_items));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

fn get_path<'a>(value: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
    let mut current = value;
    for segment in segments {
        current = match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map.get(key)?,
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index)?,
            _ => return None,
        };
    }
    Some(current)
}

fn get_path_mut<'a>(value: &'a mut Value, segments: &[PathSegment]) -> Option<&'a mut Value> {
    let mut current = value;
    for segment in segments {
        current = match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map.get_mut(key)?,
            (PathSegment::Index(index), Value::Array(items)) => items.get_mut(*index)?,
            _ => return None,
        };
    }
    Some(current)
}

fn remove_path(value: &mut Value, segments: &[PathSegment]) {
    let Some((last, prefix)) = segments.split_last() else {
        return;
    };
    let Some(parent) = get_path_mut(value, prefix) else {
        return;
    };
    match (last, parent) {
        (PathSegment::Key(key), Value::Object(map)) => {
            map.remove(key);
        }
        (PathSegment::Index(index), Value::Array(items)) if *index < items.len() => {
            items.remove(*index);
        }
        _ => {}
    }
}

fn set_path(root: &mut Value, segments: &[PathSegment], leaf: Value) {
    if segments.is_empty() {
        *root = leaf;
        return;
    }
    let mut current = root;
    for segment in segments {
        match segment {
            PathSegment::Key(key) => {
                if !current.is_object() {
                    *current = Value::Object(Map::new());
                }
                let map = current.as_object_mut().unwrap();
                current = map.entry(key.clone()).or_insert(Value::Null);
            }
            PathSegment::Index(index) => {
                if !current.is_array() {
                    *current = Value::Array(vec![]);
                }
                let items = current.as_array_mut().unwrap();
                while items.len() <= *index {
                    items.push(Value::Null);
                }
                current = &mut items[*index];
            }
        }
    }
    *current = leaf;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn include_fields_preserves_structure() {
        let value = json!({"a": {"b": 1, "c": 2}, "d": 3});
        let shaped = include_fields(&value, &["a.b"]).unwrap();
        assert_eq!(shaped, json!({"a": {"b": 1}}));
    }

    #[test]
    fn include_fields_unknown_path_drops_silently() {
        let value = json!({"a": 1});
        let shaped = include_fields(&value, &["a", "missing.path"]).unwrap();
        assert_eq!(shaped, json!({"a": 1}));
    }

    #[test]
    fn exclude_fields_removes_listed_path() {
        let value = json!({"a": 1, "b": 2});
        let shaped = exclude_fields(&value, &["a"]).unwrap();
        assert_eq!(shaped, json!({"b": 2}));
    }

    #[test]
    fn exclude_fields_unknown_path_is_noop() {
        let value = json!({"a": 1});
        let shaped = exclude_fields(&value, &["missing"]).unwrap();
        assert_eq!(shaped, value);
    }

    #[test]
    fn redact_fields_replaces_value_with_sentinel() {
        let value = json!({"token": "secret", "name": "ok"});
        let shaped = redact_fields(&value, &["token"]).unwrap();
        assert_eq!(shaped, json!({"token": "[REDACTED]", "name": "ok"}));
    }

    #[test]
    fn cap_depth_truncates_containers_at_the_cap() {
        let value = json!({"a": {"b": {"c": 1}}});
        let shaped = cap_depth(&value, 1);
        assert_eq!(shaped, json!({"a": "<truncated>"}));
    }

    #[test]
    fn cap_depth_preserves_scalars_at_any_depth() {
        let value = json!({"a": "scalar"});
        assert_eq!(cap_depth(&value, 0), json!("<truncated>"));
    }

    #[test]
    fn cap_items_truncates_arrays_and_recurses() {
        let value = json!({"list": [1, 2, 3, 4], "nested": {"list": [1, 2, 3]}});
        let shaped = cap_items(&value, 2);
        assert_eq!(shaped, json!({"list": [1, 2], "nested": {"list": [1, 2]}}));
    }

    #[test]
    fn exclude_is_commutative_over_disjoint_paths() {
        let value = json!({"p": 1, "q": 2, "r": 3});
        let a = exclude_fields(&exclude_fields(&value, &["p"]).unwrap(), &["q"]).unwrap();
        let b = exclude_fields(&exclude_fields(&value, &["q"]).unwrap(), &["p"]).unwrap();
        assert_eq!(a, b);
    }
}
