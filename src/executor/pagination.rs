//! Auto-pagination (spec §4.4): after a successful call, if the result
//! carries `has_next=true` plus a usable continuation descriptor, the
//! executor issues follow-on calls with a merged cursor argument, up to
//! depth `D`. Pages are aggregated: list-valued keys concatenate, scalar
//! keys keep the last writer.

use serde_json::{Map, Value};

/// Continuation fields tried in order, matching spec §4.4's "a
/// continuation descriptor such as a next cursor, page number, or next
/// offset".
const CURSOR_FIELDS: &[&str] = &["next_cursor", "cursor", "next_page", "next_offset"];

/// `true` if `page` signals more pages are available.
pub fn has_next(page: &Value) -> bool {
    page.get("has_next").and_then(Value::as_bool).unwrap_or(false)
}

/// Extract the continuation argument to merge into the next call's args,
/// or `None` if no usable cursor is present (pagination stops here even
/// if `has_next=true`).
pub fn next_cursor(page: &Value) -> Option<(String, Value)> {
    let map = page.as_object()?;
    for field in CURSOR_FIELDS {
        if let Some(value) = map.get(*field)
            && !value.is_null()
        {
            return Some(((*field).to_string(), value.clone()));
        }
    }
    None
}

/// Merge a cursor field into the original call args for the next page.
pub fn merge_cursor(args: &Value, cursor_key: &str, cursor_value: Value) -> Value {
    let mut merged = args.as_object().cloned().unwrap_or_default();
    merged.insert(cursor_key.to_string(), cursor_value);
    Value::Object(merged)
}

/// Fold a sequence of page results into one aggregate: arrays under the
/// same key concatenate in page order, everything else keeps the value
/// from the latest page.
pub fn aggregate_pages(pages: Vec<Value>) -> Value {
    let mut aggregate = Map::new();
    for page in pages {
        let Value::Object(map) = page else {
            continue;
        };
        for (key, value) in map {
            match (aggregate.get_mut(&key), value) {
                (Some(Value::Array(existing)), Value::Array(incoming)) => {
                    existing.extend(incoming);
                }
                (_, value) => {
                    aggregate.insert(key, value);
                }
            }
        }
    }
    Value::Object(aggregate)
}
