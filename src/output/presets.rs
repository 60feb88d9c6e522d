//! View presets: `full | summary | metadata | errors_only` (spec §4.5).
//! `errors_only` and the default `metadata` projection are fixed key sets;
//! `summary` and per-tool `metadata` overrides use a small static table so
//! tools with a well-known shape (e.g. a dashboard tool) get a richer,
//! hand-picked projection instead of the generic fallback.

use serde_json::{Map, Value};

use super::View;

const ERRORS_ONLY_KEYS: &[&str] = &["ok", "status", "error", "errors", "message"];
const DEFAULT_METADATA_KEYS: &[&str] = &[
    "id", "uid", "key", "name", "title", "url", "html_url", "web_url", "number", "repo",
];

/// Tool-specific `summary` projections, keyed by tool name. Paths are
/// dotted-path expressions resolved against the result root.
const TOOL_SUMMARY_PROJECTIONS: &[(&str, &[&str])] = &[(
    "get_dashboard",
    &[
        "meta.slug",
        "dashboard.uid",
        "dashboard.title",
        "dashboard.tags",
        "dashboard.time",
        "dashboard.templating.list",
    ],
)];

pub fn apply_view(value: &Value, view: View, tool_name: &str) -> Value {
    match view {
        View::Full => value.clone(),
        View::ErrorsOnly => project_keys(value, ERRORS_ONLY_KEYS),
        View::Metadata => project_keys(value, DEFAULT_METADATA_KEYS),
        View::Summary => match tool_summary_paths(tool_name) {
            Some(paths) => super::shape::include_fields(value, paths)
                .unwrap_or_else(|_| project_keys(value, DEFAULT_METADATA_KEYS)),
            None => project_keys(value, DEFAULT_METADATA_KEYS),
        },
    }
}

fn tool_summary_paths(tool_name: &str) -> Option<&'static [&'static str]> {
    TOOL_SUMMARY_PROJECTIONS
        .iter()
        .find(|(name, _)| *name == tool_name)
        .map(|(_, paths)| *paths)
}

fn project_keys(value: &Value, keys: &[&str]) -> Value {
    let Value::Object(map) = value else {
        return value.clone();
    };
    let mut out = Map::new();
    for key in keys {
        if let Some(found) = map.get(*key) {
            out.insert((*key).to_string(), found.clone());
        }
    }
    Value::Object(out)
}
