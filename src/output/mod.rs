//! Output shaping: per-call directives that narrow a step result down to
//! what the caller actually asked for (spec §4.5). A path grammar (slash
//! JSON-Pointer or dotted+bracket), a fixed view-preset table, and five
//! shaping operations applied in a fixed order.
//!
//! Grounded on the teacher's canonicalization style in
//! `oxicrab::agent::tools::registry::canonical_json` (recursive
//! object-map rebuilding) generalized from "sort keys" to "prune/redact/cap
//! by path".


mod path;
mod presets;
mod shape;

pub use path::{ParsedPath, PathError, PathSegment, parse_path};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Named projection applied before the explicit include/exclude/redact
/// operations (spec §4.5 "view presets").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Full,
    Summary,
    Metadata,
    ErrorsOnly,
}

impl Default for View {
    fn default() -> Self {
        Self::Full
    }
}

/// Per-call output-shaping directives (spec §3 `OutputOptions`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputOptions {
    #[serde(default)]
    pub view: View,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub redact: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
}

/// Apply `options` to `value` for a result produced by `tool_name`, in the
/// fixed order: view, include, exclude, redact, max_depth, max_items.
pub fn shape_result(value: &Value, options: &OutputOptions, tool_name: &str) -> Result<Value, PathError> {
    let mut current = presets::apply_view(value, options.view, tool_name);

    if !options.include_fields.is_empty() {
        current = shape::include_fields(&current, &options.include_fields)?;
    }
    if !options.exclude_fields.is_empty() {
        current = shape::exclude_fields(&current, &options.exclude_fields)?;
    }
    if !options.redact.is_empty() {
        current = shape::redact_fields(&current, &options.redact)?;
    }
    if let Some(depth) = options.max_depth {
        current = shape::cap_depth(&current, depth);
    }
    if let Some(items) = options.max_items {
        current = shape::cap_items(&current, items);
    }

    Ok(current)
}
