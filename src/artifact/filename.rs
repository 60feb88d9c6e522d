//! Filename derivation for the artifact store (spec §4.8): `<tool>-
//! <primary_id>-<UTC-timestamp>-<sha-prefix>.<ext>`, each component
//! sanitized independently.
//!
//! Grounded on `agent::tools::obsidian::cache::safe_vault_name`'s
//! character-class sanitization, generalized with trimming and a length
//! cap per the spec's filename grammar.

use chrono::{DateTime, Utc};
use serde_json::Value;

const MAX_COMPONENT_LEN: usize = 80;

/// Primary-identifier fields tried in order against `args` (spec §4.8).
const PRIMARY_ID_FIELDS: &[&str] = &["uid", "id", "issue", "repo", "name"];

pub fn derive_filename(
    tool: &str,
    args: &Value,
    sha256: &str,
    created_at: DateTime<Utc>,
    ext: &str,
) -> String {
    let tool_part = sanitize_component(tool, "tool");
    let primary_part = sanitize_component(&primary_identifier(args), "query");
    let timestamp = created_at.format("%Y%m%dT%H%M%SZ");
    let sha_prefix = &sha256[..sha256.len().min(12)];

    format!("{tool_part}-{primary_part}-{timestamp}-{sha_prefix}.{ext}")
}

fn primary_identifier(args: &Value) -> String {
    let Some(map) = args.as_object() else {
        return String::new();
    };
    for field in PRIMARY_ID_FIELDS {
        if let Some(value) = map.get(*field) {
            let base = scalar_to_string(value);
            if base.is_empty() {
                continue;
            }
            if *field == "repo" {
                if let Some(number) = map.get("number") {
                    let number = scalar_to_string(number);
                    if !number.is_empty() {
                        return format!("{base}-{number}");
                    }
                }
            }
            return base;
        }
    }
    String::new()
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Replace characters outside `[A-Za-z0-9._-]` with `_`, trim
/// dot/underscore/hyphen from both ends, cap at eighty characters, and
/// fall back to `fallback` if the result is empty.
fn sanitize_component(raw: &str, fallback: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = replaced.trim_matches(['.', '_', '-']);
    let capped: String = trimmed.chars().take(MAX_COMPONENT_LEN).collect();
    if capped.is_empty() {
        fallback.to_string()
    } else {
        capped
    }
}
