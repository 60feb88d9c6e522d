//! Truncator: keeps the summary prompt within budget by replacing any
//! executed-step result larger than a fixed cap with a preview envelope
//! (spec §4.6). Already-externalized artifact references pass through
//! untouched — they are already small.
//!
//! Grounded directly on `oxicrab::agent::truncation::truncate_tool_result`:
//! same shape (measure canonical bytes, slice at a safe boundary, append a
//! marker), re-scoped from "chars, ANSI-aware" to "canonical JSON bytes,
//! artifact-aware" since step results are structured values, not terminal
//! text.

use serde_json::{Value, json};

/// Cap on the canonical JSON encoding of a single step result before the
/// summarizer sees it (spec §4.6).
pub const TRUNCATION_CAP_BYTES: usize = 12 * 1024;

/// Replace `value` with a `{truncated, bytes, preview}` envelope if its
/// canonical JSON encoding exceeds `cap_bytes`. Values already carrying an
/// `artifact_uri` key (meaning the artifact store already replaced them)
/// pass through unchanged.
pub fn truncate_for_summary(value: &Value, cap_bytes: usize) -> Value {
    if value.get("artifact_uri").is_some() {
        return value.clone();
    }

    let canonical = serde_json::to_vec(value).unwrap_or_default();
    if canonical.len() <= cap_bytes {
        return value.clone();
    }

    let safe_len = floor_char_boundary_bytes(&canonical, cap_bytes);
    let preview = String::from_utf8_lossy(&canonical[..safe_len]).into_owned();

    json!({
        "truncated": true,
        "bytes": canonical.len(),
        "preview": format!("{preview}…"),
    })
}

/// Largest index <= `index` that does not split a UTF-8 code point.
fn floor_char_boundary_bytes(bytes: &[u8], index: usize) -> usize {
    let mut i = index.min(bytes.len());
    while i > 0 && (bytes[i] & 0b1100_0000) == 0b1000_0000 {
        i -= 1;
    }
    i
}
