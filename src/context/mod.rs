//! Context extractors: pure functions that scan caller input for well-known
//! URL shapes and emit advisory hints for the planner. Never authoritative —
//! the planner treats the returned map as hints only (spec §4.1).


use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

/// Compiled regex patterns, built once and reused across calls — matches
/// the `RegexPatterns` idiom used throughout the teacher crate.
struct Patterns;

impl Patterns {
    fn pull_request() -> &'static Regex {
        static RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"github\.com/([\w.-]+/[\w.-]+)/pull/(\d+)").expect("valid regex")
        });
        &RE
    }

    fn wiki_page() -> &'static Regex {
        static RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"(https?://[\w.-]+(?::\d+)?)(?:/wiki)?/(?:pages/viewpage\.action\?pageId=|pages/)(\d+)")
                .expect("valid regex")
        });
        &RE
    }

    fn issue_key() -> &'static Regex {
        static RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"(https?://[\w.-]+(?::\d+)?)/browse/([A-Z][A-Z0-9]+-\d+)")
                .expect("valid regex")
        });
        &RE
    }

    fn dashboard() -> &'static Regex {
        static RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"(https?://[\w.-]+(?::\d+)?)/d/([\w-]+)(?:/[\w-]*)?(?:\?([^\s]*))?")
                .expect("valid regex")
        });
        &RE
    }

    fn org_id_query() -> &'static Regex {
        static RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"orgId=(\d+)").expect("valid regex"));
        &RE
    }
}

/// Strip a single trailing punctuation character commonly picked up when a
/// URL is embedded in prose ("...see pull/42." or "(pull/42)").
fn depunctuate_right(token: &str) -> &str {
    token.trim_end_matches(['.', ',', ')', ']', '"', '\'', '!', '?'])
}

/// Extract all recognized context hints from the caller's raw input.
/// First match per key wins; later extractors never overwrite earlier keys.
pub fn extract_context(input: &str) -> BTreeMap<String, Value> {
    let mut context = BTreeMap::new();
    extract_pull_request(input, &mut context);
    extract_wiki_page(input, &mut context);
    extract_issue_key(input, &mut context);
    extract_dashboard(input, &mut context);
    context
}

fn insert_if_absent(context: &mut BTreeMap<String, Value>, key: &str, value: Value) {
    context.entry(key.to_string()).or_insert(value);
}

fn extract_pull_request(input: &str, context: &mut BTreeMap<String, Value>) {
    let Some(caps) = Patterns::pull_request().captures(input) else {
        return;
    };
    let repo = depunctuate_right(&caps[1]);
    let Ok(number) = depunctuate_right(&caps[2]).parse::<i64>() else {
        return;
    };
    insert_if_absent(context, "github_repo", Value::String(repo.to_string()));
    insert_if_absent(context, "github_pr_number", Value::from(number));
}

fn extract_wiki_page(input: &str, context: &mut BTreeMap<String, Value>) {
    let Some(caps) = Patterns::wiki_page().captures(input) else {
        return;
    };
    let base_url = depunctuate_right(&caps[1]);
    let Ok(page_id) = depunctuate_right(&caps[2]).parse::<i64>() else {
        return;
    };
    insert_if_absent(context, "wiki_base_url", Value::String(base_url.to_string()));
    insert_if_absent(context, "wiki_page_id", Value::from(page_id));
}

fn extract_issue_key(input: &str, context: &mut BTreeMap<String, Value>) {
    let Some(caps) = Patterns::issue_key().captures(input) else {
        return;
    };
    let base_url = depunctuate_right(&caps[1]);
    let key = depunctuate_right(&caps[2]);
    insert_if_absent(context, "issue_base_url", Value::String(base_url.to_string()));
    insert_if_absent(context, "issue_key", Value::String(key.to_string()));
}

fn extract_dashboard(input: &str, context: &mut BTreeMap<String, Value>) {
    let Some(caps) = Patterns::dashboard().captures(input) else {
        return;
    };
    let base_url = depunctuate_right(&caps[1]);
    let uid = depunctuate_right(&caps[2]);
    insert_if_absent(
        context,
        "dashboard_base_url",
        Value::String(base_url.to_string()),
    );
    insert_if_absent(context, "dashboard_uid", Value::String(uid.to_string()));

    if let Some(query) = caps.get(3)
        && let Some(org_caps) = Patterns::org_id_query().captures(query.as_str())
        && let Ok(org_id) = org_caps[1].parse::<i64>()
    {
        insert_if_absent(context, "dashboard_org_id", Value::from(org_id));
    }
}
