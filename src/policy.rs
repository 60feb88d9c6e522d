//! Read-only safety policy: allow-list plus a name-shape filter that rejects
//! any tool whose name implies a mutation, regardless of allow-list
//! membership (spec §4.3). Dual enforcement — belt (name-shape filter) and
//! suspenders (allow-list) — mirrors the pattern in
//! `oxicrab::agent::tools::read_only_wrapper`, which filters a fixed action
//! enum down to read-only actions and re-checks at execution time.

use std::collections::HashSet;

use crate::catalog::ToolSource;

/// Mutating name stems, case-folded before comparison. Static list — the
/// spec leaves user-extensibility as an open question and we do not guess
/// at it (SPEC_FULL.md §18.3).
const MUTATING_STEMS: &[&str] = &[
    "create_",
    "update_",
    "merge_",
    "delete_",
    "push_",
    "write",
    "create-or-update",
    "remove",
    "mutate",
    "approve",
    "request_changes",
];

/// Returns true if `name` contains any mutating stem after case-folding.
pub fn is_mutating_name(name: &str) -> bool {
    let folded = name.to_ascii_lowercase();
    MUTATING_STEMS.iter().any(|stem| folded.contains(stem))
}

/// Allow-list of callable tool names, partitioned by source. The upstream
/// allow-list starts empty — extending it is a deliberate act (spec §4.3).
#[derive(Debug, Clone, Default)]
pub struct Policy {
    local_allow: HashSet<String>,
    upstream_allow: HashSet<String>,
}

impl Policy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_local(&mut self, name: impl Into<String>) -> &mut Self {
        self.local_allow.insert(name.into());
        self
    }

    pub fn allow_upstream(&mut self, name: impl Into<String>) -> &mut Self {
        self.upstream_allow.insert(name.into());
        self
    }

    fn allow_list_for(&self, source: ToolSource) -> &HashSet<String> {
        match source {
            ToolSource::Local => &self.local_allow,
            ToolSource::Upstream => &self.upstream_allow,
        }
    }

    /// `IsAllowed(source, name)`: conjunction of the name-shape filter and
    /// allow-list membership (spec §4.3, §8 quantified invariant).
    pub fn is_allowed(&self, source: ToolSource, name: &str) -> bool {
        if is_mutating_name(name) {
            return false;
        }
        self.allow_list_for(source).contains(name)
    }

    /// Human-readable reason a call was denied, for `PlanRejected` error
    /// messages (spec §7: "attach the failing step's name and reason").
    pub fn deny_reason(&self, source: ToolSource, name: &str) -> Option<String> {
        if is_mutating_name(name) {
            return Some(format!(
                "tool name '{name}' matches a mutating stem and is never callable"
            ));
        }
        if !self.allow_list_for(source).contains(name) {
            return Some(format!(
                "tool '{name}' ({source}) is not on the {source} allow-list"
            ));
        }
        None
    }
}
