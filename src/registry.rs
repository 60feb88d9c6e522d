//! Tool registry used by the router (spec §4.10): a per-process catalog of
//! every tool the router could ever call, a per-session active set, and a
//! scored search function the planner (or a future interactive session)
//! can use to narrow a wide catalog down before planning.
//!
//! Distinct from `catalog::ToolCatalog`, which is the planner-facing
//! *snapshot*; this registry is the long-lived superset it is built from.
//! Fuzzy-match scoring uses `strsim::jaro_winkler`, the same crate an
//! MCP-adjacent tool in the retrieval pack reaches for when scoring
//! approximate name matches.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{ToolCatalogItem, ToolSource};

const EXACT_SUBSTRING_SCORE: u32 = 100;
const FUZZY_NAME_SCORE: u32 = 50;
const DESCRIPTION_SUBSTRING_SCORE: u32 = 30;
const CATEGORY_KEYWORD_SCORE: u32 = 20;

/// Similarity threshold above which a name counts as a "fuzzy match"
/// (spec §4.10 leaves the exact threshold unspecified; Jaro-Winkler's
/// typical "likely the same word" cutoff is used here).
const FUZZY_MATCH_THRESHOLD: f64 = 0.85;

/// Compact summary, capped at 100 characters of description, returned by
/// search and listing operations (spec §4.10 `summaries`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSummary {
    pub name: String,
    pub description: String,
    pub category: String,
}

/// A named grouping of related tools, with keywords used for scoring
/// (spec §4.10 `categories`).
#[derive(Debug, Clone)]
pub struct Category {
    pub name: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub members: Vec<String>,
}

pub struct ToolRegistry {
    tools: HashMap<String, ToolCatalogItem>,
    categories: Vec<Category>,
    active: std::collections::HashSet<String>,
}

impl ToolRegistry {
    pub fn new(categories: Vec<Category>) -> Self {
        Self {
            tools: HashMap::new(),
            categories,
            active: std::collections::HashSet::new(),
        }
    }

    pub fn register(&mut self, item: ToolCatalogItem) {
        self.tools.insert(item.name.clone(), item);
    }

    pub fn get(&self, name: &str) -> Option<&ToolCatalogItem> {
        self.tools.get(name)
    }

    /// `Activate(name)`: marks a tool eligible for the caller's session.
    pub fn activate(&mut self, name: &str) {
        self.active.insert(name.to_string());
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.contains(name)
    }

    /// First category whose member list names `tool_name`, else `"other"`.
    pub fn category_for(&self, tool_name: &str) -> String {
        self.categories
            .iter()
            .find(|category| category.members.iter().any(|member| member == tool_name))
            .map(|category| category.name.clone())
            .unwrap_or_else(|| "other".to_string())
    }

    pub fn summary_for(&self, tool_name: &str) -> Option<ToolSummary> {
        let item = self.tools.get(tool_name)?;
        Some(ToolSummary {
            name: item.name.clone(),
            description: cap_description(&item.description),
            category: self.category_for(tool_name),
        })
    }

    /// Score every registered tool against `query`, drop zero-score
    /// entries, sort descending, and return the top `limit`.
    pub fn search(&self, query: &str, limit: usize) -> Vec<ToolSummary> {
        let query_lower = query.to_ascii_lowercase();
        let tokens: Vec<&str> = query_lower.split_whitespace().collect();

        let mut scored: Vec<(u32, &ToolCatalogItem)> = self
            .tools
            .values()
            .map(|item| (self.score(item, &query_lower, &tokens), item))
            .filter(|(score, _)| *score > 0)
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.name.cmp(&b.1.name)));

        scored
            .into_iter()
            .take(limit)
            .map(|(_, item)| ToolSummary {
                name: item.name.clone(),
                description: cap_description(&item.description),
                category: self.category_for(&item.name),
            })
            .collect()
    }

    fn score(&self, item: &ToolCatalogItem, query_lower: &str, tokens: &[&str]) -> u32 {
        let mut score = 0;
        let name_lower = item.name.to_ascii_lowercase();

        if name_lower.contains(query_lower) {
            score += EXACT_SUBSTRING_SCORE;
        } else if strsim::jaro_winkler(&name_lower, query_lower) >= FUZZY_MATCH_THRESHOLD {
            score += FUZZY_NAME_SCORE;
        }

        if item.description.to_ascii_lowercase().contains(query_lower) {
            score += DESCRIPTION_SUBSTRING_SCORE;
        }

        let category = self.categories.iter().find(|c| c.name == self.category_for(&item.name));
        if let Some(category) = category
            && tokens
                .iter()
                .any(|token| category.keywords.iter().any(|keyword| keyword == token))
        {
            score += CATEGORY_KEYWORD_SCORE;
        }

        score
    }

    /// Every registered tool's `(source, name)` pair, used by `catalog.rs`
    /// callers building a planner-facing snapshot.
    pub fn all(&self) -> impl Iterator<Item = &ToolCatalogItem> {
        self.tools.values()
    }

    pub fn source_of(&self, name: &str) -> Option<ToolSource> {
        self.tools.get(name).map(|item| item.source)
    }
}

fn cap_description(description: &str) -> String {
    if description.chars().count() <= 100 {
        description.to_string()
    } else {
        description.chars().take(100).collect()
    }
}
