//! Tool catalog: the snapshot of tools visible to the planner for one
//! request (spec §3, §4).

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolSource {
    Local,
    Upstream,
}

impl ToolSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Upstream => "upstream",
        }
    }
}

impl std::fmt::Display for ToolSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptor of one invocable tool (spec §3 `ToolCatalogItem`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCatalogItem {
    pub name: String,
    pub description: String,
    pub category: String,
    pub source: ToolSource,
    /// JSON-Schema fragment, or `Value::Null` when the tool has no schema.
    #[serde(default)]
    pub input_schema: Value,
}

/// A flat, name-unique list of callable tools, built at planning time by
/// merging built-in local tools with a snapshot of upstream tools.
///
/// Immutable once constructed — the planner is the sole reader.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCatalog {
    items: Vec<ToolCatalogItem>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item, enforcing catalog-wide name uniqueness (spec §3
    /// invariant: `name` non-empty, unique within catalog).
    pub fn insert(&mut self, item: ToolCatalogItem) -> anyhow::Result<()> {
        if item.name.is_empty() {
            anyhow::bail!("catalog item name must not be empty");
        }
        if self.items.iter().any(|existing| existing.name == item.name) {
            anyhow::bail!("duplicate catalog item name: {}", item.name);
        }
        self.items.push(item);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ToolCatalogItem> {
        self.items.iter().find(|item| item.name == name)
    }

    pub fn contains(&self, source: ToolSource, name: &str) -> bool {
        self.items
            .iter()
            .any(|item| item.source == source && item.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolCatalogItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str) -> ToolCatalogItem {
        ToolCatalogItem {
            name: name.to_string(),
            description: "desc".to_string(),
            category: "cat".to_string(),
            source: ToolSource::Local,
            input_schema: Value::Null,
        }
    }

    #[test]
    fn rejects_empty_name() {
        let mut catalog = ToolCatalog::new();
        assert!(catalog.insert(item("")).is_err());
    }

    #[test]
    fn rejects_duplicate_name() {
        let mut catalog = ToolCatalog::new();
        catalog.insert(item("search")).unwrap();
        assert!(catalog.insert(item("search")).is_err());
    }

    #[test]
    fn get_finds_inserted_item() {
        let mut catalog = ToolCatalog::new();
        catalog.insert(item("search")).unwrap();
        assert!(catalog.get("search").is_some());
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn contains_checks_source_and_name() {
        let mut catalog = ToolCatalog::new();
        catalog.insert(item("search")).unwrap();
        assert!(catalog.contains(ToolSource::Local, "search"));
        assert!(!catalog.contains(ToolSource::Upstream, "search"));
    }
}
