//! In-process local tool handlers (spec §4.4 "local tools are dispatched
//! to an in-process handler registry"). Individual domain-specific
//! handlers (issue tracker, wiki, dashboards, code review) are out of
//! scope — external collaborators the router calls, not anything it
//! implements. This module only provides the dispatch contract and a
//! couple of illustrative handlers used by the executor's own tests.
//!
//! Grounded on the `Tool` trait shape in
//! `oxicrab::agent::tools::base::{Tool, ToolResult}`, narrowed from
//! "returns a `ToolResult` wrapping display text" to "returns raw JSON",
//! matching the executor's `Value`-typed dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait LocalHandler: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> Value;

    async fn call(&self, args: Value) -> anyhow::Result<Value>;
}

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn LocalHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn LocalHandler>) {
        self.handlers.insert(handler.name().to_string(), handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn LocalHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn catalog_items(&self) -> Vec<crate::catalog::ToolCatalogItem> {
        self.handlers
            .values()
            .map(|handler| crate::catalog::ToolCatalogItem {
                name: handler.name().to_string(),
                description: handler.description().to_string(),
                category: String::new(),
                source: crate::catalog::ToolSource::Local,
                input_schema: handler.input_schema(),
            })
            .collect()
    }
}
