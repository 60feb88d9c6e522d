//! Upstream MCP client: wraps a single upstream tool server as a
//! child-process `rmcp` connection and exposes one operation, "dispatch a
//! named call and return raw JSON" (spec §9's executor dispatch
//! contract).
//!
//! Grounded almost verbatim on `oxicrab::agent::tools::mcp::{McpManager,
//! McpProxyTool}`: same `TokioChildProcess` + `ServiceExt::serve` connect
//! sequence, same content-block joining. Generalized from "wrap as `impl
//! Tool` returning text" to "return the tool's raw JSON result", since the
//! router's executor works in `serde_json::Value`, not chat-loop text.

use std::borrow::Cow;
use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use rmcp::RoleClient;
use rmcp::ServiceExt;
use rmcp::model::{CallToolRequestParams, RawContent};
use rmcp::service::{Peer, RunningService};
use rmcp::transport::TokioChildProcess;
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;
use tracing::{info, warn};

use crate::catalog::{ToolCatalogItem, ToolSource};

/// How to spawn one upstream tool server (spec §6 "Configuration keys" —
/// subprocess supervision itself is out of scope; this is just the
/// connect-time shape the teacher's `McpConfig::servers` entries carry).
/// Deserializable so `config::RouterConfig` can parse a list of these
/// straight out of a `ROUTER_UPSTREAM_SERVERS` JSON array.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamServerSpec {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// A live connection to one upstream MCP server.
pub struct UpstreamClient {
    name: String,
    service: RunningService<RoleClient, ()>,
}

impl UpstreamClient {
    pub async fn connect(spec: &UpstreamServerSpec) -> Result<Self> {
        let mut cmd = Command::new(&spec.command);
        cmd.args(&spec.args);
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }
        cmd.stdin(std::process::Stdio::piped());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::inherit());

        let transport = TokioChildProcess::new(cmd)
            .with_context(|| format!("failed to spawn upstream server '{}'", spec.name))?;
        let service = ()
            .serve(transport)
            .await
            .map_err(|e| anyhow::anyhow!("MCP handshake failed for upstream '{}': {e}", spec.name))?;

        info!(upstream = %spec.name, "connected to upstream MCP server");
        Ok(Self {
            name: spec.name.clone(),
            service,
        })
    }

    fn peer(&self) -> Peer<RoleClient> {
        self.service.peer().clone()
    }

    /// List the tools this upstream exposes, as catalog items tagged
    /// `ToolSource::Upstream`.
    pub async fn list_tools(&self) -> Result<Vec<ToolCatalogItem>> {
        let tools = self
            .peer()
            .list_all_tools()
            .await
            .with_context(|| format!("failed to list tools from upstream '{}'", self.name))?;

        Ok(tools
            .into_iter()
            .map(|tool| ToolCatalogItem {
                name: tool.name.to_string(),
                description: tool.description.as_deref().unwrap_or("").to_string(),
                category: String::new(),
                source: ToolSource::Upstream,
                input_schema: Value::Object((*tool.input_schema).clone()),
            })
            .collect())
    }

    /// Call `tool_name` with `args`, returning the result's raw JSON.
    pub async fn call(&self, tool_name: &str, args: Value) -> Result<Value> {
        let arguments = match args {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("input".to_string(), other);
                Some(map)
            }
        };

        let request = CallToolRequestParams {
            meta: None,
            name: Cow::Owned(tool_name.to_string()),
            arguments,
            task: None,
        };

        let result = self
            .peer()
            .call_tool(request)
            .await
            .with_context(|| format!("upstream call to '{tool_name}' failed"))?;

        let value = content_to_value(&result.content);
        if result.is_error.unwrap_or(false) {
            bail!("upstream tool '{tool_name}' returned an error: {value}");
        }
        Ok(value)
    }

    pub async fn shutdown(self) {
        if let Err(err) = self.service.cancel().await {
            warn!(upstream = %self.name, error = %err, "error shutting down upstream MCP server");
        }
    }
}

/// Join MCP content blocks into a JSON value: if the joined text parses
/// as JSON, use that value directly (most upstream tools return
/// structured JSON as text content); otherwise wrap as `{"text": ...}`.
fn content_to_value(content: &[rmcp::model::Annotated<RawContent>]) -> Value {
    let mut joined = String::new();
    for block in content {
        match &block.raw {
            RawContent::Text(text) => {
                if !joined.is_empty() {
                    joined.push('\n');
                }
                joined.push_str(&text.text);
            }
            RawContent::Image(img) => {
                joined.push_str(&format!("[image: {} bytes]", img.data.len()));
            }
            RawContent::Audio(audio) => {
                joined.push_str(&format!("[audio: {} bytes]", audio.data.len()));
            }
            _ => joined.push_str("[unsupported content]"),
        }
    }

    serde_json::from_str(&joined).unwrap_or_else(|_| Value::String(joined))
}

/// A tool-name-keyed dispatch table built from every connected upstream's
/// tool list, so the executor never needs to know which upstream owns a
/// given tool.
#[derive(Default)]
pub struct UpstreamPool {
    owners: HashMap<String, usize>,
    clients: Vec<UpstreamClient>,
}

impl UpstreamPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&mut self, client: UpstreamClient) -> Result<()> {
        let tools = client.list_tools().await?;
        let index = self.clients.len();
        for tool in &tools {
            self.owners.insert(tool.name.clone(), index);
        }
        self.clients.push(client);
        Ok(())
    }

    pub async fn catalog_items(&self) -> Result<Vec<ToolCatalogItem>> {
        let mut items = Vec::new();
        for client in &self.clients {
            items.extend(client.list_tools().await?);
        }
        Ok(items)
    }

    pub async fn call(&self, tool_name: &str, args: Value) -> Result<Value> {
        let Some(&index) = self.owners.get(tool_name) else {
            bail!("no upstream server hosts tool '{tool_name}'");
        };
        self.clients[index].call(tool_name, args).await
    }
}
