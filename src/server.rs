//! MCP server surface: exposes the router's single `query` operation and
//! the artifact resource facade over stdio (spec §6).
//!
//! Grounded on the `#[tool_router]`/`#[tool_handler]` macro idiom used
//! throughout the retrieval pack (`context-finder-mcp`'s
//! `ContextFinderService`, `grepika`'s `GrepikaServer`), narrowed to one
//! tool instead of a family of them, with `list_resources`/`read_resource`
//! hand-implemented against the artifact store rather than generated.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::tool::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ListResourcesResult, PaginatedRequestParams,
    ProtocolVersion, ReadResourceRequestParams, ReadResourceResult, ResourceContents as McpResourceContents,
    ServerCapabilities, ServerInfo,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::resources::{self};
use crate::router::{QueryRequest, Router};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct QueryParams {
    /// The caller's task, in natural language.
    pub input: String,
    /// Upper bound on the number of steps the planner may propose.
    #[schemars(description = "Maximum number of plan steps (defaults to the server's configured bound)")]
    pub max_steps: Option<usize>,
    /// Output-shaping options (`view`, `include_fields`, `exclude_fields`, `redact`, `max_items`,
    /// `max_depth`) applied to every step's result; parsed against `OutputOptions` at call time.
    #[schemars(description = "View, field projection, redaction, and size caps applied to step results")]
    pub output: Option<Value>,
    /// If true, plan and validate but never execute (spec §8 scenario 1).
    #[schemars(description = "Plan and validate only; skip execution")]
    pub dry_run: Option<bool>,
}

/// The MCP-facing wrapper around [`Router`]. Holds the router plus the
/// generated tool router used by `#[tool_handler]`.
#[derive(Clone)]
pub struct RouterService {
    router: Arc<Router>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl RouterService {
    pub fn new(router: Arc<Router>) -> Self {
        Self {
            router,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Plan, validate, and execute a sequence of read-only tool calls to answer a task, returning the plan, per-step outcomes, and a final answer."
    )]
    async fn query(
        &self,
        Parameters(params): Parameters<QueryParams>,
    ) -> Result<CallToolResult, McpError> {
        let output = match params.output {
            Some(value) => match serde_json::from_value(value) {
                Ok(options) => Some(options),
                Err(err) => {
                    return Ok(CallToolResult::error(vec![Content::text(format!(
                        "invalid output options: {err}"
                    ))]));
                }
            },
            None => None,
        };

        let request = QueryRequest {
            input: params.input,
            max_steps: params.max_steps,
            output,
            dry_run: params.dry_run.unwrap_or(false),
        };

        match self.router.query(request).await {
            Ok(result) => {
                let json = serde_json::to_string(&result)
                    .map_err(|err| McpError::internal_error(err.to_string(), None))?;
                Ok(CallToolResult::success(vec![Content::text(json)]))
            }
            Err(err) => {
                let body: Value = serde_json::json!({
                    "phase": err.phase(),
                    "message": err.to_string(),
                });
                Ok(CallToolResult::error(vec![Content::text(body.to_string())]))
            }
        }
    }
}

#[tool_handler]
impl ServerHandler for RouterService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            server_info: Implementation {
                name: "query-router".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            instructions: Some(
                "Single entry point: call `query` with a natural-language task. Every proposed \
                 tool call is planned, validated against a read-only policy, and executed before \
                 a plan or answer is returned. Oversized step results are externalized as \
                 artifact:// resources; list and read them via the resources API."
                    .to_string(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let descriptors = resources::list_resources(self.router.artifact_store());
        let resources = descriptors
            .into_iter()
            .map(|descriptor| {
                let mut raw = rmcp::model::RawResource::new(descriptor.uri, descriptor.name);
                raw.mime_type = Some(descriptor.mime);
                raw.no_annotation()
            })
            .collect();
        Ok(ListResourcesResult {
            meta: None,
            resources,
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let contents = resources::read_resource(self.router.artifact_store(), &request.uri)
            .map_err(|err| McpError::invalid_params(err.to_string(), None))?;

        Ok(ReadResourceResult {
            contents: vec![McpResourceContents::text(contents.text, contents.uri)],
            meta: None,
        })
    }
}
