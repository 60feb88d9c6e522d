//! Command-line entry point: `serve` runs the MCP server over stdio,
//! `check-config` validates the environment without starting it.
//!
//! Grounded on the `Cli`/`Commands` clap shape in `cli::commands::Cli`,
//! narrowed from oxicrab's dozen subcommands to this router's two.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use tracing::{info, warn};

use crate::artifact::ArtifactStore;
use crate::config::RouterConfig;
use crate::handlers::HandlerRegistry;
use crate::model_client::ModelClient;
use crate::policy::{Policy, is_mutating_name};
use crate::router::Router;
use crate::server::RouterService;
use crate::upstream::{UpstreamClient, UpstreamPool};

#[derive(Parser)]
#[command(name = "query-router")]
#[command(about = "Consolidating MCP proxy: plans, validates, and executes read-only tool calls behind a single query tool")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server over stdio (default if no subcommand is given).
    Serve,
    /// Load and validate configuration, then exit.
    CheckConfig,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve().await,
        Commands::CheckConfig => check_config(),
    }
}

fn check_config() -> Result<()> {
    let config = RouterConfig::from_env().context("configuration failed to load")?;
    println!("configuration is valid");
    println!("  model: {}", config.model.model_id);
    println!("  artifact dir: {}", config.artifact.dir.display());
    println!("  max steps: {}", config.execution.max_steps);
    Ok(())
}

/// Build a [`Router`] with every `ROUTER_UPSTREAM_SERVERS` entry connected
/// and allow-listed, then serve it over stdio (spec §6). Local handlers
/// beyond the dispatch contract are domain-specific and left to the
/// operator to register at this call site; an upstream server that fails
/// to connect is logged and skipped rather than aborting startup, so one
/// misconfigured server doesn't take down the whole router.
async fn serve() -> Result<()> {
    let config = RouterConfig::from_env().context("configuration failed to load")?;
    config.validate().context("configuration is invalid")?;

    let model_client = ModelClient::new(config.model.clone()).context("failed to build model client")?;
    let artifact_store = Arc::new(ArtifactStore::new(config.artifact.clone()).context("failed to open artifact store")?);
    let handlers = Arc::new(HandlerRegistry::new());

    let mut upstream_pool = UpstreamPool::new();
    for spec in &config.upstream_servers {
        match UpstreamClient::connect(spec).await {
            Ok(client) => {
                if let Err(err) = upstream_pool.add(client).await {
                    warn!(upstream = %spec.name, error = %err, "failed to list tools from upstream server, skipping");
                }
            }
            Err(err) => {
                warn!(upstream = %spec.name, error = %err, "failed to connect to upstream server, skipping");
            }
        }
    }
    let upstream = Arc::new(upstream_pool);

    let mut policy = Policy::new();
    for item in handlers.catalog_items() {
        if !is_mutating_name(&item.name) {
            policy.allow_local(item.name);
        }
    }
    let upstream_items = upstream
        .catalog_items()
        .await
        .context("failed to list connected upstream tools")?;
    for item in upstream_items {
        if !is_mutating_name(&item.name) {
            policy.allow_upstream(item.name);
        }
    }

    let router = Arc::new(Router::new(
        config,
        model_client,
        policy,
        handlers,
        upstream,
        artifact_store,
    ));

    info!("starting query-router MCP server on stdio");
    let service = RouterService::new(router)
        .serve(stdio())
        .await
        .context("failed to start MCP server")?;
    service.waiting().await.context("MCP server exited with an error")?;
    Ok(())
}
