//! Environment-driven configuration, loaded once at startup.
//!
//! Mirrors the shape of `oxicrab::config::loader::load_config`: defaults
//! baked in via `Default`, overridden by environment variables, validated
//! once before use.


use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::upstream::UpstreamServerSpec;

/// Recognized environment variable keys (spec §6 "Configuration keys").
pub mod env_keys {
    pub const ARTIFACT_DIR: &str = "ROUTER_ARTIFACT_DIR";
    pub const ARTIFACT_INLINE_MAX_BYTES: &str = "ROUTER_ARTIFACT_INLINE_MAX_BYTES";
    pub const ARTIFACT_PREVIEW_BYTES: &str = "ROUTER_ARTIFACT_PREVIEW_BYTES";
    pub const ARTIFACT_KEEP_INDEX: &str = "ROUTER_ARTIFACT_KEEP_INDEX";
    pub const MODEL_ID: &str = "ROUTER_MODEL_ID";
    pub const MODEL_BASE_URL: &str = "ROUTER_MODEL_BASE_URL";
    pub const MODEL_API_KEY: &str = "ROUTER_MODEL_API_KEY";
    pub const MODEL_REQUEST_TIMEOUT_SECS: &str = "ROUTER_MODEL_REQUEST_TIMEOUT_SECS";
    pub const PLAN_MAX_TOKENS: &str = "ROUTER_PLAN_MAX_TOKENS";
    pub const SUMMARY_MAX_TOKENS: &str = "ROUTER_SUMMARY_MAX_TOKENS";
    pub const STEP_TIMEOUT_SECS: &str = "ROUTER_STEP_TIMEOUT_SECS";
    pub const PLAN_DEADLINE_SECS: &str = "ROUTER_PLAN_DEADLINE_SECS";
    pub const MAX_STEPS: &str = "ROUTER_MAX_STEPS";
    pub const COHORT_FANOUT: &str = "ROUTER_COHORT_FANOUT";
    pub const PAGINATION_DEPTH: &str = "ROUTER_PAGINATION_DEPTH";
    /// JSON array of `{name, command, args, env}` objects, one per
    /// upstream MCP server to connect to at startup.
    pub const UPSTREAM_SERVERS: &str = "ROUTER_UPSTREAM_SERVERS";
}

/// Top-level router configuration.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub artifact: ArtifactConfig,
    pub model: ModelConfig,
    pub execution: ExecutionConfig,
    pub upstream_servers: Vec<UpstreamServerSpec>,
}

#[derive(Debug, Clone)]
pub struct ArtifactConfig {
    pub dir: std::path::PathBuf,
    pub inline_max_bytes: usize,
    pub preview_bytes: usize,
    pub keep_index: bool,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            dir: std::path::PathBuf::from("./router-artifacts"),
            inline_max_bytes: 64 * 1024,
            preview_bytes: 2 * 1024,
            keep_index: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub model_id: String,
    pub base_url: String,
    pub api_key: String,
    pub plan_max_tokens: Option<u32>,
    pub summary_max_tokens: Option<u32>,
    pub request_timeout: Duration,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_id: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: String::new(),
            plan_max_tokens: Some(2048),
            summary_max_tokens: Some(1024),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    pub max_steps: usize,
    pub cohort_fanout: usize,
    pub pagination_depth: usize,
    pub step_timeout: Duration,
    pub plan_deadline: Duration,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_steps: 16,
            cohort_fanout: 8,
            pagination_depth: 8,
            step_timeout: Duration::from_secs(30),
            plan_deadline: Duration::from_secs(120),
        }
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            artifact: ArtifactConfig::default(),
            model: ModelConfig::default(),
            execution: ExecutionConfig::default(),
            upstream_servers: Vec::new(),
        }
    }
}

impl RouterConfig {
    /// Build configuration from defaults overridden by environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(v) = std::env::var(env_keys::ARTIFACT_DIR) {
            config.artifact.dir = std::path::PathBuf::from(v);
        }
        if let Some(v) = parse_env_usize(env_keys::ARTIFACT_INLINE_MAX_BYTES)? {
            config.artifact.inline_max_bytes = v;
        }
        if let Some(v) = parse_env_usize(env_keys::ARTIFACT_PREVIEW_BYTES)? {
            config.artifact.preview_bytes = v;
        }
        if let Ok(v) = std::env::var(env_keys::ARTIFACT_KEEP_INDEX) {
            config.artifact.keep_index = parse_bool(&v)
                .with_context(|| format!("invalid boolean for {}", env_keys::ARTIFACT_KEEP_INDEX))?;
        }
        if let Ok(v) = std::env::var(env_keys::MODEL_ID) {
            config.model.model_id = v;
        }
        if let Ok(v) = std::env::var(env_keys::MODEL_BASE_URL) {
            config.model.base_url = v;
        }
        if let Ok(v) = std::env::var(env_keys::MODEL_API_KEY) {
            config.model.api_key = v;
        }
        if let Some(v) = parse_env_u32(env_keys::PLAN_MAX_TOKENS)? {
            config.model.plan_max_tokens = Some(v);
        }
        if let Some(v) = parse_env_u32(env_keys::SUMMARY_MAX_TOKENS)? {
            config.model.summary_max_tokens = Some(v);
        }
        if let Some(v) = parse_env_u64(env_keys::MODEL_REQUEST_TIMEOUT_SECS)? {
            config.model.request_timeout = Duration::from_secs(v);
        }
        if let Some(v) = parse_env_usize(env_keys::MAX_STEPS)? {
            config.execution.max_steps = v;
        }
        if let Some(v) = parse_env_usize(env_keys::COHORT_FANOUT)? {
            config.execution.cohort_fanout = v;
        }
        if let Some(v) = parse_env_usize(env_keys::PAGINATION_DEPTH)? {
            config.execution.pagination_depth = v;
        }
        if let Some(v) = parse_env_u64(env_keys::STEP_TIMEOUT_SECS)? {
            config.execution.step_timeout = Duration::from_secs(v);
        }
        if let Some(v) = parse_env_u64(env_keys::PLAN_DEADLINE_SECS)? {
            config.execution.plan_deadline = Duration::from_secs(v);
        }
        if let Ok(v) = std::env::var(env_keys::UPSTREAM_SERVERS) {
            config.upstream_servers = serde_json::from_str(&v)
                .with_context(|| format!("invalid JSON array for {}", env_keys::UPSTREAM_SERVERS))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.execution.max_steps == 0 {
            bail!("execution.max_steps must be > 0");
        }
        if self.execution.cohort_fanout == 0 {
            bail!("execution.cohort_fanout must be > 0");
        }
        if self.artifact.inline_max_bytes == 0 {
            bail!("artifact.inline_max_bytes must be > 0");
        }
        if self.artifact.preview_bytes == 0 {
            bail!("artifact.preview_bytes must be > 0");
        }
        if self.model.base_url.is_empty() {
            bail!("model.base_url must not be empty");
        }
        Ok(())
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("not a boolean: {other}"),
    }
}

fn parse_env_usize(key: &str) -> Result<Option<usize>> {
    match std::env::var(key) {
        Ok(v) => Ok(Some(
            v.trim()
                .parse::<usize>()
                .with_context(|| format!("invalid integer for {key}"))?,
        )),
        Err(_) => Ok(None),
    }
}

fn parse_env_u32(key: &str) -> Result<Option<u32>> {
    match std::env::var(key) {
        Ok(v) => Ok(Some(
            v.trim()
                .parse::<u32>()
                .with_context(|| format!("invalid integer for {key}"))?,
        )),
        Err(_) => Ok(None),
    }
}

fn parse_env_u64(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(v) => Ok(Some(
            v.trim()
                .parse::<u64>()
                .with_context(|| format!("invalid integer for {key}"))?,
        )),
        Err(_) => Ok(None),
    }
}
