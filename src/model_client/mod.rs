//! Model-client adapter: wraps a chat-completions HTTP endpoint in two call
//! modes, `plan` (strict JSON, its own token cap) and `summary` (free text,
//! a separate cap). Reports the model's finish reason so callers can detect
//! truncation (spec §2, §6).
//!
//! Grounded on `oxicrab::providers::base::{ChatRequest, LLMResponse,
//! LLMProvider}` — the request/response shape is reused directly, pared
//! down from the teacher's multi-provider, tool-calling chat loop to a
//! single non-streaming HTTP provider: this router never lets the model
//! call tools itself, it only ever asks for a JSON plan or a text summary.


use anyhow::{Context, Result, bail};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::ModelConfig;

/// Why the model stopped generating. `Length` means the response was cut
/// off by the token cap — the spec's "truncation" signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    Other,
}

impl FinishReason {
    fn from_raw(raw: &str) -> Self {
        match raw {
            "stop" | "end_turn" | "eos" => Self::Stop,
            "length" | "max_tokens" => Self::Length,
            _ => Self::Other,
        }
    }

    pub fn is_truncated(self) -> bool {
        matches!(self, Self::Length)
    }
}

/// Result of one model call.
#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub content: String,
    pub finish_reason: FinishReason,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP adapter over a chat-completions endpoint.
pub struct ModelClient {
    http: Client,
    config: ModelConfig,
}

impl ModelClient {
    pub fn new(config: ModelConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("failed to build model-client HTTP client")?;
        Ok(Self { http, config })
    }

    /// Call the model in *plan* mode: system prompt instructs JSON-only
    /// output, capped by `model.plan_max_tokens`.
    pub async fn plan(&self, system_prompt: &str, user_prompt: &str) -> Result<ModelResponse> {
        self.chat(system_prompt, user_prompt, self.config.plan_max_tokens)
            .await
    }

    /// Call the model in *summary* mode: free text, capped by
    /// `model.summary_max_tokens`.
    pub async fn summarize(&self, system_prompt: &str, user_prompt: &str) -> Result<ModelResponse> {
        self.chat(system_prompt, user_prompt, self.config.summary_max_tokens)
            .await
    }

    async fn chat(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: Option<u32>,
    ) -> Result<ModelResponse> {
        let request = ChatCompletionRequest {
            model: &self.config.model_id,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: 0.0,
            max_tokens,
        };

        debug!(
            model = %self.config.model_id,
            max_tokens = ?max_tokens,
            "calling model endpoint"
        );

        let response = self
            .http
            .post(&self.config.base_url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .context("model endpoint request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("model endpoint returned {status}: {body}");
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .context("model endpoint returned unparseable JSON")?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .context("model endpoint returned no choices")?;

        let finish_reason = choice
            .finish_reason
            .as_deref()
            .map(FinishReason::from_raw)
            .unwrap_or(FinishReason::Other);

        Ok(ModelResponse {
            content: choice.message.content.unwrap_or_default(),
            finish_reason,
        })
    }
}

/// Defensive extraction of a JSON value from a model response that may be
/// wrapped in surrounding prose: find the first `{`/`[`, the last matching
/// `}`/`]`, and slice between them (spec §4.2).
pub fn extract_json(raw: &str) -> Option<Value> {
    let start = raw.find(['{', '[']);
    let start = start?;
    let opening = raw.as_bytes()[start];
    let closing = if opening == b'{' { b'}' } else { b']' };
    let end = raw.rfind(closing as char)?;
    if end < start {
        return None;
    }
    let slice = &raw[start..=end];
    serde_json::from_str(slice).ok()
}
