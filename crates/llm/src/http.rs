//! HTTP-based LLM providers.
//!
//! Two wire schemas: OpenAI chat completions and Anthropic's Messages API.
//! Request construction and response parsing are pure functions of
//! [`ProviderKind`] so they can be tested without a network.

use crate::provider::{CompletionRequest, CompletionResponse, LlmError, LlmProvider, ProviderKind, Role};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

const ANTHROPIC_VERSION: &str = "2023-06-01";

fn default_base_url(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::OpenAi => "https://api.openai.com/v1",
        ProviderKind::Anthropic => "https://api.anthropic.com",
    }
}

// ── OpenAI-compatible request/response types ──

#[derive(Serialize)]
struct OaiRequest<'a> {
    model: &'a str,
    messages: Vec<OaiMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct OaiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OaiResponse {
    choices: Vec<OaiChoice>,
    usage: Option<OaiUsage>,
}

#[derive(Deserialize)]
struct OaiChoice {
    message: OaiChoiceMessage,
}

#[derive(Deserialize)]
struct OaiChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OaiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

// ── Anthropic Messages API types ──

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<AnthropicMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicResponseBlock>,
    usage: Option<AnthropicUsage>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicResponseBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Serialize `request` into the JSON body expected by `kind`.
pub fn build_body(kind: ProviderKind, model: &str, request: &CompletionRequest) -> serde_json::Value {
    let value = match kind {
        ProviderKind::OpenAi => serde_json::to_value(OaiRequest {
            model,
            messages: request
                .messages
                .iter()
                .map(|m| OaiMessage { role: role_str(m.role), content: &m.content })
                .collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
        }),
        ProviderKind::Anthropic => {
            // Anthropic puts the system prompt at top level.
            let system = request.system_prompt();
            let messages = request
                .messages
                .iter()
                .filter(|m| m.role != Role::System)
                .map(|m| AnthropicMessage { role: role_str(m.role), content: &m.content })
                .collect();
            serde_json::to_value(AnthropicRequest {
                model,
                max_tokens: request.max_tokens,
                system,
                messages,
                temperature: request.temperature,
            })
        }
    };
    // Only string/number fields: serialization cannot fail.
    value.unwrap_or(serde_json::Value::Null)
}

/// Extract completion text from a raw response body of `kind`.
pub fn parse_body(kind: ProviderKind, raw: &str) -> Result<CompletionResponse, LlmError> {
    match kind {
        ProviderKind::OpenAi => {
            let api: OaiResponse =
                serde_json::from_str(raw).map_err(|e| LlmError::parse(e.to_string(), raw))?;
            let content = api
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .ok_or_else(|| LlmError::parse("no message content in choices", raw))?;
            let (input_tokens, output_tokens) = api
                .usage
                .map(|u| (u.prompt_tokens, u.completion_tokens))
                .unwrap_or((0, 0));
            Ok(CompletionResponse { content, input_tokens, output_tokens })
        }
        ProviderKind::Anthropic => {
            let api: AnthropicResponse =
                serde_json::from_str(raw).map_err(|e| LlmError::parse(e.to_string(), raw))?;
            let texts: Vec<String> = api
                .content
                .into_iter()
                .filter_map(|b| match b {
                    AnthropicResponseBlock::Text { text } => Some(text),
                    AnthropicResponseBlock::Other => None,
                })
                .collect();
            if texts.is_empty() {
                return Err(LlmError::parse("no text block in content", raw));
            }
            let (input_tokens, output_tokens) = api
                .usage
                .map(|u| (u.input_tokens, u.output_tokens))
                .unwrap_or((0, 0));
            Ok(CompletionResponse { content: texts.concat(), input_tokens, output_tokens })
        }
    }
}

/// Parse error response, returning RateLimited for 429.
fn check_error(status: reqwest::StatusCode, body: String) -> LlmError {
    if status.as_u16() == 429 {
        LlmError::RateLimited
    } else {
        LlmError::RequestFailed(format!("{status}: {body}"))
    }
}

// ── Provider ──

/// HTTP-based LLM provider for one wire schema and model.
pub struct HttpProvider {
    kind: ProviderKind,
    model: String,
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpProvider {
    /// Build from schema kind + model name + API key + optional base URL override.
    pub fn new(kind: ProviderKind, model: String, api_key: String, base_url: Option<String>) -> Self {
        let base = base_url.unwrap_or_else(|| default_base_url(kind).to_owned());
        Self {
            kind,
            model,
            client: reqwest::Client::new(),
            base_url: base.trim_end_matches('/').to_owned(),
            api_key,
        }
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        match self.kind {
            ProviderKind::OpenAi => format!("{}/chat/completions", self.base_url),
            ProviderKind::Anthropic => format!("{}/v1/messages", self.base_url),
        }
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.kind {
            ProviderKind::OpenAi => builder.bearer_auth(&self.api_key),
            ProviderKind::Anthropic => builder
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION),
        }
    }

    async fn send(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = build_body(self.kind, &self.model, &request);

        let resp = self
            .authorize(self.client.post(self.endpoint()))
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(check_error(status, text));
        }

        let raw = resp
            .text()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;
        let parsed = parse_body(self.kind, &raw)?;
        tracing::debug!(
            provider = %self.kind,
            input_tokens = parsed.input_tokens,
            output_tokens = parsed.output_tokens,
            "completion received"
        );
        Ok(parsed)
    }
}

impl LlmProvider for HttpProvider {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    fn complete(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + '_>> {
        Box::pin(self.send(request))
    }
}
