use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A single message in a completion prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Which wire schema a bot talks. Chosen once, at `/addbot` time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown provider '{0}' (expected openai or anthropic)")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderKind {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(UnknownProvider(s.to_owned())),
        }
    }
}

/// LLM completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    /// System persona + one user turn, the only shape the chat room sends.
    pub fn persona(system: impl Into<String>, user: impl Into<String>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            messages: vec![Message::system(system), Message::user(user)],
            max_tokens,
            temperature,
        }
    }

    /// First system message, if any.
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
    }

    /// Last user message, if any.
    pub fn user_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// LLM completion response.
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    pub content: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Error type for LLM operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("rate limited")]
    RateLimited,
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("unexpected response payload ({reason}). Raw response: {excerpt}")]
    Parse { reason: String, excerpt: String },
}

/// Longest raw-payload excerpt carried by `LlmError::Parse`.
pub const PARSE_EXCERPT_CHARS: usize = 900;

impl LlmError {
    /// Build a parse error carrying a bounded excerpt of the raw payload.
    pub fn parse(reason: impl Into<String>, raw: &str) -> Self {
        Self::Parse {
            reason: reason.into(),
            excerpt: raw.chars().take(PARSE_EXCERPT_CHARS).collect(),
        }
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}

/// Trait for completion providers (OpenAI, Anthropic, test doubles).
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    fn complete(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + '_>>;
}

/// Mock provider for testing. Returns a fixed response and counts calls.
#[derive(Debug, Clone)]
pub struct MockProvider {
    pub response: Result<String, LlmError>,
    calls: Arc<AtomicUsize>,
}

impl MockProvider {
    pub fn new(response: impl Into<String>) -> Self {
        Self { response: Ok(response.into()), calls: Arc::new(AtomicUsize::new(0)) }
    }

    /// A mock whose every call fails with `error`.
    pub fn failing(error: LlmError) -> Self {
        Self { response: Err(error), calls: Arc::new(AtomicUsize::new(0)) }
    }

    /// Number of `complete` calls so far (shared across clones).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn complete(
        &self,
        _request: CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + '_>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = self.response.clone();
        Box::pin(async move {
            result.map(|content| CompletionResponse {
                content,
                input_tokens: 10,
                output_tokens: 20,
            })
        })
    }
}

/// One provider per wire schema; bots look theirs up by kind.
#[derive(Clone)]
pub struct ProviderSet {
    openai: Arc<dyn LlmProvider>,
    anthropic: Arc<dyn LlmProvider>,
}

impl ProviderSet {
    pub fn new(openai: Arc<dyn LlmProvider>, anthropic: Arc<dyn LlmProvider>) -> Self {
        Self { openai, anthropic }
    }

    /// Same provider behind both kinds. Handy in tests.
    pub fn uniform(provider: Arc<dyn LlmProvider>) -> Self {
        Self { openai: Arc::clone(&provider), anthropic: provider }
    }

    pub fn get(&self, kind: ProviderKind) -> Arc<dyn LlmProvider> {
        match kind {
            ProviderKind::OpenAi => Arc::clone(&self.openai),
            ProviderKind::Anthropic => Arc::clone(&self.anthropic),
        }
    }
}
