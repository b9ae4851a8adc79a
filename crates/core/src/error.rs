use chatter_llm::LlmError;

/// Failures surfaced by the chat-room engine.
///
/// Everything except `Fatal` is reported as a system message in the transcript
/// and leaves the rest of the room running.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RoomError {
    /// The completion call itself failed (network, HTTP status, rate limit).
    #[error("{0}")]
    Transport(String),
    /// The completion payload did not match the provider schema.
    #[error("Failed to extract response from JSON ({reason}). Raw response: {excerpt}")]
    Parse { reason: String, excerpt: String },
    /// Bot limit reached, or the worker pool is no longer accepting tasks.
    #[error("{0}")]
    Capacity(String),
    /// Malformed command or argument.
    #[error("{message} Usage: {usage}")]
    Validation { message: String, usage: &'static str },
    #[error("Bot not found: {0}")]
    NotFound(String),
    /// Startup cannot proceed.
    #[error("{0}")]
    Fatal(String),
}

impl RoomError {
    pub fn validation(message: impl Into<String>, usage: &'static str) -> Self {
        Self::Validation { message: message.into(), usage }
    }

    /// Attribute a completion failure to the bot that triggered it.
    pub fn from_llm(bot: &str, err: LlmError) -> Self {
        match err {
            LlmError::Parse { reason, excerpt } => Self::Parse { reason, excerpt },
            other => Self::Transport(format!("{bot}: {other}")),
        }
    }
}

impl From<LlmError> for RoomError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Parse { reason, excerpt } => Self::Parse { reason, excerpt },
            other => Self::Transport(other.to_string()),
        }
    }
}
