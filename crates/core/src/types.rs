use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chatter_llm::ProviderKind;

/// Longest message body kept in the transcript.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Display name used for engine-generated messages.
pub const SYSTEM_NAME: &str = "system";

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    User,
    Assistant,
    System,
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub timestamp: DateTime<Local>,
    pub role: SenderRole,
    pub display_name: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: SenderRole, display_name: impl Into<String>, content: impl AsRef<str>) -> Self {
        Self {
            timestamp: Local::now(),
            role,
            display_name: display_name.into(),
            content: content.as_ref().chars().take(MAX_MESSAGE_CHARS).collect(),
        }
    }

    pub fn user(name: impl Into<String>, content: impl AsRef<str>) -> Self {
        Self::new(SenderRole::User, name, content)
    }

    pub fn assistant(bot: impl Into<String>, content: impl AsRef<str>) -> Self {
        Self::new(SenderRole::Assistant, bot, content)
    }

    pub fn system(content: impl AsRef<str>) -> Self {
        Self::new(SenderRole::System, SYSTEM_NAME, content)
    }

    /// `[HH:MM]` wall-clock stamp.
    pub fn stamp(&self) -> String {
        self.timestamp.format("[%H:%M]").to_string()
    }
}

/// Immutable view of a bot, copied out of the registry so no lock is held
/// while prompts are built or completions awaited.
#[derive(Debug, Clone, PartialEq)]
pub struct BotSnapshot {
    /// Registration the snapshot was taken from. A re-added bot with the same
    /// name gets a new one.
    pub id: Uuid,
    pub name: String,
    pub provider: ProviderKind,
    pub personality: String,
    pub temperature: f32,
    /// Consolidated memory at snapshot time.
    pub memory: String,
}

/// A bot asked to produce one turn. Produced by the dispatcher, consumed by a worker.
#[derive(Debug, Clone)]
pub struct GenerationTask {
    pub id: Uuid,
    pub query_text: String,
    pub sender_name: String,
    pub target: BotSnapshot,
}

impl GenerationTask {
    pub fn new(query_text: impl Into<String>, sender_name: impl Into<String>, target: BotSnapshot) -> Self {
        Self {
            id: Uuid::new_v4(),
            query_text: query_text.into(),
            sender_name: sender_name.into(),
            target,
        }
    }
}

/// A finished generation waiting for the single consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedResponse {
    pub response_text: String,
    pub source_bot: String,
    /// Registration of the bot that produced the reply.
    pub source_id: Uuid,
}

/// Sidebar row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub name: String,
    pub provider: ProviderKind,
    pub is_typing: bool,
}
