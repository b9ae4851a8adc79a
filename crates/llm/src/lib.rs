//! Completion-service collaborator: one trait, two HTTP wire schemas.

pub mod http;
pub mod provider;

pub use provider::{
    CompletionRequest, CompletionResponse, LlmError, LlmProvider, Message, MockProvider,
    ProviderKind, ProviderSet, Role,
};
