use std::sync::Arc;

use chatter_llm::{CompletionRequest, LlmError, ProviderSet};
use uuid::Uuid;

use super::queue::ResponseSender;
use crate::bots::{BotRegistry, persona};
use crate::chat::SharedChat;
use crate::dispatch::decision::is_mentioned;
use crate::error::RoomError;
use crate::io::status::StatusBoard;
use crate::types::{CompletedResponse, GenerationTask};

/// Body of one worker: build the bot's prompt, call its provider, and hand the
/// result to the response queue. Failures stay inside the worker and surface
/// as system messages.
pub struct Generator {
    pub chat: SharedChat,
    pub registry: Arc<BotRegistry>,
    pub status: StatusBoard,
    pub providers: ProviderSet,
    pub responses: ResponseSender,
    pub context_messages: usize,
    pub max_tokens: u32,
}

impl Generator {
    pub async fn run(self: Arc<Self>, task: GenerationTask) {
        let bot = &task.target;
        let _typing = Typing::start(&self, bot.id);

        let context = self.chat.recent(self.context_messages);
        let mentioned = is_mentioned(&task.query_text, &bot.name);
        let request = CompletionRequest::persona(
            persona::response_system_prompt(bot, &task.sender_name, &context, mentioned),
            task.query_text.clone(),
            self.max_tokens,
            bot.temperature,
        );

        tracing::debug!(task = %task.id, bot = %bot.name, provider = %bot.provider, "generation started");
        let provider = self.providers.get(bot.provider);
        let outcome = provider.complete(request).await.and_then(|reply| {
            let text = reply.content.trim();
            if text.is_empty() {
                return Err(LlmError::parse("empty completion", ""));
            }
            tracing::debug!(
                task = %task.id,
                bot = %bot.name,
                output_tokens = reply.output_tokens,
                "generation completed"
            );
            Ok(text.to_owned())
        });

        match outcome {
            Ok(text) => {
                let delivered = self.responses.enqueue(CompletedResponse {
                    response_text: text,
                    source_bot: bot.name.clone(),
                    source_id: bot.id,
                });
                if !delivered {
                    tracing::warn!(bot = %bot.name, "response queue closed, reply dropped");
                }
            }
            Err(e) => {
                let err = RoomError::from_llm(&bot.name, e);
                tracing::warn!(task = %task.id, bot = %bot.name, error = %err, "generation failed");
                self.chat.system(err.to_string());
            }
        }
    }

    fn typing(&self, id: Uuid, on: bool) {
        if self.registry.set_typing(id, on) {
            self.status.roster_changed();
        }
    }
}

/// Holds a bot's typing flag for the life of one generation; cleared on drop,
/// including when the provider future panics.
struct Typing<'a> {
    generator: &'a Generator,
    id: Uuid,
}

impl<'a> Typing<'a> {
    fn start(generator: &'a Generator, id: Uuid) -> Self {
        generator.typing(id, true);
        Self { generator, id }
    }
}

impl Drop for Typing<'_> {
    fn drop(&mut self) {
        self.generator.typing(self.id, false);
    }
}
