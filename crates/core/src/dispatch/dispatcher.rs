use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use chatter_llm::LlmProvider;

use super::decision::ResponsePolicy;
use crate::bots::BotRegistry;
use crate::chat::SharedChat;
use crate::config::RoomCfg;
use crate::error::RoomError;
use crate::runtime::generator::Generator;
use crate::runtime::pool::WorkerPool;
use crate::types::GenerationTask;

/// Which bots a dispatch looked at and which ones got a worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub evaluated: Vec<String>,
    pub accepted: Vec<String>,
}

/// Fan-out entry point for every outgoing message, from the user or a bot.
pub struct Dispatcher {
    pub registry: Arc<BotRegistry>,
    pub chat: SharedChat,
    pub policy: ResponsePolicy,
    /// Answers the yes/no consult.
    pub oracle: Arc<dyn LlmProvider>,
    pub pool: Arc<WorkerPool>,
    pub generator: Arc<Generator>,
    /// Typing latency before each submission, in milliseconds.
    pub typing_delay_ms: RangeInclusive<u64>,
}

impl Dispatcher {
    pub fn typing_delay_from(cfg: &RoomCfg) -> RangeInclusive<u64> {
        let lo = cfg.typing_delay_min_ms;
        lo..=cfg.typing_delay_max_ms.max(lo)
    }

    /// Offer `text` to every active bot except `sender`. Accepted bots are
    /// submitted one at a time, each after a typing pause; a full pool blocks
    /// here until a worker finishes.
    pub async fn dispatch(&self, text: &str, sender: &str) -> DispatchSummary {
        let mut summary = DispatchSummary::default();

        for bot in self.registry.candidates(sender) {
            summary.evaluated.push(bot.name.clone());

            let verdict = match self.policy.decide(text, &bot, self.oracle.as_ref()).await {
                Ok(v) => v,
                Err(e) => {
                    let err = RoomError::from_llm(&bot.name, e);
                    tracing::warn!(bot = %bot.name, error = %err, "response decision failed");
                    self.chat.system(err.to_string());
                    continue;
                }
            };
            tracing::debug!(bot = %bot.name, %sender, ?verdict, "response decision");
            if !verdict.responds() {
                continue;
            }

            let pause = rand::rng().random_range(self.typing_delay_ms.clone());
            tokio::time::sleep(Duration::from_millis(pause)).await;
            if !self.registry.is_active(&bot.name) {
                continue;
            }

            let name = bot.name.clone();
            let task = GenerationTask::new(text, sender, bot);
            let id = task.id;
            match self.pool.submit(Arc::clone(&self.generator).run(task)).await {
                Ok(()) => {
                    tracing::debug!(task = %id, bot = %name, in_flight = self.pool.in_flight(), "generation submitted");
                    summary.accepted.push(name);
                }
                Err(e) => {
                    tracing::warn!(bot = %name, error = %e, "generation not submitted");
                    self.chat.system(e.to_string());
                    break;
                }
            }
        }

        summary
    }
}
