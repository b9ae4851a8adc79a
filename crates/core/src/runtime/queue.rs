use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::bots::BotRegistry;
use crate::chat::SharedChat;
use crate::io::status::StatusBoard;
use crate::types::{ChatMessage, CompletedResponse};

/// Producer side, one clone per worker. Items arrive in completion order.
#[derive(Debug, Clone)]
pub struct ResponseSender {
    tx: mpsc::UnboundedSender<CompletedResponse>,
}

impl ResponseSender {
    /// Append and wake the consumer. False once the consumer has gone away.
    pub fn enqueue(&self, response: CompletedResponse) -> bool {
        self.tx.send(response).is_ok()
    }
}

/// Consumer side. Exactly one exists per queue.
#[derive(Debug)]
pub struct ResponseReceiver {
    rx: mpsc::UnboundedReceiver<CompletedResponse>,
}

impl ResponseReceiver {
    /// Wait for the next completed response. `None` once every sender is gone.
    pub async fn dequeue(&mut self) -> Option<CompletedResponse> {
        self.rx.recv().await
    }

    pub fn try_dequeue(&mut self) -> Option<CompletedResponse> {
        self.rx.try_recv().ok()
    }
}

pub fn channel() -> (ResponseSender, ResponseReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ResponseSender { tx }, ResponseReceiver { rx })
}

/// What the consumer does with each response: transcript first, then the
/// display counter, then the bot's memory. Each step takes and drops its own lock.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub chat: SharedChat,
    pub registry: Arc<BotRegistry>,
    pub status: StatusBoard,
}

impl Delivery {
    pub fn deliver(&self, response: CompletedResponse) {
        self.chat
            .post(ChatMessage::assistant(&response.source_bot, &response.response_text));
        self.status.message_received();
        if !self.registry.record_interaction(response.source_id, &response.response_text) {
            tracing::debug!(bot = %response.source_bot, "response from departed bot, memory not updated");
        }
    }
}

/// Spawn the single consumer loop. On cancellation it drains whatever is
/// already queued, then exits.
pub fn spawn_consumer(mut rx: ResponseReceiver, delivery: Delivery, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::debug!("response consumer started");
        loop {
            tokio::select! {
                item = rx.dequeue() => match item {
                    Some(response) => delivery.deliver(response),
                    None => break,
                },
                _ = cancel.cancelled() => {
                    let mut drained = 0usize;
                    while let Some(response) = rx.try_dequeue() {
                        delivery.deliver(response);
                        drained += 1;
                    }
                    tracing::debug!(drained, "response consumer draining on shutdown");
                    break;
                }
            }
        }
        tracing::debug!("response consumer stopped");
    })
}
